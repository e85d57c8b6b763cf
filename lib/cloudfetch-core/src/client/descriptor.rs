use std::fmt;

use bytes::Bytes;
use headers::ContentType;
use http::Method;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use serde::Serialize;
use url::form_urlencoded;

/// Characters left untouched when encoding a single path segment.
///
/// Matches the unreserved set of `encodeURIComponent`, so ids like `APP*20a4b75a*v1.1.1`
/// keep their readable form while `/`, `?`, `#` or spaces are escaped.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Percent-encodes a caller-supplied value so it can be used as one path segment.
///
/// ```rust
/// use cloudfetch_core::encode_segment;
///
/// assert_eq!(encode_segment("nrf-123"), "nrf-123");
/// assert_eq!(encode_segment("a/b c"), "a%2Fb%20c");
/// ```
pub fn encode_segment(value: &str) -> String {
    utf8_percent_encode(value, SEGMENT).to_string()
}

/// Errors raised synchronously when a [`RequestDescriptor`] is built from unusable input.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Error, derive_more::Display)]
pub enum DescriptorError {
    /// The resource path is empty.
    #[display("Resource must not be empty")]
    EmptyResource,

    /// The resource path starts with a `/`.
    #[display("Resource '{resource}' must be relative to the API root")]
    AbsoluteResource {
        /// The rejected resource.
        resource: String,
    },

    /// The resource path embeds a query string or a fragment.
    #[display("Resource '{resource}' must not contain '?' or '#', use a Query instead")]
    QueryInResource {
        /// The rejected resource.
        resource: String,
    },

    /// The resource path contains whitespace or control characters.
    #[display("Resource '{resource}' contains whitespace or control characters")]
    InvalidCharacter {
        /// The rejected resource.
        resource: String,
    },

    /// The resource path has a `.` or `..` segment, possibly percent-encoded.
    #[display("Resource '{resource}' must not contain '.' or '..' segments")]
    DotSegment {
        /// The rejected resource.
        resource: String,
    },

    /// A JSON payload could not be serialized.
    #[display("Failed to serialize JSON payload: {message}")]
    PayloadSerialization {
        /// The serializer message.
        message: String,
    },
}

/// Ordered query parameters.
///
/// Pairs keep their insertion order, except when built with [`Query::from_map`] where
/// keys are sorted lexicographically so the same map always yields the same query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pairs: Vec<(String, String)>,
}

impl Query {
    /// Creates an empty query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a query from key/value pairs, sorted by key.
    ///
    /// ```rust
    /// use cloudfetch_core::Query;
    ///
    /// let query = Query::from_map([("pageLimit", "100"), ("deviceIds", "a,b")]);
    /// assert_eq!(query.to_query_string(), "deviceIds=a%2Cb&pageLimit=100");
    /// ```
    pub fn from_map<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut pairs = pairs
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect::<Vec<_>>();
        pairs.sort_by(|left, right| left.0.cmp(&right.0));
        Self { pairs }
    }

    /// Appends a pair, keeping any existing pair with the same key.
    #[must_use]
    pub fn append(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.pairs.push((key.into(), value.into()));
        self
    }

    /// Sets the value of `key`.
    ///
    /// The first pair with this key is updated in place and the others are removed,
    /// otherwise the pair is appended.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        let mut found = false;
        self.pairs.retain_mut(|(name, current)| {
            if name != key {
                return true;
            }
            if found {
                return false;
            }
            found = true;
            current.clone_from(&value);
            true
        });
        if !found {
            self.pairs.push((key.to_string(), value));
        }
    }

    /// Returns the first value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    /// Returns true when there is no pair.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Iterates over the pairs in serialization order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Serializes as `application/x-www-form-urlencoded`, each value encoded once.
    pub fn to_query_string(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.iter())
            .finish()
    }
}

impl<K, V> FromIterator<(K, V)> for Query
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let pairs = iter
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        Self { pairs }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_query_string())
    }
}

/// A request body with its declared content type.
#[derive(Clone, derive_more::Debug)]
pub struct Payload {
    content_type: ContentType,
    #[debug(ignore)]
    body: Bytes,
}

impl Payload {
    /// Creates a payload from raw bytes.
    pub fn new(content_type: ContentType, body: impl Into<Bytes>) -> Self {
        Self {
            content_type,
            body: body.into(),
        }
    }

    /// Serializes `value` as an `application/json` payload.
    ///
    /// # Errors
    ///
    /// Returns [`DescriptorError::PayloadSerialization`] when `value` cannot be serialized.
    pub fn json<T>(value: &T) -> Result<Self, DescriptorError>
    where
        T: Serialize + ?Sized,
    {
        let body =
            serde_json::to_vec(value).map_err(|err| DescriptorError::PayloadSerialization {
                message: err.to_string(),
            })?;
        Ok(Self::new(ContentType::json(), body))
    }

    /// Creates an `application/octet-stream` payload.
    pub fn octet_stream(body: impl Into<Bytes>) -> Self {
        Self::new(ContentType::octet_stream(), body)
    }

    /// The declared content type.
    pub fn content_type(&self) -> &ContentType {
        &self.content_type
    }

    /// The raw body.
    pub fn body(&self) -> &Bytes {
        &self.body
    }
}

/// Describes one call to the API: which resource, with which query, verb and payload.
///
/// # Example
///
/// ```rust
/// use cloudfetch_core::{Payload, Query, RequestDescriptor};
/// use http::Method;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let list = RequestDescriptor::new("firmwares")?
///     .with_query(Query::new().append("pageLimit", "100"));
/// assert_eq!(list.method(), Method::GET);
///
/// let create = RequestDescriptor::new("fota-jobs")?
///     .with_payload(Payload::json(&serde_json::json!({ "bundleId": "APP*1" }))?);
/// assert_eq!(create.method(), Method::POST);
///
/// let cancel = RequestDescriptor::new("fota-jobs/42/cancel")?.with_method(Method::PUT);
/// assert_eq!(cancel.method(), Method::PUT);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    resource: String,
    query: Option<Query>,
    method: Option<Method>,
    payload: Option<Payload>,
}

impl RequestDescriptor {
    /// Creates a descriptor for a resource path relative to the versioned API root.
    ///
    /// Caller-supplied ids should be passed through [`encode_segment`] first.
    ///
    /// # Errors
    ///
    /// Fails when the resource is empty, absolute, carries a query string or fragment,
    /// or contains whitespace or control characters.
    pub fn new(resource: impl Into<String>) -> Result<Self, DescriptorError> {
        let resource = resource.into();
        if resource.is_empty() {
            return Err(DescriptorError::EmptyResource);
        }
        if resource.starts_with('/') {
            return Err(DescriptorError::AbsoluteResource { resource });
        }
        if resource.contains(['?', '#']) {
            return Err(DescriptorError::QueryInResource { resource });
        }
        if resource
            .chars()
            .any(|ch| ch.is_whitespace() || ch.is_control())
        {
            return Err(DescriptorError::InvalidCharacter { resource });
        }
        if resource.split('/').any(is_dot_segment) {
            return Err(DescriptorError::DotSegment { resource });
        }

        Ok(Self {
            resource,
            query: None,
            method: None,
            payload: None,
        })
    }

    /// Sets the query parameters.
    #[must_use]
    pub fn with_query(mut self, query: Query) -> Self {
        self.query = Some(query);
        self
    }

    /// Overrides the HTTP method.
    #[must_use]
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Sets the request body.
    #[must_use]
    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = Some(payload);
        self
    }

    /// The resource path.
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// The query parameters, if any.
    pub fn query(&self) -> Option<&Query> {
        self.query.as_ref()
    }

    /// The payload, if any.
    pub fn payload(&self) -> Option<&Payload> {
        self.payload.as_ref()
    }

    /// The effective HTTP method.
    ///
    /// An explicit method always wins. Otherwise a payload implies `POST`, and no payload `GET`.
    pub fn method(&self) -> Method {
        match (&self.method, &self.payload) {
            (Some(method), _) => method.clone(),
            (None, Some(_)) => Method::POST,
            (None, None) => Method::GET,
        }
    }
}

// `%2e` counts as a dot once the URL is normalized
fn is_dot_segment(segment: &str) -> bool {
    let decoded = percent_decode_str(segment).decode_utf8_lossy();
    decoded == "." || decoded == ".."
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_reject_unusable_resources() {
        assert_eq!(
            RequestDescriptor::new("").unwrap_err(),
            DescriptorError::EmptyResource
        );
        insta::assert_snapshot!(
            RequestDescriptor::new("/devices").unwrap_err(),
            @"Resource '/devices' must be relative to the API root"
        );
        insta::assert_snapshot!(
            RequestDescriptor::new("devices?pageLimit=100").unwrap_err(),
            @"Resource 'devices?pageLimit=100' must not contain '?' or '#', use a Query instead"
        );
        assert!(matches!(
            RequestDescriptor::new("devices/my device"),
            Err(DescriptorError::InvalidCharacter { .. })
        ));
    }

    #[test]
    fn should_reject_dot_segments() {
        insta::assert_snapshot!(
            RequestDescriptor::new("fota-jobs/../cancel").unwrap_err(),
            @"Resource 'fota-jobs/../cancel' must not contain '.' or '..' segments"
        );
        for resource in ["..", "devices/.", "fota-jobs/%2e%2E/cancel", "devices/%2E"] {
            assert!(
                matches!(
                    RequestDescriptor::new(resource),
                    Err(DescriptorError::DotSegment { .. })
                ),
                "{resource} should be rejected"
            );
        }

        let dotted = RequestDescriptor::new("firmwares/APP*1*v1.1.1/..json")
            .expect("dots inside a segment are fine");
        assert_eq!(dotted.resource(), "firmwares/APP*1*v1.1.1/..json");
    }

    #[test]
    fn should_pick_method_from_payload_and_override() {
        let get = RequestDescriptor::new("devices").expect("valid resource");
        assert_eq!(get.method(), Method::GET);

        let post = get
            .clone()
            .with_payload(Payload::octet_stream("some data"));
        assert_eq!(post.method(), Method::POST);

        let put_with_body = post.with_method(Method::PUT);
        assert_eq!(put_with_body.method(), Method::PUT);

        let patch = get.with_method(Method::PATCH);
        assert_eq!(patch.method(), Method::PATCH);
    }

    #[test]
    fn should_sort_query_built_from_map() {
        let query = Query::from_map([
            ("pageLimit", "100"),
            ("includeStateMeta", "true"),
            ("deviceIds", "a,b"),
            ("includeState", "true"),
        ]);

        insta::assert_snapshot!(
            query.to_query_string(),
            @"deviceIds=a%2Cb&includeState=true&includeStateMeta=true&pageLimit=100"
        );
    }

    #[test]
    fn should_keep_insertion_order_otherwise() {
        let query = Query::new()
            .append("pageLimit", "100")
            .append("deviceId", "nrf-1");

        assert_eq!(query.to_query_string(), "pageLimit=100&deviceId=nrf-1");
    }

    #[test]
    fn should_replace_existing_key_on_set() {
        let mut query = Query::new()
            .append("pageNextToken", "old")
            .append("pageLimit", "100")
            .append("pageNextToken", "older");

        query.set("pageNextToken", "new");
        assert_eq!(query.to_query_string(), "pageNextToken=new&pageLimit=100");

        query.set("deviceId", "nrf-1");
        assert_eq!(query.get("deviceId"), Some("nrf-1"));
    }

    #[test]
    fn should_encode_values_once() {
        let query = Query::new().append("pageNextToken", "a/b+c==");

        assert_eq!(query.to_query_string(), "pageNextToken=a%2Fb%2Bc%3D%3D");
    }

    #[test]
    fn should_encode_path_segments() {
        assert_eq!(encode_segment("APP*20a4b75a*v1.1.1"), "APP*20a4b75a*v1.1.1");
        assert_eq!(encode_segment("50:4a:1f"), "50%3A4a%3A1f");
        assert_eq!(encode_segment("a/b?c#d"), "a%2Fb%3Fc%23d");
    }

    #[test]
    fn should_build_json_payload() {
        let payload =
            Payload::json(&serde_json::json!({ "foo": "bar" })).expect("serializable payload");

        assert_eq!(payload.content_type(), &ContentType::json());
        assert_eq!(payload.body().as_ref(), br#"{"foo":"bar"}"#);
    }
}
