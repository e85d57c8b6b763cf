use std::fmt;
use std::sync::Arc;

use http::HeaderValue;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::schema::{Schema, SchemaValidator, TreeValidator};

mod builder;
pub use self::builder::{CloudClientBuilder, ConfigError};

mod credentials;
pub use self::credentials::{Credentials, SecureString};

mod descriptor;
pub use self::descriptor::{DescriptorError, Payload, Query, RequestDescriptor, encode_segment};

mod error;
pub use self::error::{FetchError, NO_CONTENT_MESSAGE, Violation};

mod executor;
pub use self::executor::ACCEPT_JSON;

mod output;
pub use self::output::Output;

mod pagination;
pub use self::pagination::{
    DEFAULT_PAGE_LIMIT, DEFAULT_TOKEN_PARAM, PAGE_LIMIT_PARAM, Page, PaginationConfig, page_schema,
};

mod transport;
pub use self::transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport, TransportError};

/// Client of a versioned JSON API: builds requests, classifies failures,
/// validates bodies and walks paginated lists.
///
/// The client is immutable once built. Cloning it is cheap and clones share the transport,
/// so independent calls can run concurrently.
///
/// # Example
///
/// ```rust,no_run
/// use cloudfetch_core::{CloudClient, Credentials, ReqwestTransport, RequestDescriptor, Schema};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let credentials = Credentials::new("https://api.example.com".parse()?, "some-key");
/// let client = CloudClient::builder(credentials, ReqwestTransport::new()).build()?;
///
/// let schema: Schema = Schema::object().required("token", Schema::string()).into();
/// let token: serde_json::Value = client
///     .fetch(&RequestDescriptor::new("account/service-token")?, &schema)
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct CloudClient<T, V = TreeValidator> {
    endpoint: Url,
    authorization: HeaderValue,
    transport: Arc<T>,
    validator: Arc<V>,
    pagination: PaginationConfig,
}

impl<T, V> Clone for CloudClient<T, V> {
    fn clone(&self) -> Self {
        Self {
            endpoint: self.endpoint.clone(),
            authorization: self.authorization.clone(),
            transport: Arc::clone(&self.transport),
            validator: Arc::clone(&self.validator),
            pagination: self.pagination.clone(),
        }
    }
}

impl<T, V> fmt::Debug for CloudClient<T, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("pagination", &self.pagination)
            .finish_non_exhaustive()
    }
}

impl<T> CloudClient<T, TreeValidator>
where
    T: Transport,
{
    /// Starts configuring a client. The transport is always explicit.
    pub fn builder(credentials: Credentials, transport: T) -> CloudClientBuilder<T> {
        CloudClientBuilder::new(credentials, transport)
    }
}

impl<T, V> CloudClient<T, V>
where
    T: Transport,
    V: SchemaValidator,
{
    /// The API root.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// The pagination settings.
    pub fn pagination(&self) -> &PaginationConfig {
        &self.pagination
    }

    /// The URL a descriptor resolves to.
    pub fn url_for(&self, descriptor: &RequestDescriptor) -> Url {
        executor::build_url(&self.endpoint, descriptor)
    }

    /// Sends one request and classifies its outcome, without validation.
    ///
    /// # Errors
    ///
    /// [`FetchError::Transport`] when no response was received,
    /// [`FetchError::Status`] for a status outside `2xx`,
    /// [`FetchError::Validation`] for a `2xx` body that is not JSON.
    pub async fn execute(&self, descriptor: &RequestDescriptor) -> Result<Output, FetchError> {
        let request = executor::build_request(&self.endpoint, &self.authorization, descriptor);
        executor::execute(self.transport.as_ref(), request).await
    }

    /// Sends one request, validates the body against `schema` and decodes it into `R`.
    ///
    /// Validation only happens when the request succeeded.
    /// An empty body is decoded from `null`, so `()` or `Option<_>` fit schemas accepting it.
    ///
    /// # Errors
    ///
    /// Any [`FetchError`] of [`CloudClient::execute`], or [`FetchError::Validation`] when
    /// the body does not match `schema` or cannot be decoded into `R`.
    pub async fn fetch<R>(
        &self,
        descriptor: &RequestDescriptor,
        schema: &Schema,
    ) -> Result<R, FetchError>
    where
        R: DeserializeOwned,
    {
        let output = self.execute(descriptor).await?;

        let value = self.validator.validate(schema, &output).map_err(|violations| {
            warn!(
                resource = descriptor.resource(),
                violations = violations.len(),
                "response does not match its schema"
            );
            FetchError::validation(violations)
        })?;

        decode(value).inspect_err(|err| {
            warn!(resource = descriptor.resource(), %err, "response cannot be decoded");
        })
    }

    /// Fetches a single page of a list endpoint.
    ///
    /// `token` is the continuation token of the previous page, `None` for the first one.
    ///
    /// # Errors
    ///
    /// Same as [`CloudClient::fetch`].
    pub async fn fetch_page<I>(
        &self,
        descriptor: &RequestDescriptor,
        item_schema: &Schema,
        token: Option<&str>,
    ) -> Result<Page<I>, FetchError>
    where
        I: DeserializeOwned,
    {
        let schema = page_schema(item_schema.clone());
        self.fetch_page_with(descriptor, &schema, token).await
    }

    /// Fetches every page of a list endpoint and returns all items in page order.
    ///
    /// # Errors
    ///
    /// The error of the first failing page, items of previous pages are dropped.
    /// [`FetchError::PageLimitExceeded`] when a page ceiling is configured and reached.
    pub async fn fetch_all<I>(
        &self,
        descriptor: &RequestDescriptor,
        item_schema: &Schema,
    ) -> Result<Vec<I>, FetchError>
    where
        I: DeserializeOwned,
    {
        let schema = page_schema(item_schema.clone());
        debug!(resource = descriptor.resource(), "fetching all pages");

        pagination::paginate(&self.pagination, |token| {
            let schema = &schema;
            async move {
                self.fetch_page_with(descriptor, schema, token.as_deref())
                    .await
            }
        })
        .await
    }

    async fn fetch_page_with<I>(
        &self,
        descriptor: &RequestDescriptor,
        schema: &Schema,
        token: Option<&str>,
    ) -> Result<Page<I>, FetchError>
    where
        I: DeserializeOwned,
    {
        let query = self.pagination.page_query(descriptor.query(), token);
        let descriptor = descriptor.clone().with_query(query);
        self.fetch(&descriptor, schema).await
    }
}

fn decode<R>(value: Value) -> Result<R, FetchError>
where
    R: DeserializeOwned,
{
    serde_path_to_error::deserialize(value).map_err(|err| {
        let path = err
            .path()
            .iter()
            .filter_map(|segment| match segment {
                serde_path_to_error::Segment::Seq { index } => Some(index.to_string()),
                serde_path_to_error::Segment::Map { key } => Some(key.clone()),
                serde_path_to_error::Segment::Enum { variant } => Some(variant.clone()),
                serde_path_to_error::Segment::Unknown => None,
            })
            .map(|token| format!("/{}", token.replace('~', "~0").replace('/', "~1")))
            .collect::<String>();
        FetchError::validation(vec![Violation::new(path, err.into_inner().to_string())])
    })
}
