use std::fmt;

use http::HeaderValue;
use serde::{Deserialize, Serialize};
use url::Url;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Secret string zeroed on drop, redacted in `Debug` and masked in `Display`.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SecureString(String);

impl SecureString {
    /// Wraps a secret.
    pub fn new(value: String) -> Self {
        Self(value)
    }

    /// The secret itself.
    ///
    /// Avoid keeping the returned reference around.
    pub fn expose(&self) -> &str {
        &self.0
    }

    fn masked(&self) -> String {
        let count = self.0.chars().count();
        if count <= 8 {
            return "***".to_string();
        }
        let head = self.0.chars().take(4).collect::<String>();
        let tail = self.0.chars().skip(count - 4).collect::<String>();
        format!("{head}...{tail}")
    }
}

impl fmt::Debug for SecureString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SecureString").field(&"[REDACTED]").finish()
    }
}

impl fmt::Display for SecureString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.masked())
    }
}

impl From<String> for SecureString {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for SecureString {
    fn from(value: &str) -> Self {
        Self::new(value.to_string())
    }
}

impl Serialize for SecureString {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SecureString {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        String::deserialize(deserializer).map(Self::new)
    }
}

/// Where to send requests and how to authenticate them.
///
/// ```rust
/// use cloudfetch_core::Credentials;
///
/// let credentials: Credentials = serde_json::from_str(
///     r#"{ "endpoint": "https://api.example.com", "apiKey": "secret" }"#,
/// )?;
/// assert_eq!(credentials.endpoint.as_str(), "https://api.example.com/");
/// # Ok::<(), serde_json::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    /// The API root, without the `/v1` version prefix.
    pub endpoint: Url,
    /// The bearer token.
    pub api_key: SecureString,
}

impl Credentials {
    /// Creates credentials.
    pub fn new(endpoint: Url, api_key: impl Into<SecureString>) -> Self {
        Self {
            endpoint,
            api_key: api_key.into(),
        }
    }

    /// The `Authorization` header value, flagged as sensitive.
    pub(crate) fn authorization(&self) -> Result<HeaderValue, http::header::InvalidHeaderValue> {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", self.api_key.expose()))?;
        value.set_sensitive(true);
        Ok(value)
    }
}
