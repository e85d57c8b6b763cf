use std::num::NonZeroU32;
use std::sync::Arc;

use http::header::InvalidHeaderValue;

use super::credentials::Credentials;
use super::pagination::PaginationConfig;
use super::transport::Transport;
use super::CloudClient;
use crate::schema::{SchemaValidator, TreeValidator};

/// Errors raised when a [`CloudClient`] cannot be built from its configuration.
#[derive(Debug, derive_more::Error, derive_more::Display, derive_more::From)]
pub enum ConfigError {
    /// The endpoint scheme is neither `http` nor `https`.
    #[display("Endpoint '{endpoint}' must use http or https")]
    #[from(ignore)]
    UnsupportedScheme {
        /// The rejected endpoint.
        endpoint: String,
    },

    /// The endpoint cannot carry a path (`mailto:`, `data:`...).
    #[display("Endpoint '{endpoint}' cannot be used as a base URL")]
    #[from(ignore)]
    CannotBeBase {
        /// The rejected endpoint.
        endpoint: String,
    },

    /// The API key cannot be sent in an HTTP header.
    #[display("API key contains characters not allowed in a header")]
    InvalidApiKey(InvalidHeaderValue),

    /// The page size is zero.
    #[display("Page limit must be greater than zero")]
    #[from(ignore)]
    ZeroPageLimit,

    /// The continuation token parameter name is empty.
    #[display("Continuation token parameter must not be empty")]
    #[from(ignore)]
    EmptyTokenParam,
}

/// Builder for [`CloudClient`].
///
/// # Example
///
/// ```rust
/// use cloudfetch_core::{CloudClient, Credentials, ReqwestTransport};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let credentials = Credentials::new("https://api.example.com".parse()?, "some-key");
/// let client = CloudClient::builder(credentials, ReqwestTransport::new())
///     .with_page_limit(50)
///     .with_max_pages(1_000)
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct CloudClientBuilder<T, V = TreeValidator> {
    credentials: Credentials,
    transport: T,
    validator: V,
    page_limit: Option<u32>,
    max_pages: Option<u32>,
    token_param: String,
}

impl<T> CloudClientBuilder<T, TreeValidator>
where
    T: Transport,
{
    pub(super) fn new(credentials: Credentials, transport: T) -> Self {
        let defaults = PaginationConfig::default();
        Self {
            credentials,
            transport,
            validator: TreeValidator,
            page_limit: defaults.page_limit,
            max_pages: None,
            token_param: defaults.token_param,
        }
    }
}

impl<T, V> CloudClientBuilder<T, V>
where
    T: Transport,
    V: SchemaValidator,
{
    /// Replaces the schema validator.
    pub fn with_validator<W>(self, validator: W) -> CloudClientBuilder<T, W>
    where
        W: SchemaValidator,
    {
        CloudClientBuilder {
            credentials: self.credentials,
            transport: self.transport,
            validator,
            page_limit: self.page_limit,
            max_pages: self.max_pages,
            token_param: self.token_param,
        }
    }

    /// Sets the `pageLimit` sent with every page request (default `100`).
    #[must_use]
    pub fn with_page_limit(mut self, page_limit: u32) -> Self {
        self.page_limit = Some(page_limit);
        self
    }

    /// Stops sending `pageLimit`, letting the server pick the page size.
    #[must_use]
    pub fn without_page_limit(mut self) -> Self {
        self.page_limit = None;
        self
    }

    /// Fails list calls with [`PageLimitExceeded`](crate::FetchError::PageLimitExceeded)
    /// once `max_pages` pages were fetched while the server still returns a token.
    ///
    /// `0` means unbounded, which is the default.
    #[must_use]
    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = Some(max_pages);
        self
    }

    /// Renames the query parameter carrying the continuation token (default `pageNextToken`).
    #[must_use]
    pub fn with_token_param(mut self, token_param: impl Into<String>) -> Self {
        self.token_param = token_param.into();
        self
    }

    /// Builds the client.
    ///
    /// # Errors
    ///
    /// Fails when the endpoint is not an `http`/`https` base URL, when the API key
    /// cannot be sent as a header, or when the pagination settings are unusable.
    pub fn build(self) -> Result<CloudClient<T, V>, ConfigError> {
        let Self {
            credentials,
            transport,
            validator,
            page_limit,
            max_pages,
            token_param,
        } = self;

        let endpoint = credentials.endpoint.clone();
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(ConfigError::UnsupportedScheme {
                endpoint: endpoint.to_string(),
            });
        }
        if endpoint.cannot_be_a_base() {
            return Err(ConfigError::CannotBeBase {
                endpoint: endpoint.to_string(),
            });
        }
        if page_limit == Some(0) {
            return Err(ConfigError::ZeroPageLimit);
        }
        if token_param.is_empty() {
            return Err(ConfigError::EmptyTokenParam);
        }

        let authorization = credentials.authorization()?;
        let pagination = PaginationConfig {
            token_param,
            page_limit,
            max_pages: max_pages.and_then(NonZeroU32::new),
        };

        Ok(CloudClient {
            endpoint,
            authorization,
            transport: Arc::new(transport),
            validator: Arc::new(validator),
            pagination,
        })
    }
}
