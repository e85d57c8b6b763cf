//! # Cloudfetch Resources
//!
//! Typed bindings of an IoT device cloud API built on [`cloudfetch_core`]:
//! firmware bundles, FOTA jobs, device registration and shadows, location history,
//! account information and cellular ground fixes.
//!
//! Each binding only supplies a resource path, an optional payload and a schema,
//! then decodes the validated body into a plain Rust type.
//!
//! ```rust,no_run
//! use cloudfetch_core::{CloudClient, Credentials, ReqwestTransport};
//! use cloudfetch_resources::CloudApi;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let credentials = Credentials::new("https://api.example.com".parse()?, "some-key");
//! let api = CloudApi::new(CloudClient::builder(credentials, ReqwestTransport::new()).build()?);
//!
//! for bundle in api.list_bundles().await? {
//!     println!("{} {}", bundle.bundle_id, bundle.version);
//! }
//! # Ok(())
//! # }
//! ```

use cloudfetch_core::{
    CloudClient, DescriptorError, FetchError, RequestDescriptor, SchemaValidator, Transport,
    TreeValidator,
};

mod account;
pub use self::account::{AccountInfo, MonthlyCosts, Team};

mod bundles;
pub use self::bundles::{FirmwareType, FotaBundle};

mod devices;
pub use self::devices::{
    BulkOpsRequest, BulkOpsStatus, Device, DeviceRegistration, ShadowUpdate,
    registration_payload,
};

mod fota;
pub use self::fota::{CreatedFotaJob, FotaJob, FotaJobStatus};

mod ground_fix;
pub use self::ground_fix::{GroundFix, LteCell};

mod location;
pub use self::location::{Anchor, LocationHistoryQuery, LocationRecord, ServiceType};

mod shadow;
pub use self::shadow::{DeviceShadow, ShadowMeta, ShadowState};

/// Failure of a resource call.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Error, derive_more::Display, derive_more::From)]
pub enum ApiError {
    /// The call was sent and failed.
    #[display("{_0}")]
    Fetch(FetchError),

    /// The request could not be described.
    #[display("{_0}")]
    Descriptor(DescriptorError),
}

impl ApiError {
    /// The underlying [`FetchError`], if the request was sent.
    pub fn as_fetch(&self) -> Option<&FetchError> {
        match self {
            Self::Fetch(error) => Some(error),
            Self::Descriptor(_) => None,
        }
    }
}

/// Entry point of the typed bindings.
#[derive(Debug)]
pub struct CloudApi<T, V = TreeValidator> {
    client: CloudClient<T, V>,
}

impl<T, V> Clone for CloudApi<T, V> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
        }
    }
}

impl<T, V> CloudApi<T, V>
where
    T: Transport,
    V: SchemaValidator,
{
    /// Wraps a configured client.
    pub fn new(client: CloudClient<T, V>) -> Self {
        Self { client }
    }

    /// The underlying client, for calls not covered by these bindings.
    pub fn client(&self) -> &CloudClient<T, V> {
        &self.client
    }
}

fn resource(path: impl Into<String>) -> Result<RequestDescriptor, ApiError> {
    Ok(RequestDescriptor::new(path)?)
}
