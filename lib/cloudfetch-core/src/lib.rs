//! # Cloudfetch Core
//!
//! A validated request engine for versioned JSON APIs authenticated with a bearer token.
//!
//! Every call goes through the same pipeline:
//!
//! 1. A [`RequestDescriptor`] names the resource, the query, the method and the payload.
//! 2. The [`CloudClient`] turns it into `<endpoint>/v1/<resource>[?query]`, adds the
//!    `Authorization` and `Accept` headers and hands it to a [`Transport`].
//! 3. The outcome is classified: transport failure, unexpected status, empty body or JSON body.
//! 4. A successful body is checked against a [`Schema`] by a [`SchemaValidator`], then decoded.
//!
//! List endpoints are walked with [`CloudClient::fetch_all`], following the `pageNextToken`
//! continuation token until the last page.
//!
//! Every failure is a [`FetchError`] value: nothing is retried and nothing panics.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cloudfetch_core::{CloudClient, Credentials, ReqwestTransport, RequestDescriptor, Schema};
//! use serde::Deserialize;
//!
//! #[derive(Debug, Deserialize)]
//! #[serde(rename_all = "camelCase")]
//! struct Bundle {
//!     bundle_id: String,
//!     version: String,
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let credentials = Credentials::new("https://api.example.com".parse()?, "some-key");
//! let client = CloudClient::builder(credentials, ReqwestTransport::new()).build()?;
//!
//! let bundle: Schema = Schema::object()
//!     .required("bundleId", Schema::string().min_length(1))
//!     .required("version", Schema::string())
//!     .into();
//! let bundles: Vec<Bundle> = client
//!     .fetch_all(&RequestDescriptor::new("firmwares")?, &bundle)
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Testing
//!
//! [`testing::MockTransport`] replays scripted responses and records requests,
//! so code built on this crate can be tested without a server.

mod client;
pub use self::client::*;

mod schema;
pub use self::schema::{
    ArraySchema, Field, NumberSchema, ObjectSchema, RecordSchema, Schema, SchemaValidator,
    StringSchema, TreeValidator,
};

pub mod testing;
