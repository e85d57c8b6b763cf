use std::sync::LazyLock;

use cloudfetch_core::{Page, Query, Schema, SchemaValidator, Transport};
use jiff::Timestamp;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::{ApiError, CloudApi, resource};

static UNCERTAINTY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^[0-9.]+$").expect("a valid regex"));

static MAC_ADDRESS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("(?i)^([0-9a-f]{2}:){5}[0-9a-f]{2}$").expect("a valid regex"));

static ANCHOR_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("(?i)^[a-z0-9_ -]{1,32}$").expect("a valid regex"));

/// How a location was obtained. `_EVAL` variants used an evaluation token.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceType {
    /// Wi-Fi anchors.
    #[display("ANCHOR")]
    Anchor,
    /// Satellite fix computed on the device.
    #[display("GNSS")]
    Gnss,
    /// Deprecated, still returned for older records.
    #[display("GPS")]
    Gps,
    /// Multi-cell.
    #[display("MCELL")]
    Mcell,
    /// Multi-cell, evaluation token.
    #[display("MCELL_EVAL")]
    McellEval,
    /// Single-cell.
    #[display("SCELL")]
    Scell,
    /// Single-cell, evaluation token.
    #[display("SCELL_EVAL")]
    ScellEval,
    /// Wi-Fi.
    #[display("WIFI")]
    Wifi,
    /// Wi-Fi, evaluation token.
    #[display("WIFI_EVAL")]
    WifiEval,
}

impl ServiceType {
    /// Every service type.
    pub const ALL: [Self; 9] = [
        Self::Anchor,
        Self::Gnss,
        Self::Gps,
        Self::Mcell,
        Self::McellEval,
        Self::Scell,
        Self::ScellEval,
        Self::Wifi,
        Self::WifiEval,
    ];
}

/// A Wi-Fi access point used for the fix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Anchor {
    /// Six colon separated hexadecimal pairs.
    pub mac_address: String,
    /// Name of the anchor.
    #[serde(default)]
    pub name: Option<String>,
}

/// One entry of a device location history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationRecord {
    /// The record id.
    pub id: String,
    /// The device id.
    pub device_id: String,
    /// How the location was obtained.
    pub service_type: ServiceType,
    /// When the record was stored.
    pub inserted_at: Timestamp,
    /// Latitude in degrees, as sent by the server.
    pub lat: String,
    /// Longitude in degrees, as sent by the server.
    pub lon: String,
    /// Device supplied metadata, empty for non GNSS fixes.
    pub meta: Map<String, Value>,
    /// Radius of the uncertainty circle, in meters.
    pub uncertainty: String,
    /// Anchors used for the fix.
    #[serde(default)]
    pub anchors: Option<Vec<Anchor>>,
}

/// Which part of a device location history to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationHistoryQuery {
    /// The device id.
    pub device_id: String,
    /// Only records inserted after this instant.
    pub start: Option<Timestamp>,
    /// Only records inserted before this instant.
    pub end: Option<Timestamp>,
}

impl LocationHistoryQuery {
    /// The whole history of a device.
    pub fn new(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            start: None,
            end: None,
        }
    }

    /// Restricts the history to a time range.
    #[must_use]
    pub fn between(mut self, start: Option<Timestamp>, end: Option<Timestamp>) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    fn to_query(&self) -> Query {
        let mut query = Query::new()
            .append("pageLimit", "100")
            .append("deviceId", self.device_id.as_str());
        // millisecond precision, like the API examples
        if let Some(start) = self.start {
            query.set("start", format!("{start:.3}"));
        }
        if let Some(end) = self.end {
            query.set("end", format!("{end:.3}"));
        }
        query
    }
}

static LOCATION_RECORD: LazyLock<Schema> = LazyLock::new(|| {
    Schema::object()
        .required("id", Schema::string().min_length(1))
        .required("deviceId", Schema::string().min_length(1))
        .required(
            "serviceType",
            Schema::enumeration(ServiceType::ALL.iter().map(ToString::to_string)),
        )
        .required("insertedAt", Schema::string())
        .required("lat", Schema::string().min_length(1))
        .required("lon", Schema::string().min_length(1))
        .required(
            "meta",
            Schema::record(Schema::string().min_length(1), Schema::Any),
        )
        .required("uncertainty", Schema::string().pattern(UNCERTAINTY.clone()))
        .optional(
            "anchors",
            Schema::array(
                Schema::object()
                    .required("macAddress", Schema::string().pattern(MAC_ADDRESS.clone()))
                    .optional("name", Schema::string().pattern(ANCHOR_NAME.clone())),
            ),
        )
        .into()
});

impl<T, V> CloudApi<T, V>
where
    T: Transport,
    V: SchemaValidator,
{
    /// Fetches one page of a device location history.
    ///
    /// Pass the `next_token` of the previous page to get the following one.
    ///
    /// # Errors
    ///
    /// Fails when the request fails or a record does not match the expected shape.
    pub async fn location_history_page(
        &self,
        query: &LocationHistoryQuery,
        token: Option<&str>,
    ) -> Result<Page<LocationRecord>, ApiError> {
        let descriptor = resource("location/history")?.with_query(query.to_query());
        let page = self
            .client
            .fetch_page(&descriptor, &LOCATION_RECORD, token)
            .await?;
        Ok(page)
    }

    /// Fetches a device location history, walking all pages.
    ///
    /// # Errors
    ///
    /// Fails with the first page error.
    pub async fn location_history(
        &self,
        query: &LocationHistoryQuery,
    ) -> Result<Vec<LocationRecord>, ApiError> {
        let descriptor = resource("location/history")?.with_query(query.to_query());
        let records: Vec<LocationRecord> = self
            .client
            .fetch_all(&descriptor, &LOCATION_RECORD)
            .await?;
        debug!(
            device_id = %query.device_id,
            count = records.len(),
            "location history fetched"
        );
        Ok(records)
    }
}
