use std::sync::LazyLock;

use cloudfetch_core::{Payload, Schema, SchemaValidator, Transport};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{ApiError, CloudApi, resource};

/// The LTE cell a device is connected to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LteCell {
    /// Mobile country code.
    pub mcc: String,
    /// Mobile network code.
    pub mnc: String,
    /// E-UTRAN cell id.
    pub eci: u64,
    /// Tracking area code.
    pub tac: u64,
    /// Reference signal received power, in dBm.
    pub rsrp: i64,
}

/// A location resolved from cellular information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroundFix {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
    /// Radius of the uncertainty circle, in meters.
    pub uncertainty: f64,
    /// Always `SCELL`.
    pub fulfilled_with: String,
}

#[derive(Debug, Serialize)]
struct GroundFixRequest<'a> {
    lte: [&'a LteCell; 1],
}

static GROUND_FIX: LazyLock<Schema> = LazyLock::new(|| {
    Schema::object()
        .required("lat", Schema::number().minimum(-90.0).maximum(90.0))
        .required("lon", Schema::number().minimum(-180.0).maximum(180.0))
        .required("uncertainty", Schema::number().minimum(0.0))
        .required("fulfilledWith", Schema::literal("SCELL"))
        .into()
});

impl<T, V> CloudApi<T, V>
where
    T: Transport,
    V: SchemaValidator,
{
    /// Resolves the location of a device from its serving cell.
    ///
    /// # Errors
    ///
    /// Fails when the request fails or the answer is not a single cell fix.
    pub async fn ground_fix(&self, cell: &LteCell) -> Result<GroundFix, ApiError> {
        let payload = Payload::json(&GroundFixRequest { lte: [cell] })?;
        let fix: GroundFix = self
            .client
            .fetch(
                &resource("location/ground-fix")?.with_payload(payload),
                &GROUND_FIX,
            )
            .await?;
        debug!(?cell, lat = fix.lat, lon = fix.lon, "ground fix resolved");
        Ok(fix)
    }
}
