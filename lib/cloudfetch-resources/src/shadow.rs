use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use cloudfetch_core::Schema;

/// Device shadow, as returned by the device list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceShadow {
    /// The device id.
    pub id: String,
    /// Shadow timestamps.
    #[serde(rename = "$meta")]
    pub meta: ShadowMeta,
    /// Shadow document, when requested.
    #[serde(default)]
    pub state: Option<ShadowState>,
}

/// Shadow timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShadowMeta {
    /// Creation time.
    pub created_at: Timestamp,
    /// Last update time.
    #[serde(default)]
    pub updated_at: Option<Timestamp>,
}

/// Shadow document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShadowState {
    /// State reported by the device.
    #[serde(default)]
    pub reported: Option<Map<String, Value>>,
    /// State desired by the cloud.
    #[serde(default)]
    pub desired: Option<Map<String, Value>>,
    /// Document version.
    pub version: f64,
    /// Per-key update metadata.
    pub metadata: Map<String, Value>,
}

fn document() -> Schema {
    Schema::record(Schema::string().min_length(1), Schema::Any)
}

pub(crate) fn device_shadow_schema() -> Schema {
    Schema::object()
        .required("id", Schema::string())
        .required(
            "$meta",
            Schema::object()
                .required("createdAt", Schema::string().min_length(1))
                .optional("updatedAt", Schema::string().min_length(1)),
        )
        .optional(
            "state",
            Schema::object()
                .optional("reported", document())
                .optional("desired", document())
                .required("version", Schema::number())
                .required("metadata", document()),
        )
        .into()
}
