use std::sync::LazyLock;

use cloudfetch_core::{Page, Payload, Query, Schema, SchemaValidator, Transport, encode_segment};
use http::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::shadow::{DeviceShadow, device_shadow_schema};
use crate::{ApiError, CloudApi, FirmwareType, resource};

/// One device of a bulk registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRegistration {
    /// Globally unique device id.
    pub device_id: String,
    /// Custom device type, like `humidity-sensor`.
    #[serde(default)]
    pub sub_type: Option<String>,
    /// Tags grouping devices.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Firmware types the device accepts for FOTA.
    #[serde(default)]
    pub fw_types: Vec<FirmwareType>,
    /// ES256 X.509 certificate in PEM format.
    pub cert_pem: String,
}

impl DeviceRegistration {
    /// Creates a registration without sub type, tags nor firmware types.
    pub fn new(device_id: impl Into<String>, cert_pem: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            sub_type: None,
            tags: Vec::new(),
            fw_types: Vec::new(),
            cert_pem: cert_pem.into(),
        }
    }

    /// `deviceId,subType,tag1|tag2,FW1|FW2,"<PEM>"`
    ///
    /// The certificate is wrapped in double quotes so its line breaks stay in the column.
    pub fn to_row(&self) -> String {
        let fw_types = self
            .fw_types
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("|");
        format!(
            "{},{},{},{fw_types},\"{}\"",
            self.device_id,
            self.sub_type.as_deref().unwrap_or_default(),
            self.tags.join("|"),
            self.cert_pem,
        )
    }
}

/// The bulk registration body: one row per device, newline separated.
pub fn registration_payload(devices: &[DeviceRegistration]) -> String {
    devices
        .iter()
        .map(DeviceRegistration::to_row)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Status of an asynchronous bulk operation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BulkOpsStatus {
    /// Queued.
    #[display("PENDING")]
    Pending,
    /// Running.
    #[display("IN_PROGRESS")]
    InProgress,
    /// Failed.
    #[display("FAILED")]
    Failed,
    /// Done.
    #[display("SUCCEEDED")]
    Succeeded,
}

/// An asynchronous bulk operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkOpsRequest {
    /// The operation id.
    pub bulk_ops_request_id: String,
    /// Current status.
    pub status: BulkOpsStatus,
}

/// A partial shadow document, merged into the current one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShadowUpdate {
    /// Desired state to merge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desired: Option<Map<String, Value>>,
    /// Reported state to merge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reported: Option<Map<String, Value>>,
}

/// A single device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    /// The device id.
    pub id: String,
    /// The device shadow, absent until the device connected once.
    #[serde(default)]
    pub state: Option<DeviceShadow>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProvisionDevices {
    bulk_ops_request_id: String,
}

static PROVISION_DEVICES: LazyLock<Schema> = LazyLock::new(|| {
    Schema::object()
        .required("bulkOpsRequestId", Schema::string())
        .into()
});

static BULK_OPS_REQUEST: LazyLock<Schema> = LazyLock::new(|| {
    Schema::object()
        .required("bulkOpsRequestId", Schema::string())
        .required(
            "status",
            Schema::union([
                Schema::literal("PENDING"),
                Schema::literal("IN_PROGRESS"),
                Schema::literal("FAILED"),
                Schema::literal("SUCCEEDED"),
            ]),
        )
        .into()
});

static DEVICE_SHADOW: LazyLock<Schema> = LazyLock::new(device_shadow_schema);

static DEVICE: LazyLock<Schema> = LazyLock::new(|| {
    Schema::object()
        .required("id", Schema::string())
        .optional("state", device_shadow_schema())
        .into()
});

impl<T, V> CloudApi<T, V>
where
    T: Transport,
    V: SchemaValidator,
{
    /// Registers devices in bulk, returns the id of the bulk operation to poll.
    ///
    /// # Errors
    ///
    /// Fails when the request fails or the answer carries no operation id.
    pub async fn register_devices(
        &self,
        devices: &[DeviceRegistration],
    ) -> Result<String, ApiError> {
        let payload = Payload::octet_stream(registration_payload(devices));
        let result: ProvisionDevices = self
            .client
            .fetch(&resource("devices")?.with_payload(payload), &PROVISION_DEVICES)
            .await?;
        info!(
            devices = devices.len(),
            bulk_ops_request_id = %result.bulk_ops_request_id,
            "devices registration requested"
        );
        Ok(result.bulk_ops_request_id)
    }

    /// Fetches the status of a bulk operation.
    ///
    /// # Errors
    ///
    /// Fails when the request fails or the status is unknown.
    pub async fn bulk_ops_request(&self, id: &str) -> Result<BulkOpsRequest, ApiError> {
        let descriptor = resource(format!("bulk-ops-requests/{}", encode_segment(id)))?;
        let request = self.client.fetch(&descriptor, &BULK_OPS_REQUEST).await?;
        Ok(request)
    }

    /// Fetches one device.
    ///
    /// # Errors
    ///
    /// Fails when the request fails, for instance with a `404` status for an unknown device,
    /// or when the device does not match the expected shape.
    pub async fn get_device(&self, device_id: &str) -> Result<Device, ApiError> {
        let descriptor = resource(format!("devices/{}", encode_segment(device_id)))?;
        let device = self.client.fetch(&descriptor, &DEVICE).await?;
        Ok(device)
    }

    /// Fetches the shadows of the given devices, state and state metadata included.
    ///
    /// Only the first page is fetched, so at most 100 devices should be asked for.
    ///
    /// # Errors
    ///
    /// Fails when the request fails or a shadow does not match the expected shape.
    pub async fn get_device_shadows(
        &self,
        device_ids: &[&str],
    ) -> Result<Vec<DeviceShadow>, ApiError> {
        let query = Query::from_map([
            ("includeState", "true".to_string()),
            ("includeStateMeta", "true".to_string()),
            ("pageLimit", "100".to_string()),
            ("deviceIds", device_ids.join(",")),
        ]);
        let descriptor = resource("devices")?.with_query(query);
        let page: Page<DeviceShadow> = self
            .client
            .fetch_page(&descriptor, &DEVICE_SHADOW, None)
            .await?;
        debug!(
            requested = device_ids.len(),
            received = page.items.len(),
            "device shadows fetched"
        );
        Ok(page.items)
    }

    /// Merges a partial document into a device shadow.
    ///
    /// # Errors
    ///
    /// Fails when the request fails.
    pub async fn update_device_state(
        &self,
        device_id: &str,
        update: &ShadowUpdate,
    ) -> Result<(), ApiError> {
        let descriptor = resource(format!("devices/{}/state", encode_segment(device_id)))?
            .with_payload(Payload::json(update)?)
            .with_method(Method::PATCH);
        let _: Value = self.client.fetch(&descriptor, &Schema::Any).await?;
        debug!(device_id, "device state updated");
        Ok(())
    }
}
