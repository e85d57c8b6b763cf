use std::sync::LazyLock;

use cloudfetch_core::{Schema, SchemaValidator, Transport};
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{ApiError, CloudApi, resource};

/// Firmware image kinds a device can be updated with.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FirmwareType {
    /// Application firmware.
    #[display("APP")]
    App,
    /// Modem firmware delta.
    #[display("MODEM")]
    Modem,
    /// Boot loader.
    #[display("BOOT")]
    Boot,
    /// `SoftDevice` radio stack.
    #[display("SOFTDEVICE")]
    Softdevice,
    /// Second stage boot loader.
    #[display("BOOTLOADER")]
    Bootloader,
    /// Full modem image.
    #[display("MDM_FULL")]
    MdmFull,
}

impl FirmwareType {
    /// Every firmware type.
    pub const ALL: [Self; 6] = [
        Self::App,
        Self::Modem,
        Self::Boot,
        Self::Softdevice,
        Self::Bootloader,
        Self::MdmFull,
    ];

    pub(crate) fn schema() -> Schema {
        Schema::enumeration(Self::ALL.iter().map(ToString::to_string))
    }
}

/// A firmware bundle available for FOTA.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FotaBundle {
    /// The bundle id, like `APP*20a4b75a*v1.1.1-debug`.
    pub bundle_id: String,
    /// Last modification.
    #[serde(default)]
    pub last_modified: Option<Timestamp>,
    /// Size in bytes.
    pub size: u64,
    /// Firmware version.
    pub version: String,
    /// Firmware kind.
    #[serde(rename = "type")]
    pub firmware_type: FirmwareType,
    /// Files of the bundle.
    pub filenames: Vec<String>,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
}

static FOTA_BUNDLE: LazyLock<Schema> = LazyLock::new(|| {
    Schema::object()
        .required("bundleId", Schema::string().min_length(1))
        .optional("lastModified", Schema::string())
        .required("size", Schema::number().minimum(0.0))
        .required("version", Schema::string().min_length(1))
        .required("type", FirmwareType::schema())
        .required("filenames", Schema::array(Schema::string().min_length(1)))
        .optional("name", Schema::string().min_length(1))
        .optional("description", Schema::string().min_length(1))
        .into()
});

impl<T, V> CloudApi<T, V>
where
    T: Transport,
    V: SchemaValidator,
{
    /// Lists every firmware bundle, walking all pages.
    ///
    /// # Errors
    ///
    /// Fails with the first page error.
    pub async fn list_bundles(&self) -> Result<Vec<FotaBundle>, ApiError> {
        let bundles: Vec<FotaBundle> = self
            .client
            .fetch_all(&resource("firmwares")?, &FOTA_BUNDLE)
            .await?;
        debug!(count = bundles.len(), "firmware bundles listed");
        Ok(bundles)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use cloudfetch_core::FetchError;
    use cloudfetch_core::testing::MockTransport;
    use serde_json::json;

    use super::*;
    use crate::fixtures::api;

    fn bundle(id: &str) -> serde_json::Value {
        json!({
            "bundleId": id,
            "lastModified": "2019-08-24T14:15:22Z",
            "size": 418_565,
            "version": "v1.1.1-debug",
            "type": "APP",
            "filenames": ["hello-nrfcloud-thingy91-debug-v1.1.1-fwupd.bin"],
            "name": "hello.nrfcloud.com v1.1.1-debug",
        })
    }

    #[tokio::test]
    async fn should_list_all_bundles() {
        let transport = Arc::new(
            MockTransport::new()
                .respond_json(
                    200,
                    json!({ "items": [bundle("APP*1")], "total": 1, "pageNextToken": "next" }),
                )
                .respond_json(200, json!({ "items": [bundle("APP*2")], "total": 1 })),
        );

        let bundles = api(&transport).list_bundles().await.expect("all bundles");

        let ids = bundles
            .iter()
            .map(|it| it.bundle_id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(ids, ["APP*1", "APP*2"]);
        assert_eq!(
            bundles.first().map(|it| it.firmware_type),
            Some(FirmwareType::App)
        );
        insta::assert_debug_snapshot!(transport.urls(), @r#"
        [
            "https://api.example.com/v1/firmwares?pageLimit=100",
            "https://api.example.com/v1/firmwares?pageLimit=100&pageNextToken=next",
        ]
        "#);
    }

    #[tokio::test]
    async fn should_reject_unknown_firmware_type() {
        let mut invalid = bundle("APP*1");
        invalid["type"] = json!("FIRMWARE");
        let transport = Arc::new(
            MockTransport::new().respond_json(200, json!({ "items": [invalid], "total": 1 })),
        );

        let error = api(&transport)
            .list_bundles()
            .await
            .expect_err("unknown type");

        insta::assert_snapshot!(error, @"Validation errors: /items/0/type: Expected one of APP, MODEM, BOOT, SOFTDEVICE, BOOTLOADER, MDM_FULL, got 'FIRMWARE'");
        assert!(matches!(
            error.as_fetch(),
            Some(FetchError::Validation { .. })
        ));
    }

    #[test]
    fn should_serialize_firmware_types() {
        let json = serde_json::to_value(FirmwareType::ALL).expect("serializable");

        assert_eq!(
            json,
            json!(["APP", "MODEM", "BOOT", "SOFTDEVICE", "BOOTLOADER", "MDM_FULL"])
        );
    }
}
