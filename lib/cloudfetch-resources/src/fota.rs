use std::sync::LazyLock;

use cloudfetch_core::{Payload, Schema, SchemaValidator, Transport, encode_segment};
use http::Method;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::{ApiError, CloudApi, resource};

/// Lifecycle of a FOTA job.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FotaJobStatus {
    /// Created, not started yet.
    #[display("CREATED")]
    Created,
    /// At least one device is updating.
    #[display("IN_PROGRESS")]
    InProgress,
    /// Cancelled.
    #[display("CANCELLED")]
    Cancelled,
    /// Being deleted.
    #[display("DELETION_IN_PROGRESS")]
    DeletionInProgress,
    /// Done.
    #[display("COMPLETED")]
    Completed,
}

impl FotaJobStatus {
    /// Every status.
    pub const ALL: [Self; 5] = [
        Self::Created,
        Self::InProgress,
        Self::Cancelled,
        Self::DeletionInProgress,
        Self::Completed,
    ];
}

/// A FOTA job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FotaJob {
    /// The job id.
    pub job_id: String,
    /// Current status.
    pub status: FotaJobStatus,
    /// Details about the status.
    #[serde(default)]
    pub status_detail: Option<String>,
    /// Creation time.
    pub created_at: Timestamp,
    /// Last update time.
    #[serde(default)]
    pub last_updated_at: Option<Timestamp>,
    /// Completion time.
    #[serde(default)]
    pub completed_at: Option<Timestamp>,
}

/// The answer to a FOTA job creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedFotaJob {
    /// The id of the new job.
    pub job_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateFotaJob<'a> {
    bundle_id: &'a str,
    auto_apply: bool,
    device_identifiers: [&'a str; 1],
}

static CREATED_FOTA_JOB: LazyLock<Schema> = LazyLock::new(|| {
    Schema::object()
        .required("jobId", Schema::string().min_length(1))
        .into()
});

static FOTA_JOB: LazyLock<Schema> = LazyLock::new(|| {
    Schema::object()
        .required("jobId", Schema::string().min_length(1))
        .required(
            "status",
            Schema::enumeration(FotaJobStatus::ALL.iter().map(ToString::to_string)),
        )
        .optional("statusDetail", Schema::string().min_length(1))
        .required("createdAt", Schema::string())
        .optional("lastUpdatedAt", Schema::string())
        .optional("completedAt", Schema::string())
        .into()
});

impl<T, V> CloudApi<T, V>
where
    T: Transport,
    V: SchemaValidator,
{
    /// Schedules the update of one device to a bundle, applied automatically.
    ///
    /// # Errors
    ///
    /// Fails when the request fails or the answer carries no job id.
    pub async fn create_fota_job(
        &self,
        device_id: &str,
        bundle_id: &str,
    ) -> Result<CreatedFotaJob, ApiError> {
        let payload = Payload::json(&CreateFotaJob {
            bundle_id,
            auto_apply: true,
            device_identifiers: [device_id],
        })?;
        let job: CreatedFotaJob = self
            .client
            .fetch(&resource("fota-jobs")?.with_payload(payload), &CREATED_FOTA_JOB)
            .await?;
        debug!(job_id = %job.job_id, device_id, bundle_id, "FOTA job created");
        Ok(job)
    }

    /// Fetches a FOTA job.
    ///
    /// # Errors
    ///
    /// Fails when the request fails or the job does not match the expected shape.
    pub async fn get_fota_job(&self, job_id: &str) -> Result<FotaJob, ApiError> {
        let descriptor = resource(format!("fota-jobs/{}", encode_segment(job_id)))?;
        let job = self.client.fetch(&descriptor, &FOTA_JOB).await?;
        Ok(job)
    }

    /// Cancels a FOTA job. Whatever the server answers on success is ignored.
    ///
    /// # Errors
    ///
    /// Fails when the request fails.
    pub async fn cancel_fota_job(&self, job_id: &str) -> Result<(), ApiError> {
        let descriptor = resource(format!("fota-jobs/{}/cancel", encode_segment(job_id)))?
            .with_method(Method::PUT);
        let _: Value = self.client.fetch(&descriptor, &Schema::Any).await?;
        debug!(job_id, "FOTA job cancelled");
        Ok(())
    }
}
