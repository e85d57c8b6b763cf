#![allow(missing_docs)]

use axum::http::Method;
use cloudfetch_core::FetchError;
use cloudfetch_resources::{
    ApiError, DeviceRegistration, FirmwareType, FotaJobStatus, LocationHistoryQuery,
    ServiceType,
};
use rstest::rstest;

mod common;
pub use self::common::*;

#[rstest]
#[tokio::test]
async fn should_list_bundles_across_pages(#[future] cloud: TestCloud) -> anyhow::Result<()> {
    let cloud = cloud.await;

    let bundles = cloud.api().list_bundles().await?;

    let summary = bundles
        .iter()
        .map(|it| format!("{} {}", it.bundle_id, it.firmware_type))
        .collect::<Vec<_>>();
    insta::assert_debug_snapshot!(summary, @r#"
    [
        "APP*1*app APP",
        "MODEM*2*modem MODEM",
    ]
    "#);
    assert_eq!(
        bundles.last().map(|it| it.firmware_type),
        Some(FirmwareType::Modem)
    );

    let queries = cloud
        .received()
        .into_iter()
        .map(|it| it.raw_query.unwrap_or_default())
        .collect::<Vec<_>>();
    insta::assert_debug_snapshot!(queries, @r#"
    [
        "pageLimit=100",
        "pageLimit=100&pageNextToken=next%2F1",
    ]
    "#);
    Ok(())
}

#[rstest]
#[tokio::test]
async fn should_register_devices(#[future] cloud: TestCloud) -> anyhow::Result<()> {
    let cloud = cloud.await;
    let mut device = DeviceRegistration::new("nrf-1", "PEM");
    device.tags = vec!["east".to_string()];

    let id = cloud.api().register_devices(&[device]).await?;

    assert_eq!(id, "01EZZJ");
    let received = cloud.received();
    let request = received.first().expect("one request");
    assert_eq!(request.method, Method::POST);
    assert_eq!(
        request.content_type.as_deref(),
        Some("application/octet-stream")
    );
    insta::assert_snapshot!(String::from_utf8_lossy(&request.body), @r#"nrf-1,,east,,"PEM""#);
    Ok(())
}

#[rstest]
#[tokio::test]
async fn should_follow_a_fota_job(#[future] cloud: TestCloud) -> anyhow::Result<()> {
    let cloud = cloud.await;
    let api = cloud.api();

    let created = api.create_fota_job("nrf-1", "APP*1*app").await?;
    let job = api.get_fota_job(&created.job_id).await?;
    api.cancel_fota_job(&created.job_id).await?;

    assert_eq!(job.status, FotaJobStatus::InProgress);
    let received = cloud.received();
    let calls = received
        .iter()
        .map(|it| format!("{} {}", it.method, it.path))
        .collect::<Vec<_>>();
    insta::assert_debug_snapshot!(calls, @r#"
    [
        "POST /v1/fota-jobs",
        "GET /v1/fota-jobs/job%201",
        "PUT /v1/fota-jobs/job%201/cancel",
    ]
    "#);
    let creation = received.first().expect("a creation");
    insta::assert_snapshot!(
        String::from_utf8_lossy(&creation.body),
        @r#"{"bundleId":"APP*1*app","autoApply":true,"deviceIdentifiers":["nrf-1"]}"#
    );
    Ok(())
}

#[rstest]
#[tokio::test]
async fn should_fetch_location_history(#[future] cloud: TestCloud) -> anyhow::Result<()> {
    let cloud = cloud.await;

    let records = cloud
        .api()
        .location_history(&LocationHistoryQuery::new("nrf-1"))
        .await?;

    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|it| it.service_type == ServiceType::Gnss));
    let queries = cloud
        .received()
        .into_iter()
        .map(|it| it.raw_query.unwrap_or_default())
        .collect::<Vec<_>>();
    insta::assert_debug_snapshot!(queries, @r#"
    [
        "pageLimit=100&deviceId=nrf-1",
        "pageLimit=100&deviceId=nrf-1&pageNextToken=T2",
    ]
    "#);
    Ok(())
}

#[rstest]
#[tokio::test]
async fn should_surface_status_errors(#[future] cloud: TestCloud) {
    let cloud = cloud.await;

    let error = cloud
        .api()
        .current_monthly_costs()
        .await
        .expect_err("unauthorized");

    assert_eq!(
        error,
        ApiError::Fetch(FetchError::Status {
            status_code: 401,
            message: "Invalid API key".to_string(),
        })
    );
}
