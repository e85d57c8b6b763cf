#![allow(dead_code, missing_docs, clippy::expect_used)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Context;
use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use rstest::fixture;
use serde_json::{Value, json};
use tokio::task::JoinHandle;
use tracing::info;
use url::{Url, form_urlencoded};

use cloudfetch_core::{CloudClient, Credentials, ReqwestTransport};
use cloudfetch_resources::CloudApi;

pub const API_KEY: &str = "some-api-key";

pub fn init_tracing() {
    // should be run once, fail otherwise, we skip that error
    let _ = tracing_subscriber::fmt()
        .pretty()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();

    info!("Tracing initialized");
}

/// A request as seen by the stub cloud.
#[derive(Debug, Clone)]
pub struct Received {
    pub method: Method,
    pub path: String,
    pub raw_query: Option<String>,
    pub content_type: Option<String>,
    pub body: Bytes,
}

#[derive(Debug, Clone, Default)]
struct Recorder(Arc<Mutex<Vec<Received>>>);

impl Recorder {
    fn push(&self, received: Received) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(received);
    }

    fn all(&self) -> Vec<Received> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[derive(Debug)]
pub struct TestCloud {
    endpoint: Url,
    recorder: Recorder,
    server: JoinHandle<()>,
}

impl TestCloud {
    pub async fn start() -> anyhow::Result<Self> {
        let recorder = Recorder::default();
        let router = Router::new()
            .fallback(handle)
            .with_state(recorder.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .context("bind stub cloud")?;
        let addr = listener.local_addr()?;
        info!(%addr, "launching stub cloud");

        let server = tokio::spawn(async move {
            axum::serve(listener, router).await.expect("server launched");
        });

        let endpoint = format!("http://{addr}/").parse()?;
        Ok(Self {
            endpoint,
            recorder,
            server,
        })
    }

    pub fn api(&self) -> CloudApi<ReqwestTransport> {
        let credentials = Credentials::new(self.endpoint.clone(), API_KEY);
        let client = CloudClient::builder(credentials, ReqwestTransport::new())
            .build()
            .expect("valid configuration");
        CloudApi::new(client)
    }

    pub fn received(&self) -> Vec<Received> {
        self.recorder.all()
    }
}

impl Drop for TestCloud {
    fn drop(&mut self) {
        self.server.abort();
    }
}

#[fixture]
pub async fn cloud() -> TestCloud {
    init_tracing();
    match TestCloud::start().await {
        Ok(cloud) => cloud,
        Err(error) => {
            panic!("fail to start stub cloud: {error:?}");
        }
    }
}

fn bundle(id: &str, firmware_type: &str) -> Value {
    json!({
        "bundleId": id,
        "lastModified": "2024-02-01T10:00:00Z",
        "size": 385_260,
        "version": "1.0.0",
        "type": firmware_type,
        "filenames": ["app_update.bin"],
    })
}

fn location(id: &str) -> Value {
    json!({
        "id": id,
        "deviceId": "nrf-1",
        "serviceType": "GNSS",
        "insertedAt": "2024-01-31T12:00:00.000Z",
        "lat": "63.42",
        "lon": "10.43",
        "meta": { "spd": 0.5 },
        "uncertainty": "4.2",
    })
}

async fn handle(
    State(recorder): State<Recorder>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let content_type = headers
        .get(axum::http::header::CONTENT_TYPE)
        .and_then(|it| it.to_str().ok())
        .map(ToString::to_string);
    recorder.push(Received {
        method: method.clone(),
        path: uri.path().to_string(),
        raw_query: uri.query().map(ToString::to_string),
        content_type,
        body: body.clone(),
    });
    let query: HashMap<String, String> = uri
        .query()
        .map(|query| form_urlencoded::parse(query.as_bytes()).into_owned().collect())
        .unwrap_or_default();

    match (method, uri.path()) {
        (Method::GET, "/v1/firmwares") => match query.get("pageNextToken").map(String::as_str) {
            None => axum::Json(json!({
                "items": [bundle("APP*1*app", "APP")],
                "total": 2,
                "pageNextToken": "next/1",
            }))
            .into_response(),
            Some("next/1") => axum::Json(json!({
                "items": [bundle("MODEM*2*modem", "MODEM")],
                "total": 2,
            }))
            .into_response(),
            Some(_) => (StatusCode::BAD_REQUEST, "Unknown token").into_response(),
        },
        (Method::POST, "/v1/devices") => (
            StatusCode::ACCEPTED,
            axum::Json(json!({ "bulkOpsRequestId": "01EZZJ" })),
        )
            .into_response(),
        (Method::POST, "/v1/fota-jobs") => axum::Json(json!({ "jobId": "job 1" })).into_response(),
        (Method::GET, "/v1/fota-jobs/job%201") => axum::Json(json!({
            "jobId": "job 1",
            "status": "IN_PROGRESS",
            "createdAt": "2024-02-01T10:00:00Z",
        }))
        .into_response(),
        (Method::PUT, "/v1/fota-jobs/job%201/cancel") => StatusCode::NO_CONTENT.into_response(),
        (Method::GET, "/v1/location/history") => {
            match query.get("pageNextToken").map(String::as_str) {
                None => axum::Json(json!({ "items": [location("a")], "pageNextToken": "T2" }))
                    .into_response(),
                Some(_) => axum::Json(json!({ "items": [location("b")] })).into_response(),
            }
        }
        (Method::GET, "/v1/account") => {
            (StatusCode::UNAUTHORIZED, "Invalid API key").into_response()
        }
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}
