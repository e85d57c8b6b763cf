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
use serde_json::json;
use tokio::task::JoinHandle;
use tracing::info;
use url::{Url, form_urlencoded};

use cloudfetch_core::{CloudClient, Credentials, ReqwestTransport};

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

/// A request as seen by the stub server.
#[derive(Debug, Clone)]
pub struct Received {
    pub method: Method,
    pub path: String,
    pub raw_query: Option<String>,
    pub headers: HeaderMap,
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
pub struct TestApp {
    endpoint: Url,
    recorder: Recorder,
    server: JoinHandle<()>,
}

impl TestApp {
    pub async fn start() -> anyhow::Result<Self> {
        let recorder = Recorder::default();
        let router = Router::new()
            .fallback(handle)
            .with_state(recorder.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .context("bind stub server")?;
        let addr = listener.local_addr()?;
        info!(%addr, "launching stub server");

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

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn client(&self) -> CloudClient<ReqwestTransport> {
        let credentials = Credentials::new(self.endpoint.clone(), API_KEY);
        CloudClient::builder(credentials, ReqwestTransport::new())
            .build()
            .expect("valid configuration")
    }

    pub fn received(&self) -> Vec<Received> {
        self.recorder.all()
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self.server.abort();
    }
}

#[fixture]
pub async fn app() -> TestApp {
    init_tracing();
    match TestApp::start().await {
        Ok(app) => app,
        Err(error) => {
            panic!("fail to start test app: {error:?}");
        }
    }
}

fn parse_query(uri: &Uri) -> HashMap<String, String> {
    uri.query()
        .map(|query| form_urlencoded::parse(query.as_bytes()).into_owned().collect())
        .unwrap_or_default()
}

async fn handle(
    State(recorder): State<Recorder>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    recorder.push(Received {
        method: method.clone(),
        path: uri.path().to_string(),
        raw_query: uri.query().map(ToString::to_string),
        headers: headers.clone(),
        body: body.clone(),
    });
    let query = parse_query(&uri);

    match (method, uri.path()) {
        (Method::GET, "/v1/devices/42") => {
            axum::Json(json!({ "deviceId": "42", "tags": ["configuration:solar-shield"] }))
                .into_response()
        }
        (Method::GET, "/v1/bad") => (StatusCode::BAD_REQUEST, "Bad Request").into_response(),
        (Method::GET, "/v1/missing") => StatusCode::NOT_FOUND.into_response(),
        (Method::GET, "/v1/empty") => StatusCode::NO_CONTENT.into_response(),
        (Method::GET, "/v1/empty-ok") => StatusCode::OK.into_response(),
        (Method::GET, "/v1/html") => "<html></html>".into_response(),
        (Method::GET, "/v1/items") => match query.get("pageNextToken").map(String::as_str) {
            None => axum::Json(json!({ "items": ["A"], "pageNextToken": "a/b+c==" }))
                .into_response(),
            Some("a/b+c==") => axum::Json(json!({ "items": ["B"], "total": 2 })).into_response(),
            Some(_) => (StatusCode::BAD_REQUEST, "Unknown token").into_response(),
        },
        (Method::GET, "/v1/broken-items") => match query.get("pageNextToken") {
            None => axum::Json(json!({ "items": ["A"], "pageNextToken": "T" })).into_response(),
            Some(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
            }
        },
        (Method::GET, "/v1/endless") => {
            axum::Json(json!({ "items": ["again"], "pageNextToken": "same" })).into_response()
        }
        (method, "/v1/echo") => {
            let content_type = headers
                .get(axum::http::header::CONTENT_TYPE)
                .and_then(|it| it.to_str().ok())
                .map(ToString::to_string);
            axum::Json(json!({
                "method": method.as_str(),
                "contentType": content_type,
                "body": String::from_utf8_lossy(&body),
            }))
            .into_response()
        }
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}
