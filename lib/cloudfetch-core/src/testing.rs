//! Scripted [`Transport`] for tests of code built on top of [`CloudClient`](crate::CloudClient).
//!
//! ```rust
//! use cloudfetch_core::testing::MockTransport;
//!
//! let transport = MockTransport::new()
//!     .respond_json(200, serde_json::json!({ "items": ["A"], "pageNextToken": "T" }))
//!     .respond_json(200, serde_json::json!({ "items": ["B"] }));
//! ```

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue, StatusCode};

use crate::client::{HttpRequest, HttpResponse, Transport, TransportError};

type Scripted = Result<HttpResponse, TransportError>;

/// A [`Transport`] that replays scripted responses in order and records every request.
///
/// When the script is exhausted, the fallback response (see [`MockTransport::always`])
/// is replayed, or a [`TransportError`] is returned.
#[derive(Debug, Default)]
pub struct MockTransport {
    script: Mutex<VecDeque<Scripted>>,
    fallback: Option<Scripted>,
    requests: Mutex<Vec<HttpRequest>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn response(status: u16, content_type: Option<&'static str>, body: Bytes) -> HttpResponse {
    let mut headers = HeaderMap::new();
    if let Some(content_type) = content_type {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    }
    headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len()));
    HttpResponse {
        status: StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        headers,
        body,
    }
}

impl MockTransport {
    /// Creates a transport with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a raw response.
    #[must_use]
    pub fn respond(self, response: HttpResponse) -> Self {
        lock(&self.script).push_back(Ok(response));
        self
    }

    /// Queues a JSON response.
    #[must_use]
    pub fn respond_json(self, status: u16, body: serde_json::Value) -> Self {
        let body = Bytes::from(body.to_string());
        self.respond(response(status, Some("application/json"), body))
    }

    /// Queues a plain text response.
    #[must_use]
    pub fn respond_text(self, status: u16, body: &str) -> Self {
        let body = Bytes::copy_from_slice(body.as_bytes());
        self.respond(response(status, Some("text/plain"), body))
    }

    /// Queues a response without body.
    #[must_use]
    pub fn respond_empty(self, status: u16) -> Self {
        self.respond(response(status, None, Bytes::new()))
    }

    /// Queues a transport failure.
    #[must_use]
    pub fn fail(self, message: &str) -> Self {
        lock(&self.script).push_back(Err(TransportError::new(message)));
        self
    }

    /// Replays this JSON response once the script is exhausted.
    #[must_use]
    pub fn always(mut self, status: u16, body: serde_json::Value) -> Self {
        let body = Bytes::from(body.to_string());
        self.fallback = Some(Ok(response(status, Some("application/json"), body)));
        self
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<HttpRequest> {
        lock(&self.requests).clone()
    }

    /// The URLs of every request received so far, in order.
    pub fn urls(&self) -> Vec<String> {
        lock(&self.requests)
            .iter()
            .map(|request| request.url.to_string())
            .collect()
    }
}

impl Transport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        lock(&self.requests).push(request);
        let scripted = lock(&self.script).pop_front();
        match (scripted, &self.fallback) {
            (Some(scripted), _) => scripted,
            (None, Some(fallback)) => fallback.clone(),
            (None, None) => Err(TransportError::new("no scripted response left")),
        }
    }
}
