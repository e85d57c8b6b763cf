use headers::HeaderMapExt;
use http::header::{ACCEPT, AUTHORIZATION, CONTENT_LENGTH};
use http::{HeaderMap, HeaderValue};
use tracing::{debug, warn};
use url::Url;

use super::descriptor::RequestDescriptor;
use super::error::{FetchError, NO_CONTENT_MESSAGE, Violation};
use super::output::Output;
use super::transport::{HttpRequest, HttpResponse, Transport};

/// Value of the `Accept` header sent with every request.
pub const ACCEPT_JSON: &str = "application/json; charset=utf-8";

/// `<endpoint>/v1/<resource>[?<query>]`
///
/// Any path already present on the endpoint is kept, a trailing slash is dropped.
/// An absent or empty query produces no `?`.
pub(crate) fn build_url(endpoint: &Url, descriptor: &RequestDescriptor) -> Url {
    let mut url = endpoint.clone();
    let base_path = endpoint.path().trim_end_matches('/');
    url.set_path(&format!("{base_path}/v1/{}", descriptor.resource()));
    url.set_fragment(None);
    url.set_query(None);

    if let Some(query) = descriptor.query()
        && !query.is_empty()
    {
        url.query_pairs_mut().extend_pairs(query.iter());
    }

    url
}

pub(crate) fn build_request(
    endpoint: &Url,
    authorization: &HeaderValue,
    descriptor: &RequestDescriptor,
) -> HttpRequest {
    let url = build_url(endpoint, descriptor);

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, authorization.clone());
    headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_JSON));

    let body = descriptor.payload().map(|payload| {
        headers.typed_insert(payload.content_type().clone());
        payload.body().clone()
    });

    HttpRequest {
        method: descriptor.method(),
        url,
        headers,
        body,
    }
}

fn has_no_content(response: &HttpResponse) -> bool {
    response.body.is_empty()
        || response
            .headers
            .get(CONTENT_LENGTH)
            .is_some_and(|length| length.as_bytes() == b"0")
}

pub(crate) fn classify(response: HttpResponse) -> Result<Output, FetchError> {
    let status = response.status;

    if !status.is_success() {
        let message = if has_no_content(&response) {
            NO_CONTENT_MESSAGE.to_string()
        } else {
            String::from_utf8_lossy(&response.body).into_owned()
        };
        warn!(status = status.as_u16(), %message, "request failed");
        return Err(FetchError::Status {
            status_code: status.as_u16(),
            message,
        });
    }

    if has_no_content(&response) {
        debug!(status = status.as_u16(), "empty response");
        return Ok(Output::Empty);
    }

    serde_json::from_slice(&response.body)
        .map(Output::Json)
        .map_err(|err| {
            warn!(status = status.as_u16(), %err, "response body is not JSON");
            FetchError::validation(vec![Violation::new(
                "",
                format!("Expected a JSON body: {err}"),
            )])
        })
}

/// Performs exactly one round trip and classifies its outcome.
pub(crate) async fn execute<T>(transport: &T, request: HttpRequest) -> Result<Output, FetchError>
where
    T: Transport,
{
    debug!(method = %request.method, url = %request.url, "executing request");
    let response = transport.send(request).await.map_err(|err| {
        warn!(%err, "transport failure");
        FetchError::from(err)
    })?;

    classify(response)
}
