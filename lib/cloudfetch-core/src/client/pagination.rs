use std::future::Future;
use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::descriptor::Query;
use super::error::FetchError;
use crate::schema::Schema;

/// Query parameter carrying the page size.
pub const PAGE_LIMIT_PARAM: &str = "pageLimit";

/// Query parameter carrying the continuation token.
pub const DEFAULT_TOKEN_PARAM: &str = "pageNextToken";

/// Page size requested by default.
pub const DEFAULT_PAGE_LIMIT: u32 = 100;

/// One page of a list endpoint.
///
/// The continuation token is opaque: it is replayed verbatim, never parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    /// The items of this page.
    pub items: Vec<T>,
    /// The total number of items, when the server reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    /// The token to fetch the next page, absent on the last page.
    #[serde(
        default,
        rename = "pageNextToken",
        skip_serializing_if = "Option::is_none"
    )]
    pub next_token: Option<String>,
}

/// The schema of a list response whose items match `item`.
///
/// ```rust
/// use cloudfetch_core::{Schema, page_schema};
///
/// let schema = page_schema(Schema::object().required("jobId", Schema::string()));
/// ```
pub fn page_schema(item: impl Into<Schema>) -> Schema {
    Schema::object()
        .required("items", Schema::array(item))
        .optional("total", Schema::integer().minimum(0.0))
        .optional("pageNextToken", Schema::string().min_length(1))
        .into()
}

/// How list endpoints are walked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationConfig {
    /// Name of the query parameter carrying the continuation token.
    pub token_param: String,
    /// Page size sent as `pageLimit`, unless the descriptor already sets one.
    pub page_limit: Option<u32>,
    /// Hard ceiling on the number of pages, unbounded when `None`.
    pub max_pages: Option<NonZeroU32>,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            token_param: DEFAULT_TOKEN_PARAM.to_string(),
            page_limit: Some(DEFAULT_PAGE_LIMIT),
            max_pages: None,
        }
    }
}

impl PaginationConfig {
    /// The query of the page fetched with `token`, derived from the caller's query.
    pub(crate) fn page_query(&self, base: Option<&Query>, token: Option<&str>) -> Query {
        let mut query = base.cloned().unwrap_or_default();
        if let Some(limit) = self.page_limit
            && query.get(PAGE_LIMIT_PARAM).is_none()
        {
            query.set(PAGE_LIMIT_PARAM, limit.to_string());
        }
        if let Some(token) = token {
            query.set(&self.token_param, token);
        }
        query
    }
}

#[derive(Debug)]
enum PaginationState<T> {
    Fetching(Option<String>),
    Done(Vec<T>),
    Failed(FetchError),
}

/// Drives `fetch_page` until the server stops returning a continuation token.
///
/// Pages are fetched one after the other. Items are returned in page arrival order.
/// The first failure ends the walk and items gathered so far are dropped.
pub(crate) async fn paginate<T, F, Fut>(
    config: &PaginationConfig,
    mut fetch_page: F,
) -> Result<Vec<T>, FetchError>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>, FetchError>>,
{
    let mut items = Vec::new();
    let mut pages = 0_u32;
    let mut state = PaginationState::Fetching(None);

    loop {
        state = match state {
            PaginationState::Fetching(token) => match fetch_page(token).await {
                Err(error) => PaginationState::Failed(error),
                Ok(page) => {
                    pages = pages.saturating_add(1);
                    debug!(
                        page = pages,
                        items = page.items.len(),
                        total = page.total,
                        has_next = page.next_token.is_some(),
                        "page received"
                    );
                    items.extend(page.items);
                    match (page.next_token, config.max_pages) {
                        (None, _) => PaginationState::Done(std::mem::take(&mut items)),
                        (Some(_), Some(max_pages)) if pages >= max_pages.get() => {
                            PaginationState::Failed(FetchError::PageLimitExceeded {
                                max_pages: max_pages.get(),
                            })
                        }
                        (Some(token), _) => PaginationState::Fetching(Some(token)),
                    }
                }
            },
            PaginationState::Done(items) => return Ok(items),
            PaginationState::Failed(error) => {
                if !items.is_empty() {
                    warn!(
                        discarded = items.len(),
                        pages, "pagination failed, dropping items of previous pages"
                    );
                }
                return Err(error);
            }
        };
    }
}
