use bucketry_core::{merge_headers, set_header, Headers, RequestDescriptor, ValidationError};
use reqwest::Url;
use serde_json::Value;
use std::sync::Arc;

use crate::http::{HttpResponse, HttpTransport};
use crate::{ClientError, Result};

const DEFAULT_SORT: &str = "-last_modified";

/// How many pages `list` follows before returning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pages {
    Count(u32),
    Unbounded,
}

impl Default for Pages {
    fn default() -> Self {
        Pages::Count(1)
    }
}

impl Pages {
    fn exhausted(&self, consumed: u32) -> bool {
        match self {
            Pages::Count(max) => consumed >= *max,
            Pages::Unbounded => false,
        }
    }
}

/// Query parameters of a list call
#[derive(Debug, Clone, Default)]
pub struct ListParams {
    pub sort: Option<String>,
    pub filters: Vec<(String, String)>,
    pub limit: Option<u32>,
    /// Version token returned by a previous list (`last_modified`)
    pub since: Option<String>,
    pub fields: Vec<String>,
    /// Snapshot timestamp
    pub at: Option<u64>,
    pub pages: Pages,
    pub headers: Headers,
    pub retry: Option<u32>,
}

impl ListParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    pub fn filter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push((name.into(), value.into()));
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn since(mut self, since: impl Into<String>) -> Self {
        self.since = Some(since.into());
        self
    }

    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn at(mut self, at: u64) -> Self {
        self.at = Some(at);
        self
    }

    pub fn pages(mut self, pages: Pages) -> Self {
        self.pages = pages;
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        set_header(&mut self.headers, name, value);
        self
    }

    /// `since` as sent on the wire; a quoted ETag is accepted as-is
    fn since_token(&self) -> Option<&str> {
        self.since.as_deref().map(|since| since.trim_matches('"'))
    }

    /// Reject malformed parameters before anything is sent
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        if let (Some(since), Some(token)) = (&self.since, self.since_token()) {
            if token.is_empty() || token.contains(['"', ' ', '\t', '\n', '\r']) {
                return Err(ValidationError::InvalidSince(since.clone()));
            }
        }
        Ok(())
    }

    /// Query pairs in the order the server documents them
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![(
            "_sort".to_string(),
            self.sort.clone().unwrap_or_else(|| DEFAULT_SORT.to_string()),
        )];
        pairs.extend(self.filters.iter().cloned());
        if let Some(limit) = self.limit {
            pairs.push(("_limit".to_string(), limit.to_string()));
        }
        if let Some(since) = self.since_token() {
            pairs.push(("_since".to_string(), since.to_string()));
        }
        if !self.fields.is_empty() {
            pairs.push(("_fields".to_string(), self.fields.join(",")));
        }
        if let Some(at) = self.at {
            pairs.push(("_at".to_string(), at.to_string()));
        }
        pairs
    }
}

/// One or more aggregated pages of a list endpoint, plus a cursor to the
/// next page.
#[derive(Clone)]
pub struct PageResult {
    pub data: Vec<Value>,
    /// Collection version (ETag without quotes)
    pub last_modified: Option<String>,
    pub total_records: Option<u64>,
    pub has_next_page: bool,
    pub pages_consumed: u32,
    next_page: Option<String>,
    cursor: Cursor,
}

/// What `next()` needs to fetch another page
#[derive(Clone)]
struct Cursor {
    transport: Arc<HttpTransport>,
    headers: Headers,
    retry: u32,
}

impl std::fmt::Debug for PageResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageResult")
            .field("data", &self.data)
            .field("last_modified", &self.last_modified)
            .field("total_records", &self.total_records)
            .field("has_next_page", &self.has_next_page)
            .field("next_page", &self.next_page)
            .finish_non_exhaustive()
    }
}

impl PageResult {
    /// Continuation URL supplied by the server, if any
    pub fn next_page_url(&self) -> Option<&str> {
        self.next_page.as_deref()
    }

    /// Fetch exactly one more page and append it to the records gathered
    /// so far.
    ///
    /// Fails with [`ClientError::PaginationExhausted`] when the server did
    /// not supply a continuation.
    pub async fn next(&self) -> Result<PageResult> {
        let url = self
            .next_page
            .as_deref()
            .ok_or(ClientError::PaginationExhausted)?;
        let page = walk(
            self.cursor.clone(),
            url.to_string(),
            Pages::Count(1),
        )
        .await?;

        let mut data = self.data.clone();
        data.extend(page.data);
        Ok(PageResult {
            data,
            last_modified: self.last_modified.clone().or(page.last_modified),
            total_records: self.total_records.or(page.total_records),
            has_next_page: page.has_next_page,
            pages_consumed: self.pages_consumed + page.pages_consumed,
            next_page: page.next_page,
            cursor: page.cursor,
        })
    }
}

/// List `url` (absolute, without query) following continuations per `params.pages`
pub(crate) async fn list(
    transport: Arc<HttpTransport>,
    url: &str,
    params: &ListParams,
    default_headers: &Headers,
    default_retry: u32,
) -> Result<PageResult> {
    params.validate()?;

    let url = Url::parse_with_params(url, params.query_pairs())
        .map_err(|e| ValidationError::InvalidRemote {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let headers = merge_headers(default_headers, &params.headers);

    let cursor = Cursor {
        transport,
        headers,
        retry: params.retry.unwrap_or(default_retry),
    };

    walk(cursor, url.to_string(), params.pages).await
}

async fn walk(cursor: Cursor, first_url: String, pages: Pages) -> Result<PageResult> {
    let mut data = Vec::new();
    let mut last_modified = None;
    let mut total_records = None;
    let mut consumed = 0;
    let mut url = first_url;

    loop {
        let request = RequestDescriptor::get(url.as_str()).with_headers(cursor.headers.clone());
        let response = cursor.transport.request(&url, &request, cursor.retry).await?;
        consumed += 1;

        let page = read_page(response);
        data.extend(page.records);
        last_modified = last_modified.or(page.etag);
        total_records = total_records.or(page.total_records);

        tracing::debug!(
            url = %url,
            records = data.len(),
            pages = consumed,
            "Fetched list page"
        );

        match page.next_page {
            Some(next) if !pages.exhausted(consumed) => url = next,
            next_page => {
                return Ok(PageResult {
                    data,
                    last_modified,
                    total_records,
                    has_next_page: next_page.is_some(),
                    pages_consumed: consumed,
                    next_page,
                    cursor,
                })
            }
        }
    }
}

struct Page {
    records: Vec<Value>,
    etag: Option<String>,
    total_records: Option<u64>,
    next_page: Option<String>,
}

fn read_page(response: HttpResponse) -> Page {
    let etag = response.header("ETag").map(|v| v.replace('"', ""));
    let total_records = response
        .header("Total-Records")
        .and_then(|v| v.trim().parse().ok());
    let next_page = response
        .header("Next-Page")
        .filter(|v| !v.is_empty())
        .map(str::to_string);

    let records = match response.json {
        Value::Object(mut body) => match body.remove("data") {
            Some(Value::Array(records)) => records,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };

    Page {
        records,
        etag,
        total_records,
        next_page,
    }
}
