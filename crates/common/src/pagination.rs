//! Page-number pagination
//!
//! `?page=<n>&limit=<size>` in, `{count, next, previous, results}` out.
//! Links are relative and keep every other query parameter.

use crate::config::PaginationConfig;
use crate::errors::{AppError, Result};
use serde::{Deserialize, Serialize};
use url::form_urlencoded;

/// Raw `page` and `limit` query parameters. Kept as text so a malformed
/// page can be told apart from a malformed limit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PageQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// Requested page, 1-based
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageParams {
    pub page: u64,
    pub limit: u64,
}

impl PageParams {
    /// Resolve the requested page.
    ///
    /// A malformed or zero `page` is a 404 like an out-of-range page. A
    /// malformed `limit` falls back to the default and is capped at the
    /// configured maximum.
    pub fn new(query: &PageQuery, config: &PaginationConfig) -> Result<Self> {
        let page = match query.page.as_deref().filter(|p| !p.is_empty()) {
            Some(raw) => raw
                .parse::<u64>()
                .ok()
                .filter(|p| *p >= 1)
                .ok_or_else(|| AppError::not_found("page", raw))?,
            None => 1,
        };

        let limit = query
            .limit
            .as_deref()
            .and_then(|raw| raw.parse::<u64>().ok())
            .filter(|size| *size >= 1)
            .map_or(config.default_page_size, |size| size.min(config.max_page_size));

        Ok(Self { page, limit })
    }

    /// Zero-based page index for the ORM paginator
    pub fn index(&self) -> u64 {
        self.page.saturating_sub(1)
    }

    fn num_pages(&self, count: u64) -> u64 {
        count.div_ceil(self.limit).max(1)
    }
}

/// One page of results
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    /// Wrap a fetched page. Asking for a page past the last one is a 404,
    /// except page 1 of an empty listing.
    pub fn new(
        results: Vec<T>,
        count: u64,
        params: PageParams,
        path: &str,
        query: &str,
    ) -> Result<Self> {
        let pages = params.num_pages(count);
        if params.page > pages {
            return Err(AppError::not_found("page", params.page));
        }

        let next = (params.page < pages).then(|| page_link(path, query, params.page + 1));
        let previous = (params.page > 1).then(|| page_link(path, query, params.page - 1));

        Ok(Self {
            count,
            next,
            previous,
            results,
        })
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            count: self.count,
            next: self.next,
            previous: self.previous,
            results: self.results.into_iter().map(f).collect(),
        }
    }
}

/// Rebuild `path?query` with `page` replaced. Page 1 drops the parameter.
fn page_link(path: &str, query: &str, page: u64) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    let mut wrote_page = false;

    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        if key == "page" {
            if page > 1 && !wrote_page {
                serializer.append_pair("page", &page.to_string());
                wrote_page = true;
            }
            continue;
        }
        serializer.append_pair(&key, &value);
    }

    if page > 1 && !wrote_page {
        serializer.append_pair("page", &page.to_string());
    }

    let query = serializer.finish();
    if query.is_empty() {
        path.to_string()
    } else {
        format!("{}?{}", path, query)
    }
}
