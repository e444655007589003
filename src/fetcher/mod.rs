//! Fetcher: the external-collaborator interface (spec §1, §4 "Fetcher").
//!
//! Given a URL and fetch options, returns raw HTML, the final URL after
//! redirects, and response headers. Two concrete implementations are
//! provided: [`http::HttpFetcher`] (plain HTTP via `reqwest`) and
//! [`headless::HeadlessFetcher`] (a pooled Chromium instance via
//! `chromiumoxide`), unified behind the [`Fetcher`] trait so
//! `ScrapeCoordinator` never needs to know which one it's holding.

pub mod headless;
pub mod http;

use std::collections::HashMap;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::config::FetchOptions;
use crate::error::LinksResult;

/// Result of a single fetch (spec §3 feeds `ScrapedData.rawHTML`).
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub html: String,
    pub final_url: Url,
    pub headers: HashMap<String, String>,
}

#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches `url` honoring `opts` (method, redirect policy, headers) and
    /// racing against both `cancel` and the per-call timeout from
    /// `crate::config::ConcurrencyOptions::fetch_timeout` (spec §5).
    ///
    /// # Errors
    /// Returns [`crate::error::LinksError::ScrapeFailed`] on network
    /// failure, timeout, cancellation, or an unsupported content type.
    async fn fetch(
        &self,
        url: &Url,
        opts: &FetchOptions,
        timeout: std::time::Duration,
        cancel: &CancellationToken,
    ) -> LinksResult<FetchedPage>;
}

pub(crate) fn is_html_content_type(content_type: Option<&str>) -> bool {
    match content_type {
        None => true,
        Some(ct) => {
            let ct = ct.to_lowercase();
            ct.contains("text/html") || ct.contains("application/xhtml+xml")
        }
    }
}
