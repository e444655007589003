//! Headless-browser `Fetcher`, backed by a pooled Chromium instance.
//!
//! Grounded on `crawl_engine::page_processor`'s `goto` → `wait_for_navigation`
//! sequence (itself wrapped in [`crate::crawl_engine::page_timeout::with_page_timeout`])
//! and [`crate::browser_pool::BrowserPool`]'s checkout/return lifecycle. Page
//! enhancement and stealth-measure injection are intentionally not carried
//! over here — this fetcher exists to retrieve rendered HTML for a
//! content-extraction pipeline, not to evade bot detection.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::browser_pool::BrowserPool;
use crate::config::FetchOptions;
use crate::crawl_engine::page_timeout::with_page_timeout;
use crate::error::LinksError;

use super::{FetchedPage, Fetcher};

pub struct HeadlessFetcher {
    pool: Arc<BrowserPool>,
}

impl HeadlessFetcher {
    #[must_use]
    pub fn new(pool: Arc<BrowserPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Fetcher for HeadlessFetcher {
    async fn fetch(
        &self,
        url: &Url,
        _opts: &FetchOptions,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<FetchedPage, LinksError> {
        let timeout_secs = timeout.as_secs().max(1);

        let navigate = async {
            let guard = self.pool.acquire().await.map_err(|e| LinksError::ScrapeFailed {
                url: url.to_string(),
                reason: format!("no browser available: {e}"),
            })?;

            let page = guard
                .browser()
                .new_page(url.as_str())
                .await
                .map_err(|e| LinksError::ScrapeFailed { url: url.to_string(), reason: e.to_string() })?;

            with_page_timeout(
                async { page.wait_for_navigation().await.map_err(|e| anyhow::anyhow!("{e}")) },
                timeout_secs,
                "headless page load",
            )
            .await
            .map_err(|e| LinksError::ScrapeFailed { url: url.to_string(), reason: e.to_string() })?;

            let final_url = page
                .url()
                .await
                .map_err(|e| LinksError::ScrapeFailed { url: url.to_string(), reason: e.to_string() })?
                .and_then(|u| Url::parse(&u).ok())
                .unwrap_or_else(|| url.clone());

            let html = page
                .content()
                .await
                .map_err(|e| LinksError::ScrapeFailed { url: url.to_string(), reason: e.to_string() })?;

            Ok(FetchedPage { html, final_url, headers: HashMap::new() })
        };

        tokio::select! {
            result = navigate => result,
            () = cancel.cancelled() => Err(LinksError::ScrapeFailed {
                url: url.to_string(),
                reason: "cancelled".to_string(),
            }),
        }
    }
}
