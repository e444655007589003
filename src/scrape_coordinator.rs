//! `ScrapeCoordinator` (spec §4.3): per-request memoized `ScrapeIfNotVisited`.
//!
//! Grounded on `crawl_engine::page_processor`'s fetch → extract sequence
//! (goto/wait_for_navigation wrapped in a hard timeout, data extracted into
//! a structured record) and `crawl_engine::crawl_types::FailureKind` for
//! turning a fetch failure into an informative skip reason instead of a
//! propagated error. Visited/skip bookkeeping uses `dashmap` the way the
//! teacher's concurrent crawl state does, since multiple ancestor/descendant
//! scrapes run concurrently under the orchestrator's semaphore.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio_util::sync::CancellationToken;

use crate::cleaner;
use crate::config::{FetchOptions, LinksOptions};
use crate::error::FailureKind;
use crate::fetcher::Fetcher;
use crate::imurl::ImUrl;
use crate::metadata::{self, Metadata};

/// Raw + derived data captured for a single successfully-scraped URL (spec §3 `ScrapedData`).
#[derive(Debug, Clone)]
pub struct ScrapedData {
    pub raw_html: String,
    pub cleaned_html: Option<String>,
    pub metadata: Option<Metadata>,
    pub meta_files: Option<MetaFiles>,
}

/// Root-only "data capture" fetches for `robots.txt`/`sitemap.xml` (spec §4.3:
/// honored only when `url == rootURL`, never enforced).
#[derive(Debug, Clone, Default)]
pub struct MetaFiles {
    pub robots_txt: Option<String>,
    pub sitemap_xml: Option<String>,
}

/// Per-request scrape state and the single memoized operation over it.
pub struct ScrapeCoordinator {
    fetcher: Arc<dyn Fetcher>,
    http_client: reqwest::Client,
    visited_timestamps: DashMap<ImUrl, DateTime<Utc>>,
    data_cache: DashMap<ImUrl, ScrapedData>,
    skipped: DashMap<ImUrl, String>,
}

impl ScrapeCoordinator {
    #[must_use]
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            fetcher,
            http_client: reqwest::Client::new(),
            visited_timestamps: DashMap::new(),
            data_cache: DashMap::new(),
            skipped: DashMap::new(),
        }
    }

    #[must_use]
    pub fn visited_timestamps(&self) -> HashMap<ImUrl, DateTime<Utc>> {
        self.visited_timestamps.iter().map(|e| (e.key().clone(), *e.value())).collect()
    }

    #[must_use]
    pub fn skipped(&self) -> HashMap<ImUrl, String> {
        self.skipped.iter().map(|e| (e.key().clone(), e.value().clone())).collect()
    }

    #[must_use]
    pub fn is_visited(&self, url: &ImUrl) -> bool {
        self.data_cache.contains_key(url)
    }

    /// `ScrapeIfNotVisited(url, opts) -> ScrapedData?` (spec §4.3).
    ///
    /// Returns `None` on fetch failure, recording `skipped[url]` instead of
    /// propagating — only the target URL's failure is ever treated as fatal,
    /// and that decision is made by the orchestrator, not here.
    pub async fn scrape_if_not_visited(
        &self,
        url: &ImUrl,
        root_url: &ImUrl,
        options: &LinksOptions,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Option<ScrapedData> {
        if let Some(existing) = self.data_cache.get(url) {
            return Some(existing.clone());
        }

        let fetch_opts: FetchOptions = options.fetch_options().clone();
        match self.fetcher.fetch(url, &fetch_opts, timeout, cancel).await {
            Ok(fetched) => {
                self.visited_timestamps.insert(url.clone(), Utc::now());

                let cleaned_html = if options.cleaned_html() {
                    match cleaner::clean_html(&fetched.html) {
                        Ok(cleaned) => Some(cleaned),
                        Err(e) => {
                            tracing::warn!(%url, error = %e, "cleaner failed, cleanedHTML absent");
                            None
                        }
                    }
                } else {
                    None
                };

                let extracted_metadata = if options.metadata() {
                    Some(metadata::extract_metadata(&fetched.html, &fetched.headers))
                } else {
                    None
                };

                let meta_files = if url == root_url && (options.robots() || options.sitemap_xml()) {
                    Some(self.capture_root_meta_files(url, options).await)
                } else {
                    None
                };

                let data = ScrapedData {
                    raw_html: fetched.html,
                    cleaned_html,
                    metadata: extracted_metadata,
                    meta_files,
                };
                self.data_cache.insert(url.clone(), data.clone());
                Some(data)
            }
            Err(e) => {
                let kind = FailureKind::classify(&e.to_string());
                self.skipped.insert(url.clone(), format!("{}: {e}", kind.skip_reason_prefix()));
                None
            }
        }
    }

    async fn capture_root_meta_files(&self, root_url: &ImUrl, options: &LinksOptions) -> MetaFiles {
        let mut meta_files = MetaFiles::default();

        if options.robots() {
            if let Ok(robots_url) = root_url.with_path("/robots.txt") {
                meta_files.robots_txt = self.fetch_text_best_effort(robots_url.as_str()).await;
            }
        }

        if options.sitemap_xml() {
            if let Ok(sitemap_url) = root_url.with_path("/sitemap.xml") {
                meta_files.sitemap_xml = self.fetch_text_best_effort(sitemap_url.as_str()).await;
            }
        }

        meta_files
    }

    async fn fetch_text_best_effort(&self, url: &str) -> Option<String> {
        match self.http_client.get(url).send().await {
            Ok(response) if response.status().is_success() => response.text().await.ok(),
            Ok(response) => {
                tracing::debug!(url, status = %response.status(), "meta file fetch non-success, skipping");
                None
            }
            Err(e) => {
                tracing::debug!(url, error = %e, "meta file fetch failed, skipping");
                None
            }
        }
    }
}
