//! Shared helpers for the sitetree-crawler integration test suite.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use url::Url;

use sitetree_crawler::error::LinksError;
use sitetree_crawler::{FetchedPage, Fetcher};

/// Serves canned HTML per exact URL string; unknown URLs return an empty page.
pub struct StubFetcher {
    pages: HashMap<String, String>,
    calls: Mutex<Vec<String>>,
}

impl StubFetcher {
    #[allow(dead_code)]
    pub fn new(pages: HashMap<String, String>) -> Self {
        Self { pages, calls: Mutex::new(Vec::new()) }
    }

    #[allow(dead_code)]
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Fetcher for StubFetcher {
    async fn fetch(
        &self,
        url: &Url,
        _opts: &sitetree_crawler::config::FetchOptions,
        _timeout: Duration,
        _cancel: &CancellationToken,
    ) -> Result<FetchedPage, LinksError> {
        self.calls.lock().unwrap().push(url.to_string());
        let html = self
            .pages
            .get(url.as_str())
            .cloned()
            .unwrap_or_else(|| "<html><body></body></html>".to_string());
        Ok(FetchedPage { html, final_url: url.clone(), headers: HashMap::new() })
    }
}

#[allow(dead_code)]
pub fn page(title: &str, body: &str) -> String {
    format!(
        "<html><head><title>{title}</title></head><body>{body}</body></html>",
        title = title,
        body = body
    )
}
