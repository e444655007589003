//! Plain HTTP(S) `Fetcher`, built once and shared across requests.
//!
//! Grounded on the teacher's `browser_setup` timeout/error-context idiom
//! (`anyhow::Context`-style messages wrapped into the crate's own error
//! type) and the reuse-one-client pattern common to the pack's `reqwest`
//! consumers: a single [`reqwest::Client`] is constructed once per
//! [`HttpFetcher`] and cloned cheaply per request.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::redirect::Policy;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::config::{FetchMethod, FetchOptions, RedirectPolicy};
use crate::crawl_engine::content_validator::validate_page_content;
use crate::error::LinksError;

use super::{is_html_content_type, FetchedPage, Fetcher};

pub struct HttpFetcher {
    following: reqwest::Client,
    not_following: reqwest::Client,
}

impl HttpFetcher {
    /// # Errors
    /// Returns an error if the underlying `reqwest::Client`s fail to build
    /// (e.g. TLS backend initialization failure).
    pub fn new() -> Result<Self, reqwest::Error> {
        let following = reqwest::Client::builder().redirect(Policy::limited(10)).build()?;
        // `error`/`manual` need the raw 3xx response, which reqwest only
        // hands back when its own redirect-following is disabled entirely.
        let not_following = reqwest::Client::builder().redirect(Policy::none()).build()?;
        Ok(Self { following, not_following })
    }

    fn client_for(&self, redirect: RedirectPolicy) -> &reqwest::Client {
        match redirect {
            RedirectPolicy::Follow => &self.following,
            RedirectPolicy::Error | RedirectPolicy::Manual => &self.not_following,
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new().expect("reqwest client with default TLS backend builds")
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(
        &self,
        url: &Url,
        opts: &FetchOptions,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<FetchedPage, LinksError> {
        let method = match opts.method {
            FetchMethod::Get => reqwest::Method::GET,
            FetchMethod::Head => reqwest::Method::HEAD,
        };

        let mut request = self.client_for(opts.redirect).request(method, url.as_str());
        for (name, value) in &opts.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let fetch = async {
            let response = request
                .send()
                .await
                .map_err(|e| LinksError::ScrapeFailed { url: url.to_string(), reason: e.to_string() })?;

            let status = response.status();

            if matches!(opts.redirect, RedirectPolicy::Error) && status.is_redirection() {
                return Err(LinksError::ScrapeFailed {
                    url: url.to_string(),
                    reason: format!("unexpected redirect: {status}"),
                });
            }

            // `manual` surfaces the raw 3xx response as-is (no Location
            // follow-up fetch) with its own headers and body.
            if matches!(opts.redirect, RedirectPolicy::Manual) && status.is_redirection() {
                let mut headers = HashMap::new();
                for (name, value) in response.headers() {
                    if let Ok(v) = value.to_str() {
                        headers.insert(name.as_str().to_lowercase(), v.to_string());
                    }
                }
                let final_url = response.url().clone();
                let html = response.text().await.unwrap_or_default();
                return Ok(FetchedPage { html, final_url, headers });
            }
            let validation = validate_page_content("", "", url.as_str(), Some(status.as_u16()));
            if !validation.is_valid {
                return Err(LinksError::ScrapeFailed {
                    url: url.to_string(),
                    reason: validation.reason.unwrap_or_else(|| format!("HTTP {status}")),
                });
            }

            let final_url = response.url().clone();
            let content_type = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);

            if !is_html_content_type(content_type.as_deref()) {
                return Err(LinksError::UnsupportedContentType {
                    url: url.to_string(),
                    content_type: content_type.unwrap_or_default(),
                });
            }

            let mut headers = HashMap::new();
            for (name, value) in response.headers() {
                if let Ok(v) = value.to_str() {
                    headers.insert(name.as_str().to_lowercase(), v.to_string());
                }
            }

            let html = response
                .text()
                .await
                .map_err(|e| LinksError::ScrapeFailed { url: url.to_string(), reason: e.to_string() })?;

            Ok(FetchedPage { html, final_url, headers })
        };

        tokio::select! {
            result = tokio::time::timeout(timeout, fetch) => result.map_err(|_| LinksError::ScrapeFailed {
                url: url.to_string(),
                reason: format!("fetch timed out after {timeout:?}"),
            })?,
            () = cancel.cancelled() => Err(LinksError::ScrapeFailed {
                url: url.to_string(),
                reason: "cancelled".to_string(),
            }),
        }
    }
}
