//! Core configuration types for the links-tree request pipeline.
//!
//! Mirrors the teacher's `CrawlConfig` shape (one struct holding every knob,
//! built through a typestate builder in [`super::builder`]) but re-scoped to
//! the options table in spec §6.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::imurl::ImUrl;

/// Sibling ordering within a tree level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LinksOrder {
    #[default]
    Page,
    Alphabetical,
}

/// Which backend performs the `Clean(html, opts) -> cleanedHTML` step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum CleaningProcessor {
    #[default]
    CheerioReader,
    HtmlRewriter,
    Browser,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum FetchMethod {
    #[default]
    Get,
    Head,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RedirectPolicy {
    #[default]
    Follow,
    Error,
    Manual,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheOptions {
    pub enabled: bool,
    pub expiration_ttl_secs: u64,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self { enabled: true, expiration_ttl_secs: 86_400 }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct MetricsOptions {
    pub enable: bool,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct LinkExtractionOptions {
    pub include_external: bool,
    pub include_media: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FetchOptions {
    pub method: FetchMethod,
    pub redirect: RedirectPolicy,
    #[serde(default)]
    pub headers: Vec<(String, String)>,
}

/// Bounds on the bounded-parallel fan-out described in spec §5.
///
/// Resolves the "should `MAX_KIN_LIMIT` be per-phase" open question (spec §9)
/// in favor of one shared limit applied to ancestors, root-descendants, and
/// target-descendants alike (see DESIGN.md).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ConcurrencyOptions {
    pub max_parallel_fetches: usize,
    pub max_kin_limit: usize,
    pub fetch_timeout_secs: u64,
}

impl Default for ConcurrencyOptions {
    fn default() -> Self {
        Self { max_parallel_fetches: 5, max_kin_limit: 20, fetch_timeout_secs: 30 }
    }
}

impl ConcurrencyOptions {
    #[must_use]
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

/// The full, validated request configuration (spec §6, `LinksOptions`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinksOptions {
    pub(crate) url: ImUrl,
    pub(crate) tree: bool,
    pub(crate) extracted_links: bool,
    pub(crate) metadata: bool,
    pub(crate) cleaned_html: bool,
    pub(crate) robots: bool,
    pub(crate) sitemap_xml: bool,
    pub(crate) subdomain_as_root_url: bool,
    pub(crate) is_platform_url: bool,
    pub(crate) folder_first: bool,
    pub(crate) links_order: LinksOrder,
    pub(crate) cleaning_processor: CleaningProcessor,
    pub(crate) cache_options: CacheOptions,
    pub(crate) metrics_options: MetricsOptions,
    pub(crate) link_extraction_options: LinkExtractionOptions,
    pub(crate) fetch_options: FetchOptions,
    pub(crate) concurrency: ConcurrencyOptions,
}

impl LinksOptions {
    #[must_use]
    pub fn url(&self) -> &ImUrl {
        &self.url
    }

    #[must_use]
    pub const fn tree(&self) -> bool {
        self.tree
    }

    #[must_use]
    pub const fn extracted_links(&self) -> bool {
        self.extracted_links
    }

    #[must_use]
    pub const fn metadata(&self) -> bool {
        self.metadata
    }

    #[must_use]
    pub const fn cleaned_html(&self) -> bool {
        self.cleaned_html
    }

    #[must_use]
    pub const fn robots(&self) -> bool {
        self.robots
    }

    #[must_use]
    pub const fn sitemap_xml(&self) -> bool {
        self.sitemap_xml
    }

    #[must_use]
    pub const fn subdomain_as_root_url(&self) -> bool {
        self.subdomain_as_root_url
    }

    #[must_use]
    pub const fn is_platform_url_flag(&self) -> bool {
        self.is_platform_url
    }

    #[must_use]
    pub const fn folder_first(&self) -> bool {
        self.folder_first
    }

    #[must_use]
    pub const fn links_order(&self) -> LinksOrder {
        self.links_order
    }

    #[must_use]
    pub const fn cleaning_processor(&self) -> CleaningProcessor {
        self.cleaning_processor
    }

    #[must_use]
    pub const fn cache_options(&self) -> &CacheOptions {
        &self.cache_options
    }

    #[must_use]
    pub const fn metrics_options(&self) -> MetricsOptions {
        self.metrics_options
    }

    #[must_use]
    pub const fn link_extraction_options(&self) -> LinkExtractionOptions {
        self.link_extraction_options
    }

    #[must_use]
    pub const fn fetch_options(&self) -> &FetchOptions {
        &self.fetch_options
    }

    #[must_use]
    pub const fn concurrency(&self) -> ConcurrencyOptions {
        self.concurrency
    }
}
