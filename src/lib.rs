//! A concurrent links-tree builder: scrapes a target URL's ancestors, root,
//! and descendants, classifies every outgoing link, and assembles (or
//! enriches) a cached hierarchical [`tree::Tree`].
//!
//! See [`orchestrator::LinksOrchestrator::process_links_request`] for the
//! entry point.

pub mod browser_pool;
pub mod browser_profile;
pub mod browser_setup;
pub mod cache;
pub mod cleaner;
pub mod config;
pub mod crawl_engine;
pub mod error;
pub mod fetcher;
pub mod imurl;
pub mod link_extractor;
pub mod metadata;
pub mod metrics;
pub mod orchestrator;
pub mod response;
pub mod scrape_coordinator;
pub mod tree;
pub mod url_classifier;
pub mod utils;

pub use browser_pool::{BrowserPool, BrowserPoolConfig, PooledBrowserGuard};
pub use browser_profile::{
    cleanup_stale_lock, cleanup_stale_profiles, create_unique_profile,
    create_unique_profile_with_prefix, is_singleton_lock_stale, BrowserProfile,
};
pub use browser_setup::{download_managed_browser, find_browser_executable, launch_browser};
pub use cache::CacheLayer;
pub use config::{LinksOptions, LinksOptionsBuilder};
pub use error::{LinksError, LinksResult};
pub use fetcher::{headless::HeadlessFetcher, http::HttpFetcher, Fetcher, FetchedPage};
pub use imurl::ImUrl;
pub use metrics::Metrics;
pub use orchestrator::LinksOrchestrator;
pub use response::{LinksErrorResponse, LinksResponse, LinksSuccessWithTree, LinksSuccessWithoutTree};
pub use tree::{SkippedUrl, Tree, TreeNode};
