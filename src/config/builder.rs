//! Typestate builder for [`super::types::LinksOptions`].
//!
//! Mirrors the teacher's `CrawlConfigBuilder<State>` consuming-transition
//! pattern (type states plus a `build()` only available once required
//! fields are set): the only required field here is `url`, so there are
//! exactly two states, `()` (nothing set yet) and [`WithUrl`] (ready to
//! `build()`). Every other field has a spec-mandated default and can be set
//! at any state.

use std::marker::PhantomData;

use crate::error::{LinksError, LinksResult};
use crate::imurl::ImUrl;
use crate::url_classifier;

use super::types::{
    CacheOptions, CleaningProcessor, ConcurrencyOptions, FetchOptions, LinkExtractionOptions,
    LinksOptions, LinksOrder, MetricsOptions,
};

/// Marker: `url` has not been set yet. `build()` is unavailable.
#[derive(Debug, Clone, Copy)]
pub struct WithUrl;

/// Marker: all required fields are set; `build()` is available.
pub type Complete = WithUrl;

#[derive(Debug, Clone)]
pub struct LinksOptionsBuilder<State = ()> {
    url: Option<String>,
    tree: bool,
    extracted_links: bool,
    metadata: bool,
    cleaned_html: bool,
    robots: bool,
    sitemap_xml: bool,
    subdomain_as_root_url: bool,
    is_platform_url: bool,
    folder_first: bool,
    links_order: LinksOrder,
    cleaning_processor: CleaningProcessor,
    cache_options: CacheOptions,
    metrics_options: MetricsOptions,
    link_extraction_options: LinkExtractionOptions,
    fetch_options: FetchOptions,
    concurrency: ConcurrencyOptions,
    _phantom: PhantomData<State>,
}

impl Default for LinksOptionsBuilder<()> {
    fn default() -> Self {
        Self {
            url: None,
            tree: true,
            extracted_links: false,
            metadata: false,
            cleaned_html: false,
            robots: false,
            sitemap_xml: false,
            subdomain_as_root_url: false,
            is_platform_url: false,
            folder_first: false,
            links_order: LinksOrder::default(),
            cleaning_processor: CleaningProcessor::default(),
            cache_options: CacheOptions::default(),
            metrics_options: MetricsOptions::default(),
            link_extraction_options: LinkExtractionOptions::default(),
            fetch_options: FetchOptions::default(),
            concurrency: ConcurrencyOptions::default(),
            _phantom: PhantomData,
        }
    }
}

impl LinksOptionsBuilder<()> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the required target URL, unlocking `build()`.
    #[must_use]
    pub fn url(self, url: impl Into<String>) -> LinksOptionsBuilder<WithUrl> {
        LinksOptionsBuilder {
            url: Some(url.into()),
            tree: self.tree,
            extracted_links: self.extracted_links,
            metadata: self.metadata,
            cleaned_html: self.cleaned_html,
            robots: self.robots,
            sitemap_xml: self.sitemap_xml,
            subdomain_as_root_url: self.subdomain_as_root_url,
            is_platform_url: self.is_platform_url,
            folder_first: self.folder_first,
            links_order: self.links_order,
            cleaning_processor: self.cleaning_processor,
            cache_options: self.cache_options,
            metrics_options: self.metrics_options,
            link_extraction_options: self.link_extraction_options,
            fetch_options: self.fetch_options,
            concurrency: self.concurrency,
            _phantom: PhantomData,
        }
    }
}

impl LinksOptionsBuilder<WithUrl> {
    /// Validate and assemble the final [`LinksOptions`].
    ///
    /// # Errors
    /// Returns [`LinksError::InvalidUrl`] if the target URL fails
    /// `url_classifier::normalize_url` or URL parsing.
    pub fn build(self) -> LinksResult<LinksOptions> {
        let raw = self.url.as_deref().unwrap_or_default();
        let normalized = url_classifier::normalize_url(raw)
            .map_err(|e| LinksError::InvalidUrl(format!("{raw}: {e}")))?;
        let url = ImUrl::parse(normalized.as_str())
            .map_err(|e| LinksError::InvalidUrl(format!("{raw}: {e}")))?;

        Ok(LinksOptions {
            url,
            tree: self.tree,
            extracted_links: self.extracted_links,
            metadata: self.metadata,
            cleaned_html: self.cleaned_html,
            robots: self.robots,
            sitemap_xml: self.sitemap_xml,
            subdomain_as_root_url: self.subdomain_as_root_url,
            is_platform_url: self.is_platform_url,
            folder_first: self.folder_first,
            links_order: self.links_order,
            cleaning_processor: self.cleaning_processor,
            cache_options: self.cache_options,
            metrics_options: self.metrics_options,
            link_extraction_options: self.link_extraction_options,
            fetch_options: self.fetch_options,
            concurrency: self.concurrency,
        })
    }
}

// Builder methods available at any state, since every field but `url` is optional.
impl<State> LinksOptionsBuilder<State> {
    #[must_use]
    pub fn tree(mut self, tree: bool) -> Self {
        self.tree = tree;
        self
    }

    #[must_use]
    pub fn extracted_links(mut self, extracted_links: bool) -> Self {
        self.extracted_links = extracted_links;
        self
    }

    #[must_use]
    pub fn metadata(mut self, metadata: bool) -> Self {
        self.metadata = metadata;
        self
    }

    #[must_use]
    pub fn cleaned_html(mut self, cleaned_html: bool) -> Self {
        self.cleaned_html = cleaned_html;
        self
    }

    #[must_use]
    pub fn robots(mut self, robots: bool) -> Self {
        self.robots = robots;
        self
    }

    #[must_use]
    pub fn sitemap_xml(mut self, sitemap_xml: bool) -> Self {
        self.sitemap_xml = sitemap_xml;
        self
    }

    #[must_use]
    pub fn subdomain_as_root_url(mut self, subdomain_as_root_url: bool) -> Self {
        self.subdomain_as_root_url = subdomain_as_root_url;
        self
    }

    #[must_use]
    pub fn is_platform_url(mut self, is_platform_url: bool) -> Self {
        self.is_platform_url = is_platform_url;
        self
    }

    #[must_use]
    pub fn folder_first(mut self, folder_first: bool) -> Self {
        self.folder_first = folder_first;
        self
    }

    #[must_use]
    pub fn links_order(mut self, links_order: LinksOrder) -> Self {
        self.links_order = links_order;
        self
    }

    #[must_use]
    pub fn cleaning_processor(mut self, cleaning_processor: CleaningProcessor) -> Self {
        self.cleaning_processor = cleaning_processor;
        self
    }

    #[must_use]
    pub fn cache_options(mut self, cache_options: CacheOptions) -> Self {
        self.cache_options = cache_options;
        self
    }

    #[must_use]
    pub fn metrics_options(mut self, metrics_options: MetricsOptions) -> Self {
        self.metrics_options = metrics_options;
        self
    }

    #[must_use]
    pub fn link_extraction_options(mut self, link_extraction_options: LinkExtractionOptions) -> Self {
        self.link_extraction_options = link_extraction_options;
        self
    }

    #[must_use]
    pub fn fetch_options(mut self, fetch_options: FetchOptions) -> Self {
        self.fetch_options = fetch_options;
        self
    }

    #[must_use]
    pub fn concurrency(mut self, concurrency: ConcurrencyOptions) -> Self {
        self.concurrency = concurrency;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let opts = LinksOptionsBuilder::new()
            .url("https://example.com/a/b")
            .build()
            .expect("valid url");
        assert!(opts.tree());
        assert!(!opts.extracted_links());
        assert!(!opts.folder_first());
        assert_eq!(opts.links_order(), LinksOrder::Page);
        assert_eq!(opts.concurrency().max_kin_limit, 20);
    }

    #[test]
    fn rejects_invalid_url() {
        let err = LinksOptionsBuilder::new().url("not a url").build();
        assert!(err.is_err());
    }
}
