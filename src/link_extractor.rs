//! `ExtractLinksFromHTML` (spec §4.2): parses HTML and buckets every link
//! via [`crate::url_classifier::classify_link`].
//!
//! Grounded on the teacher's `page_extractor::extractors` extraction-function
//! shape (`#[inline]`, `log::debug!` bucket counts) but adapted from CDP
//! `page.evaluate` against a live `Page` to a static `scraper::Html` parse,
//! since this crate's `Fetcher` contract hands over an HTML string rather
//! than a live browser handle.

use std::collections::HashSet;

use scraper::{Html, Selector};
use url::Url;

use crate::url_classifier::{self, Classification, LinkBucket};

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct MediaLinks {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub videos: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub documents: Vec<String>,
}

impl MediaLinks {
    fn is_empty(&self) -> bool {
        self.images.is_empty() && self.videos.is_empty() && self.documents.is_empty()
    }
}

/// `ExtractedLinks` (spec §3): internal is always populated; external/media
/// are omitted per `opts.includeExternal`/`opts.includeMedia`.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ExtractedLinks {
    pub internal: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<MediaLinks>,
}

/// Where skipped hrefs are recorded during extraction (spec §4.2's `skippedSink`).
pub trait SkipSink {
    fn record(&mut self, href: &str, reason: String);
}

impl SkipSink for Vec<(String, String)> {
    fn record(&mut self, href: &str, reason: String) {
        self.push((href.to_string(), reason));
    }
}

#[inline]
fn selector(css: &str) -> Selector {
    // All selectors here are static, valid CSS; construction cannot fail.
    Selector::parse(css).expect("static selector is valid CSS")
}

/// `ExtractLinksFromHTML(html, baseURL, rootURL, opts, isPlatform, skippedSink) -> ExtractedLinks` (spec §4.2).
#[inline]
pub fn extract_links_from_html(
    html: &str,
    base_url: &Url,
    root_url: &Url,
    include_external: bool,
    include_media: bool,
    is_platform: bool,
    skipped_sink: &mut impl SkipSink,
) -> ExtractedLinks {
    let document = Html::parse_document(html);

    let mut internal = Vec::new();
    let mut external = Vec::new();
    let mut media = MediaLinks::default();

    let mut seen_internal = HashSet::new();
    let mut seen_external = HashSet::new();
    let mut seen_images = HashSet::new();
    let mut seen_videos = HashSet::new();
    let mut seen_documents = HashSet::new();

    let candidate_hrefs = collect_candidate_hrefs(&document);

    for href in candidate_hrefs {
        match url_classifier::classify_link(&href, base_url, root_url, is_platform) {
            Classification::Skip { reason } => skipped_sink.record(&href, reason),
            Classification::Bucketed { bucket, url } => {
                let normalized = url.to_string();
                match bucket {
                    LinkBucket::Internal => {
                        if seen_internal.insert(normalized.clone()) {
                            internal.push(normalized);
                        }
                    }
                    LinkBucket::External => {
                        if seen_external.insert(normalized.clone()) {
                            external.push(normalized);
                        }
                    }
                    LinkBucket::MediaImage => {
                        if seen_images.insert(normalized.clone()) {
                            media.images.push(normalized);
                        }
                    }
                    LinkBucket::MediaVideo => {
                        if seen_videos.insert(normalized.clone()) {
                            media.videos.push(normalized);
                        }
                    }
                    LinkBucket::MediaDocument => {
                        if seen_documents.insert(normalized.clone()) {
                            media.documents.push(normalized);
                        }
                    }
                }
            }
        }
    }

    log::debug!(
        "extracted links: internal={}, external={}, images={}, videos={}, documents={}",
        internal.len(),
        external.len(),
        media.images.len(),
        media.videos.len(),
        media.documents.len(),
    );

    ExtractedLinks {
        internal,
        external: if include_external { Some(external) } else { None },
        media: if include_media && !media.is_empty() { Some(media) } else { None },
    }
}

/// Walks `<a href>`, `<img src/srcset>`, `<source src>`, `<video src>` in
/// document order, returning the raw (unresolved) href strings to classify.
fn collect_candidate_hrefs(document: &Html) -> Vec<String> {
    let mut hrefs = Vec::new();

    for el in document.select(&selector("a[href]")) {
        if let Some(href) = el.value().attr("href") {
            hrefs.push(href.to_string());
        }
    }

    for el in document.select(&selector("img")) {
        if let Some(src) = el.value().attr("src") {
            hrefs.push(src.to_string());
        } else if let Some(srcset) = el.value().attr("srcset") {
            if let Some(first) = first_srcset_url(srcset) {
                hrefs.push(first);
            }
        }
    }

    for el in document.select(&selector("source[src]")) {
        if let Some(src) = el.value().attr("src") {
            hrefs.push(src.to_string());
        }
    }

    for el in document.select(&selector("video[src]")) {
        if let Some(src) = el.value().attr("src") {
            hrefs.push(src.to_string());
        }
    }

    hrefs
}

/// `srcset` is a comma-separated list of `url [descriptor]` candidates;
/// spec §4.2 only wants the first.
fn first_srcset_url(srcset: &str) -> Option<String> {
    srcset
        .split(',')
        .next()
        .map(str::trim)
        .and_then(|entry| entry.split_whitespace().next())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn urls(base: &str, root: &str) -> (Url, Url) {
        (Url::parse(base).unwrap(), Url::parse(root).unwrap())
    }

    #[test]
    fn buckets_internal_external_and_media() {
        let html = r#"
            <html><body>
                <a href="/about">About</a>
                <a href="https://other.example/page">Other</a>
                <img src="/logo.png">
                <a href="/report.pdf">Report</a>
                <a href="javascript:void(0)">noop</a>
            </body></html>
        "#;
        let (base, root) = urls("https://h/page", "https://h/");
        let mut skips: Vec<(String, String)> = Vec::new();
        let extracted = extract_links_from_html(html, &base, &root, true, true, false, &mut skips);

        assert_eq!(extracted.internal, vec!["https://h/about"]);
        assert_eq!(extracted.external.unwrap(), vec!["https://other.example/page"]);
        let media = extracted.media.unwrap();
        assert_eq!(media.images, vec!["https://h/logo.png"]);
        assert_eq!(media.documents, vec!["https://h/report.pdf"]);
        assert_eq!(skips.len(), 1);
    }

    #[test]
    fn omits_external_and_media_buckets_when_disabled() {
        let html = r#"<a href="https://other.example/page">x</a><img src="/a.png">"#;
        let (base, root) = urls("https://h/page", "https://h/");
        let mut skips: Vec<(String, String)> = Vec::new();
        let extracted = extract_links_from_html(html, &base, &root, false, false, false, &mut skips);
        assert!(extracted.external.is_none());
        assert!(extracted.media.is_none());
    }

    #[test]
    fn dedupes_preserving_first_seen_order() {
        let html = r#"<a href="/a">1</a><a href="/b">2</a><a href="/a">3</a>"#;
        let (base, root) = urls("https://h/page", "https://h/");
        let mut skips: Vec<(String, String)> = Vec::new();
        let extracted = extract_links_from_html(html, &base, &root, false, false, false, &mut skips);
        assert_eq!(extracted.internal, vec!["https://h/a", "https://h/b"]);
    }

    #[test]
    fn srcset_takes_first_candidate() {
        assert_eq!(first_srcset_url("/a.png 1x, /b.png 2x"), Some("/a.png".to_string()));
        assert_eq!(first_srcset_url(""), None);
    }
}
