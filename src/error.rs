//! Crate-wide error taxonomy.
//!
//! Mirrors the teacher's `crawl_engine::crawl_types::CrawlError` shape but
//! expressed with `thiserror`, and extended with the variants the links-tree
//! pipeline needs (see spec §7). Only [`LinksError::InvalidUrl`] and a target-URL
//! [`LinksError::ScrapeFailed`] ever become a [`crate::response::LinksErrorResponse`];
//! everything else is absorbed into a skip reason or an absent optional field.

use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum LinksError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("failed to scrape {url}: {reason}")]
    ScrapeFailed { url: String, reason: String },

    #[error("unsupported content type '{content_type}' for {url}")]
    UnsupportedContentType { url: String, content_type: String },

    #[error("classification skip: {0}")]
    ClassificationSkip(String),

    #[error("cache error: {0}")]
    CacheError(String),

    #[error("cleaner error: {0}")]
    CleanerError(String),

    #[error("metadata extraction error: {0}")]
    MetadataError(String),

    #[error("meta files error: {0}")]
    MetaFilesError(String),

    #[error("internal error: {0}")]
    InternalError(String),
}

impl LinksError {
    /// Whether this error, if raised for the *target* URL, should convert the
    /// whole request into a [`crate::response::LinksErrorResponse`] per spec §7.
    #[must_use]
    pub const fn is_fatal_for_target(&self) -> bool {
        matches!(
            self,
            Self::InvalidUrl(_)
                | Self::ScrapeFailed { .. }
                | Self::UnsupportedContentType { .. }
                | Self::InternalError(_)
        )
    }
}

impl From<anyhow::Error> for LinksError {
    fn from(err: anyhow::Error) -> Self {
        Self::InternalError(format!("{err:#}"))
    }
}

pub type LinksResult<T> = Result<T, LinksError>;

/// Categorizes a scrape failure for retry/skip-reason purposes.
///
/// Adapted from the teacher's `crawl_engine::crawl_types::FailureKind`: the
/// BFS crawler used this to drive retry-queue backoff, which this crate does
/// not have (the fan-out is a fixed set, not an open-ended frontier). The
/// classification itself is still useful for producing an informative
/// `SkippedUrl` reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Network,
    Http,
    ContentExtraction,
    RateLimited,
    Cancelled,
    Unknown,
}

impl FailureKind {
    #[must_use]
    pub fn classify(message: &str) -> Self {
        let msg = message.to_lowercase();

        if msg.contains("429") || msg.contains("too many requests") || msg.contains("rate limit") {
            return Self::RateLimited;
        }
        if msg.contains("cancelled") || msg.contains("canceled") {
            return Self::Cancelled;
        }
        if msg.contains("timeout") || msg.contains("timed out")
            || msg.contains("connection refused") || msg.contains("connection reset")
            || msg.contains("dns") || msg.contains("unreachable") || msg.contains("eof")
        {
            return Self::Network;
        }
        if msg.contains("http") || msg.contains("status") || msg.contains("redirect") {
            return Self::Http;
        }
        if msg.contains("parse") || msg.contains("extract") || msg.contains("selector") {
            return Self::ContentExtraction;
        }
        Self::Unknown
    }

    #[must_use]
    pub const fn skip_reason_prefix(&self) -> &'static str {
        match self {
            Self::Network => "Failed to scrape (network)",
            Self::Http => "Failed to scrape (http)",
            Self::ContentExtraction => "Failed to scrape (content)",
            Self::RateLimited => "Failed to scrape (rate limited)",
            Self::Cancelled => "Failed to scrape (cancelled)",
            Self::Unknown => "Failed to scrape",
        }
    }
}
