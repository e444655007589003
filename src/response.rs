//! `LinksResponse` discriminated union (spec §3, §6).
//!
//! Grounded on the teacher's `page_extractor::page_data::PageData` shape
//! (one struct per outcome, success discriminated by presence of content
//! fields) translated into three explicit Rust variants instead of one
//! struct with every field optional.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::link_extractor::ExtractedLinks;
use crate::metadata::Metadata;
use crate::metrics::Metrics;
use crate::tree::{SkippedUrl, Tree};

/// Tree-mode success (spec §3 `LinksResponse` / `SuccessWithTree`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinksSuccessWithTree {
    pub request_id: Uuid,
    pub success: bool,
    pub cached: bool,
    pub target_url: String,
    pub timestamp: DateTime<Utc>,
    pub ancestors: Vec<String>,
    pub tree: Tree,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<Metrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped_urls: Option<Vec<SkippedUrl>>,
}

/// Non-tree-mode success, content fields at the response root (spec §3
/// `SuccessWithoutTree`; also the shape persisted under the non-tree cache
/// key per spec §4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinksSuccessWithoutTree {
    pub request_id: Uuid,
    pub success: bool,
    pub cached: bool,
    pub target_url: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cleaned_html: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_links: Option<ExtractedLinks>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<Metrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped_urls: Option<Vec<SkippedUrl>>,
}

/// `{requestId, success:false, targetUrl, timestamp, error, tree?}` (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinksErrorResponse {
    pub request_id: Uuid,
    pub success: bool,
    pub target_url: String,
    pub timestamp: DateTime<Utc>,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tree: Option<Tree>,
}

/// The top-level discriminated union the orchestrator returns (spec §3
/// `LinksResponse`). `success`/presence-of-`tree` discriminate on the wire;
/// in Rust, variants discriminate directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LinksResponse {
    Tree(LinksSuccessWithTree),
    Flat(LinksSuccessWithoutTree),
    Error(LinksErrorResponse),
}

impl LinksResponse {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        !matches!(self, Self::Error(_))
    }
}
