//! `TreeAssembler` (spec §4.4): converts a flat set of internal URLs plus
//! per-URL content maps into a hierarchical [`Tree`], and merges new
//! coverage into an existing cached tree without ever losing data
//! (monotonic enrichment).
//!
//! Grounded on the teacher's `link_index` URL→node graph idea (there, a
//! persistent SQLite table driving retroactive HTML rewriting; here, an
//! in-memory hierarchical assembler with no on-disk concern) and
//! `crawl_engine::link_processor`'s internal-link walk for the
//! path-segment traversal shape.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};

use crate::config::LinksOrder;
use crate::imurl::ImUrl;
use crate::link_extractor::ExtractedLinks;
use crate::metadata::Metadata;

/// One node in the assembled tree (spec §3 `TreeNode`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeNode {
    pub url: ImUrl,
    pub name: Option<String>,
    pub last_updated: DateTime<Utc>,
    pub last_visited: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<TreeNode>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cleaned_html: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_links: Option<ExtractedLinks>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TreeNode {
    fn leaf(url: ImUrl, name: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            url,
            name,
            last_updated: now,
            last_visited: None,
            children: None,
            metadata: None,
            cleaned_html: None,
            extracted_links: None,
            error: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedUrl {
    pub url: String,
    pub reason: String,
}

/// The top-level cache value for tree-mode requests (spec §3 `Tree`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tree {
    pub root: TreeNode,
    pub total_urls: usize,
    pub root_url: ImUrl,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped_urls: Option<Vec<SkippedUrl>>,
}

/// Per-URL content collected during a scrape pass, fed into [`build_tree`]/[`merge_into_tree`].
#[derive(Debug, Clone, Default)]
pub struct TreeInputs {
    pub metadata_by_url: HashMap<ImUrl, Metadata>,
    pub cleaned_html_by_url: HashMap<ImUrl, String>,
    pub extracted_by_url: HashMap<ImUrl, ExtractedLinks>,
    pub visited_timestamps: HashMap<ImUrl, DateTime<Utc>>,
}

fn path_segments_owned(url: &ImUrl) -> Vec<String> {
    url.path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).map(str::to_string).collect())
        .unwrap_or_default()
}

fn synthetic_ancestor_url(root: &ImUrl, cumulative: &[String]) -> ImUrl {
    let path = format!("/{}/", cumulative.join("/"));
    root.with_path(&path).unwrap_or_else(|_| root.clone())
}

fn decode_segment(segment: &str) -> String {
    percent_decode_str(segment).decode_utf8_lossy().into_owned()
}

/// Finds or creates the node along `relative` (path segments past the
/// containing node), attaching content for the URL it terminates at.
///
/// Returns whether a newer `lastVisited` was recorded anywhere along the
/// walk, so the caller can bubble `lastUpdated=now()` up through every
/// ancestor up to the root (spec §4.4 `MergeIntoTree` step 3).
#[allow(clippy::too_many_arguments)]
fn insert_path(
    children: &mut Option<Vec<TreeNode>>,
    root: &ImUrl,
    base_segments: &[String],
    relative: &[String],
    full_url: &ImUrl,
    inputs: &TreeInputs,
    now: DateTime<Utc>,
) -> bool {
    let kids = children.get_or_insert_with(Vec::new);
    let segment = &relative[0];

    let mut cumulative = base_segments.to_vec();
    cumulative.push(segment.clone());

    let is_leaf = relative.len() == 1;
    let match_key = cumulative.join("/");

    let idx = kids.iter().position(|c| path_segments_owned(&c.url).join("/") == match_key);
    let idx = match idx {
        Some(i) => i,
        None => {
            let node_url = if is_leaf { full_url.clone() } else { synthetic_ancestor_url(root, &cumulative) };
            kids.push(TreeNode::leaf(node_url, Some(decode_segment(segment)), now));
            kids.len() - 1
        }
    };

    if is_leaf {
        let node = &mut kids[idx];
        node.url = full_url.clone();
        attach_content(node, full_url, inputs, now)
    } else {
        let visited_deeper =
            insert_path(&mut kids[idx].children, root, &cumulative, &relative[1..], full_url, inputs, now);
        if visited_deeper {
            kids[idx].last_updated = now;
        }
        visited_deeper
    }
}

/// Monotonic enrichment: non-null inputs overwrite, null inputs never erase.
/// Returns whether `node.last_visited` was bumped to a newer timestamp, so
/// callers can propagate `lastUpdated` up the ancestor chain.
fn attach_content(node: &mut TreeNode, url: &ImUrl, inputs: &TreeInputs, now: DateTime<Utc>) -> bool {
    if let Some(metadata) = inputs.metadata_by_url.get(url) {
        node.metadata = Some(metadata.clone());
    }
    if let Some(cleaned) = inputs.cleaned_html_by_url.get(url) {
        node.cleaned_html = Some(cleaned.clone());
    }
    if let Some(extracted) = inputs.extracted_by_url.get(url) {
        node.extracted_links = Some(extracted.clone());
    }
    if let Some(visited_at) = inputs.visited_timestamps.get(url) {
        let is_newer = match node.last_visited {
            Some(existing) => *visited_at > existing,
            None => true,
        };
        if is_newer {
            node.last_visited = Some(*visited_at);
            node.last_updated = now;
            return true;
        }
    }
    false
}

fn is_strict_descendant(root_segments: &[String], candidate_segments: &[String]) -> bool {
    candidate_segments.len() > root_segments.len() && candidate_segments[..root_segments.len()] == root_segments[..]
}

/// `BuildTree(internalLinks, rootURL, visitedURLs, metadataByURL, cleanedHTMLByURL, extractedByURL, opts) -> TreeNode` (spec §4.4).
#[must_use]
pub fn build_tree(
    internal_links: &[ImUrl],
    root_url: &ImUrl,
    inputs: &TreeInputs,
    folder_first: bool,
    links_order: LinksOrder,
) -> Tree {
    let now = Utc::now();
    let mut root = TreeNode::leaf(root_url.clone(), None, now);
    attach_content(&mut root, root_url, inputs, now);

    let root_segments = path_segments_owned(root_url);

    let mut all_urls: Vec<ImUrl> = internal_links.to_vec();
    for visited in inputs.visited_timestamps.keys() {
        if !all_urls.contains(visited) {
            all_urls.push(visited.clone());
        }
    }

    for url in &all_urls {
        if url == root_url {
            continue;
        }
        let segments = path_segments_owned(url);
        if !is_strict_descendant(&root_segments, &segments) {
            continue;
        }
        let relative = &segments[root_segments.len()..];
        let visited_deeper =
            insert_path(&mut root.children, root_url, &root_segments, relative, url, inputs, now);
        if visited_deeper {
            root.last_updated = now;
        }
    }

    sort_children_recursive(&mut root.children, folder_first, links_order);

    let total_urls = count_nodes(&root);
    Tree { root, total_urls, root_url: root_url.clone(), skipped_urls: None }
}

/// `MergeIntoTree(existingTree, newInternalLinks, …) -> TreeNode` (spec §4.4).
///
/// Starts from a deep copy of `existing`, inserts any new links not already
/// present, bubbles `lastVisited`/`lastUpdated` for revisited nodes, and
/// re-applies ordering. No URL already in `existing` is ever removed.
#[must_use]
pub fn merge_into_tree(
    existing: &Tree,
    new_internal_links: &[ImUrl],
    inputs: &TreeInputs,
    folder_first: bool,
    links_order: LinksOrder,
) -> Tree {
    let now = Utc::now();
    let mut merged = existing.clone();
    let root_url = merged.root_url.clone();
    let root_segments = path_segments_owned(&root_url);

    attach_content(&mut merged.root, &root_url, inputs, now);

    let mut all_urls: Vec<ImUrl> = new_internal_links.to_vec();
    for visited in inputs.visited_timestamps.keys() {
        if !all_urls.contains(visited) {
            all_urls.push(visited.clone());
        }
    }

    for url in &all_urls {
        if *url == root_url {
            continue;
        }
        let segments = path_segments_owned(url);
        if !is_strict_descendant(&root_segments, &segments) {
            continue;
        }
        let relative = &segments[root_segments.len()..];
        let visited_deeper =
            insert_path(&mut merged.root.children, &root_url, &root_segments, relative, url, inputs, now);
        if visited_deeper {
            merged.root.last_updated = now;
        }
    }

    sort_children_recursive(&mut merged.root.children, folder_first, links_order);
    merged.total_urls = count_nodes(&merged.root);
    merged
}

fn sort_children_recursive(children: &mut Option<Vec<TreeNode>>, folder_first: bool, links_order: LinksOrder) {
    let Some(kids) = children else { return };
    for child in kids.iter_mut() {
        sort_children_recursive(&mut child.children, folder_first, links_order);
    }

    if folder_first {
        let (mut folders, mut leaves): (Vec<TreeNode>, Vec<TreeNode>) =
            kids.drain(..).partition(|c| c.children.is_some());
        order_group(&mut folders, links_order);
        order_group(&mut leaves, links_order);
        folders.extend(leaves);
        *kids = folders;
    } else {
        order_group(kids, links_order);
    }
}

fn order_group(group: &mut [TreeNode], links_order: LinksOrder) {
    if matches!(links_order, LinksOrder::Alphabetical) {
        group.sort_by(|a, b| a.name.cmp(&b.name));
    }
    // LinksOrder::Page preserves first-discovery insertion order: no-op.
}

fn count_nodes(node: &TreeNode) -> usize {
    1 + node.children.as_ref().map_or(0, |kids| kids.iter().map(count_nodes).sum())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u(s: &str) -> ImUrl {
        ImUrl::parse(s).unwrap()
    }

    #[test]
    fn builds_nested_tree_from_internal_links() {
        let root = u("https://h/");
        let links = vec![u("https://h/a"), u("https://h/a/b"), u("https://h/c")];
        let inputs = TreeInputs::default();
        let tree = build_tree(&links, &root, &inputs, false, LinksOrder::Page);

        assert_eq!(tree.root_url, root);
        let names: Vec<_> = tree.root.children.as_ref().unwrap().iter().map(|c| c.name.clone()).collect();
        assert_eq!(names, vec![Some("a".to_string()), Some("c".to_string())]);

        let a_node = &tree.root.children.as_ref().unwrap()[0];
        assert_eq!(a_node.children.as_ref().unwrap()[0].name, Some("b".to_string()));
    }

    #[test]
    fn excludes_non_descendants() {
        let root = u("https://h/sub/");
        let links = vec![u("https://h/other")];
        let inputs = TreeInputs::default();
        let tree = build_tree(&links, &root, &inputs, false, LinksOrder::Page);
        assert!(tree.root.children.is_none());
    }

    #[test]
    fn merge_never_removes_existing_urls() {
        let root = u("https://h/");
        let inputs = TreeInputs::default();
        let initial = build_tree(&[u("https://h/a")], &root, &inputs, false, LinksOrder::Page);

        let merged = merge_into_tree(&initial, &[u("https://h/b")], &inputs, false, LinksOrder::Page);
        let names: Vec<_> = merged.root.children.as_ref().unwrap().iter().map(|c| c.name.clone()).collect();
        assert!(names.contains(&Some("a".to_string())));
        assert!(names.contains(&Some("b".to_string())));
    }

    #[test]
    fn folder_first_orders_folders_before_leaves() {
        let root = u("https://h/");
        let links = vec![u("https://h/leaf"), u("https://h/folder/child")];
        let inputs = TreeInputs::default();
        let tree = build_tree(&links, &root, &inputs, true, LinksOrder::Page);
        let names: Vec<_> = tree.root.children.as_ref().unwrap().iter().map(|c| c.name.clone()).collect();
        assert_eq!(names, vec![Some("folder".to_string()), Some("leaf".to_string())]);
    }

    #[test]
    fn alphabetical_order_sorts_by_name() {
        let root = u("https://h/");
        let links = vec![u("https://h/zeta"), u("https://h/alpha")];
        let inputs = TreeInputs::default();
        let tree = build_tree(&links, &root, &inputs, false, LinksOrder::Alphabetical);
        let names: Vec<_> = tree.root.children.as_ref().unwrap().iter().map(|c| c.name.clone()).collect();
        assert_eq!(names, vec![Some("alpha".to_string()), Some("zeta".to_string())]);
    }

    #[test]
    fn decodes_percent_encoded_segment_names() {
        let root = u("https://h/");
        let links = vec![u("https://h/hello%20world")];
        let inputs = TreeInputs::default();
        let tree = build_tree(&links, &root, &inputs, false, LinksOrder::Page);
        assert_eq!(tree.root.children.as_ref().unwrap()[0].name, Some("hello world".to_string()));
    }

    #[test]
    fn no_two_siblings_share_a_url() {
        let root = u("https://h/");
        let links = vec![u("https://h/a/x"), u("https://h/a/y")];
        let inputs = TreeInputs::default();
        let tree = build_tree(&links, &root, &inputs, false, LinksOrder::Page);
        let a = &tree.root.children.as_ref().unwrap()[0];
        let kids = a.children.as_ref().unwrap();
        assert_eq!(kids.len(), 2);
        assert_ne!(kids[0].url, kids[1].url);
    }

    #[test]
    fn revisit_bumps_last_updated_on_ancestors_up_to_root() {
        let root = u("https://h/");
        let leaf = u("https://h/a/b");
        let inputs = TreeInputs::default();
        let initial = build_tree(&[leaf.clone()], &root, &inputs, false, LinksOrder::Page);

        let stale_stamp = initial.root.last_updated;
        let a_stale_stamp = initial.root.children.as_ref().unwrap()[0].last_updated;

        std::thread::sleep(std::time::Duration::from_millis(2));

        let mut revisit = TreeInputs::default();
        revisit.visited_timestamps.insert(leaf.clone(), Utc::now());
        let merged = merge_into_tree(&initial, &[leaf], &revisit, false, LinksOrder::Page);

        let a_node = &merged.root.children.as_ref().unwrap()[0];
        let b_node = &a_node.children.as_ref().unwrap()[0];
        assert!(b_node.last_visited.is_some());
        assert!(a_node.last_updated > a_stale_stamp, "intermediate ancestor `a` must be bumped");
        assert!(merged.root.last_updated > stale_stamp, "root must be bumped");
    }
}
