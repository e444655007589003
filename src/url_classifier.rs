//! URL normalization, root derivation, and link classification (spec §4.1).
//!
//! Grounded on [`crate::imurl`]'s `Url`-manipulation idiom and the teacher's
//! `utils::url_utils::is_valid_url` / `utils::constants` static-allowlist
//! pattern, but none of the teacher's crawl-mirroring path logic survives —
//! this module only ever classifies, never writes to disk.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use url::Url;

use crate::imurl::ImUrl;

/// Host allowlist for platform-URL detection (spec §4.1 `IsPlatformURL`).
///
/// A small static set, not part of the design contract per spec.md — callers
/// needing a different allowlist should route through `opts.is_platform_url`
/// instead of extending this list.
static PLATFORM_ALLOWLIST: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "github.com",
        "gitlab.com",
        "linkedin.com",
        "twitter.com",
        "x.com",
        "facebook.com",
        "medium.com",
        "notion.site",
    ]
    .into_iter()
    .collect()
});

/// Multi-label public suffixes this crate recognizes for base-domain
/// derivation. Best-effort per spec.md §4.1/§9 — not a full Public Suffix
/// List; unknown TLDs fall back to `origin(target)` (see DESIGN.md).
static MULTI_LABEL_SUFFIXES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "co.uk", "org.uk", "ac.uk", "gov.uk", "co.jp", "co.kr", "co.nz", "co.za", "com.au",
        "net.au", "org.au", "com.br", "com.mx", "com.cn", "com.tw", "co.in",
    ]
    .into_iter()
    .collect()
});

const MEDIA_IMAGE_EXTS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "svg", "bmp", "ico"];
const MEDIA_VIDEO_EXTS: &[&str] = &["mp4", "webm", "mov", "avi"];
const MEDIA_DOC_EXTS: &[&str] =
    &["pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "zip", "csv"];

/// Which bucket a classified link belongs in (spec §4.1 `ClassifyLink`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkBucket {
    Internal,
    External,
    MediaImage,
    MediaVideo,
    MediaDocument,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ClassifyError {
    #[error("unparseable or unsupported scheme: {0}")]
    InvalidUrl(String),
    #[error("non-http(s) link: {0}")]
    UnsupportedScheme(String),
}

/// Normalizes a raw URL string per spec §4.1 `NormalizeURL`.
///
/// Lowercases scheme and host, strips default ports and the fragment,
/// collapses duplicate path slashes, lowercases percent-encoded triplets,
/// and preserves a trailing slash only on the root path. Only `http`/`https`
/// are accepted.
///
/// # Errors
/// Returns [`ClassifyError::InvalidUrl`] on unparseable input or a scheme
/// other than `http`/`https`.
pub fn normalize_url(raw: &str) -> Result<Url, ClassifyError> {
    let parsed = Url::parse(raw.trim()).map_err(|e| ClassifyError::InvalidUrl(e.to_string()))?;
    normalize_parsed(parsed)
}

/// Normalizes an already-parsed [`Url`], as used when resolving a relative
/// `href` against a base page URL.
///
/// # Errors
/// Returns [`ClassifyError::UnsupportedScheme`] for anything but `http`/`https`.
pub fn normalize_parsed(mut url: Url) -> Result<Url, ClassifyError> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ClassifyError::UnsupportedScheme(url.scheme().to_string()));
    }

    url.set_fragment(None);

    // url::Url already lowercases scheme and host and strips the default
    // port for the given scheme on construction; what's left is path
    // normalization (collapse "//", lowercase percent-encoded triplets, and
    // strip a trailing slash except on the root path).
    let collapsed = collapse_duplicate_slashes(url.path());
    let lowered_pct = lowercase_percent_triplets(&collapsed);
    let deslashed = strip_non_root_trailing_slash(&lowered_pct);
    if deslashed != url.path() {
        url.set_path(&deslashed);
    }

    Ok(url)
}

fn strip_non_root_trailing_slash(path: &str) -> String {
    if path != "/" && path.ends_with('/') {
        path.trim_end_matches('/').to_string()
    } else {
        path.to_string()
    }
}

fn collapse_duplicate_slashes(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut prev_slash = false;
    for ch in path.chars() {
        if ch == '/' {
            if prev_slash {
                continue;
            }
            prev_slash = true;
        } else {
            prev_slash = false;
        }
        out.push(ch);
    }
    out
}

fn lowercase_percent_triplets(path: &str) -> String {
    let bytes = path.as_bytes();
    let mut out = String::with_capacity(path.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            out.push('%');
            out.push((bytes[i + 1] as char).to_ascii_lowercase());
            out.push((bytes[i + 2] as char).to_ascii_lowercase());
            i += 3;
        } else {
            out.push(bytes[i] as char);
            i += 1;
        }
    }
    out
}

fn origin_url(url: &Url) -> Option<Url> {
    let origin = format!("{}://{}", url.scheme(), url.host_str()?);
    Url::parse(&origin).ok()
}

/// `IsPlatformURL(target, userFlag) -> bool` (spec §4.1).
#[must_use]
pub fn is_platform_url(target: &Url, user_flag: bool) -> bool {
    if user_flag {
        return true;
    }
    target
        .host_str()
        .is_some_and(|h| PLATFORM_ALLOWLIST.contains(h.to_lowercase().as_str()))
}

fn base_domain(host: &str) -> &str {
    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() < 2 {
        return host;
    }
    for window_start in (0..labels.len().saturating_sub(1)).rev() {
        let candidate_suffix = labels[window_start + 1..].join(".");
        if MULTI_LABEL_SUFFIXES.contains(candidate_suffix.as_str()) {
            let start = window_start;
            return &host[host_label_byte_offset(host, start)..];
        }
    }
    // Unknown suffix shape: assume the last two labels form the registrable domain.
    let start = labels.len().saturating_sub(2);
    &host[host_label_byte_offset(host, start)..]
}

fn host_label_byte_offset(host: &str, label_index: usize) -> usize {
    host.split('.')
        .take(label_index)
        .map(|l| l.len() + 1)
        .sum()
}

/// `DeriveRootURL(target, opts) -> URL` (spec §4.1).
///
/// `is_platform_url` and `subdomain_as_root` are the already-resolved
/// `opts.isPlatformUrl`/`opts.subdomainAsRootURL` flags; `user_flag` feeds
/// `IsPlatformURL`'s allowlist-or-flag check.
#[must_use]
pub fn derive_root_url(target: &Url, user_platform_flag: bool, subdomain_as_root: bool) -> Url {
    if is_platform_url(target, user_platform_flag) {
        return target.clone();
    }
    if subdomain_as_root {
        if let Some(origin) = origin_url(target) {
            return origin;
        }
    }
    if let Some(host) = target.host_str() {
        let base = base_domain(host);
        if let Ok(root) = Url::parse(&format!("{}://{}", target.scheme(), base)) {
            return root;
        }
    }
    origin_url(target).unwrap_or_else(|| target.clone())
}

fn path_segments_vec(url: &Url) -> Vec<&str> {
    url.path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).collect())
        .unwrap_or_default()
}

/// `AncestorPaths(target) -> []URL` (spec §4.1).
///
/// For `https://h/a/b/c` returns `[https://h/, https://h/a/, https://h/a/b/]`
/// in shallow-to-deep order. A root host with no path returns an empty
/// sequence.
#[must_use]
pub fn ancestor_paths(target: &Url) -> Vec<Url> {
    let segments = path_segments_vec(target);
    if segments.is_empty() {
        return Vec::new();
    }

    let mut out = Vec::with_capacity(segments.len());
    for depth in 0..segments.len() {
        let mut url = target.clone();
        url.set_query(None);
        url.set_fragment(None);
        if let Ok(mut path_mut) = url.path_segments_mut() {
            path_mut.clear().extend(&segments[..depth]).push("");
        }
        out.push(url);
    }
    out
}

/// `DescendantPaths(target, candidateSet) -> []URL` (spec §4.1).
///
/// Every URL in `candidates` whose path is a strict proper extension of
/// `target`'s path and which shares `target`'s host, ordered by path depth
/// ascending then lexicographically.
#[must_use]
pub fn descendant_paths<'a>(target: &Url, candidates: &'a [Url]) -> Vec<&'a Url> {
    let target_host = target.host_str();
    let target_segments = path_segments_vec(target);

    let mut matches: Vec<&Url> = candidates
        .iter()
        .filter(|candidate| {
            candidate.host_str() == target_host && {
                let candidate_segments = path_segments_vec(candidate);
                candidate_segments.len() > target_segments.len()
                    && candidate_segments[..target_segments.len()] == target_segments[..]
            }
        })
        .collect();

    matches.sort_by(|a, b| {
        let depth_a = path_segments_vec(a).len();
        let depth_b = path_segments_vec(b).len();
        depth_a.cmp(&depth_b).then_with(|| a.as_str().cmp(b.as_str()))
    });
    matches
}

/// Outcome of [`classify_link`]: either a bucketed, normalized URL, or a skip
/// reason that is never fatal (spec §4.1, §7).
pub enum Classification {
    Bucketed { bucket: LinkBucket, url: Url },
    Skip { reason: String },
}

/// `ClassifyLink(href, base, root, isPlatform) -> {bucket, normalizedURL} | skip{reason}` (spec §4.1).
///
/// Resolves `href` against `base`, normalizes it, rejects non-http(s),
/// empty, `javascript:`, `mailto:`, and `tel:` links as skips, then buckets
/// by host/extension. In platform mode, internal additionally requires the
/// resolved URL to share `target`'s (here, `root`'s) path prefix.
#[must_use]
pub fn classify_link(href: &str, base: &Url, root: &Url, is_platform: bool) -> Classification {
    let trimmed = href.trim();
    if trimmed.is_empty() {
        return Classification::Skip { reason: "empty href".to_string() };
    }
    if trimmed.starts_with("javascript:") || trimmed.starts_with("mailto:") || trimmed.starts_with("tel:")
    {
        return Classification::Skip { reason: format!("unsupported scheme link: {trimmed}") };
    }

    let resolved = match base.join(trimmed) {
        Ok(u) => u,
        Err(e) => return Classification::Skip { reason: format!("unresolvable href '{trimmed}': {e}") },
    };

    let normalized = match normalize_parsed(resolved) {
        Ok(u) => u,
        Err(e) => return Classification::Skip { reason: e.to_string() },
    };

    let same_host_as_root = normalized.host_str() == root.host_str();

    if let Some(bucket) = media_bucket(&normalized) {
        return Classification::Bucketed { bucket, url: normalized };
    }

    if same_host_as_root {
        if is_platform {
            let root_segments = path_segments_vec(root);
            let url_segments = path_segments_vec(&normalized);
            let shares_prefix = url_segments.len() >= root_segments.len()
                && url_segments[..root_segments.len()] == root_segments[..];
            if !shares_prefix {
                return Classification::Bucketed { bucket: LinkBucket::External, url: normalized };
            }
        }
        Classification::Bucketed { bucket: LinkBucket::Internal, url: normalized }
    } else {
        Classification::Bucketed { bucket: LinkBucket::External, url: normalized }
    }
}

fn media_bucket(url: &Url) -> Option<LinkBucket> {
    let ext = url
        .path_segments()
        .and_then(|mut s| s.next_back())
        .and_then(|last| last.rsplit('.').next())
        .map(str::to_lowercase)?;

    if MEDIA_IMAGE_EXTS.contains(&ext.as_str()) {
        Some(LinkBucket::MediaImage)
    } else if MEDIA_VIDEO_EXTS.contains(&ext.as_str()) {
        Some(LinkBucket::MediaVideo)
    } else if MEDIA_DOC_EXTS.contains(&ext.as_str()) {
        Some(LinkBucket::MediaDocument)
    } else {
        None
    }
}

/// Convenience wrapper returning [`ImUrl`] for a normalized string, used by
/// the config builder to validate the target URL.
pub fn normalize_to_imurl(raw: &str) -> Result<ImUrl, ClassifyError> {
    let normalized = normalize_url(raw)?;
    ImUrl::parse(normalized.as_str()).map_err(|e| ClassifyError::InvalidUrl(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_is_idempotent() {
        let once = normalize_url("HTTPS://Example.com:443//a//b/").unwrap();
        let twice = normalize_parsed(once.clone()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn normalize_rejects_unsupported_scheme() {
        assert!(normalize_url("ftp://example.com").is_err());
    }

    #[test]
    fn trailing_slash_on_non_root_path_is_stripped() {
        let with_slash = normalize_url("https://h/a/b/").unwrap();
        let without_slash = normalize_url("https://h/a/b").unwrap();
        assert_eq!(with_slash, without_slash);
        assert_eq!(with_slash.path(), "/a/b");
    }

    #[test]
    fn root_path_trailing_slash_is_preserved() {
        let root = normalize_url("https://h/").unwrap();
        assert_eq!(root.path(), "/");
    }

    #[test]
    fn ancestor_paths_are_prefix_chain() {
        let target = Url::parse("https://h/a/b/c").unwrap();
        let ancestors = ancestor_paths(&target);
        assert_eq!(
            ancestors.iter().map(Url::as_str).collect::<Vec<_>>(),
            vec!["https://h/", "https://h/a/", "https://h/a/b/"]
        );
    }

    #[test]
    fn ancestor_paths_empty_for_root() {
        let target = Url::parse("https://h/").unwrap();
        assert!(ancestor_paths(&target).is_empty());
    }

    #[test]
    fn descendant_paths_orders_by_depth_then_lex() {
        let target = Url::parse("https://h/a").unwrap();
        let candidates = vec![
            Url::parse("https://h/a/z").unwrap(),
            Url::parse("https://h/a/b/c").unwrap(),
            Url::parse("https://h/a/b").unwrap(),
            Url::parse("https://h/other").unwrap(),
        ];
        let result = descendant_paths(&target, &candidates);
        assert_eq!(
            result.iter().map(|u| u.as_str()).collect::<Vec<_>>(),
            vec!["https://h/a/b", "https://h/a/z", "https://h/a/b/c"]
        );
    }

    #[test]
    fn classify_buckets_media_by_extension() {
        let base = Url::parse("https://h/page").unwrap();
        let root = Url::parse("https://h/").unwrap();
        match classify_link("/img/logo.PNG", &base, &root, false) {
            Classification::Bucketed { bucket, .. } => assert_eq!(bucket, LinkBucket::MediaImage),
            Classification::Skip { reason } => panic!("unexpected skip: {reason}"),
        }
    }

    #[test]
    fn classify_skips_javascript_links() {
        let base = Url::parse("https://h/page").unwrap();
        let root = Url::parse("https://h/").unwrap();
        matches!(classify_link("javascript:void(0)", &base, &root, false), Classification::Skip { .. });
    }

    #[test]
    fn classify_internal_vs_external() {
        let base = Url::parse("https://h/page").unwrap();
        let root = Url::parse("https://h/").unwrap();
        match classify_link("https://other.example/x", &base, &root, false) {
            Classification::Bucketed { bucket, .. } => assert_eq!(bucket, LinkBucket::External),
            Classification::Skip { reason } => panic!("unexpected skip: {reason}"),
        }
    }

    #[test]
    fn platform_mode_requires_path_prefix_for_internal() {
        let root = Url::parse("https://github.com/rust-lang/rust").unwrap();
        let base = Url::parse("https://github.com/rust-lang/rust/issues/1").unwrap();
        match classify_link("/other-org/other-repo", &base, &root, true) {
            Classification::Bucketed { bucket, .. } => assert_eq!(bucket, LinkBucket::External),
            Classification::Skip { reason } => panic!("unexpected skip: {reason}"),
        }
    }

    #[test]
    fn derive_root_url_base_domain() {
        let target = Url::parse("https://docs.example.com/a").unwrap();
        let root = derive_root_url(&target, false, false);
        assert_eq!(root.as_str(), "https://example.com/");
    }

    #[test]
    fn derive_root_url_multi_label_suffix() {
        let target = Url::parse("https://www.shop.co.uk/a").unwrap();
        let root = derive_root_url(&target, false, false);
        assert_eq!(root.as_str(), "https://shop.co.uk/");
    }

    #[test]
    fn derive_root_url_subdomain_as_root() {
        let target = Url::parse("https://docs.example.com/a").unwrap();
        let root = derive_root_url(&target, false, true);
        assert_eq!(root.as_str(), "https://docs.example.com/");
    }

    #[test]
    fn derive_root_url_platform_mode_keeps_target() {
        let target = Url::parse("https://github.com/rust-lang/rust").unwrap();
        let root = derive_root_url(&target, false, false);
        assert_eq!(root.as_str(), target.as_str());
    }
}
