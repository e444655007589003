//! Property-flavored checks for `URLClassifier` invariants (spec.md §8).

use pretty_assertions::assert_eq;
use url::Url;

use sitetree_crawler::error::LinksError;

#[test]
fn normalize_url_is_idempotent() {
    let cases = [
        "HTTPS://Example.COM:443/a//b/",
        "http://example.com:80/Foo%2fbar",
        "https://example.com/a/b/../c",
        "https://example.com",
    ];
    for raw in cases {
        let Ok(once) = sitetree_crawler::url_classifier::normalize_url(raw) else { continue };
        let twice = sitetree_crawler::url_classifier::normalize_parsed(once.clone()).unwrap();
        assert_eq!(once.as_str(), twice.as_str(), "not idempotent for {raw}");
    }
}

#[test]
fn normalize_url_rejects_unsupported_schemes() {
    let err = sitetree_crawler::url_classifier::normalize_url("ftp://example.com/a");
    assert!(err.is_err());
}

#[test]
fn ancestor_paths_are_a_prefix_chain_ending_before_target() {
    let target = Url::parse("https://h.example/a/b/c").unwrap();
    let ancestors = sitetree_crawler::url_classifier::ancestor_paths(&target);
    assert_eq!(
        ancestors.iter().map(Url::to_string).collect::<Vec<_>>(),
        vec!["https://h.example/".to_string(), "https://h.example/a/".to_string(), "https://h.example/a/b/".to_string()]
    );
    for ancestor in &ancestors {
        assert!(target.as_str().starts_with(ancestor.path()) || ancestor.path() == "/");
        assert_ne!(ancestor.as_str(), target.as_str());
    }
}

#[test]
fn bare_origin_has_no_ancestors() {
    let target = Url::parse("https://h.example/").unwrap();
    assert!(sitetree_crawler::url_classifier::ancestor_paths(&target).is_empty());
}

#[test]
fn descendant_paths_orders_by_depth_then_lexicographic() {
    let target = Url::parse("https://h.example/a").unwrap();
    let candidates = vec![
        Url::parse("https://h.example/a/z/1").unwrap(),
        Url::parse("https://h.example/a/b").unwrap(),
        Url::parse("https://h.example/a/a").unwrap(),
        Url::parse("https://other.example/a/x").unwrap(),
        Url::parse("https://h.example/a").unwrap(),
    ];
    let descendants = sitetree_crawler::url_classifier::descendant_paths(&target, &candidates);
    let strs: Vec<_> = descendants.iter().map(|u| u.as_str()).collect();
    assert_eq!(
        strs,
        vec!["https://h.example/a/a", "https://h.example/a/b", "https://h.example/a/z/1"]
    );
}

#[test]
fn classify_link_never_panics_on_malformed_hrefs() {
    let base = Url::parse("https://h.example/page").unwrap();
    let root = Url::parse("https://h.example/").unwrap();
    let inputs = ["", "   ", "javascript:alert(1)", "mailto:a@b.com", "tel:+123", "://broken", "#frag-only"];
    for href in inputs {
        match sitetree_crawler::url_classifier::classify_link(href, &base, &root, false) {
            sitetree_crawler::url_classifier::Classification::Skip { reason } => assert!(!reason.is_empty()),
            sitetree_crawler::url_classifier::Classification::Bucketed { .. } => {}
        }
    }
}

#[test]
fn media_extensions_classify_into_dedicated_buckets() {
    use sitetree_crawler::url_classifier::{classify_link, Classification, LinkBucket};

    let base = Url::parse("https://h.example/page").unwrap();
    let root = Url::parse("https://h.example/").unwrap();

    let cases = [
        ("/photo.JPG", LinkBucket::MediaImage),
        ("/clip.mp4", LinkBucket::MediaVideo),
        ("/report.pdf", LinkBucket::MediaDocument),
    ];
    for (href, expected) in cases {
        match classify_link(href, &base, &root, false) {
            Classification::Bucketed { bucket, .. } => assert_eq!(bucket, expected, "for {href}"),
            Classification::Skip { reason } => panic!("unexpected skip for {href}: {reason}"),
        }
    }
}

#[test]
fn derive_root_url_platform_mode_roots_at_target() {
    let target = Url::parse("https://github.com/alice/repo").unwrap();
    let root = sitetree_crawler::url_classifier::derive_root_url(&target, false, false);
    assert_eq!(root.as_str(), target.as_str());
}

#[test]
fn derive_root_url_subdomain_flag_roots_at_origin() {
    let target = Url::parse("https://blog.example.com/post").unwrap();
    let root = sitetree_crawler::url_classifier::derive_root_url(&target, false, true);
    assert_eq!(root.as_str(), "https://blog.example.com/");
}

#[test]
fn derive_root_url_default_mode_roots_at_base_domain() {
    let target = Url::parse("https://blog.example.com/post").unwrap();
    let root = sitetree_crawler::url_classifier::derive_root_url(&target, false, false);
    assert_eq!(root.as_str(), "https://example.com/");
}

#[test]
fn invalid_url_error_is_the_links_error_variant() {
    let err = sitetree_crawler::url_classifier::normalize_to_imurl("not a url");
    assert!(err.is_err());
    match err {
        Err(e) => assert!(!e.to_string().is_empty()),
        Ok(_) => panic!("expected failure"),
    }
}

#[test]
fn links_error_invalid_url_variant_exists() {
    let e = LinksError::InvalidUrl("bad input".to_string());
    assert!(e.to_string().contains("bad input"));
}
