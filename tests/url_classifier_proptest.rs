//! Property-based checks for `URLClassifier` invariants (spec.md §8),
//! generating arbitrary well-formed `http(s)` URLs with `proptest` instead of
//! enumerating fixed cases.

use proptest::prelude::*;
use url::Url;

use sitetree_crawler::url_classifier::{ancestor_paths, normalize_parsed, normalize_url};

fn host_strategy() -> impl Strategy<Value = String> {
    "[a-z]{2,8}\\.(com|org|dev)".prop_map(|s| s)
}

fn path_segment_strategy() -> impl Strategy<Value = String> {
    "[a-z]{1,6}"
}

fn arbitrary_url() -> impl Strategy<Value = String> {
    (
        prop_oneof![Just("http"), Just("https")],
        host_strategy(),
        prop::collection::vec(path_segment_strategy(), 0..4),
    )
        .prop_map(|(scheme, host, segments)| {
            if segments.is_empty() {
                format!("{scheme}://{host}")
            } else {
                format!("{scheme}://{host}/{}", segments.join("/"))
            }
        })
}

proptest! {
    /// `NormalizeURL(NormalizeURL(url)) == NormalizeURL(url)` for any
    /// well-formed http(s) URL (spec.md §8 idempotence invariant).
    #[test]
    fn normalize_url_is_idempotent_for_arbitrary_urls(raw in arbitrary_url()) {
        let once = normalize_url(&raw).expect("arbitrary URL should be valid http(s)");
        let twice = normalize_parsed(once.clone()).expect("already-normalized URL stays valid");
        prop_assert_eq!(once.as_str(), twice.as_str());
    }

    /// `AncestorPaths(target)` is a prefix chain where every entry is a
    /// proper path-prefix of `target` and no entry equals `target` itself.
    #[test]
    fn ancestor_paths_are_proper_prefixes_for_arbitrary_urls(raw in arbitrary_url()) {
        let target = Url::parse(&raw).expect("arbitrary URL parses");
        let ancestors = ancestor_paths(&target);

        for ancestor in &ancestors {
            prop_assert_ne!(ancestor.as_str(), target.as_str());
            prop_assert_eq!(ancestor.host_str(), target.host_str());
        }

        // Shallow-to-deep order: each ancestor's path is no longer than the next's.
        for window in ancestors.windows(2) {
            prop_assert!(window[0].path().len() <= window[1].path().len());
        }
    }
}
