//! `MetadataExtractor` (SPEC_FULL.md component 10): pulls title, description,
//! keywords, author, dates, language, canonical URL, and `robots` directives
//! out of raw HTML.
//!
//! The field set is carried over from the teacher's `page_extractor::schema::PageMetadata`
//! (itself populated via CDP `page.evaluate`), re-extracted here with
//! `scraper` since this crate's `Fetcher` contract hands over an HTML string
//! rather than a live `Page`.

use std::collections::HashMap;

use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metadata {
    pub title: Option<String>,
    pub description: Option<String>,
    pub keywords: Option<Vec<String>>,
    pub author: Option<String>,
    pub published_date: Option<String>,
    pub modified_date: Option<String>,
    pub language: Option<String>,
    pub canonical_url: Option<String>,
    pub robots: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,
}

fn sel(css: &str) -> Selector {
    Selector::parse(css).expect("static selector is valid CSS")
}

fn meta_content(document: &Html, name: &str) -> Option<String> {
    let name_sel = sel(&format!(r#"meta[name="{name}" i]"#));
    document
        .select(&name_sel)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn meta_property(document: &Html, property: &str) -> Option<String> {
    let prop_sel = sel(&format!(r#"meta[property="{property}" i]"#));
    document
        .select(&prop_sel)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// `ExtractMetadata(html, headers) -> Metadata`, never fails — missing fields
/// are simply absent (spec §7: "metadata extraction failures: metadata
/// becomes absent", handled one field at a time here rather than all-or-nothing).
#[must_use]
pub fn extract_metadata(html: &str, response_headers: &HashMap<String, String>) -> Metadata {
    let document = Html::parse_document(html);

    let title = document
        .select(&sel("title"))
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| meta_property(&document, "og:title"));

    let description = meta_content(&document, "description").or_else(|| meta_property(&document, "og:description"));

    let keywords = meta_content(&document, "keywords").map(|raw| {
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    });

    let author = meta_content(&document, "author");
    let published_date = meta_property(&document, "article:published_time");
    let modified_date = meta_property(&document, "article:modified_time");

    let language = document
        .select(&sel("html"))
        .next()
        .and_then(|el| el.value().attr("lang"))
        .map(str::to_string);

    let canonical_url = document
        .select(&sel(r#"link[rel="canonical"]"#))
        .next()
        .and_then(|el| el.value().attr("href"))
        .map(str::to_string);

    let robots = meta_content(&document, "robots");

    let interesting_headers = ["content-type", "x-frame-options", "content-security-policy"];
    let headers = response_headers
        .iter()
        .filter(|(k, _)| interesting_headers.contains(&k.to_lowercase().as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    Metadata {
        title,
        description,
        keywords,
        author,
        published_date,
        modified_date,
        language,
        canonical_url,
        robots,
        headers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_standard_fields() {
        let html = r#"
            <html lang="en">
            <head>
                <title>Example Page</title>
                <meta name="description" content="A description.">
                <meta name="keywords" content="rust, crawling, links">
                <meta name="author" content="Jane Doe">
                <meta name="robots" content="index,follow">
                <link rel="canonical" href="https://example.com/canonical">
            </head>
            <body></body>
            </html>
        "#;
        let headers = HashMap::new();
        let metadata = extract_metadata(html, &headers);
        assert_eq!(metadata.title.as_deref(), Some("Example Page"));
        assert_eq!(metadata.description.as_deref(), Some("A description."));
        assert_eq!(metadata.keywords, Some(vec!["rust".into(), "crawling".into(), "links".into()]));
        assert_eq!(metadata.author.as_deref(), Some("Jane Doe"));
        assert_eq!(metadata.language.as_deref(), Some("en"));
        assert_eq!(metadata.canonical_url.as_deref(), Some("https://example.com/canonical"));
        assert_eq!(metadata.robots.as_deref(), Some("index,follow"));
    }

    #[test]
    fn falls_back_to_open_graph_title() {
        let html = r#"<html><head><meta property="og:title" content="OG Title"></head></html>"#;
        let metadata = extract_metadata(html, &HashMap::new());
        assert_eq!(metadata.title.as_deref(), Some("OG Title"));
    }

    #[test]
    fn missing_fields_are_absent_not_fatal() {
        let metadata = extract_metadata("<html></html>", &HashMap::new());
        assert!(metadata.title.is_none());
        assert!(metadata.description.is_none());
    }

    #[test]
    fn headers_filtered_to_interesting_set() {
        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), "text/html".to_string());
        headers.insert("set-cookie".to_string(), "secret".to_string());
        let metadata = extract_metadata("<html></html>", &headers);
        assert_eq!(metadata.headers.get("content-type").map(String::as_str), Some("text/html"));
        assert!(!metadata.headers.contains_key("set-cookie"));
    }
}
