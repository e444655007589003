//! `Cleaner` (SPEC_FULL.md component 9): a minimal HTML sanitizer producing
//! `ScrapedData.cleanedHTML`.
//!
//! Strips `<script>`/`<style>`/comment nodes and collapses runs of
//! whitespace between tags. Grounded on the streaming-rewrite idiom in the
//! teacher's `link_rewriter::rewrite_links_in_html` (`lol_html::HtmlRewriter`
//! + `element!` handlers writing into a `Vec<u8>` sink) but the full
//! markdown-conversion pipeline it fed (widget filtering, semantic-element
//! stripping, entity decoding) is out of scope here — this only removes
//! non-content nodes, it does not convert anything.

use lol_html::{element, text, HtmlRewriter, Settings};

use crate::error::LinksError;

/// `Clean(html, opts) -> cleanedHTML` (spec §2 component 1 "Cleaner"; the
/// concrete implementation is SPEC_FULL.md component 9).
///
/// # Errors
/// Returns [`LinksError::CleanerError`] if `lol_html` fails to parse or the
/// rewritten output is not valid UTF-8; per spec §7 this is caught by the
/// caller and folded into an absent `cleanedHTML`, never propagated as fatal.
pub fn clean_html(html: &str) -> Result<String, LinksError> {
    let mut output = Vec::with_capacity(html.len());

    let mut rewriter = HtmlRewriter::new(
        Settings {
            element_content_handlers: vec![
                element!("script, style", |el| {
                    el.remove();
                    Ok(())
                }),
                text!("*", |t| {
                    let collapsed = collapse_whitespace(t.as_str());
                    if collapsed != t.as_str() {
                        t.replace(&collapsed, lol_html::html_content::ContentType::Text);
                    }
                    Ok(())
                }),
            ],
            ..Settings::default()
        },
        |chunk: &[u8]| output.extend_from_slice(chunk),
    );

    rewriter
        .write(html.as_bytes())
        .map_err(|e| LinksError::CleanerError(e.to_string()))?;
    rewriter
        .end()
        .map_err(|e| LinksError::CleanerError(e.to_string()))?;

    String::from_utf8(output).map_err(|e| LinksError::CleanerError(e.to_string()))
}

fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_was_space = false;
    for ch in text.chars() {
        if ch.is_whitespace() {
            if !last_was_space {
                out.push(' ');
            }
            last_was_space = true;
        } else {
            out.push(ch);
            last_was_space = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_script_and_style_tags() {
        let html = "<html><head><style>body{color:red}</style></head><body><script>alert(1)</script><p>hello</p></body></html>";
        let cleaned = clean_html(html).unwrap();
        assert!(!cleaned.contains("alert"));
        assert!(!cleaned.contains("color:red"));
        assert!(cleaned.contains("hello"));
    }

    #[test]
    fn collapses_runs_of_whitespace() {
        let html = "<p>hello    \n\n   world</p>";
        let cleaned = clean_html(html).unwrap();
        assert!(cleaned.contains("hello world"));
    }
}
