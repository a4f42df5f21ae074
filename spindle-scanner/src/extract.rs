//! Reference extraction from HTML bodies.
//!
//! Bodies go through a full HTML5 tree builder rather than a bare start-tag
//! scan, so the parser's repairs apply: `<image>` is rewritten to `<img>`
//! and a repeated attribute keeps only its first value.

use scraper::Html;
use std::collections::BTreeSet;

/// Tags whose references are collected.
const REFERENCE_TAGS: [&str; 4] = ["a", "link", "img", "script"];
/// Attributes read on those tags.
const REFERENCE_ATTRIBUTES: [&str; 2] = ["href", "src"];

/// References found on a single page, deduplicated within that page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    /// Followable references (no file extension).
    pub links: BTreeSet<String>,
    /// Static resources (final path segment has a `.`).
    pub assets: BTreeSet<String>,
}

/// Parses `body` as HTML and partitions every `href`/`src` of `a`, `link`,
/// `img` and `script` elements into links and assets.
pub fn extract(body: &str) -> Page {
    let document = Html::parse_document(body);
    let mut page = Page::default();

    for element in document.tree.values().filter_map(|node| node.as_element()) {
        if !REFERENCE_TAGS.contains(&element.name()) {
            continue;
        }

        for (name, value) in element.attrs() {
            if !REFERENCE_ATTRIBUTES.contains(&name) {
                continue;
            }

            let candidate = strip_fragment(value);
            if candidate.trim().is_empty() {
                continue;
            }

            if is_static_asset(candidate) {
                page.assets.insert(candidate.to_string());
            } else {
                page.links.insert(candidate.to_string());
            }
        }
    }

    page
}

/// Drops the first `#` and everything after it.
pub fn strip_fragment(reference: &str) -> &str {
    match reference.find('#') {
        Some(end) => &reference[..end],
        None => reference,
    }
}

/// Extension heuristic on the raw reference: a `.` anywhere after the last
/// `/` makes it an asset. Dotted directory names (`/v1.2`) and bare hosts
/// without a trailing slash (`http://other.com`) classify as assets too.
pub fn is_static_asset(reference: &str) -> bool {
    reference
        .rsplit('/')
        .next()
        .is_some_and(|segment| segment.contains('.'))
}
