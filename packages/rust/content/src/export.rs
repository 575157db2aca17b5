//! Item extraction from a CMS XML export.
//!
//! The export is scanned textually: each `<item>` block is matched on its own
//! and every field is pulled out with an independent pattern. A field that
//! fails to match falls back to a default, so a malformed item never aborts
//! the scan.

use std::sync::LazyLock;

use regex::Regex;

use crate::transduce::decode_entities;

/// Status requested when the caller does not specify one.
pub const DEFAULT_STATUS: &str = "publish";

/// One post/page record from the export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportItem {
    /// Item title (`"Untitled"` when missing).
    pub title: String,
    /// URL slug (empty when missing).
    pub slug: String,
    /// Publish date exactly as it appears in the export.
    pub publish_date: String,
    /// Numeric post id (`0` when missing).
    pub id: u64,
    /// Raw block markup of the body.
    pub content: String,
    /// Values of `<category domain="category">`, in document order.
    pub categories: Vec<String>,
    /// Values of `<category domain="post_tag">`, in document order.
    pub tags: Vec<String>,
}

static ITEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<item>(.*?)</item>").expect("valid regex"));

static TYPE_RE: LazyLock<Regex> = LazyLock::new(|| cdata_field("wp:post_type"));
static STATUS_RE: LazyLock<Regex> = LazyLock::new(|| cdata_field("wp:status"));
static TITLE_RE: LazyLock<Regex> = LazyLock::new(|| cdata_field("title"));
static SLUG_RE: LazyLock<Regex> = LazyLock::new(|| cdata_field("wp:post_name"));
static DATE_RE: LazyLock<Regex> = LazyLock::new(|| cdata_field("wp:post_date"));

static ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<wp:post_id>\s*(\d+)\s*</wp:post_id>").expect("valid regex")
});

static CONTENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<content:encoded>(?:<!\[CDATA\[)?(.*?)(?:\]\]>)?</content:encoded>")
        .expect("valid regex")
});

static CATEGORY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"<category\s+domain="(category|post_tag)"[^>]*>(?:<!\[CDATA\[)?(.*?)(?:\]\]>)?</category>"#,
    )
    .expect("valid regex")
});

/// Single-line `<tag>value</tag>` where the value may be CDATA-wrapped.
fn cdata_field(tag: &str) -> Regex {
    let tag = regex::escape(tag);
    Regex::new(&format!(r"<{tag}>(?:<!\[CDATA\[)?(.*?)(?:\]\]>)?</{tag}>")).expect("valid regex")
}

fn capture<'a>(re: &Regex, haystack: &'a str) -> Option<&'a str> {
    re.captures(haystack)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Extract every item whose post type and status both match exactly.
///
/// Items are returned in document order. Non-matching items are silently
/// excluded.
pub fn extract_items(xml: &str, post_type: &str, status: &str) -> Vec<ExportItem> {
    ITEM_RE
        .captures_iter(xml)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .filter(|item| {
            capture(&TYPE_RE, item) == Some(post_type) && capture(&STATUS_RE, item) == Some(status)
        })
        .map(parse_item)
        .collect()
}

fn parse_item(item: &str) -> ExportItem {
    let mut categories = Vec::new();
    let mut tags = Vec::new();
    for caps in CATEGORY_RE.captures_iter(item) {
        let value = decode_entities(&caps[2]);
        match &caps[1] {
            "category" => categories.push(value),
            _ => tags.push(value),
        }
    }

    ExportItem {
        title: capture(&TITLE_RE, item)
            .map(decode_entities)
            .unwrap_or_else(|| "Untitled".to_string()),
        slug: capture(&SLUG_RE, item).unwrap_or_default().to_string(),
        publish_date: capture(&DATE_RE, item).unwrap_or_default().to_string(),
        id: capture(&ID_RE, item)
            .and_then(|id| id.parse().ok())
            .unwrap_or(0),
        content: capture(&CONTENT_RE, item).unwrap_or_default().to_string(),
        categories,
        tags,
    }
}
