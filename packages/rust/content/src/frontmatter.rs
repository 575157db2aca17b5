//! Content document synthesis: descriptive metadata plus front-matter rendering.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;

use sitemigrate_shared::{ContentConfig, FeaturedImage, Result, SiteMigrateError};

use crate::export::ExportItem;

/// Maximum description length in characters.
pub const DESCRIPTION_MAX: usize = 155;

/// Paragraphs this short (or shorter) are never used as the description.
const DESCRIPTION_MIN_PARAGRAPH: usize = 50;

/// Category value never carried into tags.
const RESERVED_CATEGORY: &str = "Uncategorized";

// ---------------------------------------------------------------------------
// ContentDocument
// ---------------------------------------------------------------------------

/// A complete content document: front-matter fields and Markdown body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentDocument {
    pub title: String,
    /// At most [`DESCRIPTION_MAX`] characters.
    pub description: String,
    pub pub_date: NaiveDate,
    pub author: String,
    pub image: Option<String>,
    pub image_alt: Option<String>,
    /// Deduplicated, in first-encounter order.
    pub tags: Vec<String>,
    pub draft: bool,
    pub body: String,
}

impl ContentDocument {
    /// Render the document as front-matter, a blank line, then the body.
    ///
    /// Keys always appear in the order title, description, pubDate, author,
    /// image, imageAlt, tags, draft. `image`/`imageAlt` are omitted when unset.
    pub fn render(&self) -> String {
        let mut out = String::from("---\n");
        out.push_str(&format!("title: \"{}\"\n", escape_yaml_string(&self.title)));
        out.push_str(&format!(
            "description: \"{}\"\n",
            escape_yaml_string(&self.description)
        ));
        out.push_str(&format!("pubDate: {}\n", self.pub_date.format("%Y-%m-%d")));
        out.push_str(&format!("author: \"{}\"\n", escape_yaml_string(&self.author)));
        if let Some(image) = &self.image {
            out.push_str(&format!("image: \"{}\"\n", escape_yaml_string(image)));
        }
        if let Some(alt) = &self.image_alt {
            out.push_str(&format!("imageAlt: \"{}\"\n", escape_yaml_string(alt)));
        }
        let tags: Vec<String> = self
            .tags
            .iter()
            .map(|t| format!("\"{}\"", escape_yaml_string(t)))
            .collect();
        out.push_str(&format!("tags: [{}]\n", tags.join(", ")));
        out.push_str(&format!("draft: {}\n", self.draft));
        out.push_str("---\n\n");
        out.push_str(&self.body);
        out.push('\n');
        out
    }
}

/// Escape special characters in a double-quoted YAML string value.
fn escape_yaml_string(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

// ---------------------------------------------------------------------------
// Featured image lookup
// ---------------------------------------------------------------------------

/// Slug to image lookup by longest matching prefix.
///
/// An exact slug is its own longest prefix, so exact entries always win over
/// shorter prefix entries.
#[derive(Debug, Clone, Default)]
pub struct ImageIndex {
    /// Sorted by key length, longest first.
    entries: Vec<(String, String)>,
}

impl ImageIndex {
    pub fn new(entries: &[FeaturedImage]) -> Self {
        let mut entries: Vec<(String, String)> = entries
            .iter()
            .map(|e| (e.slug.clone(), e.image.clone()))
            .collect();
        // Stable sort keeps definition order among equal-length keys.
        entries.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        Self { entries }
    }

    pub fn lookup(&self, slug: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| slug.starts_with(key.as_str()))
            .map(|(_, image)| image.as_str())
    }
}

// ---------------------------------------------------------------------------
// Field derivation
// ---------------------------------------------------------------------------

/// Pick a description from the first paragraph longer than 50 characters.
///
/// Markdown emphasis and link punctuation is stripped, whitespace runs are
/// folded to one space, and anything over 155 characters is cut to 152 plus
/// `...`. Returns `None` if no paragraph qualifies.
pub fn describe(body: &str) -> Option<String> {
    static LINK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"!?\[([^\]]*)\]\([^)]*\)").expect("valid regex"));
    static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

    let paragraph = body
        .split("\n\n")
        .map(str::trim)
        .find(|p| p.chars().count() > DESCRIPTION_MIN_PARAGRAPH)?;

    let unlinked = LINK_RE.replace_all(paragraph, "$1");
    let stripped: String = unlinked
        .chars()
        .filter(|c| !matches!(c, '#' | '*' | '[' | ']' | '(' | ')'))
        .collect();
    let clean = WS_RE.replace_all(stripped.trim(), " ").into_owned();

    if clean.chars().count() <= DESCRIPTION_MAX {
        return Some(clean);
    }
    let mut truncated: String = clean.chars().take(DESCRIPTION_MAX - 3).collect();
    truncated.push_str("...");
    Some(truncated)
}

/// Parse an export date and keep only the calendar date.
///
/// Accepts `YYYY-MM-DD HH:MM:SS` (the export's own format), RFC 3339,
/// RFC 2822, and a bare `YYYY-MM-DD`.
pub fn normalize_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.date());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.date_naive());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

/// Tags first, then categories, minus `Uncategorized`, deduplicated in
/// encounter order.
pub fn assemble_tags(item: &ExportItem) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    let candidates = item
        .tags
        .iter()
        .chain(item.categories.iter().filter(|c| *c != RESERVED_CATEGORY));
    for tag in candidates {
        if !tags.contains(tag) {
            tags.push(tag.clone());
        }
    }
    tags
}

// ---------------------------------------------------------------------------
// Synthesizer
// ---------------------------------------------------------------------------

/// Static inputs shared by every document of a migration run.
#[derive(Debug, Clone)]
pub struct DocumentSettings {
    pub author: String,
    /// `{title}` is replaced with the item title.
    pub fallback_description: String,
    pub images: ImageIndex,
}

impl From<&ContentConfig> for DocumentSettings {
    fn from(config: &ContentConfig) -> Self {
        Self {
            author: config.author.clone(),
            fallback_description: config.fallback_description.clone(),
            images: ImageIndex::new(&config.featured_images),
        }
    }
}

/// Build the content document for one item and its converted body.
///
/// Fails only when the publish date cannot be interpreted.
pub fn synthesize(
    item: &ExportItem,
    body: String,
    settings: &DocumentSettings,
) -> Result<ContentDocument> {
    let pub_date = normalize_date(&item.publish_date).ok_or_else(|| {
        SiteMigrateError::parse(format!(
            "unrecognised publish date {:?} on '{}'",
            item.publish_date, item.slug
        ))
    })?;

    let description = describe(&body).unwrap_or_else(|| {
        settings
            .fallback_description
            .replace("{title}", &item.title)
    });

    let image = settings.images.lookup(&item.slug).map(String::from);
    let image_alt = image.as_ref().map(|_| item.title.clone());

    Ok(ContentDocument {
        title: item.title.clone(),
        description,
        pub_date,
        author: settings.author.clone(),
        image,
        image_alt,
        tags: assemble_tags(item),
        draft: false,
        body,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
