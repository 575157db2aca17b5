//! Reference listing of published pages and the editor that produced them.

use std::fmt;

use crate::export::{ExportItem, extract_items};

/// Content shorter than this is reported as empty.
const MINIMAL_CONTENT_LEN: usize = 100;

/// Which editor (if any) a page body came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageBuilder {
    Elementor,
    Gutenberg,
    Empty,
    Html,
}

impl PageBuilder {
    pub fn detect(content: &str) -> Self {
        if content.contains("elementor") || content.contains("data-widget_type") {
            Self::Elementor
        } else if content.contains("<!-- wp:") {
            Self::Gutenberg
        } else if content.len() < MINIMAL_CONTENT_LEN {
            Self::Empty
        } else {
            Self::Html
        }
    }
}

impl fmt::Display for PageBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Elementor => "Elementor",
            Self::Gutenberg => "Gutenberg",
            Self::Empty => "Empty/Minimal",
            Self::Html => "HTML",
        };
        f.write_str(name)
    }
}

/// One line of the page inventory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSummary {
    pub id: u64,
    pub title: String,
    pub slug: String,
    pub content_len: usize,
    pub builder: PageBuilder,
}

impl From<&ExportItem> for PageSummary {
    fn from(item: &ExportItem) -> Self {
        Self {
            id: item.id,
            title: item.title.clone(),
            slug: item.slug.clone(),
            content_len: item.content.len(),
            builder: PageBuilder::detect(&item.content),
        }
    }
}

/// List published pages in the export. Nothing is written.
pub fn inventory_pages(xml: &str, status: &str) -> Vec<PageSummary> {
    extract_items(xml, "page", status)
        .iter()
        .map(PageSummary::from)
        .collect()
}
