//! CMS export to Markdown content migration.
//!
//! This crate provides:
//! - [`export`]: item extraction from the XML export
//! - [`transduce`]: ordered block-markup to Markdown rewriting
//! - [`frontmatter`]: description/date/image/tag derivation and document rendering
//! - [`migrate`]: the end-to-end pipeline writing one document per slug
//! - [`inventory`]: a reference listing of published pages

pub mod export;
pub mod frontmatter;
pub mod inventory;
pub mod migrate;
pub mod transduce;

pub use export::{DEFAULT_STATUS, ExportItem, extract_items};
pub use frontmatter::{
    ContentDocument, DESCRIPTION_MAX, DocumentSettings, ImageIndex, assemble_tags, describe,
    normalize_date, synthesize,
};
pub use inventory::{PageBuilder, PageSummary, inventory_pages};
pub use migrate::{MigrateOptions, MigrationSummary, WrittenDocument, migrate_posts, read_export};
pub use transduce::{ENTITY_TABLE, decode_entities, decode_entities_with, to_markdown};

#[cfg(test)]
mod tests {
    use super::*;

    fn load_fixture(name: &str) -> String {
        let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../../../fixtures")
            .join(name);
        std::fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("missing fixture {}: {e}", path.display()))
    }

    #[test]
    fn fixture_item_counts() {
        let xml = load_fixture("export.xml");
        assert_eq!(extract_items(&xml, "post", DEFAULT_STATUS).len(), 3);
        assert_eq!(extract_items(&xml, "post", "draft").len(), 1);
        assert_eq!(extract_items(&xml, "attachment", "inherit").len(), 1);
    }

    #[test]
    fn fixture_page_inventory() {
        let xml = load_fixture("export.xml");
        let pages = inventory_pages(&xml, DEFAULT_STATUS);
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].title, "About Us");
        assert_eq!(pages[0].builder, PageBuilder::Elementor);
    }

    #[test]
    fn fixture_body_converts_cleanly() {
        let xml = load_fixture("export.xml");
        let items = extract_items(&xml, "post", DEFAULT_STATUS);
        let md = to_markdown(&items[0].content);

        assert!(md.starts_with("## What is NEPTS?"));
        assert!(md.contains("**hospital appointments**"));
        assert!(md.contains("[NHS guidance](https://www.nhs.uk/)"));
        assert!(md.ends_with("> Every journey matters."));
        assert!(!md.contains('<'));
    }
}
