//! End-to-end content migration: export file -> items -> Markdown -> documents.

use std::path::{Path, PathBuf};

use tracing::{info, instrument, warn};

use sitemigrate_shared::{ProgressReporter, Result, SiteMigrateError};

use crate::export::{ExportItem, extract_items};
use crate::frontmatter::{DocumentSettings, synthesize};
use crate::transduce::to_markdown;

/// Configuration for [`migrate_posts`].
#[derive(Debug, Clone)]
pub struct MigrateOptions {
    /// CMS XML export to read.
    pub export_xml: PathBuf,
    /// Directory receiving `<slug>.md` files.
    pub content_dir: PathBuf,
    /// Item type to migrate.
    pub post_type: String,
    /// Item status to migrate.
    pub status: String,
    /// Author, fallback description, featured images.
    pub settings: DocumentSettings,
}

/// One document written to disk.
#[derive(Debug, Clone)]
pub struct WrittenDocument {
    pub slug: String,
    pub path: PathBuf,
    /// Length of the Markdown body in bytes.
    pub body_len: usize,
}

/// Result of a migration run.
#[derive(Debug, Default)]
pub struct MigrationSummary {
    /// Items matching type and status.
    pub matched: usize,
    /// Documents written, in export order.
    pub written: Vec<WrittenDocument>,
    /// Items that could not be turned into a document: (slug, reason).
    pub failed: Vec<(String, String)>,
}

/// Read the export and write one content document per matching item.
///
/// Only an unreadable export or an uncreatable output directory aborts the
/// run; per-item failures are logged and collected in the summary. Items
/// sharing a slug overwrite each other, last one wins.
#[instrument(skip_all, fields(export = %opts.export_xml.display()))]
pub fn migrate_posts(
    opts: &MigrateOptions,
    progress: &dyn ProgressReporter,
) -> Result<MigrationSummary> {
    progress.phase("Reading export");
    let xml = read_export(&opts.export_xml)?;

    progress.phase("Extracting items");
    let items = extract_items(&xml, &opts.post_type, &opts.status);
    info!(
        count = items.len(),
        post_type = %opts.post_type,
        status = %opts.status,
        "extracted items"
    );

    std::fs::create_dir_all(&opts.content_dir)
        .map_err(|e| SiteMigrateError::io(&opts.content_dir, e))?;

    let mut summary = MigrationSummary {
        matched: items.len(),
        ..Default::default()
    };

    progress.phase("Writing documents");
    let total = items.len();
    for (i, item) in items.iter().enumerate() {
        progress.item(&item.slug, i + 1, total);
        match write_document(item, opts) {
            Ok(written) => {
                info!(slug = %written.slug, chars = written.body_len, "wrote document");
                summary.written.push(written);
            }
            Err(e) => {
                warn!(slug = %item.slug, error = %e, "skipping item");
                summary.failed.push((item.slug.clone(), e.to_string()));
            }
        }
    }

    progress.finish();
    info!(
        written = summary.written.len(),
        failed = summary.failed.len(),
        dir = %opts.content_dir.display(),
        "migration completed"
    );

    Ok(summary)
}

/// Read the export file as UTF-8.
pub fn read_export(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| SiteMigrateError::io(path, e))
}

fn write_document(item: &ExportItem, opts: &MigrateOptions) -> Result<WrittenDocument> {
    if item.slug.is_empty() {
        return Err(SiteMigrateError::validation(format!(
            "item {} ('{}') has no slug",
            item.id, item.title
        )));
    }
    if !is_plain_slug(&item.slug) {
        return Err(SiteMigrateError::validation(format!(
            "item {} has slug '{}' with path components",
            item.id, item.slug
        )));
    }

    let body = to_markdown(&item.content);
    let doc = synthesize(item, body, &opts.settings)?;

    let path = opts.content_dir.join(format!("{}.md", item.slug));
    std::fs::write(&path, doc.render()).map_err(|e| SiteMigrateError::io(&path, e))?;

    Ok(WrittenDocument {
        slug: item.slug.clone(),
        path,
        body_len: doc.body.len(),
    })
}

/// A slug must name a single file inside the content directory.
fn is_plain_slug(slug: &str) -> bool {
    !slug.contains(['/', '\\']) && slug != "." && slug != ".."
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitemigrate_shared::{ContentConfig, SilentProgress};

    fn fixture_path(name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../../../fixtures")
            .join(name)
    }

    fn options(export_xml: PathBuf, content_dir: PathBuf) -> MigrateOptions {
        MigrateOptions {
            export_xml,
            content_dir,
            post_type: "post".into(),
            status: "publish".into(),
            settings: DocumentSettings::from(&ContentConfig::default()),
        }
    }

    #[test]
    fn migrates_fixture_export() {
        let out = tempfile::tempdir().unwrap();
        let opts = options(fixture_path("export.xml"), out.path().join("blog"));

        let summary = migrate_posts(&opts, &SilentProgress).unwrap();

        assert_eq!(summary.matched, 3);
        assert_eq!(summary.written.len(), 2);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].0, "undated-post");

        let doc = std::fs::read_to_string(out.path().join("blog/understanding-nepts.md")).unwrap();
        assert!(doc.starts_with("---\ntitle: \"Understanding NEPTS & Patient Transport\"\n"));
        assert!(doc.contains("pubDate: 2024-03-12\n"));
        assert!(doc.contains("image: \"../assets/images/blog/nepts-guide.webp\"\n"));
        assert!(doc.contains("tags: [\"NHS\", \"Transport\"]\n"));
        assert!(doc.contains("\n---\n\n## What is NEPTS?\n\n"));
        assert!(doc.contains("1. Eligibility\n2. Booking\n"));
        assert!(!doc.contains("<!--"));

        let other = std::fs::read_to_string(out.path().join("blog/fleet-update.md")).unwrap();
        assert!(!other.contains("image:"));
        assert!(other.contains("description: \"Fleet update — AFJ Limited blog post"));
    }

    #[test]
    fn missing_export_is_an_error() {
        let out = tempfile::tempdir().unwrap();
        let opts = options(out.path().join("missing.xml"), out.path().join("blog"));
        let result = migrate_posts(&opts, &SilentProgress);
        assert!(matches!(result, Err(SiteMigrateError::Io { .. })));
    }

    #[test]
    fn slugs_with_path_components_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let xml_path = dir.path().join("escape.xml");
        let item = |slug: &str| {
            format!(
                "<item><title>T</title>\
                 <wp:post_name><![CDATA[{slug}]]></wp:post_name>\
                 <wp:post_date><![CDATA[2024-01-01 00:00:00]]></wp:post_date>\
                 <wp:status><![CDATA[publish]]></wp:status>\
                 <wp:post_type><![CDATA[post]]></wp:post_type>\
                 <content:encoded><![CDATA[<p>x</p>]]></content:encoded></item>"
            )
        };
        let xml: String = ["../escaped", "nested/inner", "back\\slash", "..", "fine"]
            .into_iter()
            .map(item)
            .collect();
        std::fs::write(&xml_path, xml).unwrap();

        let opts = options(xml_path, dir.path().join("out/blog"));
        let summary = migrate_posts(&opts, &SilentProgress).unwrap();

        assert_eq!(summary.written.len(), 1);
        assert_eq!(summary.written[0].slug, "fine");
        let failed: Vec<&str> = summary.failed.iter().map(|(s, _)| s.as_str()).collect();
        assert_eq!(failed, ["../escaped", "nested/inner", "back\\slash", ".."]);
        assert!(!dir.path().join("out/escaped.md").exists());
        assert!(!dir.path().join("out/blog/nested").exists());
    }

    #[test]
    fn later_item_with_same_slug_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let xml_path = dir.path().join("dupe.xml");
        let item = |title: &str| {
            format!(
                "<item><title>{title}</title>\
                 <wp:post_name><![CDATA[same]]></wp:post_name>\
                 <wp:post_date><![CDATA[2024-01-01 00:00:00]]></wp:post_date>\
                 <wp:status><![CDATA[publish]]></wp:status>\
                 <wp:post_type><![CDATA[post]]></wp:post_type>\
                 <content:encoded><![CDATA[<p>{title}</p>]]></content:encoded></item>"
            )
        };
        std::fs::write(&xml_path, format!("{}{}", item("First"), item("Second"))).unwrap();

        let opts = options(xml_path, dir.path().join("out"));
        let summary = migrate_posts(&opts, &SilentProgress).unwrap();
        assert_eq!(summary.written.len(), 2);

        let doc = std::fs::read_to_string(dir.path().join("out/same.md")).unwrap();
        assert!(doc.contains("title: \"Second\""));
    }
}
