//! Media listing CSV reader and filename classification.
//!
//! Classification and skip evaluation are both ordered, first-match lookups
//! over rule tables built once from configuration. A filename is never given
//! more than one folder and never re-evaluated.

use std::collections::HashMap;
use std::path::Path;

use regex::{Regex, RegexBuilder};

use sitemigrate_shared::{MediaConfig, RenameEntry, Result, SiteMigrateError};

/// Folder used when no classification rule matches.
pub const FALLBACK_FOLDER: &str = "misc";

/// Destination folders created under the assets root before retrieval.
pub const MEDIA_FOLDERS: &[&str] = &[
    "logo",
    "hero",
    "fleet",
    "team",
    "services",
    "accreditations",
    "blog",
    "about",
    "icons",
    "misc",
];

const URL_COLUMN: &str = "URL";
const FILENAME_COLUMN: &str = "File Name";
const TYPE_COLUMN: &str = "Type";

// ---------------------------------------------------------------------------
// CSV input
// ---------------------------------------------------------------------------

/// One row of the media listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRecord {
    pub url: String,
    pub filename: String,
    /// Declared MIME type (may be empty).
    pub media_type: String,
}

/// Split one CSV line into fields.
///
/// Double-quoted fields may contain commas; `""` inside quotes is a literal
/// quote. Quoted fields spanning lines are not supported.
pub fn parse_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    fields.push(current);
    fields
}

/// Parse a header row plus data rows into column-name keyed maps.
///
/// Header names are trimmed and a leading byte-order mark is removed. Blank
/// lines are ignored; short rows get empty values for missing columns.
pub fn parse_csv(text: &str) -> Vec<HashMap<String, String>> {
    let mut lines = text.lines();
    let Some(header_line) = lines.next() else {
        return Vec::new();
    };
    let headers: Vec<String> = parse_csv_line(header_line)
        .iter()
        .map(|h| h.trim().trim_start_matches('\u{feff}').to_string())
        .collect();

    lines
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            let values = parse_csv_line(line);
            headers
                .iter()
                .enumerate()
                .map(|(i, h)| {
                    let value = values.get(i).map(|v| v.trim()).unwrap_or_default();
                    (h.clone(), value.to_string())
                })
                .collect()
        })
        .collect()
}

/// Read media records from CSV text. Fails if a required column is missing.
pub fn read_records(text: &str) -> Result<Vec<MediaRecord>> {
    let header = text.lines().next().unwrap_or_default();
    let headers: Vec<String> = parse_csv_line(header)
        .iter()
        .map(|h| h.trim().trim_start_matches('\u{feff}').to_string())
        .collect();
    for required in [URL_COLUMN, FILENAME_COLUMN] {
        if !headers.iter().any(|h| h == required) {
            return Err(SiteMigrateError::parse(format!(
                "media CSV is missing the '{required}' column"
            )));
        }
    }

    Ok(parse_csv(text)
        .into_iter()
        .map(|mut row| MediaRecord {
            url: row.remove(URL_COLUMN).unwrap_or_default(),
            filename: row.remove(FILENAME_COLUMN).unwrap_or_default(),
            media_type: row.remove(TYPE_COLUMN).unwrap_or_default(),
        })
        .collect())
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// An ordered `(pattern, folder)` pair.
#[derive(Debug, Clone)]
pub struct ClassificationRule {
    pub pattern: Regex,
    pub folder: String,
}

/// Why a record will not be retrieved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exclusion {
    /// URL or filename absent.
    MissingField,
    /// A PDF that is not in the rename table.
    UnlistedDocument,
    /// Office documents and other non-media types.
    UnsupportedType,
    /// Filename matched a skip pattern.
    SkipPattern,
    /// Filename would escape its destination folder.
    UnsafeFilename,
}

/// Classification outcome for one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Excluded(Exclusion),
    /// Retrieve into the documents folder under `target`.
    Document { filename: String, target: String },
    /// Retrieve into `<assets>/<folder>/<filename>`.
    Asset { folder: String, filename: String },
}

/// Compiled rule tables for one run.
#[derive(Debug, Clone)]
pub struct Catalog {
    rules: Vec<ClassificationRule>,
    skip: Vec<Regex>,
    documents: Vec<RenameEntry>,
}

fn compile(pattern: &str) -> Result<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| SiteMigrateError::config(format!("invalid pattern '{pattern}': {e}")))
}

impl Catalog {
    /// Compile the configured tables. Any invalid pattern fails the whole build.
    pub fn from_config(config: &MediaConfig) -> Result<Self> {
        let rules = config
            .rules
            .iter()
            .map(|r| {
                Ok(ClassificationRule {
                    pattern: compile(&r.pattern)?,
                    folder: r.folder.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let skip = config
            .skip_patterns
            .iter()
            .map(|p| compile(p))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            rules,
            skip,
            documents: config.documents.clone(),
        })
    }

    /// First matching rule's folder, or [`FALLBACK_FOLDER`].
    pub fn folder_for(&self, filename: &str) -> &str {
        self.rules
            .iter()
            .find(|rule| rule.pattern.is_match(filename))
            .map(|rule| rule.folder.as_str())
            .unwrap_or(FALLBACK_FOLDER)
    }

    pub fn is_skipped(&self, filename: &str) -> bool {
        self.skip.iter().any(|p| p.is_match(filename))
    }

    /// New name for a PDF, if it is in the rename table.
    pub fn document_target(&self, filename: &str) -> Option<&str> {
        self.documents
            .iter()
            .find(|d| d.source == filename)
            .map(|d| d.target.as_str())
    }

    /// Decide what to do with one record. Each step is terminal.
    pub fn classify(&self, record: &MediaRecord) -> Verdict {
        if record.url.is_empty() || record.filename.is_empty() {
            return Verdict::Excluded(Exclusion::MissingField);
        }
        if !is_plain_filename(&record.filename) {
            return Verdict::Excluded(Exclusion::UnsafeFilename);
        }

        if is_pdf(record) {
            return match self.document_target(&record.filename) {
                Some(target) => Verdict::Document {
                    filename: record.filename.clone(),
                    target: target.to_string(),
                },
                None => Verdict::Excluded(Exclusion::UnlistedDocument),
            };
        }

        if record.media_type.contains("document") || record.media_type.contains("officedocument")
        {
            return Verdict::Excluded(Exclusion::UnsupportedType);
        }

        if self.is_skipped(&record.filename) {
            return Verdict::Excluded(Exclusion::SkipPattern);
        }

        Verdict::Asset {
            folder: self.folder_for(&record.filename).to_string(),
            filename: record.filename.clone(),
        }
    }
}

fn is_pdf(record: &MediaRecord) -> bool {
    record.media_type.contains("pdf")
        || Path::new(&record.filename)
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

fn is_plain_filename(name: &str) -> bool {
    !name.contains(['/', '\\']) && name != "." && name != ".."
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        Catalog::from_config(&MediaConfig::default()).expect("default rules compile")
    }

    fn record(filename: &str, media_type: &str) -> MediaRecord {
        MediaRecord {
            url: format!("https://example.com/uploads/{filename}"),
            filename: filename.into(),
            media_type: media_type.into(),
        }
    }

    fn folder_of(filename: &str) -> String {
        match catalog().classify(&record(filename, "image/png")) {
            Verdict::Asset { folder, .. } => folder,
            other => panic!("expected asset verdict for {filename}, got {other:?}"),
        }
    }

    #[test]
    fn csv_line_with_quotes_and_commas() {
        let fields = parse_csv_line(r#"a,"b, c","say ""hi""",,d"#);
        assert_eq!(fields, ["a", "b, c", "say \"hi\"", "", "d"]);
    }

    #[test]
    fn csv_strips_bom_and_trims() {
        let text = "\u{feff}URL , File Name,Type\r\n https://x/a.png ,a.png,image/png\r\n\r\n";
        let rows = parse_csv(text);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["URL"], "https://x/a.png");
        assert_eq!(rows[0]["File Name"], "a.png");
        assert_eq!(rows[0]["Type"], "image/png");
    }

    #[test]
    fn csv_short_rows_get_empty_values() {
        let rows = parse_csv("URL,File Name,Type\nhttps://x/a.png\n");
        assert_eq!(rows[0]["File Name"], "");
        assert_eq!(rows[0]["Type"], "");
    }

    #[test]
    fn read_records_requires_columns() {
        assert!(read_records("Link,Name\nx,y\n").is_err());
        let records = read_records("URL,File Name\nhttps://x/a.png,a.png\n").unwrap();
        assert_eq!(records[0].media_type, "");
    }

    #[test]
    fn classification_examples() {
        assert_eq!(folder_of("afj-logo-2024.png"), "logo");
        assert_eq!(folder_of("homeToSchool.jpg"), "hero");
        assert_eq!(folder_of("CQC-badge.png"), "accreditations");
        assert_eq!(folder_of("Mission.png"), "about");
        assert_eq!(folder_of("IMG_0062.jpg"), "team");
        assert_eq!(folder_of("IMG_4420.jpg"), "fleet");
        assert_eq!(folder_of("Maintenance-bay.jpg"), "services");
        assert_eq!(folder_of("arrow.svg"), "icons");
        assert_eq!(folder_of("Greener-Roads.webp"), "blog");
        assert_eq!(folder_of("completely-unknown.png"), FALLBACK_FOLDER);
    }

    #[test]
    fn classification_is_case_insensitive_and_first_match() {
        assert_eq!(folder_of("LOGO.svg"), "logo");
        assert_eq!(folder_of("cqc.svg"), "accreditations");
    }

    #[test]
    fn skip_patterns_exclude_before_classification() {
        let c = catalog();
        for name in [
            "tube-spinner.svg",
            "1.svg",
            "2.svg",
            "A-Safe-Reliable-Fleet-1.svg",
            "www.afjltd.co_.uk-hero.svg",
        ] {
            assert_eq!(
                c.classify(&record(name, "image/svg+xml")),
                Verdict::Excluded(Exclusion::SkipPattern),
                "{name}"
            );
        }
        assert!(matches!(
            c.classify(&record("12.svg", "image/svg+xml")),
            Verdict::Asset { .. }
        ));
    }

    #[test]
    fn pdf_handling() {
        let c = catalog();
        assert_eq!(
            c.classify(&record("HTS-2.pdf", "application/pdf")),
            Verdict::Document {
                filename: "HTS-2.pdf".into(),
                target: "afj-brochure.pdf".into(),
            }
        );
        assert_eq!(
            c.classify(&record("AFJ_Carbon_Reduction_Plan.pdf", "")),
            Verdict::Document {
                filename: "AFJ_Carbon_Reduction_Plan.pdf".into(),
                target: "carbon-reduction-plan.pdf".into(),
            }
        );
        assert_eq!(
            c.classify(&record("Other.pdf", "application/pdf")),
            Verdict::Excluded(Exclusion::UnlistedDocument)
        );
    }

    #[test]
    fn office_documents_excluded() {
        let c = catalog();
        let docx = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
        assert_eq!(
            c.classify(&record("Policy.docx", docx)),
            Verdict::Excluded(Exclusion::UnsupportedType)
        );
        assert_eq!(
            c.classify(&record("Notes.doc", "application/msword-document")),
            Verdict::Excluded(Exclusion::UnsupportedType)
        );
    }

    #[test]
    fn missing_fields_and_unsafe_names() {
        let c = catalog();
        let mut no_url = record("a.png", "image/png");
        no_url.url.clear();
        assert_eq!(c.classify(&no_url), Verdict::Excluded(Exclusion::MissingField));

        let mut no_name = record("a.png", "image/png");
        no_name.filename.clear();
        assert_eq!(c.classify(&no_name), Verdict::Excluded(Exclusion::MissingField));

        assert_eq!(
            c.classify(&record("../escape.png", "image/png")),
            Verdict::Excluded(Exclusion::UnsafeFilename)
        );
    }

    #[test]
    fn invalid_pattern_rejected() {
        let mut config = MediaConfig::default();
        config.skip_patterns.push("(unclosed".into());
        let err = Catalog::from_config(&config).unwrap_err();
        assert!(err.to_string().contains("(unclosed"));
    }
}
