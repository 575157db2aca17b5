//! Image size audit: enumerate, measure, tier.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use sitemigrate_shared::{Result, SiteMigrateError};

/// Raster formats the audit measures and can recompress.
pub const RASTER_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "tiff"];

/// Extension of the already-optimized format.
pub const OPTIMIZED_EXTENSION: &str = "webp";

/// Assumed fraction saved by recompressing a convertible oversized file.
pub const ESTIMATED_REDUCTION: f64 = 0.6;

const MIB: u64 = 1_048_576;

/// Severity band for an oversized image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Tier {
    /// More than 2 MB.
    Critical,
    /// More than 1 MB, at most 2 MB.
    Large,
    /// Above the threshold, at most 1 MB.
    Moderate,
}

impl Tier {
    /// Tier for `size`, or `None` when it does not exceed `threshold`.
    pub fn classify(size: u64, threshold: u64) -> Option<Self> {
        if size <= threshold {
            None
        } else if size > 2 * MIB {
            Some(Self::Critical)
        } else if size > MIB {
            Some(Self::Large)
        } else {
            Some(Self::Moderate)
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Critical => "critical (> 2 MB)",
            Self::Large => "large (1-2 MB)",
            Self::Moderate => "moderate (500 KB - 1 MB)",
        })
    }
}

/// One measured image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEntry {
    /// Absolute or caller-relative path as found during the walk.
    pub path: PathBuf,
    /// Path relative to the audited root, for display.
    pub relative_path: PathBuf,
    pub size: u64,
    /// Lower-cased extension.
    pub extension: String,
}

impl AuditEntry {
    pub fn is_optimized(&self) -> bool {
        self.extension == OPTIMIZED_EXTENSION
    }
}

/// Result of auditing one directory tree.
#[derive(Debug, Clone, Default)]
pub struct AuditReport {
    pub root: PathBuf,
    pub threshold: u64,
    /// Number of images measured.
    pub total_files: usize,
    pub total_bytes: u64,
    /// Images above the threshold, largest first.
    pub oversized: Vec<(Tier, AuditEntry)>,
}

impl AuditReport {
    /// Oversized entries in one tier, largest first.
    pub fn tier(&self, tier: Tier) -> impl Iterator<Item = &AuditEntry> {
        self.oversized
            .iter()
            .filter(move |(t, _)| *t == tier)
            .map(|(_, e)| e)
    }

    /// Oversized images already in the optimized format.
    pub fn already_optimized(&self) -> usize {
        self.oversized.iter().filter(|(_, e)| e.is_optimized()).count()
    }

    /// Oversized images that a conversion run would process.
    pub fn convertible(&self) -> impl Iterator<Item = &AuditEntry> {
        self.oversized
            .iter()
            .map(|(_, e)| e)
            .filter(|e| !e.is_optimized())
    }

    /// Bytes expected to be saved by converting every convertible image.
    pub fn estimated_savings(&self) -> u64 {
        self.convertible()
            .map(|e| (e.size as f64 * ESTIMATED_REDUCTION) as u64)
            .sum()
    }
}

/// Walk `root` and measure every raster or optimized image under it.
///
/// A missing root is an error; unreadable subdirectories are logged and
/// skipped.
#[instrument(skip_all, fields(root = %root.display()))]
pub fn audit_dir(root: &Path, threshold: u64) -> Result<AuditReport> {
    if !root.is_dir() {
        return Err(SiteMigrateError::MissingDirectory {
            path: root.to_path_buf(),
        });
    }

    let mut entries = Vec::new();
    collect_images(root, root, &mut entries)?;

    let mut report = AuditReport {
        root: root.to_path_buf(),
        threshold,
        total_files: entries.len(),
        total_bytes: entries.iter().map(|e| e.size).sum(),
        oversized: Vec::new(),
    };

    report.oversized = entries
        .into_iter()
        .filter_map(|e| Tier::classify(e.size, threshold).map(|t| (t, e)))
        .collect();
    report
        .oversized
        .sort_by(|(ta, a), (tb, b)| ta.cmp(tb).then(b.size.cmp(&a.size)));

    debug!(
        files = report.total_files,
        oversized = report.oversized.len(),
        "audit complete"
    );
    Ok(report)
}

fn collect_images(root: &Path, dir: &Path, out: &mut Vec<AuditEntry>) -> Result<()> {
    let read = std::fs::read_dir(dir).map_err(|e| SiteMigrateError::io(dir, e))?;

    for entry in read {
        let entry = entry.map_err(|e| SiteMigrateError::io(dir, e))?;
        let path = entry.path();
        let file_type = entry
            .file_type()
            .map_err(|e| SiteMigrateError::io(&path, e))?;

        if file_type.is_dir() {
            if let Err(e) = collect_images(root, &path, out) {
                tracing::warn!(dir = %path.display(), error = %e, "skipping unreadable directory");
            }
            continue;
        }
        if !file_type.is_file() {
            continue;
        }

        let Some(extension) = image_extension(&path) else {
            continue;
        };
        let size = entry
            .metadata()
            .map_err(|e| SiteMigrateError::io(&path, e))?
            .len();
        let relative_path = path.strip_prefix(root).unwrap_or(&path).to_path_buf();

        out.push(AuditEntry {
            path,
            relative_path,
            size,
            extension,
        });
    }
    Ok(())
}

fn image_extension(path: &Path) -> Option<String> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    (RASTER_EXTENSIONS.contains(&ext.as_str()) || ext == OPTIMIZED_EXTENSION).then_some(ext)
}

/// Render a byte count for reports.
pub fn format_bytes(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}
