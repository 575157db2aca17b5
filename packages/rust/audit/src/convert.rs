//! Lossy WebP recompression of oversized images.

use std::path::{Path, PathBuf};

use tracing::{info, instrument, warn};

use sitemigrate_shared::{ProgressReporter, Result, SiteMigrateError};

use crate::report::{AuditEntry, AuditReport, OPTIMIZED_EXTENSION};

/// One file written by a conversion run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedFile {
    pub source: PathBuf,
    pub output: PathBuf,
    pub before: u64,
    pub after: u64,
    /// `before - after`; negative when recompression grew the file.
    pub saved: i64,
}

/// Totals for a conversion run.
#[derive(Debug, Default)]
pub struct ConversionSummary {
    pub converted: Vec<ConvertedFile>,
    /// A same-named optimized copy already existed.
    pub skipped: usize,
    /// (path, reason) per file that could not be converted.
    pub failed: Vec<(PathBuf, String)>,
}

impl ConversionSummary {
    pub fn total_saved(&self) -> i64 {
        self.converted.iter().map(|c| c.saved).sum()
    }
}

/// Convert every convertible oversized image in `report`.
///
/// The optimized copy is written next to the original, which is left in
/// place. Failures are logged and collected; the batch always completes.
#[instrument(skip(report, progress), fields(root = %report.root.display()))]
pub fn convert_oversized(
    report: &AuditReport,
    quality: u8,
    progress: &dyn ProgressReporter,
) -> ConversionSummary {
    let mut summary = ConversionSummary::default();
    let entries: Vec<&AuditEntry> = report.convertible().collect();
    let total = entries.len();

    progress.phase("Converting images");
    for (i, entry) in entries.into_iter().enumerate() {
        progress.item(&entry.relative_path.display().to_string(), i + 1, total);

        let output = optimized_path(&entry.path);
        if output.exists() {
            info!(output = %output.display(), "optimized copy exists, skipping");
            summary.skipped += 1;
            continue;
        }

        match convert_file(&entry.path, &output, quality) {
            Ok(after) => {
                let converted = ConvertedFile {
                    source: entry.path.clone(),
                    output,
                    before: entry.size,
                    after,
                    saved: entry.size as i64 - after as i64,
                };
                info!(
                    file = %entry.relative_path.display(),
                    before = converted.before,
                    after = converted.after,
                    saved = converted.saved,
                    "converted"
                );
                summary.converted.push(converted);
            }
            Err(e) => {
                warn!(file = %entry.path.display(), error = %e, "conversion failed");
                summary.failed.push((entry.path.clone(), e.to_string()));
            }
        }
    }
    progress.finish();

    summary
}

/// Decode `source` and write a lossy WebP at `quality` (0-100) to `output`.
/// Returns the size of the written file.
pub fn convert_file(source: &Path, output: &Path, quality: u8) -> Result<u64> {
    let decoded = image::open(source)
        .map_err(|e| SiteMigrateError::Conversion(format!("{}: {e}", source.display())))?;
    let rgba = decoded.to_rgba8();
    let (width, height) = rgba.dimensions();

    let encoded = webp::Encoder::from_rgba(rgba.as_raw(), width, height)
        .encode_simple(false, f32::from(quality.min(100)))
        .map_err(|e| {
            SiteMigrateError::Conversion(format!(
                "{} ({width}x{height}): {e:?}",
                source.display()
            ))
        })?;

    let part = part_path(output);
    if let Err(e) = std::fs::write(&part, &*encoded) {
        let _ = std::fs::remove_file(&part);
        return Err(SiteMigrateError::io(&part, e));
    }
    std::fs::rename(&part, output).map_err(|e| SiteMigrateError::io(output, e))?;
    Ok(encoded.len() as u64)
}

/// `banner.webp` -> `banner.webp.part`
fn part_path(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_os_string();
    name.push(".part");
    PathBuf::from(name)
}

/// `banner.png` -> `banner.webp`, in the same directory.
pub fn optimized_path(path: &Path) -> PathBuf {
    path.with_extension(OPTIMIZED_EXTENSION)
}
