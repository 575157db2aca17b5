//! Image weight audit and optional WebP recompression.
//!
//! [`report`] measures a directory tree and sorts oversized images into tiers;
//! [`convert`] writes optimized copies next to the originals.

pub mod convert;
pub mod report;

pub use convert::{ConversionSummary, ConvertedFile, convert_file, convert_oversized, optimized_path};
pub use report::{
    AuditEntry, AuditReport, ESTIMATED_REDUCTION, OPTIMIZED_EXTENSION, RASTER_EXTENSIONS, Tier,
    audit_dir, format_bytes,
};
