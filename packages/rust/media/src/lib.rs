//! Media listing classification and retrieval.
//!
//! - [`catalog`]: CSV reader, folder rules, skip patterns, PDF renames
//! - [`fetch`]: idempotent single-file download with bounded redirects
//! - [`download`]: the sequential batch over a whole listing

pub mod catalog;
pub mod download;
pub mod fetch;

pub use catalog::{
    Catalog, ClassificationRule, Exclusion, FALLBACK_FOLDER, MEDIA_FOLDERS, MediaRecord, Verdict,
    parse_csv, parse_csv_line, read_records,
};
pub use download::{
    DownloadOptions, DownloadSummary, SeedSummary, download_media, prepare_folders,
    seed_local_copies,
};
pub use fetch::{FetchOutcome, Fetcher};
