//! Media download pipeline: listing -> verdicts -> sequential retrieval.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use sitemigrate_shared::{ProgressReporter, RenameEntry, Result, SiteMigrateError};

use crate::catalog::{Catalog, Exclusion, MEDIA_FOLDERS, MediaRecord, Verdict, read_records};
use crate::fetch::{FetchOutcome, Fetcher};

/// Configuration for [`download_media`].
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    /// Media listing CSV.
    pub csv: PathBuf,
    /// Root of the per-folder asset tree.
    pub assets_dir: PathBuf,
    /// Destination for renamed PDFs.
    pub documents_dir: PathBuf,
    /// Where `local_copies` sources are looked up.
    pub export_dir: PathBuf,
    /// Pause after each asset actually downloaded.
    pub delay: Duration,
    pub max_redirects: u32,
    pub local_copies: Vec<RenameEntry>,
}

/// Counts from one download run.
#[derive(Debug, Default)]
pub struct DownloadSummary {
    pub downloaded: usize,
    /// Excluded records plus destinations that already existed.
    pub skipped: usize,
    /// (url or local source, reason) for each failed retrieval or copy.
    pub errors: Vec<(String, String)>,
    /// Local files copied into the asset tree.
    pub seeded: usize,
}

/// Retrieve every eligible record in the listing, one at a time.
///
/// Per-record failures are logged and counted; only an unreadable listing or
/// an uncreatable destination folder aborts the run.
#[instrument(skip_all, fields(csv = %opts.csv.display()))]
pub async fn download_media(
    opts: &DownloadOptions,
    catalog: &Catalog,
    progress: &dyn ProgressReporter,
) -> Result<DownloadSummary> {
    progress.phase("Reading media listing");
    let text = tokio::fs::read_to_string(&opts.csv)
        .await
        .map_err(|e| SiteMigrateError::io(&opts.csv, e))?;
    let records = read_records(&text)?;
    info!(count = records.len(), "media records loaded");

    prepare_folders(&opts.assets_dir, &opts.documents_dir).await?;

    let fetcher = Fetcher::new(opts.max_redirects)?;
    let mut summary = DownloadSummary::default();

    progress.phase("Downloading media");
    let total = records.len();
    for (i, record) in records.iter().enumerate() {
        progress.item(&record.filename, i + 1, total);

        let (dest, is_asset) = match catalog.classify(record) {
            Verdict::Excluded(reason) => {
                log_exclusion(record, reason);
                summary.skipped += 1;
                continue;
            }
            Verdict::Document { filename, target } => {
                debug!(%filename, %target, "document");
                (opts.documents_dir.join(target), false)
            }
            Verdict::Asset { folder, filename } => {
                (opts.assets_dir.join(folder).join(filename), true)
            }
        };

        match fetcher.fetch(&record.url, &dest).await {
            Ok(FetchOutcome::Downloaded { bytes }) => {
                info!(dest = %dest.display(), bytes, "downloaded");
                summary.downloaded += 1;
                if is_asset && !opts.delay.is_zero() {
                    tokio::time::sleep(opts.delay).await;
                }
            }
            Ok(FetchOutcome::Skipped) => {
                debug!(dest = %dest.display(), "already present");
                summary.skipped += 1;
            }
            Err(e) => {
                warn!(url = %record.url, error = %e, "download failed");
                summary.errors.push((record.url.clone(), e.to_string()));
            }
        }
    }

    progress.phase("Seeding local assets");
    let seeding = seed_local_copies(&opts.export_dir, &opts.assets_dir, &opts.local_copies);
    summary.seeded = seeding.copied;
    summary.errors.extend(seeding.failed);

    progress.finish();
    info!(
        downloaded = summary.downloaded,
        skipped = summary.skipped,
        errors = summary.errors.len(),
        seeded = summary.seeded,
        "media download completed"
    );

    Ok(summary)
}

/// Create every fixed asset folder plus the documents folder.
pub async fn prepare_folders(assets_dir: &Path, documents_dir: &Path) -> Result<()> {
    for folder in MEDIA_FOLDERS {
        let dir = assets_dir.join(folder);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| SiteMigrateError::io(&dir, e))?;
    }
    tokio::fs::create_dir_all(documents_dir)
        .await
        .map_err(|e| SiteMigrateError::io(documents_dir, e))
}

/// Outcome of [`seed_local_copies`].
#[derive(Debug, Default)]
pub struct SeedSummary {
    pub copied: usize,
    /// (source, reason) per copy that failed.
    pub failed: Vec<(String, String)>,
}

/// Copy each `source` under `from` to `target` under `to`, unless the source
/// is missing or the target already exists. A failed copy is logged and
/// recorded; the remaining entries are still tried.
pub fn seed_local_copies(from: &Path, to: &Path, copies: &[RenameEntry]) -> SeedSummary {
    let mut summary = SeedSummary::default();
    for entry in copies {
        let source = from.join(&entry.source);
        let target = to.join(&entry.target);

        if !source.is_file() {
            debug!(source = %source.display(), "local source missing");
            continue;
        }
        if target.exists() {
            debug!(target = %target.display(), "local copy already present");
            continue;
        }

        match copy_file(&source, &target) {
            Ok(()) => {
                info!(target = %target.display(), "copied local asset");
                summary.copied += 1;
            }
            Err(e) => {
                warn!(source = %source.display(), error = %e, "local copy failed");
                summary
                    .failed
                    .push((source.display().to_string(), e.to_string()));
            }
        }
    }
    summary
}

fn copy_file(source: &Path, target: &Path) -> Result<()> {
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent).map_err(|e| SiteMigrateError::io(parent, e))?;
    }
    std::fs::copy(source, target).map_err(|e| SiteMigrateError::io(target, e))?;
    Ok(())
}

fn log_exclusion(record: &MediaRecord, reason: Exclusion) {
    match reason {
        Exclusion::SkipPattern => info!(filename = %record.filename, "skipped by pattern"),
        Exclusion::UnsafeFilename => {
            warn!(filename = %record.filename, "refusing filename with path components")
        }
        other => debug!(filename = %record.filename, reason = ?other, "excluded"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitemigrate_shared::{MediaConfig, SilentProgress};
    use wiremock::matchers::{method, path, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Rewrite the fixture listing so its relative URLs point at `base`.
    fn listing_for(base: &str) -> String {
        let fixture = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../../fixtures/media-urls.csv");
        std::fs::read_to_string(fixture)
            .unwrap()
            .replace("\n/wp-content/", &format!("\n{base}/wp-content/"))
    }

    fn options(root: &Path, csv: PathBuf) -> DownloadOptions {
        DownloadOptions {
            csv,
            assets_dir: root.join("assets"),
            documents_dir: root.join("documents"),
            export_dir: root.join("export"),
            delay: Duration::ZERO,
            max_redirects: 5,
            local_copies: MediaConfig::default().local_copies,
        }
    }

    #[tokio::test]
    async fn downloads_fixture_listing_and_reruns_without_requests() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path_regex("^/wp-content/uploads/"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"BYTES".to_vec()))
            .mount(&server)
            .await;

        let root = tempfile::tempdir().unwrap();
        let csv = root.path().join("media.csv");
        std::fs::write(&csv, listing_for(&server.uri())).unwrap();

        let catalog = Catalog::from_config(&MediaConfig::default()).unwrap();
        let opts = options(root.path(), csv);

        let first = download_media(&opts, &catalog, &SilentProgress).await.unwrap();
        assert_eq!(first.downloaded, 3);
        assert_eq!(first.skipped, 4);
        assert!(first.errors.is_empty());

        let assets = root.path().join("assets");
        assert!(assets.join("logo/afj-logo-2024.png").exists());
        assert!(assets.join("misc/Random-photo.jpg").exists());
        assert!(root.path().join("documents/afj-brochure.pdf").exists());
        assert!(!assets.join("icons/tube-spinner.svg").exists());
        for folder in MEDIA_FOLDERS {
            assert!(assets.join(folder).is_dir(), "{folder} not created");
        }

        let requests = server.received_requests().await.unwrap().len();
        assert_eq!(requests, 3);

        let second = download_media(&opts, &catalog, &SilentProgress).await.unwrap();
        assert_eq!(second.downloaded, 0);
        assert_eq!(second.skipped, 7);
        assert_eq!(server.received_requests().await.unwrap().len(), requests);
    }

    #[tokio::test]
    async fn failed_record_does_not_stop_batch() {
        let server = MockServer::start().await;
        Mock::given(path("/broken/first.png"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(path("/ok/second.png"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let root = tempfile::tempdir().unwrap();
        let csv = root.path().join("media.csv");
        let base = server.uri();
        std::fs::write(
            &csv,
            format!(
                "URL,File Name,Type\n\
                 {base}/broken/first.png,first.png,image/png\n\
                 {base}/ok/second.png,second.png,image/png\n"
            ),
        )
        .unwrap();

        let catalog = Catalog::from_config(&MediaConfig::default()).unwrap();
        let summary = download_media(&options(root.path(), csv), &catalog, &SilentProgress)
            .await
            .unwrap();

        assert_eq!(summary.downloaded, 1);
        assert_eq!(summary.errors.len(), 1);
        assert!(summary.errors[0].0.ends_with("/broken/first.png"));
        assert!(root.path().join("assets/misc/second.png").exists());
        assert!(!root.path().join("assets/misc/first.png").exists());
    }

    #[tokio::test]
    async fn delay_follows_downloaded_assets_only() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("x"))
            .mount(&server)
            .await;

        let root = tempfile::tempdir().unwrap();
        let csv = root.path().join("media.csv");
        let base = server.uri();
        std::fs::write(
            &csv,
            format!(
                "URL,File Name,Type\n\
                 {base}/a.png,a.png,image/png\n\
                 {base}/HTS-2.pdf,HTS-2.pdf,application/pdf\n\
                 {base}/tube-spinner.svg,tube-spinner.svg,image/svg+xml\n\
                 {base}/present.png,present.png,image/png\n\
                 {base}/b.png,b.png,image/png\n"
            ),
        )
        .unwrap();
        std::fs::create_dir_all(root.path().join("assets/misc")).unwrap();
        std::fs::write(root.path().join("assets/misc/present.png"), "old").unwrap();

        let mut opts = options(root.path(), csv);
        opts.delay = Duration::from_millis(400);
        let catalog = Catalog::from_config(&MediaConfig::default()).unwrap();

        let started = std::time::Instant::now();
        let summary = download_media(&opts, &catalog, &SilentProgress)
            .await
            .unwrap();
        let elapsed = started.elapsed();

        assert_eq!(summary.downloaded, 3);
        assert_eq!(summary.skipped, 2);
        // Two asset downloads pause; the PDF, the skip pattern and the
        // existing file do not.
        assert!(elapsed >= Duration::from_millis(800), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(1200), "{elapsed:?}");
    }

    #[tokio::test]
    async fn missing_listing_is_an_error() {
        let root = tempfile::tempdir().unwrap();
        let catalog = Catalog::from_config(&MediaConfig::default()).unwrap();
        let opts = options(root.path(), root.path().join("nope.csv"));
        let result = download_media(&opts, &catalog, &SilentProgress).await;
        assert!(matches!(result, Err(SiteMigrateError::Io { .. })));
    }

    #[test]
    fn seeds_only_missing_targets_from_existing_sources() {
        let root = tempfile::tempdir().unwrap();
        let export = root.path().join("export");
        let assets = root.path().join("assets");
        std::fs::create_dir_all(&export).unwrap();
        std::fs::write(export.join("afj-logo-final.png"), "png").unwrap();

        let copies = MediaConfig::default().local_copies;
        assert_eq!(seed_local_copies(&export, &assets, &copies).copied, 1);
        assert_eq!(
            std::fs::read_to_string(assets.join("logo/afj-logo-final.png")).unwrap(),
            "png"
        );
        assert!(!assets.join("logo/logo.webp").exists());

        let again = seed_local_copies(&export, &assets, &copies);
        assert_eq!(again.copied, 0);
        assert!(again.failed.is_empty());
    }

    #[test]
    fn failed_copy_is_recorded_and_others_continue() {
        let root = tempfile::tempdir().unwrap();
        let export = root.path().join("export");
        let assets = root.path().join("assets");
        std::fs::create_dir_all(&export).unwrap();
        std::fs::create_dir_all(&assets).unwrap();
        std::fs::write(export.join("blocked.png"), "png").unwrap();
        std::fs::write(export.join("ok.png"), "png").unwrap();
        // A file where the target's parent directory should be.
        std::fs::write(assets.join("logo"), "not a dir").unwrap();

        let copies = [
            RenameEntry {
                source: "blocked.png".into(),
                target: "logo/blocked.png".into(),
            },
            RenameEntry {
                source: "ok.png".into(),
                target: "misc/ok.png".into(),
            },
        ];
        let seeding = seed_local_copies(&export, &assets, &copies);

        assert_eq!(seeding.copied, 1);
        assert_eq!(seeding.failed.len(), 1);
        assert!(seeding.failed[0].0.ends_with("blocked.png"));
        assert!(assets.join("misc/ok.png").exists());
    }

    #[tokio::test]
    async fn seeding_failure_is_reported_in_summary() {
        let root = tempfile::tempdir().unwrap();
        let export = root.path().join("export");
        std::fs::create_dir_all(&export).unwrap();
        std::fs::write(export.join("logo.webp"), "webp").unwrap();
        let csv = root.path().join("media.csv");
        std::fs::write(&csv, "URL,File Name,Type\n").unwrap();

        let mut opts = options(root.path(), csv);
        opts.local_copies = vec![RenameEntry {
            source: "logo.webp".into(),
            target: "logo/logo.webp/nested".into(),
        }];
        std::fs::create_dir_all(root.path().join("assets/logo")).unwrap();
        std::fs::write(root.path().join("assets/logo/logo.webp"), "file").unwrap();

        let catalog = Catalog::from_config(&MediaConfig::default()).unwrap();
        let summary = download_media(&opts, &catalog, &SilentProgress)
            .await
            .unwrap();

        assert_eq!(summary.seeded, 0);
        assert_eq!(summary.errors.len(), 1);
        assert!(summary.errors[0].0.ends_with("logo.webp"));
    }
}
