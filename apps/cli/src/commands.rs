//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use indicatif::{ProgressBar, ProgressStyle};
use sitemigrate_audit::{AuditReport, Tier, audit_dir, convert_oversized, format_bytes};
use sitemigrate_content::{
    DocumentSettings, MigrateOptions, inventory_pages, migrate_posts, read_export,
};
use sitemigrate_media::{Catalog, DownloadOptions, download_media};
use sitemigrate_shared::{
    AppConfig, CONFIG_FILE_NAME, ProgressReporter, init_config, load_config, render_config,
};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// sitemigrate: move a CMS site into a static-site content tree.
#[derive(Parser)]
#[command(
    name = "sitemigrate",
    version,
    about = "Convert a CMS export into Markdown content, fetch its media, and audit image weight.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to ./sitemigrate.toml when present).
    #[arg(long, global = true, env = "SITEMIGRATE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Convert exported posts into Markdown content documents.
    Migrate {
        /// CMS XML export.
        #[arg(long)]
        xml: Option<PathBuf>,

        /// Output directory for `<slug>.md` files.
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Item type to migrate.
        #[arg(long = "type")]
        post_type: Option<String>,

        /// Item status to migrate.
        #[arg(long)]
        status: Option<String>,

        /// Skip the published-page inventory.
        #[arg(long)]
        no_pages: bool,
    },

    /// Download media listed in the export CSV into the asset tree.
    Download {
        /// Media listing CSV.
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Asset root (per-folder images).
        #[arg(long)]
        assets: Option<PathBuf>,

        /// Destination for renamed PDFs.
        #[arg(long)]
        documents: Option<PathBuf>,

        /// Pause after each downloaded asset, in milliseconds.
        #[arg(long)]
        delay_ms: Option<u64>,
    },

    /// Report oversized images and optionally write WebP copies.
    Audit {
        /// Directory to audit.
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Write optimized copies next to oversized originals.
        #[arg(long)]
        convert: bool,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Write the default config to ./sitemigrate.toml (or --config).
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "sitemigrate=info",
        1 => "sitemigrate=debug",
        _ => "sitemigrate=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt().with_env_filter(env_filter).with_target(false).init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Migrate {
            xml,
            out,
            post_type,
            status,
            no_pages,
        } => {
            let config = load_config(config_path)?;
            cmd_migrate(&config, xml, out, post_type, status, no_pages)
        }
        Command::Download {
            csv,
            assets,
            documents,
            delay_ms,
        } => {
            let config = load_config(config_path)?;
            cmd_download(&config, csv, assets, documents, delay_ms).await
        }
        Command::Audit { dir, convert } => {
            let config = load_config(config_path)?;
            cmd_audit(&config, dir, convert)
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(config_path),
            ConfigAction::Show => cmd_config_show(config_path),
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

fn cmd_migrate(
    config: &AppConfig,
    xml: Option<PathBuf>,
    out: Option<PathBuf>,
    post_type: Option<String>,
    status: Option<String>,
    no_pages: bool,
) -> Result<()> {
    let opts = MigrateOptions {
        export_xml: xml.unwrap_or_else(|| config.paths.export_xml.clone()),
        content_dir: out.unwrap_or_else(|| config.paths.content_dir.clone()),
        post_type: post_type.unwrap_or_else(|| config.content.post_type.clone()),
        status: status.unwrap_or_else(|| config.content.status.clone()),
        settings: DocumentSettings::from(&config.content),
    };

    info!(
        export = %opts.export_xml.display(),
        out = %opts.content_dir.display(),
        "migrating content"
    );

    let reporter = CliProgress::new();
    let summary = migrate_posts(&opts, &reporter)?;

    println!();
    println!("  Content migration complete");
    println!("  Matched:  {}", summary.matched);
    println!("  Written:  {}", summary.written.len());
    println!("  Failed:   {}", summary.failed.len());
    println!("  Output:   {}", opts.content_dir.display());
    for doc in &summary.written {
        println!("    {:<48} {:>7} chars", doc.slug, doc.body_len);
    }
    for (slug, reason) in &summary.failed {
        println!("    ! {slug}: {reason}");
    }

    if !no_pages {
        let xml = read_export(&opts.export_xml)?;
        let pages = inventory_pages(&xml, &opts.status);
        println!();
        println!("  Published pages: {}", pages.len());
        for page in &pages {
            println!(
                "    [{:>5}] {:<40} /{:<32} {:>7} chars  {}",
                page.id, page.title, page.slug, page.content_len, page.builder
            );
        }
    }
    println!();

    Ok(())
}

async fn cmd_download(
    config: &AppConfig,
    csv: Option<PathBuf>,
    assets: Option<PathBuf>,
    documents: Option<PathBuf>,
    delay_ms: Option<u64>,
) -> Result<()> {
    let catalog = Catalog::from_config(&config.media)?;
    let opts = DownloadOptions {
        csv: csv.unwrap_or_else(|| config.paths.media_csv.clone()),
        assets_dir: assets.unwrap_or_else(|| config.paths.assets_dir.clone()),
        documents_dir: documents.unwrap_or_else(|| config.paths.documents_dir.clone()),
        export_dir: config.paths.export_dir.clone(),
        delay: Duration::from_millis(delay_ms.unwrap_or(config.media.delay_ms)),
        max_redirects: config.media.max_redirects,
        local_copies: config.media.local_copies.clone(),
    };

    info!(csv = %opts.csv.display(), "downloading media");

    let reporter = CliProgress::new();
    let summary = download_media(&opts, &catalog, &reporter).await?;

    println!();
    println!("  Media download complete");
    println!("  Downloaded: {}", summary.downloaded);
    println!("  Skipped:    {}", summary.skipped);
    println!("  Errors:     {}", summary.errors.len());
    if summary.seeded > 0 {
        println!("  Seeded:     {}", summary.seeded);
    }
    for (url, reason) in &summary.errors {
        println!("    ! {url}: {reason}");
    }
    println!();

    Ok(())
}

fn cmd_audit(config: &AppConfig, dir: Option<PathBuf>, convert: bool) -> Result<()> {
    let root = dir.unwrap_or_else(|| config.paths.audit_dir.clone());
    info!(root = %root.display(), convert, "auditing images");

    let report = audit_dir(&root, config.audit.threshold_bytes)?;
    print_audit(&report);

    if !convert {
        if report.convertible().next().is_some() {
            println!("  Run with --convert to write WebP copies.");
            println!();
        }
        return Ok(());
    }

    let reporter = CliProgress::new();
    let summary = convert_oversized(&report, config.audit.quality, &reporter);

    println!("  Conversion (quality {})", config.audit.quality);
    for file in &summary.converted {
        println!(
            "    {} -> {}  {} -> {}  (saved {})",
            display_relative(&file.source, &root),
            display_relative(&file.output, &root),
            format_bytes(file.before),
            format_bytes(file.after),
            format_signed(file.saved),
        );
    }
    for (path, reason) in &summary.failed {
        println!("    ! {}: {reason}", display_relative(path, &root));
    }
    println!();
    println!("  Converted: {}", summary.converted.len());
    println!("  Skipped:   {}", summary.skipped);
    println!("  Failed:    {}", summary.failed.len());
    println!("  Saved:     {}", format_signed(summary.total_saved()));
    println!();

    Ok(())
}

fn print_audit(report: &AuditReport) {
    println!();
    println!("  Image audit: {}", report.root.display());
    println!(
        "  Images:    {} ({})",
        report.total_files,
        format_bytes(report.total_bytes)
    );
    println!(
        "  Oversized: {} (> {})",
        report.oversized.len(),
        format_bytes(report.threshold)
    );

    for tier in [Tier::Critical, Tier::Large, Tier::Moderate] {
        let entries: Vec<_> = report.tier(tier).collect();
        if entries.is_empty() {
            continue;
        }
        println!();
        println!("  {tier}: {}", entries.len());
        for entry in entries {
            println!(
                "    {:>10}  {}",
                format_bytes(entry.size),
                entry.relative_path.display()
            );
        }
    }

    println!();
    println!("  Already optimized:  {}", report.already_optimized());
    println!("  Convertible:        {}", report.convertible().count());
    println!(
        "  Estimated savings:  {}",
        format_bytes(report.estimated_savings())
    );
    println!();
}

fn display_relative(path: &Path, root: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).display().to_string()
}

fn format_signed(bytes: i64) -> String {
    if bytes < 0 {
        format!("-{}", format_bytes(bytes.unsigned_abs()))
    } else {
        format_bytes(bytes.unsigned_abs())
    }
}

fn cmd_config_init(explicit: Option<&Path>) -> Result<()> {
    let path = explicit.unwrap_or(Path::new(CONFIG_FILE_NAME));
    let path = init_config(path)?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(explicit: Option<&Path>) -> Result<()> {
    let config = load_config(explicit)?;
    println!("{}", render_config(&config)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(style);
        spinner.enable_steady_tick(Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn item(&self, label: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("[{current}/{total}] {label}"));
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}
