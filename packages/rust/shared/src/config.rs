//! Application configuration for sitemigrate.
//!
//! Configuration lives in an optional `sitemigrate.toml` next to the site.
//! CLI flags override config file values, which override defaults. The
//! defaults reproduce the rule tables of the site this tool was written for.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SiteMigrateError};

/// Default configuration file name, looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "sitemigrate.toml";

// ---------------------------------------------------------------------------
// Config structs (matching sitemigrate.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Input and output locations.
    #[serde(default)]
    pub paths: PathsConfig,

    /// Content migration settings.
    #[serde(default)]
    pub content: ContentConfig,

    /// Media retrieval settings and rule tables.
    #[serde(default)]
    pub media: MediaConfig,

    /// Size audit settings.
    #[serde(default)]
    pub audit: AuditConfig,
}

/// `[paths]` section. Relative paths resolve against the working directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// CMS XML export.
    #[serde(default = "default_export_xml")]
    pub export_xml: PathBuf,
    /// Directory receiving one Markdown document per slug.
    #[serde(default = "default_content_dir")]
    pub content_dir: PathBuf,
    /// Media listing CSV (`URL`, `File Name`, `Type` columns).
    #[serde(default = "default_media_csv")]
    pub media_csv: PathBuf,
    /// Root of the categorized media tree.
    #[serde(default = "default_assets_dir")]
    pub assets_dir: PathBuf,
    /// Destination for renamed PDF documents.
    #[serde(default = "default_documents_dir")]
    pub documents_dir: PathBuf,
    /// Media tree scanned by the size audit.
    #[serde(default = "default_audit_dir")]
    pub audit_dir: PathBuf,
    /// Directory holding the raw export files (source of local copies).
    #[serde(default = "default_export_dir")]
    pub export_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            export_xml: default_export_xml(),
            content_dir: default_content_dir(),
            media_csv: default_media_csv(),
            assets_dir: default_assets_dir(),
            documents_dir: default_documents_dir(),
            audit_dir: default_audit_dir(),
            export_dir: default_export_dir(),
        }
    }
}

fn default_export_xml() -> PathBuf {
    PathBuf::from("wordpress-export/export.xml")
}
fn default_content_dir() -> PathBuf {
    PathBuf::from("src/content/blog")
}
fn default_media_csv() -> PathBuf {
    PathBuf::from("wordpress-export/media-urls.csv")
}
fn default_assets_dir() -> PathBuf {
    PathBuf::from("src/assets/images")
}
fn default_documents_dir() -> PathBuf {
    PathBuf::from("public/documents")
}
fn default_audit_dir() -> PathBuf {
    PathBuf::from("public/images")
}
fn default_export_dir() -> PathBuf {
    PathBuf::from("wordpress-export")
}

/// `[content]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentConfig {
    /// Export item type to migrate.
    #[serde(default = "default_post_type")]
    pub post_type: String,

    /// Export item status to migrate.
    #[serde(default = "default_status")]
    pub status: String,

    /// Author written into every document.
    #[serde(default = "default_author")]
    pub author: String,

    /// Description used when no paragraph qualifies. `{title}` is substituted.
    #[serde(default = "default_fallback_description")]
    pub fallback_description: String,

    /// Slug (or slug prefix) to featured image, longest prefix wins.
    #[serde(default = "default_featured_images")]
    pub featured_images: Vec<FeaturedImage>,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            post_type: default_post_type(),
            status: default_status(),
            author: default_author(),
            fallback_description: default_fallback_description(),
            featured_images: default_featured_images(),
        }
    }
}

fn default_post_type() -> String {
    "post".into()
}
fn default_status() -> String {
    "publish".into()
}
fn default_author() -> String {
    "AFJ Limited".into()
}
fn default_fallback_description() -> String {
    "{title} — AFJ Limited blog post about transport services in Birmingham.".into()
}

/// `[[content.featured_images]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeaturedImage {
    /// Full slug or slug prefix.
    pub slug: String,
    /// Image path written into front-matter.
    pub image: String,
}

fn default_featured_images() -> Vec<FeaturedImage> {
    const BLOG: &str = "../assets/images/blog";
    [
        ("businesses-changing-lives-through-csr", "businesses-csr.webp"),
        (
            "failsworth-transport-firm-helps-in-fight-against-loan-sharks",
            "loan-sharks-awareness.webp",
        ),
        (
            "5-keys-to-reliable-home-to-school-transport-in-the-uk",
            "home-to-school-transport-keys.webp",
        ),
        ("understanding-nepts", "nepts-guide.webp"),
        ("the-group-travel-game-changer", "private-minibus-hire.webp"),
        ("care-home-funding-grants", "care-home-funding.webp"),
        ("finalist-at-the-prestigious", "midlands-business-awards.webp"),
        ("swift-mobilisation", "swift-mobilisation.webp"),
        ("why-proactive-maintenance", "proactive-maintenance.webp"),
        (
            "navigating-the-challenges-of-staff-retention",
            "staff-retention-transport.webp",
        ),
        ("the-role-of-technology", "technology-transport-safety.webp"),
        ("the-rising-demand-for-wheelchair", "wheelchair-accessible-vehicles.webp"),
        ("what-councils-look-for", "councils-hts-providers.webp"),
        ("the-environmental-impact", "environmental-vehicle-maintenance.webp"),
        ("the-hidden-crisis", "hospital-discharges.webp"),
        ("why-driver-and-passenger", "driver-pa-training.webp"),
    ]
    .into_iter()
    .map(|(slug, file)| FeaturedImage {
        slug: slug.into(),
        image: format!("{BLOG}/{file}"),
    })
    .collect()
}

/// `[media]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Pause after each standard asset download, in milliseconds.
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,

    /// Maximum number of 301/302 hops followed per download.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: u32,

    /// Ordered classification rules; first match wins, fallback is `misc`.
    #[serde(default = "default_rules")]
    pub rules: Vec<RuleConfig>,

    /// Filename patterns excluded from retrieval entirely.
    #[serde(default = "default_skip_patterns")]
    pub skip_patterns: Vec<String>,

    /// PDFs to retrieve into the documents folder under a new name.
    #[serde(default = "default_documents")]
    pub documents: Vec<RenameEntry>,

    /// Files copied from the export directory into the media tree.
    #[serde(default = "default_local_copies")]
    pub local_copies: Vec<RenameEntry>,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            delay_ms: default_delay_ms(),
            max_redirects: default_max_redirects(),
            rules: default_rules(),
            skip_patterns: default_skip_patterns(),
            documents: default_documents(),
            local_copies: default_local_copies(),
        }
    }
}

fn default_delay_ms() -> u64 {
    100
}
fn default_max_redirects() -> u32 {
    10
}

/// `[[media.rules]]` entry: a case-insensitive regex and its folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleConfig {
    pub pattern: String,
    pub folder: String,
}

fn default_rules() -> Vec<RuleConfig> {
    [
        (r"^(afj-logo|afjltdlogos|logo)\b", "logo"),
        (
            r"^(homeToSchool|nEmer|FleetSM|privatesmAFj|convertionAFJ|afj)\b",
            "hero",
        ),
        (r"^(Group-112|alkdu73|Group123)", "hero"),
        (
            r"^(CQC|BCC|MCC|LCC|WCC|SCC|TBC|TBCC|OCC|NWAS|CnW|Finalist_Service|tameside)",
            "accreditations",
        ),
        (r"^(Core-value|Mission|Vision|Quality-begins)", "about"),
        (r"^(Image-[1-4]|IMG_0062|IMG_0046|IMG_0044|IMG_0028)", "team"),
        (
            r"^(mbs1|IMG_4420|IMG_4309|IMG_4438|IMG_0077|IMG_0076|IMG_0067|IMG_0043|IMG_0033|20231)",
            "fleet",
        ),
        (
            r"^(Untitled-design|Maintenance|Private-Hire|Privateasd|Convkhgersion|Mask-Group|NoPath)",
            "services",
        ),
        (r"\.svg$", "icons"),
        (
            r"^(Tackling-Hospital|Greener-Roads|Key-Factors|Rising-Demand|Role-of-Technology|Navigating-the-challenges|WhatsApp-Image-2025)",
            "blog",
        ),
        (r"^(1730980756373|1729868555014|2024311_85132)", "blog"),
    ]
    .into_iter()
    .map(|(pattern, folder)| RuleConfig {
        pattern: pattern.into(),
        folder: folder.into(),
    })
    .collect()
}

fn default_skip_patterns() -> Vec<String> {
    [
        r"www\.afjltd\.co_\.uk.*\.svg$",
        r"A-Safe-Reliable-Fleet-1\.svg$",
        r"^2\.svg$",
        r"^1\.svg$",
        r"tube-spinner\.svg$",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// A `{ source, target }` filename pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameEntry {
    pub source: String,
    pub target: String,
}

fn default_documents() -> Vec<RenameEntry> {
    [
        ("HTS-2.pdf", "afj-brochure.pdf"),
        ("Copy-of-AFJ-Maintenance-service-1.pdf", "maintenance-service.pdf"),
        ("AFJ_Carbon_Reduction_Plan.pdf", "carbon-reduction-plan.pdf"),
    ]
    .into_iter()
    .map(|(source, target)| RenameEntry {
        source: source.into(),
        target: target.into(),
    })
    .collect()
}

fn default_local_copies() -> Vec<RenameEntry> {
    [
        ("afj-logo-final.png", "logo/afj-logo-final.png"),
        ("logo.webp", "logo/logo.webp"),
    ]
    .into_iter()
    .map(|(source, target)| RenameEntry {
        source: source.into(),
        target: target.into(),
    })
    .collect()
}

/// `[audit]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Files strictly larger than this are oversized.
    #[serde(default = "default_threshold_bytes")]
    pub threshold_bytes: u64,

    /// WebP quality (0-100) used when converting.
    #[serde(default = "default_quality")]
    pub quality: u8,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            threshold_bytes: default_threshold_bytes(),
            quality: default_quality(),
        }
    }
}

fn default_threshold_bytes() -> u64 {
    512_000
}
fn default_quality() -> u8 {
    80
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Resolve and load the configuration.
///
/// An explicit path must exist. Without one, `./sitemigrate.toml` is used when
/// present, otherwise the built-in defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<AppConfig> {
    if let Some(path) = explicit {
        return load_config_from(path);
    }

    let path = PathBuf::from(CONFIG_FILE_NAME);
    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| SiteMigrateError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        SiteMigrateError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Write the default config to `path`, refusing to overwrite an existing file.
pub fn init_config(path: &Path) -> Result<PathBuf> {
    if path.exists() {
        return Err(SiteMigrateError::config(format!(
            "{} already exists",
            path.display()
        )));
    }

    let content = render_config(&AppConfig::default())?;
    std::fs::write(path, content).map_err(|e| SiteMigrateError::io(path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path.to_path_buf())
}

/// Render a config as pretty TOML.
pub fn render_config(config: &AppConfig) -> Result<String> {
    toml::to_string_pretty(config).map_err(|e| SiteMigrateError::config(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let toml_str = render_config(&AppConfig::default()).expect("serialize default config");
        assert!(toml_str.contains("export_xml"));
        assert!(toml_str.contains("afj-brochure.pdf"));
    }

    #[test]
    fn config_roundtrip_keeps_rule_order() {
        let toml_str = render_config(&AppConfig::default()).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.media.rules, default_rules());
        assert_eq!(parsed.media.rules[0].folder, "logo");
        assert_eq!(parsed.content.featured_images.len(), 16);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[content]
author = "Someone Else"

[media]
delay_ms = 0

[[media.rules]]
pattern = "^banner"
folder = "hero"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.content.author, "Someone Else");
        assert_eq!(config.content.status, "publish");
        assert_eq!(config.media.delay_ms, 0);
        assert_eq!(config.media.rules.len(), 1);
        assert_eq!(config.media.max_redirects, 10);
        assert_eq!(config.audit.threshold_bytes, 512_000);
    }

    #[test]
    fn explicit_missing_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_config(Some(&dir.path().join("nope.toml")));
        assert!(matches!(result, Err(SiteMigrateError::Io { .. })));
    }

    #[test]
    fn init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        init_config(&path).expect("first init");
        let loaded = load_config(Some(&path)).expect("load written config");
        assert_eq!(loaded.audit.quality, 80);
        assert!(init_config(&path).is_err());
    }
}
