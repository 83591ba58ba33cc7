//! Import configuration module.
//!
//! Handles loading, validating, and merging `blogimport.toml`. Stock defaults
//! are overridden by the config file, and command-line flags override both.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [output]
//! slug_filenames = true       # name posts after their permalink slug
//! comments = false            # write comment files and comment lists
//! comments_dir = "comments"   # comment files, relative to the target
//! markdown = false            # convert post bodies to Markdown
//! strip_blogger_urls = false  # drop blogger.com author URIs and images
//! extra = ""                  # TOML lines added to every post header
//!
//! [images]
//! # static_dir = "site/static/img"   # download images here (omit to skip)
//! thumbnail_size_token = "s72-c"
//! full_size_token = "s1600"
//!
//! [download]
//! timeout_secs = 30
//! # max_parallel = 4          # parallel downloads (omit for auto = CPU cores)
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse. Override just the values you want:
//!
//! ```toml
//! [output]
//! comments = true
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Config file looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "blogimport.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Import configuration loaded from `blogimport.toml`.
///
/// All fields have defaults. Config files need only specify the values they
/// want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImportConfig {
    /// What gets written and how files are named.
    pub output: OutputConfig,
    /// Image localization and thumbnail URL rewriting.
    pub images: ImagesConfig,
    /// HTTP settings for image downloads.
    pub download: DownloadConfig,
}

impl ImportConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let dir = Path::new(&self.output.comments_dir);
        if self.output.comments_dir.trim().is_empty()
            || !dir
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(ConfigError::Validation(
                "output.comments_dir must be a relative path inside the target".into(),
            ));
        }
        if !self.output.extra.trim().is_empty() && self.output.extra.parse::<toml::Table>().is_err()
        {
            return Err(ConfigError::Validation(
                "output.extra must be valid TOML key/value lines".into(),
            ));
        }
        if self.images.thumbnail_size_token.is_empty() || self.images.full_size_token.is_empty() {
            return Err(ConfigError::Validation(
                "images size tokens must not be empty".into(),
            ));
        }
        if self.download.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "download.timeout_secs must be non-zero".into(),
            ));
        }
        if self.download.max_parallel == Some(0) {
            return Err(ConfigError::Validation(
                "download.max_parallel must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

/// Output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Name post files after the permalink slug rather than the title.
    pub slug_filenames: bool,
    /// Write one TOML file per comment and list comment IDs in post headers.
    pub comments: bool,
    /// Directory for comment files, relative to the target directory.
    pub comments_dir: String,
    /// Convert post bodies from HTML to Markdown.
    pub markdown: bool,
    /// Blank author URIs and images that point at blogger.com.
    pub strip_blogger_urls: bool,
    /// TOML lines inserted verbatim into every post header.
    pub extra: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            slug_filenames: true,
            comments: false,
            comments_dir: "comments".to_string(),
            markdown: false,
            strip_blogger_urls: false,
            extra: String::new(),
        }
    }
}

/// Image settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesConfig {
    /// Directory images are downloaded into. Images stay remote when absent.
    pub static_dir: Option<PathBuf>,
    /// Size segment of Blogger thumbnail URLs.
    pub thumbnail_size_token: String,
    /// Size segment substituted to address the full-size image.
    pub full_size_token: String,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            static_dir: None,
            thumbnail_size_token: "s72-c".to_string(),
            full_size_token: "s1600".to_string(),
        }
    }
}

/// Download settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DownloadConfig {
    /// Per-request timeout.
    pub timeout_secs: u64,
    /// Maximum number of parallel downloads.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_parallel: Option<usize>,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_parallel: None,
        }
    }
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &DownloadConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_parallel.map(|n| n.min(cores)).unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(ImportConfig::default())
        .map_err(|e| ConfigError::Validation(format!("stock defaults do not serialize: {e}")))
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
///
/// `blogimport` only ever layers one file over the stock defaults, which
/// `#[serde(default)]` alone would also cover. Merging first keeps the
/// validated table complete when a caller supplies a different base.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<ImportConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: ImportConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from the given file.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result. A missing file yields the stock defaults.
pub fn load_config(path: &Path) -> Result<ImportConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(path)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `blogimport.toml` with all keys and
/// explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# blogimport configuration
# ========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Command-line flags override them.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Output
# ---------------------------------------------------------------------------
[output]
# Name post files after the permalink slug Blogger assigned (true) or after
# the post title (false).
slug_filenames = true

# Write one TOML file per comment and list comment IDs in each post header.
comments = false

# Where comment files go, relative to the target directory.
comments_dir = "comments"

# Convert post bodies from HTML to Markdown.
markdown = false

# Blank author URIs and profile images that point at blogger.com.
strip_blogger_urls = false

# TOML lines inserted verbatim into every post header, e.g.
# extra = 'series = "archive"'
extra = ""

# ---------------------------------------------------------------------------
# Images
# ---------------------------------------------------------------------------
[images]
# Download every external image into this directory and rewrite references.
# References become paths relative to the last "static" directory, so
# "site/static/img" yields "/img/<file>". Omit to leave images remote.
# static_dir = "site/static/img"

# Blogger thumbnail URLs carry a size segment; the post's [image] src
# replaces the thumbnail token with the full-size one.
thumbnail_size_token = "s72-c"
full_size_token = "s1600"

# ---------------------------------------------------------------------------
# Downloads
# ---------------------------------------------------------------------------
[download]
# Per-request timeout in seconds.
timeout_secs = 30

# Maximum parallel downloads.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_parallel = 4
"##
}
