//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$TNEFEXTRACT_CONFIG` (environment variable)
//! 2. `~/.config/tnefextract/config.toml` (Linux/macOS)
//!    `%APPDATA%\tnefextract\config.toml` (Windows)
//! 3. Built-in defaults

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// Extraction output defaults.
    pub export: ExportConfig,
    /// Decoder safety limits.
    pub limits: LimitsConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
    /// Override cache directory for logs.
    pub cache_dir: Option<PathBuf>,
}

/// Extraction output defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Default output directory when `-o` is not given.
    pub default_output_dir: PathBuf,
    /// Write a `.raw` sidecar with the uninterpreted attachment attributes.
    pub write_meta_sidecars: bool,
}

/// Decoder safety limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum declared decompressed body size in bytes
    /// (default: 268435456 = 256 MB).
    pub max_body_size: u64,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            cache_dir: None,
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            default_output_dir: PathBuf::from("out"),
            write_meta_sidecars: true,
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_size: crate::parser::rtf::MAX_RAW_SIZE_DEFAULT,
        }
    }
}

/// Load configuration from the first available source, falling back to the
/// defaults on any error.
pub fn load_config() -> Config {
    let path = config_path();
    let Some(path) = path else {
        return Config::default();
    };
    match std::fs::read_to_string(&path) {
        Ok(text) => match toml::from_str(&text) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Invalid config file, using defaults");
                Config::default()
            }
        },
        Err(_) => Config::default(),
    }
}

/// Resolve the configuration file path, if any candidate exists.
fn config_path() -> Option<PathBuf> {
    if let Ok(p) = std::env::var("TNEFEXTRACT_CONFIG") {
        return Some(PathBuf::from(p));
    }
    dirs::config_dir().map(|d| d.join("tnefextract").join("config.toml"))
}

/// Directory for log files: the configured override or the platform cache
/// directory.
pub fn cache_dir(config: &Config) -> PathBuf {
    config.general.cache_dir.clone().unwrap_or_else(|| {
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from(".cache"))
            .join("tnefextract")
    })
}
