//! Configuration loader plus strongly typed settings structures.
//!
//! Settings live in `~/.grade-stamp/config.toml` (or under the directory
//! named by `GRADE_STAMP_DIR`). A default file is embedded at compile time
//! and extracted on first run.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

// Embed default configuration file at compile time
const DEFAULT_CONFIG: &str = include_str!("../defaults/config.toml");

/// Environment variable overriding the base directory
pub const DIR_ENV_VAR: &str = "GRADE_STAMP_DIR";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub fonts: FontConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Physical pixels per display pixel; the export oversamples this by 2
    #[serde(default = "default_device_pixel_ratio")]
    pub device_pixel_ratio: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FontConfig {
    #[serde(default = "default_true")]
    pub load_system_fonts: bool,
    #[serde(default)]
    pub font_dirs: Vec<PathBuf>,
    /// Family used when "sans-serif" is requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sans_serif_family: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Event poll timeout - lower = higher FPS, higher CPU
    #[serde(default = "default_poll_timeout_ms")]
    pub poll_timeout_ms: u64,
    #[serde(default = "default_true")]
    pub show_preview: bool,
}

fn default_device_pixel_ratio() -> f32 {
    1.0
}

fn default_poll_timeout_ms() -> u64 {
    16
}

fn default_true() -> bool {
    true
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            device_pixel_ratio: default_device_pixel_ratio(),
        }
    }
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            load_system_fonts: true,
            font_dirs: Vec::new(),
            sans_serif_family: None,
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            poll_timeout_ms: default_poll_timeout_ms(),
            show_preview: true,
        }
    }
}

impl Config {
    /// Load config from the profile directory, extracting defaults on first run
    pub fn load() -> Result<Self> {
        Self::extract_defaults()?;
        let config_path = Self::config_path()?;
        Self::load_from_path(&config_path)
    }

    /// Load config from a custom file path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let contents =
            fs::read_to_string(path).context(format!("Failed to read config file: {:?}", path))?;
        let config = Self::from_toml(&contents)
            .context(format!("Failed to parse config file: {:?}", path))?;
        Ok(config)
    }

    /// Parse and sanitize a TOML document
    pub fn from_toml(contents: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(contents)?;
        config.sanitize();
        Ok(config)
    }

    /// The embedded default configuration
    pub fn embedded_default() -> Result<Self> {
        Self::from_toml(DEFAULT_CONFIG)
    }

    /// Replace out-of-range values with defaults
    fn sanitize(&mut self) {
        let ratio = self.export.device_pixel_ratio;
        if !ratio.is_finite() || ratio <= 0.0 {
            tracing::warn!(
                "export.device_pixel_ratio must be positive (got {}), using 1.0",
                ratio
            );
            self.export.device_pixel_ratio = default_device_pixel_ratio();
        }
        if self.ui.poll_timeout_ms == 0 {
            tracing::warn!("ui.poll_timeout_ms must be at least 1, using default");
            self.ui.poll_timeout_ms = default_poll_timeout_ms();
        }
    }

    /// Write the default config file if it does not exist yet
    fn extract_defaults() -> Result<()> {
        let base = Self::base_dir()?;
        fs::create_dir_all(&base)
            .context(format!("Failed to create config directory {:?}", base))?;

        let config_path = Self::config_path()?;
        if !config_path.exists() {
            fs::write(&config_path, DEFAULT_CONFIG).context("Failed to write config.toml")?;
            tracing::info!("Extracted config.toml to {:?}", config_path);
        }
        Ok(())
    }

    /// Get the base grade-stamp directory (~/.grade-stamp/)
    /// Can be overridden with GRADE_STAMP_DIR environment variable
    pub fn base_dir() -> Result<PathBuf> {
        if let Ok(custom_dir) = std::env::var(DIR_ENV_VAR) {
            return Ok(PathBuf::from(custom_dir));
        }

        let home = dirs::home_dir().context("Could not find home directory")?;
        Ok(home.join(".grade-stamp"))
    }

    /// Returns: ~/.grade-stamp/config.toml
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::base_dir()?.join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_default_parses() {
        let config = Config::embedded_default().expect("default config is valid");
        assert_eq!(config.export.device_pixel_ratio, 1.0);
        assert!(config.fonts.load_system_fonts);
        assert!(config.fonts.font_dirs.is_empty());
        assert_eq!(config.ui.poll_timeout_ms, 16);
        assert!(config.ui.show_preview);
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.export.device_pixel_ratio, 1.0);
        assert!(config.fonts.sans_serif_family.is_none());
        assert_eq!(config.ui.poll_timeout_ms, 16);
    }

    #[test]
    fn test_partial_sections() {
        let toml_str = r#"
[export]
device_pixel_ratio = 2.0

[fonts]
load_system_fonts = false
font_dirs = ["/usr/share/fonts/custom"]
sans_serif_family = "DejaVu Sans"
"#;
        let config = Config::from_toml(toml_str).unwrap();
        assert_eq!(config.export.device_pixel_ratio, 2.0);
        assert!(!config.fonts.load_system_fonts);
        assert_eq!(
            config.fonts.font_dirs,
            vec![PathBuf::from("/usr/share/fonts/custom")]
        );
        assert_eq!(config.fonts.sans_serif_family.as_deref(), Some("DejaVu Sans"));
        assert!(config.ui.show_preview);
    }

    #[test]
    fn test_non_positive_ratio_falls_back() {
        let config = Config::from_toml("[export]\ndevice_pixel_ratio = 0.0\n").unwrap();
        assert_eq!(config.export.device_pixel_ratio, 1.0);

        let config = Config::from_toml("[export]\ndevice_pixel_ratio = -3.0\n").unwrap();
        assert_eq!(config.export.device_pixel_ratio, 1.0);
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        assert!(Config::from_toml("[export\n").is_err());
        assert!(Config::from_toml("[ui]\npoll_timeout_ms = \"fast\"\n").is_err());
    }

    #[test]
    fn test_round_trip_through_toml() {
        let config = Config::embedded_default().unwrap();
        let text = toml::to_string_pretty(&config).expect("Failed to serialize config");
        let back = Config::from_toml(&text).unwrap();
        assert_eq!(back.export.device_pixel_ratio, config.export.device_pixel_ratio);
        assert_eq!(back.ui.poll_timeout_ms, config.ui.poll_timeout_ms);
    }
}
