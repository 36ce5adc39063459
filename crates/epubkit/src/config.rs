//! Configuration management for epubkit.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::check::CheckOptions;
use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default configuration directory name.
const CONFIG_DIR_NAME: &str = "epubkit";

/// Prefix for configuration environment variables.
const ENV_PREFIX: &str = "EPUBKIT_";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (`EPUBKIT_<SECTION>__<KEY>`)
/// 2. TOML config file at `~/.config/epubkit/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Conformance check configuration.
    pub check: CheckConfig,
    /// Output configuration.
    pub output: OutputConfig,
    /// Resource limits.
    pub limits: LimitsConfig,
}

/// Conformance check configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckConfig {
    /// Treat media-type mismatches as errors.
    pub strict_media_types: bool,
    /// Treat a compressed mimetype entry as an error.
    pub require_stored_mimetype: bool,
}

/// Output configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Default output format when `--format` is not given.
    pub format: OutputFormat,
}

/// Output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Plain,
    /// JSON.
    Json,
}

/// Resource limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Largest entry, in uncompressed bytes, that will be read into memory.
    pub max_entry_bytes: u64,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            strict_media_types: false,
            require_stored_mimetype: true,
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_entry_bytes: 64 * 1024 * 1024,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// A missing file is not an error; defaults and environment apply.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading, parsing or validation fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);
        Self::from_figment(Self::figment(&config_file))
    }

    fn figment(config_file: &Path) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    fn from_figment(figment: Figment) -> Result<Self> {
        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.limits.max_entry_bytes == 0 {
            return Err(Error::ConfigValidation {
                message: "max_entry_bytes must be greater than 0".to_string(),
            });
        }

        Ok(())
    }

    /// Options for the conformance check.
    #[must_use]
    pub fn check_options(&self) -> CheckOptions {
        CheckOptions {
            strict_media_types: self.check.strict_media_types,
            require_stored_mimetype: self.check.require_stored_mimetype,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert!(!config.check.strict_media_types);
        assert!(config.check.require_stored_mimetype);
        assert_eq!(config.output.format, OutputFormat::Plain);
        assert_eq!(config.limits.max_entry_bytes, 64 * 1024 * 1024);
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_zero_entry_limit() {
        let mut config = Config::default();
        config.limits.max_entry_bytes = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("max_entry_bytes"));
    }

    #[test]
    fn test_check_options_from_config() {
        let mut config = Config::default();
        config.check.strict_media_types = true;
        config.check.require_stored_mimetype = false;

        let options = config.check_options();
        assert!(options.strict_media_types);
        assert!(!options.require_stored_mimetype);
    }

    #[test]
    fn test_default_check_options_match_default_config() {
        assert_eq!(Config::default().check_options(), CheckOptions::default());
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("epubkit"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_load_nonexistent_config() {
        Jail::expect_with(|_jail| {
            let config = Config::load_from(Some(PathBuf::from("/nonexistent/config.toml")))
                .map_err(|e| e.to_string())?;
            assert_eq!(config, Config::default());
            Ok(())
        });
    }

    #[test]
    fn test_load_from_toml_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "epubkit.toml",
                r#"
                [check]
                strict_media_types = true

                [output]
                format = "json"
                "#,
            )?;

            let config = Config::load_from(Some(PathBuf::from("epubkit.toml")))
                .map_err(|e| e.to_string())?;
            assert!(config.check.strict_media_types);
            assert!(config.check.require_stored_mimetype);
            assert_eq!(config.output.format, OutputFormat::Json);
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file("epubkit.toml", "[limits]\nmax_entry_bytes = 10\n")?;
            jail.set_env("EPUBKIT_LIMITS__MAX_ENTRY_BYTES", "20");
            jail.set_env("EPUBKIT_CHECK__REQUIRE_STORED_MIMETYPE", "false");

            let config = Config::load_from(Some(PathBuf::from("epubkit.toml")))
                .map_err(|e| e.to_string())?;
            assert_eq!(config.limits.max_entry_bytes, 20);
            assert!(!config.check.require_stored_mimetype);
            Ok(())
        });
    }

    #[test]
    fn test_invalid_file_value_is_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file("epubkit.toml", "[limits]\nmax_entry_bytes = 0\n")?;

            let result = Config::load_from(Some(PathBuf::from("epubkit.toml")));
            assert!(matches!(result, Err(Error::ConfigValidation { .. })));
            Ok(())
        });
    }

    #[test]
    fn test_output_format_serialize() {
        let json = serde_json::to_string(&OutputConfig::default()).unwrap();
        assert_eq!(json, r#"{"format":"plain"}"#);
    }

    #[test]
    fn test_config_clone() {
        let config = Config::default();
        assert_eq!(config.clone(), config);
    }
}
