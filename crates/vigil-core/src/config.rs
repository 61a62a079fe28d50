//! Application configuration with layered loading.
//!
//! Configuration is loaded in this order (later overrides earlier):
//!
//! 1. **Compiled defaults**: hardcoded in the struct `Default` impls
//! 2. **Config file**: TOML file specified by the `VIGIL_CONFIG` env var
//! 3. **Environment variables**: `VIGIL_*` vars override specific fields
//!    (e.g. `VIGIL_SERVER__BIND_PORT=8080`)
//!
//! Configuration is validated at load time; an invalid combination returns
//! an error instead of failing later at runtime.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// HTTP query server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// IP address to bind the server to. Defaults to `127.0.0.1`.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Port number to listen on. Must be greater than 0. Defaults to `5000`.
    #[serde(default = "default_bind_port")]
    pub bind_port: u16,
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_bind_port() -> u16 {
    5000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind_address: default_bind_address(), bind_port: default_bind_port() }
    }
}

/// Dimension registration settings.
///
/// Each listed tag becomes a dimension of the same name extracting from that
/// tag. The conventional set is `host`, `dc`, `service`, `volume`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DimensionsConfig {
    /// Tags to index as dimensions. Cannot be empty.
    #[serde(default = "default_dimension_tags")]
    pub tags: Vec<String>,
}

fn default_dimension_tags() -> Vec<String> {
    ["host", "dc", "service", "volume"].map(String::from).to_vec()
}

impl Default for DimensionsConfig {
    fn default() -> Self {
        Self { tags: default_dimension_tags() }
    }
}

/// Application logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (e.g. "trace", "debug", "info", "warn", "error"). Defaults to `"info"`.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: `"json"` or `"pretty"`. Defaults to `"pretty"`.
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level(), format: default_log_format() }
    }
}

/// Saved query results settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultsConfig {
    /// Directory where query results are persisted. Defaults to `results`.
    #[serde(default = "default_results_dir")]
    pub dir: String,
}

fn default_results_dir() -> String {
    "results".to_string()
}

impl Default for ResultsConfig {
    fn default() -> Self {
        Self { dir: default_results_dir() }
    }
}

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Dimension registration.
    #[serde(default)]
    pub dimensions: DimensionsConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Result persistence settings.
    #[serde(default)]
    pub results: ResultsConfig,
}

impl AppConfig {
    /// Loads configuration from defaults, the optional `VIGIL_CONFIG` TOML
    /// file, and `VIGIL_*` environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        if let Ok(path) = std::env::var("VIGIL_CONFIG") {
            builder = builder.add_source(File::from(Path::new(&path)).required(true));
        }

        let settings = builder
            .add_source(Environment::with_prefix("VIGIL").separator("__"))
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Checks cross-field constraints the type system cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.bind_port == 0 {
            return Err(ConfigError::Message("server.bind_port must be greater than 0".into()));
        }
        if self.dimensions.tags.is_empty() {
            return Err(ConfigError::Message("dimensions.tags cannot be empty".into()));
        }
        if self.dimensions.tags.iter().any(|tag| tag.trim().is_empty()) {
            return Err(ConfigError::Message("dimensions.tags entries cannot be blank".into()));
        }
        match self.logging.format.as_str() {
            "json" | "pretty" => {}
            other => {
                return Err(ConfigError::Message(format!(
                    "logging.format must be \"json\" or \"pretty\", got {other:?}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server.bind_address, "127.0.0.1");
        assert_eq!(config.server.bind_port, 5000);
        assert_eq!(config.dimensions.tags, vec!["host", "dc", "service", "volume"]);
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_port() {
        let config = AppConfig {
            server: ServerConfig { bind_port: 0, ..ServerConfig::default() },
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_dimensions() {
        let config = AppConfig {
            dimensions: DimensionsConfig { tags: vec![] },
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unknown_log_format() {
        let config = AppConfig {
            logging: LoggingConfig { format: "xml".to_string(), ..LoggingConfig::default() },
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let toml = r#"
            [server]
            bind_address = "0.0.0.0"
            bind_port = 8080

            [dimensions]
            tags = ["host", "rack"]
        "#;

        let config: AppConfig = toml_like_parse(toml);
        assert_eq!(config.server.bind_address, "0.0.0.0");
        assert_eq!(config.server.bind_port, 8080);
        assert_eq!(config.dimensions.tags, vec!["host", "rack"]);
        // Unspecified sections fall back to defaults.
        assert_eq!(config.logging.level, "info");
    }

    fn toml_like_parse(toml: &str) -> AppConfig {
        Config::builder()
            .add_source(File::from_str(toml, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }
}
