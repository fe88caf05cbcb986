//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `homebus.toml` in the working directory. The `[core]` and
//! `[logging]` sections have defaults so the file is optional; any other
//! top-level table that carries an `adapter` key describes one adapter
//! instance, identified by that key. Environment variables take precedence
//! over file values.

use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Bus core / HTTP listener settings.
    pub core: CoreConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Every remaining top-level table; adapter instances live here.
    #[serde(flatten)]
    pub sections: BTreeMap<String, toml::Table>,
}

/// HTTP listener configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Address to bind to.
    pub host: String,
    /// TCP port.
    pub port: u16,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

/// One adapter instance section, identified by its `adapter` key.
#[derive(Debug)]
pub struct AdapterSection<'a> {
    /// The TOML table name (instance name, e.g. `ruuvi_upstairs`).
    pub name: &'a str,
    /// Which adapter to instantiate (registry lookup key).
    pub adapter: &'a str,
    table: &'a toml::Table,
}

impl Config {
    /// Load configuration from `homebus.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if
    /// validation fails.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("homebus.toml")?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("HOMEBUS_HOST") {
            self.core.host = val;
        }
        if let Ok(val) = std::env::var("HOMEBUS_PORT") {
            if let Ok(port) = val.parse() {
                self.core.port = port;
            }
        }
        if let Ok(val) = std::env::var("HOMEBUS_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.core.port == 0 {
            return Err(ConfigError::Validation("port must be non-zero".to_string()));
        }
        // shape-check the adapter keys up front so a bad section fails at
        // startup, not mid-wiring
        self.adapter_sections()?;
        Ok(())
    }

    /// Return the `host:port` bind address.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.core.host, self.core.port)
    }

    /// Every top-level table carrying an `adapter` key.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Key`] if an `adapter` key is not a string.
    pub fn adapter_sections(&self) -> Result<Vec<AdapterSection<'_>>, ConfigError> {
        self.sections
            .iter()
            .filter(|(_, table)| table.contains_key("adapter"))
            .map(|(name, table)| {
                let adapter = table
                    .get("adapter")
                    .and_then(toml::Value::as_str)
                    .ok_or_else(|| ConfigError::Key(format!("{name}.adapter")))?;
                Ok(AdapterSection {
                    name,
                    adapter,
                    table,
                })
            })
            .collect()
    }
}

impl AdapterSection<'_> {
    /// String value for `key` in this section.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Key`] when the key is absent or not a string.
    pub fn get_string(&self, key: &str) -> Result<String, ConfigError> {
        self.table
            .get(key)
            .and_then(toml::Value::as_str)
            .map(ToString::to_string)
            .ok_or_else(|| ConfigError::Key(format!("{}.{key}", self.name)))
    }

    /// String→string table for `key` in this section.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Key`] when the key is absent, not a table, or
    /// holds non-string values.
    pub fn get_string_map(&self, key: &str) -> Result<HashMap<String, String>, ConfigError> {
        let table = self
            .table
            .get(key)
            .and_then(toml::Value::as_table)
            .ok_or_else(|| ConfigError::Key(format!("{}.{key}", self.name)))?;

        table
            .iter()
            .map(|(k, v)| {
                let value = v
                    .as_str()
                    .ok_or_else(|| ConfigError::Key(format!("{}.{key}.{k}", self.name)))?;
                Ok((k.clone(), value.to_string()))
            })
            .collect()
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "homebusd=info,homebus=info,tower_http=debug".to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
    /// A required key is absent or has the wrong type.
    #[error("config key '{0}' is missing or has the wrong type")]
    Key(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_produce_sensible_defaults() {
        let config = Config::default();
        assert_eq!(config.core.host, "127.0.0.1");
        assert_eq!(config.core.port, 8080);
        assert!(config.sections.is_empty());
    }

    #[test]
    fn should_parse_minimal_toml() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.core.port, 8080);
        assert!(config.adapter_sections().unwrap().is_empty());
    }

    #[test]
    fn should_parse_core_and_adapter_sections() {
        let toml = r#"
            [core]
            host = '0.0.0.0'
            port = 9090

            [ruuvi_upstairs]
            adapter = 'ruuvi'
            path = '/ruuvi'

            [ruuvi_upstairs.sensors]
            'cc:64:a6:ed:f6:aa' = 'study'
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.core.host, "0.0.0.0");
        assert_eq!(config.core.port, 9090);

        let sections = config.adapter_sections().unwrap();
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].name, "ruuvi_upstairs");
        assert_eq!(sections[0].adapter, "ruuvi");
        assert_eq!(sections[0].get_string("path").unwrap(), "/ruuvi");

        let sensors = sections[0].get_string_map("sensors").unwrap();
        assert_eq!(sensors["cc:64:a6:ed:f6:aa"], "study");
    }

    #[test]
    fn should_skip_tables_without_adapter_key() {
        let toml = r"
            [logging]
            filter = 'debug'

            [notes]
            comment = 'not an adapter'
        ";
        let config: Config = toml::from_str(toml).unwrap();
        assert!(config.adapter_sections().unwrap().is_empty());
        assert_eq!(config.logging.filter, "debug");
    }

    #[test]
    fn should_reject_non_string_adapter_key() {
        let toml = "
            [broken]
            adapter = 7
        ";
        let config: Config = toml::from_str(toml).unwrap();
        assert!(config.adapter_sections().is_err());
    }

    #[test]
    fn should_report_missing_section_key() {
        let toml = "
            [ruuvi]
            adapter = 'ruuvi'
        ";
        let config: Config = toml::from_str(toml).unwrap();
        let sections = config.adapter_sections().unwrap();
        let err = sections[0].get_string("path").unwrap_err();
        assert!(err.to_string().contains("ruuvi.path"));
    }

    #[test]
    fn should_reject_zero_port() {
        let mut config = Config::default();
        config.core.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_format_bind_addr() {
        let config = Config::default();
        assert_eq!(config.bind_addr(), "127.0.0.1:8080");
    }

    #[test]
    fn should_return_default_when_file_not_found() {
        let config = Config::from_file("nonexistent.toml").unwrap();
        assert_eq!(config.core.port, 8080);
    }

    #[test]
    fn should_report_parse_error_for_invalid_toml() {
        let result: Result<Config, _> = toml::from_str("invalid {{{");
        assert!(result.is_err());
    }
}
