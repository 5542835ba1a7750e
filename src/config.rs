//! Configuration for the check.
//!
//! Settings come from three layers, merged with clear precedence:
//!
//! 1. Default values (lowest priority)
//! 2. Configuration file (given with `--config`)
//! 3. Command-line arguments (highest priority)
//!
//! The merged [`Config`] is turned into a [`CheckConfiguration`], the value the
//! validator and the expiry checker work on.
//!
//! # Example Configuration File
//!
//! ```toml
//! hostname = "example.com"
//! port = 443
//! warning = 30
//! critical = 7
//! trusted_ca_file = "/etc/ssl/private-ca.pem"
//! insecure_skip_verify = false
//! timeout = 30
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

/// Port used when none is configured
pub const DEFAULT_PORT: u16 = 443;

/// Connection timeout in seconds used when none is configured
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Parameters of one check run, as handed to the validator.
///
/// Thresholds are signed so that zero or negative input reaches the validator
/// and is reported instead of being rejected by the argument parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckConfiguration {
    /// Host to connect to; must be a fully-qualified domain name
    pub hostname: String,
    /// TCP port to connect to
    pub port: u16,
    /// Days before expiry at which WARNING is reported
    pub warning_days: i64,
    /// Days before expiry at which CRITICAL is reported
    pub critical_days: i64,
    /// PEM bundle used instead of the platform trust store
    pub trusted_ca_file: Option<PathBuf>,
    /// Skip certificate chain and hostname verification
    pub insecure_skip_verify: bool,
    /// Timeout for connecting, reading and writing
    pub timeout: Duration,
}

impl Default for CheckConfiguration {
    fn default() -> Self {
        CheckConfiguration {
            hostname: String::new(),
            port: DEFAULT_PORT,
            warning_days: 0,
            critical_days: 0,
            trusted_ca_file: None,
            insecure_skip_verify: false,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// File and command-line configuration.
///
/// All fields are optional to support partial configuration and merging.
#[derive(Debug, Default, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Host to check
    pub hostname: Option<String>,
    /// TCP port
    pub port: Option<u16>,
    /// Warning threshold in days
    pub warning: Option<i64>,
    /// Critical threshold in days
    pub critical: Option<i64>,
    /// Path to a PEM bundle of trusted CA certificates
    pub trusted_ca_file: Option<PathBuf>,
    /// Skip certificate verification
    pub insecure_skip_verify: Option<bool>,
    /// Connection timeout in seconds
    pub timeout: Option<u64>,
}

impl Config {
    /// Loads configuration from a TOML file.
    ///
    /// # Returns
    ///
    /// * `Ok(Config)` - Successfully parsed configuration
    /// * `Err(ConfigError::Io)` - File could not be read
    /// * `Err(ConfigError::Parse)` - File contains invalid TOML or unknown keys
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        Ok(config)
    }

    /// Built-in defaults: port 443, 30 second timeout, verification enabled.
    ///
    /// Hostname and thresholds have no default and must be supplied.
    pub fn defaults() -> Self {
        Config {
            port: Some(DEFAULT_PORT),
            insecure_skip_verify: Some(false),
            timeout: Some(DEFAULT_TIMEOUT_SECS),
            ..Config::default()
        }
    }

    /// Merges this configuration with another, prioritizing the other's values.
    ///
    /// For each field, a `Some` in `other` overrides this config's value and a
    /// `None` keeps it.
    pub fn merge_with(self, other: Config) -> Self {
        Config {
            hostname: other.hostname.or(self.hostname),
            port: other.port.or(self.port),
            warning: other.warning.or(self.warning),
            critical: other.critical.or(self.critical),
            trusted_ca_file: other.trusted_ca_file.or(self.trusted_ca_file),
            insecure_skip_verify: other.insecure_skip_verify.or(self.insecure_skip_verify),
            timeout: other.timeout.or(self.timeout),
        }
    }

    /// Converts the merged configuration into the value the validator checks.
    ///
    /// Missing thresholds become 0 so validation reports them as required. An
    /// empty CA file path counts as no CA file.
    pub fn into_check_configuration(self) -> CheckConfiguration {
        CheckConfiguration {
            hostname: self.hostname.unwrap_or_default(),
            port: self.port.unwrap_or(DEFAULT_PORT),
            warning_days: self.warning.unwrap_or(0),
            critical_days: self.critical.unwrap_or(0),
            trusted_ca_file: self
                .trusted_ca_file
                .filter(|path| !path.as_os_str().is_empty()),
            insecure_skip_verify: self.insecure_skip_verify.unwrap_or(false),
            timeout: Duration::from_secs(self.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS)),
        }
    }

    /// Generates an example configuration file in TOML format.
    pub fn example_toml() -> String {
        let example = Config {
            hostname: Some("example.com".to_string()),
            port: Some(DEFAULT_PORT),
            warning: Some(30),
            critical: Some(7),
            trusted_ca_file: Some(PathBuf::from("/etc/ssl/certs/private-ca.pem")),
            insecure_skip_verify: Some(false),
            timeout: Some(DEFAULT_TIMEOUT_SECS),
        };

        toml::to_string_pretty(&example)
            .unwrap_or_else(|_| "# Error generating example".to_string())
    }
}

/// Errors that can occur during configuration loading and parsing.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File not found, permission denied, etc.
    #[error("cannot read configuration file {}: {reason}", path.display())]
    Io {
        /// Configuration file path
        path: PathBuf,
        /// Underlying I/O error text
        reason: String,
    },
    /// Invalid TOML syntax, type mismatch or unknown key
    #[error("cannot parse configuration file {}: {reason}", path.display())]
    Parse {
        /// Configuration file path
        path: PathBuf,
        /// Underlying parser error text
        reason: String,
    },
}
