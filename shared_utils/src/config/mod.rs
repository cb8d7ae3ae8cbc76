//! Configuration management for the tunnel bootstrapper.
//!
//! Settings are read from an optional TOML file. Every field carries a
//! default, so a missing section or a partial file is valid. VPN
//! credentials are deliberately not part of this structure; they are read
//! from the environment by [`crate::credentials`].

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Error reading configuration file
    #[error("Failed to read config file: {0}")]
    IoError(#[from] io::Error),

    /// Error parsing TOML configuration
    #[error("Failed to parse TOML config: {0}")]
    TomlError(#[from] toml::de::Error),

    /// Missing required configuration value
    #[error("Missing required configuration value: {0}")]
    MissingValue(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    /// Configuration file not found
    #[error("Configuration file not found at {0}")]
    FileNotFound(PathBuf),
}

/// VPN client invocation settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VpnConfig {
    /// VPN client binary (default: "openvpn")
    #[serde(default = "default_vpn_binary")]
    pub binary: String,

    /// VPN profile passed via `--config` (default: "/etc/openvpn/client.ovpn")
    #[serde(default = "default_profile_path")]
    pub profile_path: PathBuf,

    /// Where the username/password file is written (default: "/tmp/vpn-auth.txt")
    #[serde(default = "default_auth_file")]
    pub auth_file: PathBuf,

    /// Flag that makes the client detach (default: "--daemon")
    #[serde(default = "default_daemon_flag")]
    pub daemon_flag: String,

    /// Additional arguments inserted before the daemon flag
    #[serde(default)]
    pub extra_args: Vec<String>,
}

fn default_vpn_binary() -> String {
    "openvpn".to_string()
}

fn default_profile_path() -> PathBuf {
    PathBuf::from("/etc/openvpn/client.ovpn")
}

fn default_auth_file() -> PathBuf {
    PathBuf::from("/tmp/vpn-auth.txt")
}

fn default_daemon_flag() -> String {
    "--daemon".to_string()
}

impl Default for VpnConfig {
    fn default() -> Self {
        VpnConfig {
            binary: default_vpn_binary(),
            profile_path: default_profile_path(),
            auth_file: default_auth_file(),
            daemon_flag: default_daemon_flag(),
            extra_args: Vec::new(),
        }
    }
}

/// Tunnel readiness polling settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReadinessConfig {
    /// Interface whose presence signals a live tunnel (default: "tun0")
    #[serde(default = "default_interface")]
    pub interface: String,

    /// Upper bound on probes (default: 25)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Pause between probes in seconds (default: 1)
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Abort instead of continuing when the tunnel never shows up (default: false)
    #[serde(default)]
    pub require_tunnel: bool,
}

fn default_interface() -> String {
    "tun0".to_string()
}

fn default_max_attempts() -> u32 {
    25
}

fn default_interval_secs() -> u64 {
    1
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        ReadinessConfig {
            interface: default_interface(),
            max_attempts: default_max_attempts(),
            interval_secs: default_interval_secs(),
            require_tunnel: false,
        }
    }
}

impl ReadinessConfig {
    /// Pause between two consecutive probes.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Downstream entry point settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScraperConfig {
    /// Program that replaces the bootstrapper (default: "python3")
    #[serde(default = "default_scraper_program")]
    pub program: String,

    /// Arguments for the program (default: ["main.py"])
    #[serde(default = "default_scraper_args")]
    pub args: Vec<String>,

    /// Variables the downstream process expects; only reported when absent
    #[serde(default = "default_required_env")]
    pub required_env: Vec<String>,
}

fn default_scraper_program() -> String {
    "python3".to_string()
}

fn default_scraper_args() -> Vec<String> {
    vec!["main.py".to_string()]
}

fn default_required_env() -> Vec<String> {
    vec![
        "TELEGRAM_BOT_TOKEN".to_string(),
        "TELEGRAM_CHAT_ID".to_string(),
    ]
}

impl Default for ScraperConfig {
    fn default() -> Self {
        ScraperConfig {
            program: default_scraper_program(),
            args: default_scraper_args(),
            required_env: default_required_env(),
        }
    }
}

/// Main configuration structure for the bootstrapper.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BootstrapConfig {
    /// VPN client settings
    #[serde(default)]
    pub vpn: VpnConfig,

    /// Readiness polling settings
    #[serde(default)]
    pub readiness: ReadinessConfig,

    /// Downstream entry point settings
    #[serde(default)]
    pub scraper: ScraperConfig,

    /// Log level (default: "info")
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        BootstrapConfig {
            vpn: VpnConfig::default(),
            readiness: ReadinessConfig::default(),
            scraper: ScraperConfig::default(),
            log_level: default_log_level(),
        }
    }
}

impl BootstrapConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;

        Ok(config)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: BootstrapConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` when given, otherwise fall back to the default
    /// location and finally to built-in defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let default_path = Self::default_path();
                if default_path.exists() {
                    Self::load(default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.vpn.binary.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "vpn.binary".to_string(),
                message: "VPN client binary must not be empty".to_string(),
            });
        }

        if self.readiness.interface.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "readiness.interface".to_string(),
                message: "Interface name must not be empty".to_string(),
            });
        }

        if self.readiness.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                key: "readiness.max_attempts".to_string(),
                message: "At least one readiness probe is required".to_string(),
            });
        }

        if self.readiness.interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "readiness.interval_secs".to_string(),
                message: "Poll interval must be at least one second".to_string(),
            });
        }

        if self.scraper.program.trim().is_empty() {
            return Err(ConfigError::MissingValue("scraper.program".to_string()));
        }

        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("tunnel-bootstrap").join("config.toml")
        } else {
            PathBuf::from("config.toml")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = BootstrapConfig::default();
        assert_eq!(config.vpn.binary, "openvpn");
        assert_eq!(config.vpn.daemon_flag, "--daemon");
        assert_eq!(config.readiness.interface, "tun0");
        assert_eq!(config.readiness.max_attempts, 25);
        assert_eq!(config.readiness.interval(), Duration::from_secs(1));
        assert!(!config.readiness.require_tunnel);
        assert_eq!(config.scraper.args, vec!["main.py".to_string()]);
        assert_eq!(config.log_level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_partial_config() {
        let mut file = NamedTempFile::new().unwrap();

        let config_str = r#"
            log_level = "debug"

            [readiness]
            interface = "tun1"

            [scraper]
            program = "/app/monitor"
            args = []
        "#;

        file.write_all(config_str.as_bytes()).unwrap();

        let config = BootstrapConfig::load(file.path()).unwrap();

        assert_eq!(config.log_level, "debug");
        assert_eq!(config.readiness.interface, "tun1");
        assert_eq!(config.readiness.max_attempts, 25);
        assert_eq!(config.scraper.program, "/app/monitor");
        assert!(config.scraper.args.is_empty());
        assert_eq!(config.vpn.auth_file, PathBuf::from("/tmp/vpn-auth.txt"));
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let result = BootstrapConfig::from_toml_str("[readiness]\nmax_attempts = 0\n");

        match result {
            Err(ConfigError::InvalidValue { key, .. }) => {
                assert_eq!(key, "readiness.max_attempts")
            }
            other => panic!("Expected InvalidValue, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_explicit_file() {
        let result = BootstrapConfig::load("/nonexistent/bootstrap.toml");
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }
}
