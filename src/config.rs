//! Configuration module for fortisync
//!
//! Handles loading and merging configuration from multiple sources:
//! - Default values
//! - System configuration (/etc/fortisync/fortisync.toml)
//! - User configuration (~/.fortisync.toml, ~/.config/fortisync/config.toml)
//! - Project configuration (./fortisync.toml)
//! - Environment variables
//!
//! Command-line flags are applied on top by the binary.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::connection::config::{
    ConnectionConfig, HostConfig, DEFAULT_CHANNEL_TIMEOUT, DEFAULT_PORT, DEFAULT_TIMEOUT,
};
use crate::session::CommitPolicy;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Device to manage
    pub device: DeviceConfig,

    /// Commit retry settings
    pub commit: CommitPolicy,

    /// SSH settings
    pub ssh: SshConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

/// Device settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Hostname or address
    pub hostname: Option<String>,

    /// SSH port
    pub port: u16,

    /// Vdom to scope every command to
    pub vdom: Option<String>,

    /// Login user
    pub username: Option<String>,

    /// Login password
    pub password: Option<String>,

    /// Private key file
    pub keyfile: Option<String>,

    /// TCP connect timeout in seconds
    pub timeout: u64,

    /// Per-command timeout in seconds
    pub channel_timeout: u64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            hostname: None,
            port: DEFAULT_PORT,
            vdom: None,
            username: None,
            password: None,
            keyfile: None,
            timeout: DEFAULT_TIMEOUT,
            channel_timeout: DEFAULT_CHANNEL_TIMEOUT,
        }
    }
}

/// SSH settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SshConfig {
    /// SSH client config file (default: ~/.ssh/config)
    pub config_path: Option<PathBuf>,

    /// Read the SSH client config file
    pub parse_ssh_config: bool,

    /// Try the SSH agent first
    pub use_agent: bool,

    /// Accept hosts missing from known_hosts
    pub accept_unknown_hosts: bool,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            config_path: None,
            parse_ssh_config: true,
            use_agent: true,
            accept_unknown_hosts: true,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format: {}", other)),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level used when neither -v nor RUST_LOG is given
    pub level: String,

    /// Log format
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl Config {
    /// Load configuration from all sources
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        let mut config = Config::default();

        for path in Self::get_config_paths(config_path) {
            if path.exists() {
                config = config.merge_from_file(&path)?;
            }
        }

        config.apply_env_overrides();

        Ok(config)
    }

    /// Configuration files in increasing priority
    fn get_config_paths(explicit_path: Option<&PathBuf>) -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("/etc/fortisync/fortisync.toml")];

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".fortisync.toml"));
        }
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("fortisync").join("config.toml"));
        }

        paths.push(PathBuf::from("fortisync.toml"));

        if let Some(path) = explicit_path {
            paths.push(path.clone());
        } else if let Ok(env_config) = std::env::var("FORTISYNC_CONFIG") {
            paths.push(PathBuf::from(env_config));
        }

        paths
    }

    /// Merge configuration from a file
    fn merge_from_file(&self, path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        let file_config: Config = match extension {
            "yml" | "yaml" => serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?,
            "json" => serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?,
            "toml" => toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?,
            _ => toml::from_str(&content)
                .or_else(|_| serde_yaml::from_str(&content))
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?,
        };

        Ok(self.merge(file_config))
    }

    /// Merge another config into this one; values in `other` that differ
    /// from the defaults win.
    fn merge(&self, other: Config) -> Config {
        let defaults = DeviceConfig::default();
        Config {
            device: DeviceConfig {
                hostname: other.device.hostname.or_else(|| self.device.hostname.clone()),
                port: if other.device.port != defaults.port {
                    other.device.port
                } else {
                    self.device.port
                },
                vdom: other.device.vdom.or_else(|| self.device.vdom.clone()),
                username: other.device.username.or_else(|| self.device.username.clone()),
                password: other.device.password.or_else(|| self.device.password.clone()),
                keyfile: other.device.keyfile.or_else(|| self.device.keyfile.clone()),
                timeout: if other.device.timeout != defaults.timeout {
                    other.device.timeout
                } else {
                    self.device.timeout
                },
                channel_timeout: if other.device.channel_timeout != defaults.channel_timeout {
                    other.device.channel_timeout
                } else {
                    self.device.channel_timeout
                },
            },
            commit: if other.commit != CommitPolicy::default() {
                other.commit
            } else {
                self.commit.clone()
            },
            ssh: SshConfig {
                config_path: other.ssh.config_path.or_else(|| self.ssh.config_path.clone()),
                parse_ssh_config: other.ssh.parse_ssh_config,
                use_agent: other.ssh.use_agent,
                accept_unknown_hosts: other.ssh.accept_unknown_hosts,
            },
            logging: other.logging,
        }
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("FORTISYNC_HOST") {
            self.device.hostname = Some(host);
        }

        if let Ok(port) = std::env::var("FORTISYNC_PORT") {
            if let Ok(n) = port.parse() {
                self.device.port = n;
            }
        }

        if let Ok(user) = std::env::var("FORTISYNC_USER") {
            self.device.username = Some(user);
        }

        if let Ok(password) = std::env::var("FORTISYNC_PASSWORD") {
            self.device.password = Some(password);
        }

        if let Ok(keyfile) = std::env::var("FORTISYNC_KEYFILE") {
            self.device.keyfile = Some(keyfile);
        }

        if let Ok(vdom) = std::env::var("FORTISYNC_VDOM") {
            self.device.vdom = Some(vdom);
        }

        if let Ok(timeout) = std::env::var("FORTISYNC_TIMEOUT") {
            if let Ok(n) = timeout.parse() {
                self.device.timeout = n;
            }
        }

        if let Ok(timeout) = std::env::var("FORTISYNC_CHANNEL_TIMEOUT") {
            if let Ok(n) = timeout.parse() {
                self.device.channel_timeout = n;
            }
        }

        if let Ok(format) = std::env::var("FORTISYNC_LOG_FORMAT") {
            if let Ok(format) = format.parse() {
                self.logging.format = format;
            }
        }
    }

    /// Load from a specific file only
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Config::default().merge_from_file(path.as_ref())
    }

    /// Connection settings for the configured device.
    pub fn to_connection_config(&self) -> ConnectionConfig {
        let mut config = ConnectionConfig::default();
        config.defaults.port = self.device.port;
        config.defaults.timeout = self.device.timeout;
        config.defaults.channel_timeout = self.device.channel_timeout;
        config.defaults.use_agent = self.ssh.use_agent;
        config.defaults.accept_unknown_hosts = self.ssh.accept_unknown_hosts;
        if let Some(user) = &self.device.username {
            config.defaults.user = user.clone();
        }
        config.ssh_config_path = self.ssh.config_path.clone();
        config.parse_ssh_config = self.ssh.parse_ssh_config;

        if let Some(hostname) = &self.device.hostname {
            let mut host = HostConfig::new();
            if let Some(password) = &self.device.password {
                host = host.password(password.clone());
            }
            if let Some(keyfile) = &self.device.keyfile {
                host = host.identity_file(keyfile.clone());
            }
            config.add_host(hostname.clone(), host);
        }

        config
    }
}
