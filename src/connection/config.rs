//! SSH settings for reaching a device.
//!
//! Explicit host entries win over `~/.ssh/config`, which wins over
//! [`ConnectionDefaults`]. Host names in either source may be glob patterns
//! (`*.branch`, `fw-?`).

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use super::ConnectionError;

/// Default TCP connect timeout in seconds
pub const DEFAULT_TIMEOUT: u64 = 60;

/// Default per-command timeout in seconds
pub const DEFAULT_CHANNEL_TIMEOUT: u64 = 30;

/// Default SSH port
pub const DEFAULT_PORT: u16 = 22;

/// Factory administrator account on the appliance
pub const DEFAULT_USER: &str = "admin";

/// `Host a b c` opens a block for each listed pattern.
static HOST_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^Host\s+(.+)$").expect("valid Host regex"));
/// `Key value` or `Key=value`.
static OPTION_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\w+)(?:\s*=\s*|\s+)(.+)$").expect("valid option regex"));

/// Settings for every device this process may connect to
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Fallbacks for anything a host entry leaves unset
    pub defaults: ConnectionDefaults,

    /// Host entries keyed by name or glob pattern, first match wins
    pub hosts: IndexMap<String, HostConfig>,

    /// SSH client config to read instead of `~/.ssh/config`
    pub ssh_config_path: Option<PathBuf>,

    /// Read the SSH client config at all
    pub parse_ssh_config: bool,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            defaults: ConnectionDefaults::default(),
            hosts: IndexMap::new(),
            ssh_config_path: None,
            parse_ssh_config: true,
        }
    }
}

impl ConnectionConfig {
    /// Add entries from the SSH client config for hosts not configured yet.
    pub fn load_ssh_config(&mut self) -> Result<(), ConnectionError> {
        if !self.parse_ssh_config {
            return Ok(());
        }

        let path = match &self.ssh_config_path {
            Some(path) => expand_path(&path.to_string_lossy()),
            None => match dirs::home_dir() {
                Some(home) => home.join(".ssh").join("config"),
                None => return Ok(()),
            },
        };
        if !path.exists() {
            return Ok(());
        }

        let entries = read_ssh_config(&path)?;
        debug!(path = %path.display(), entries = entries.len(), "Loaded SSH client config");
        for (pattern, entry) in entries {
            self.hosts.entry(pattern).or_insert(entry);
        }
        Ok(())
    }

    /// Entry for `host`: an exact match, else the first matching pattern.
    pub fn get_host(&self, host: &str) -> Option<&HostConfig> {
        self.hosts.get(host).or_else(|| {
            self.hosts
                .iter()
                .find(|(pattern, _)| is_pattern(pattern) && matches_pattern(pattern, host))
                .map(|(_, entry)| entry)
        })
    }

    /// Entry for `host` with every gap filled from the defaults.
    pub fn get_host_merged(&self, host: &str) -> HostConfig {
        let mut entry = self.get_host(host).cloned().unwrap_or_default();
        entry.hostname.get_or_insert_with(|| host.to_string());
        entry.user.get_or_insert_with(|| self.defaults.user.clone());
        entry.port.get_or_insert(self.defaults.port);
        entry.connect_timeout.get_or_insert(self.defaults.timeout);
        if entry.identity_file.is_none() {
            entry.identity_file = self.defaults.identity_files.first().cloned();
        }
        entry
    }

    pub fn add_host(&mut self, name: impl Into<String>, entry: HostConfig) {
        self.hosts.insert(name.into(), entry);
    }
}

/// Fallback connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionDefaults {
    /// Login user
    pub user: String,

    /// SSH port
    pub port: u16,

    /// TCP connect timeout in seconds
    pub timeout: u64,

    /// Per-command timeout in seconds
    pub channel_timeout: u64,

    /// Private keys tried after the host's own key
    pub identity_files: Vec<String>,

    /// Offer SSH agent identities first
    pub use_agent: bool,

    /// Trust devices missing from known_hosts
    pub accept_unknown_hosts: bool,

    /// known_hosts file to check instead of `~/.ssh/known_hosts`
    pub known_hosts_file: Option<PathBuf>,
}

impl Default for ConnectionDefaults {
    fn default() -> Self {
        Self {
            user: DEFAULT_USER.to_string(),
            port: DEFAULT_PORT,
            timeout: DEFAULT_TIMEOUT,
            channel_timeout: DEFAULT_CHANNEL_TIMEOUT,
            identity_files: Vec::new(),
            use_agent: true,
            accept_unknown_hosts: true,
            known_hosts_file: None,
        }
    }
}

/// Settings for one host or host pattern
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostConfig {
    /// Address to connect to, when different from the entry name
    pub hostname: Option<String>,

    pub port: Option<u16>,

    pub user: Option<String>,

    /// Private key path, `~` expanded
    pub identity_file: Option<String>,

    #[serde(skip_serializing)]
    pub password: Option<String>,

    /// TCP connect timeout in seconds
    pub connect_timeout: Option<u64>,

    /// Recorded from the SSH config; connections do not run it.
    pub proxy_command: Option<String>,

    /// `StrictHostKeyChecking yes|no`
    pub strict_host_key_checking: Option<bool>,

    pub user_known_hosts_file: Option<String>,

    /// Every other SSH config option, lowercased key
    #[serde(default)]
    pub options: IndexMap<String, String>,
}

impl HostConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn identity_file(mut self, path: impl Into<String>) -> Self {
        self.identity_file = Some(path.into());
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// TCP connect timeout in seconds
    pub fn timeout(mut self, secs: u64) -> Self {
        self.connect_timeout = Some(secs);
        self
    }

    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs(self.connect_timeout.unwrap_or(DEFAULT_TIMEOUT))
    }

    /// Record one SSH config option.
    fn apply_option(&mut self, key: &str, value: String) {
        match key {
            "hostname" => self.hostname = Some(value),
            "port" => self.port = value.parse().ok(),
            "user" => self.user = Some(value),
            "identityfile" => self.identity_file = Some(shellexpand::tilde(&value).into_owned()),
            "connecttimeout" => self.connect_timeout = value.parse().ok(),
            "proxycommand" => self.proxy_command = Some(value),
            "stricthostkeychecking" => {
                self.strict_host_key_checking = match value.to_lowercase().as_str() {
                    "yes" => Some(true),
                    "no" => Some(false),
                    _ => None,
                }
            }
            "userknownhostsfile" => self.user_known_hosts_file = Some(value),
            _ => {
                self.options.insert(key.to_string(), value);
            }
        }
    }
}

/// Read an SSH client config file.
pub fn read_ssh_config(path: &Path) -> Result<IndexMap<String, HostConfig>, ConnectionError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        ConnectionError::InvalidConfig(format!("{}: {}", path.display(), e))
    })?;
    Ok(parse_ssh_config(&content))
}

/// Parse SSH client config text into entries keyed by host pattern.
///
/// Options before the first `Host` line and `Match` blocks are ignored.
pub fn parse_ssh_config(content: &str) -> IndexMap<String, HostConfig> {
    let mut entries = IndexMap::new();
    let mut patterns: Vec<String> = Vec::new();
    let mut entry = HostConfig::default();

    let mut flush = |patterns: &mut Vec<String>, entry: &HostConfig| {
        for pattern in patterns.drain(..) {
            entries.insert(pattern, entry.clone());
        }
    };

    for line in content.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(caps) = HOST_LINE.captures(line) {
            flush(&mut patterns, &entry);
            patterns = caps[1].split_whitespace().map(String::from).collect();
            entry = HostConfig::default();
        } else if let Some(caps) = OPTION_LINE.captures(line) {
            let key = caps[1].to_lowercase();
            if key == "match" {
                flush(&mut patterns, &entry);
                entry = HostConfig::default();
                continue;
            }
            entry.apply_option(&key, caps[2].trim().trim_matches('"').to_string());
        }
    }
    flush(&mut patterns, &entry);

    entries
}

fn is_pattern(name: &str) -> bool {
    name.contains(['*', '?'])
}

/// Glob match with `*` and `?`.
pub fn matches_pattern(pattern: &str, host: &str) -> bool {
    let glob = regex::escape(pattern)
        .replace(r"\*", ".*")
        .replace(r"\?", ".");
    Regex::new(&format!("^{}$", glob))
        .map(|re| re.is_match(host))
        .unwrap_or(false)
}

/// Expand `~` and environment variables.
pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::full(path).unwrap_or_else(|_| path.into()).as_ref())
}

/// `~/.ssh/id_*` keys that exist, strongest first.
pub fn default_identity_files() -> Vec<PathBuf> {
    let Some(home) = dirs::home_dir() else {
        return Vec::new();
    };
    ["id_ed25519", "id_ecdsa", "id_rsa"]
        .iter()
        .map(|name| home.join(".ssh").join(name))
        .filter(|p| p.exists())
        .collect()
}
