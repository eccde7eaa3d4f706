//! Transport to the appliance CLI.
//!
//! Sessions never talk to SSH directly. They hold a boxed [`Connection`],
//! which runs one command string and hands back whatever the device printed;
//! interpreting that output is the job of [`crate::session::CliChannel`].
//! Tests substitute a scripted implementation of the same trait.
//!
//! # Example
//!
//! ```rust,ignore
//! use fortisync::connection::{Connection, ConnectionBuilder, ExecuteOptions};
//!
//! let conn = ConnectionBuilder::new("192.168.1.99")
//!     .user("admin")
//!     .password("secret")
//!     .connect()
//!     .await?;
//!
//! let status = conn
//!     .execute("get system status", Some(ExecuteOptions::new().with_timeout(30)))
//!     .await?;
//! println!("{}", status.stdout);
//! ```

pub mod config;

#[cfg(feature = "russh")]
pub mod russh;

use async_trait::async_trait;
use thiserror::Error;

pub use config::{ConnectionConfig, HostConfig};

#[cfg(feature = "russh")]
pub use russh::{ConnectionBuilder, RusshConnection};

/// Transport failures.
#[derive(Error, Debug)]
pub enum ConnectionError {
    /// TCP connect or SSH handshake failed.
    #[error("Connection failed: {0}")]
    Connect(String),

    /// Every authentication method was rejected.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The device presented a key that contradicts known_hosts.
    #[error("Host key verification failed for {0}")]
    HostKeyMismatch(String),

    /// A channel could not be opened or the exec request was refused.
    #[error("Channel error: {0}")]
    Channel(String),

    /// The device did not answer in time.
    #[error("Connection timeout after {0} seconds")]
    Timeout(u64),

    /// Unreadable connection or SSH client configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Protocol error from the SSH library.
    #[error("SSH error: {0}")]
    Ssh(String),

    /// Socket level I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection was already closed.
    #[error("Connection closed")]
    Closed,
}

#[cfg(feature = "russh")]
impl From<::russh::Error> for ConnectionError {
    fn from(err: ::russh::Error) -> Self {
        ConnectionError::Ssh(err.to_string())
    }
}

impl ConnectionError {
    /// Whether reconnecting and repeating the operation could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ConnectionError::Timeout(_) | ConnectionError::Closed | ConnectionError::Io(_)
        )
    }
}

/// Result type for transport operations.
pub type ConnectionResult<T> = Result<T, ConnectionError>;

/// Raw output of one command.
///
/// FortiOS rarely reports a non-zero exit status; failures show up as text
/// on stdout or stderr instead, so `exit_code` is informational.
///
/// ```rust
/// use fortisync::connection::CommandResult;
///
/// let ok = CommandResult::success("FGT # ".into(), String::new());
/// assert!(ok.success);
///
/// let refused = CommandResult::failure(255, String::new(), "Unknown action 0".into());
/// assert!(!refused.success);
/// assert!(refused.has_stderr());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    /// Exit status reported by the channel, 0 when none was sent
    pub exit_code: i32,
    /// Everything the device printed on stdout, prompts included
    pub stdout: String,
    /// Everything the device printed on stderr
    pub stderr: String,
    /// `exit_code == 0`
    pub success: bool,
}

impl CommandResult {
    /// Result with exit status 0
    pub fn success(stdout: String, stderr: String) -> Self {
        Self {
            exit_code: 0,
            stdout,
            stderr,
            success: true,
        }
    }

    /// Result with a non-zero exit status
    pub fn failure(exit_code: i32, stdout: String, stderr: String) -> Self {
        Self {
            exit_code,
            stdout,
            stderr,
            success: exit_code == 0,
        }
    }

    /// Whether anything but whitespace reached stderr
    pub fn has_stderr(&self) -> bool {
        !self.stderr.trim().is_empty()
    }
}

/// Per-command options
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    /// Seconds to wait for the command to finish
    pub timeout: Option<u64>,
}

impl ExecuteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Give up after `secs` seconds
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Some(secs);
        self
    }
}

/// A command channel to one device.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Label used in logs, usually `user@host:port`
    fn identifier(&self) -> &str;

    /// False once the connection is known to be unusable
    async fn is_alive(&self) -> bool;

    /// Run `command` and collect its output
    async fn execute(
        &self,
        command: &str,
        options: Option<ExecuteOptions>,
    ) -> ConnectionResult<CommandResult>;

    /// Tear the connection down; later calls to `execute` fail
    async fn close(&self) -> ConnectionResult<()>;
}
