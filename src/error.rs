//! Error types for fortisync.
//!
//! Library operations return [`Result`]; the binary maps errors to exit
//! codes with [`Error::exit_code`].

use std::path::PathBuf;
use thiserror::Error;

use crate::connection::ConnectionError;
use crate::session::FailedCommand;
use crate::tree::ParseError;

/// `Result` with [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything a parse, diff, or device session can fail with.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed configuration text.
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] ParseError),

    /// The device rejected a command or printed a failure marker.
    #[error("Command '{command}' failed: {message}")]
    Execution {
        /// First line of the command sent
        command: String,
        /// Device output explaining the failure
        message: String,
    },

    /// Commands still failing after retries. Raised after an automatic
    /// rollback was attempted.
    #[error("Commit failed with {} failed command(s){}", failed.len(), if *rolled_back { ", changes rolled back" } else { "" })]
    CommitFailed {
        /// Commands the device reported as failed
        failed: Vec<FailedCommand>,
        /// Whether the rollback script ran successfully
        rolled_back: bool,
    },

    /// Rollback requested before any commit took a snapshot.
    #[error("No configuration snapshot to roll back to")]
    NoSnapshot,

    /// Transport failure.
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// The session has no open connection.
    #[error("Not connected to a device")]
    NotConnected,

    /// Invalid settings.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A candidate or config path that does not exist.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Unreadable YAML config file.
    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    /// JSON output or input that failed to (de)serialize.
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Unreadable TOML config file.
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Wrapped foreign error with a description of what was attempted.
    #[error("{message}")]
    Other {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl Error {
    /// Execution error naming only the first line of a multi-line command.
    pub fn execution(command: impl AsRef<str>, message: impl Into<String>) -> Self {
        Self::Execution {
            command: command.as_ref().lines().next().unwrap_or_default().to_string(),
            message: message.into(),
        }
    }

    /// Whether reconnecting and retrying could help.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::Connection(e) => e.is_transient(),
            Error::NotConnected => true,
            _ => false,
        }
    }

    /// Process exit status for the CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::CommitFailed { .. } => 2,
            Error::Connection(_) | Error::NotConnected => 3,
            Error::Parse(_) => 4,
            Error::Execution { .. } => 5,
            _ => 1,
        }
    }
}

/// Attach a description to foreign errors, turning them into [`Error::Other`].
pub trait ErrorContext<T> {
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Like `context`, building the message only on failure.
    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Other {
            message: message.into(),
            source: Some(Box::new(e)),
        })
    }

    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| Error::Other {
            message: f().into(),
            source: Some(Box::new(e)),
        })
    }
}
