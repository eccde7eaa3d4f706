//! Command channel to the device CLI.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, error};

use crate::connection::{Connection, ExecuteOptions};
use crate::error::{Error, Result};

/// Marker the CLI prints when it refuses a command.
pub const FAILURE_MARKER: &str = "Command fail";

static PROMPT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\S+(?:\s\S+)?\s#\s").expect("valid prompt regex"));

/// Runs commands over a [`Connection`] and cleans up what the CLI prints.
pub struct CliChannel {
    connection: Box<dyn Connection>,
    timeout: Option<u64>,
}

impl CliChannel {
    /// Wrap a connection
    pub fn new(connection: Box<dyn Connection>) -> Self {
        Self {
            connection,
            timeout: None,
        }
    }

    /// Per-command timeout in seconds
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Some(secs);
        self
    }

    /// Identifier of the underlying connection
    pub fn identifier(&self) -> &str {
        self.connection.identifier()
    }

    /// Whether the underlying connection is usable
    pub async fn is_alive(&self) -> bool {
        self.connection.is_alive().await
    }

    /// Run `command` and return its output lines.
    ///
    /// Anything on stderr, or the CLI failure marker anywhere in stdout, is an
    /// [`Error::Execution`]. Prompts are cut from the start of every line and
    /// the final line, the trailing prompt, is dropped.
    pub async fn execute(&self, command: &str) -> Result<Vec<String>> {
        debug!(host = %self.identifier(), command = %command, "Executing command");

        let options = ExecuteOptions {
            timeout: self.timeout,
        };
        let result = self.connection.execute(command, Some(options)).await?;

        if result.has_stderr() {
            error!(host = %self.identifier(), command = %command, stderr = %result.stderr, "Command failed");
            return Err(Error::execution(command, result.stderr));
        }
        if result.stdout.contains(FAILURE_MARKER) {
            error!(host = %self.identifier(), command = %command, output = %result.stdout, "Command failed");
            return Err(Error::execution(command, result.stdout));
        }

        Ok(clean_output(&result.stdout))
    }

    /// Close the underlying connection
    pub async fn close(&self) -> Result<()> {
        self.connection.close().await?;
        Ok(())
    }
}

impl std::fmt::Debug for CliChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CliChannel")
            .field("identifier", &self.identifier())
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Split CLI output into lines, strip prompts and drop the trailing line.
pub fn clean_output(stdout: &str) -> Vec<String> {
    let mut lines: Vec<String> = stdout
        .lines()
        .map(|line| {
            if PROMPT_RE.is_match(line) {
                line.split_once(" # ")
                    .map(|(_, rest)| rest)
                    .unwrap_or(line)
                    .to_string()
            } else {
                line.to_string()
            }
        })
        .collect();
    lines.pop();
    lines
}
