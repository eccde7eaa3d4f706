//! Batch envelope, result log parsing and retry policy.
//!
//! Scripts are pushed inside `execute batch start` / `execute batch end` so
//! the device applies them in one go; `execute batch lastlog` then prints one
//! `<code>: <command>` line per statement, where a negative code marks a
//! failed statement.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::diff::GLOBAL_VDOM;

static LASTLOG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(-?[0-9]\d*):\W+(.*)").expect("valid lastlog regex"));

/// Failure codes that go away when the same change is resubmitted.
pub const DEFAULT_RETRY_CODES: [i64; 2] = [-3, -23];

/// Resubmissions allowed after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// A statement the device reported as failed in the batch log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedCommand {
    /// Negative status code
    pub code: i64,
    /// The statement as echoed by the device
    pub command: String,
}

impl FailedCommand {
    /// Create a new failed command
    pub fn new(code: i64, command: impl Into<String>) -> Self {
        Self {
            code,
            command: command.into(),
        }
    }
}

impl fmt::Display for FailedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.command)
    }
}

/// How failed batches are retried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommitPolicy {
    /// Resubmissions allowed after the first attempt
    pub max_retries: u32,
    /// Codes considered transient
    pub retry_codes: Vec<i64>,
}

impl Default for CommitPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            retry_codes: DEFAULT_RETRY_CODES.to_vec(),
        }
    }
}

impl CommitPolicy {
    /// Whether `code` is transient
    pub fn is_retryable(&self, code: i64) -> bool {
        self.retry_codes.contains(&code)
    }

    /// Whether any of `failed` should be resubmitted
    pub fn should_retry(&self, failed: &[FailedCommand]) -> bool {
        failed.iter().any(|f| self.is_retryable(f.code))
    }
}

/// Prefix that moves a device command into the global scope when a vdom is
/// selected.
fn global_prefix(vdom: Option<&str>) -> &'static str {
    if vdom.is_some() {
        "config global\n    "
    } else {
        ""
    }
}

/// Wrap `script` in the batch envelope.
pub fn batch_command(vdom: Option<&str>, script: &str) -> String {
    let enter_vdom = match vdom {
        Some(name) if name != GLOBAL_VDOM => format!("config vdom\n  edit {name}\n"),
        _ => String::new(),
    };
    format!(
        "{}execute batch start\n{}{}\nexecute batch end\n",
        global_prefix(vdom),
        enter_vdom,
        script
    )
}

/// Command that prints the result log of the last batch.
pub fn lastlog_command(vdom: Option<&str>) -> String {
    format!("{}execute batch lastlog", global_prefix(vdom))
}

/// Command that prints the configuration under `path`.
pub fn show_command(vdom: Option<&str>, path: &str) -> String {
    match vdom {
        Some(GLOBAL_VDOM) => format!("config global\nshow {path}\nend"),
        Some(name) => format!("config vdom\nedit {name}\nshow {path}\nend"),
        None => format!("show {path}"),
    }
}

/// Extract the failed statements from a batch result log.
pub fn parse_batch_lastlog<S: AsRef<str>>(lines: &[S]) -> Vec<FailedCommand> {
    lines
        .iter()
        .filter_map(|line| LASTLOG_RE.captures(line.as_ref()))
        .filter_map(|caps| {
            let code = lastlog_code(&caps[1]);
            (code < 0).then(|| FailedCommand::new(code, &caps[2]))
        })
        .collect()
}

/// Status code of one lastlog line. Codes too wide for `i64` saturate, so
/// an oversized negative code still counts as a failure.
fn lastlog_code(digits: &str) -> i64 {
    digits.parse().unwrap_or(if digits.starts_with('-') {
        i64::MIN
    } else {
        i64::MAX
    })
}
