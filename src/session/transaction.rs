//! Commit, retry and rollback.
//!
//! A commit pushes a script inside a batch, reads the batch log back and
//! reloads the running configuration from the device. Statements failing
//! with a transient code are resubmitted with a freshly computed script until
//! the retry budget runs out. Whatever still fails either triggers a rollback
//! to the snapshot taken before the commit or, for forced commits, is only
//! reported.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, warn};

use super::batch::{batch_command, lastlog_command, parse_batch_lastlog, FailedCommand};
use super::{FortiDevice, LoadInto};
use crate::diff;
use crate::error::{Error, Result};
use crate::tree::ConfigTree;

/// Where the controller is in a load or commit cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionState {
    /// Nothing in progress
    Idle,
    /// Fetching configuration from the device
    Loading,
    /// Computing the script to send
    Diffing,
    /// Batch sent, waiting for the device
    Executing,
    /// Reading the batch log
    Verifying,
    /// Resubmitting after transient failures
    Retrying,
    /// Last commit applied cleanly
    Committed,
    /// Restoring the pre-commit snapshot
    RollingBack,
    /// Forced commit finished with failures left in place
    CommittedWithErrors,
    /// Last operation failed
    Fatal,
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransactionState::Idle => "idle",
            TransactionState::Loading => "loading",
            TransactionState::Diffing => "diffing",
            TransactionState::Executing => "executing",
            TransactionState::Verifying => "verifying",
            TransactionState::Retrying => "retrying",
            TransactionState::Committed => "committed",
            TransactionState::RollingBack => "rollingback",
            TransactionState::CommittedWithErrors => "committedwitherrors",
            TransactionState::Fatal => "fatal",
        };
        write!(f, "{}", s)
    }
}

/// Outcome of a commit or rollback that did not raise
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitReport {
    /// Statements still failing after the last attempt
    pub failed_commands: Vec<FailedCommand>,
    /// Batches sent to the device
    pub attempts: u32,
    /// Whether this report describes a rollback that restored the snapshot
    pub rolled_back: bool,
}

impl CommitReport {
    /// True when nothing failed
    pub fn is_clean(&self) -> bool {
        self.failed_commands.is_empty()
    }
}

/// What to send on each attempt
#[derive(Debug, Clone)]
enum ScriptSource {
    /// Diff from running to candidate, recomputed every attempt
    Candidate,
    /// Diff from running to the snapshot, recomputed every attempt
    Snapshot,
    /// Caller-supplied script, resent as is
    Explicit(String),
}

impl FortiDevice {
    /// Push changes to the device.
    ///
    /// Without `config_text` the script is the diff from running to
    /// candidate. On success the running tree mirrors the device again and
    /// the previous running tree is kept as the rollback snapshot; the
    /// candidate is left untouched.
    ///
    /// When statements keep failing and `force` is false, the changes are
    /// rolled back and [`Error::CommitFailed`] is returned. With `force` the
    /// failures are only reported in the returned [`CommitReport`].
    pub async fn commit(&mut self, config_text: Option<&str>, force: bool) -> Result<CommitReport> {
        info!(host = %self.hostname, vdom = ?self.vdom, force, explicit = config_text.is_some(), "Committing config");
        let source = match config_text {
            Some(text) => ScriptSource::Explicit(text.to_string()),
            None => ScriptSource::Candidate,
        };

        let report = match self.run_transaction(&source, true).await {
            Ok(report) => report,
            Err(e) => {
                self.transition(TransactionState::Fatal);
                return Err(e);
            }
        };

        if report.is_clean() {
            self.transition(TransactionState::Committed);
            return Ok(report);
        }

        if force {
            warn!(
                host = %self.hostname,
                failed = report.failed_commands.len(),
                "Forced commit left failed commands in place"
            );
            for failed in &report.failed_commands {
                warn!(host = %self.hostname, code = failed.code, command = %failed.command, "Failed command");
            }
            self.transition(TransactionState::CommittedWithErrors);
            return Ok(report);
        }

        self.transition(TransactionState::RollingBack);
        let rolled_back = match self.rollback_inner().await {
            Ok(rollback) => rollback.is_clean(),
            Err(e) => {
                warn!(host = %self.hostname, error = %e, "Rollback failed");
                false
            }
        };
        self.transition(TransactionState::Fatal);

        Err(Error::CommitFailed {
            failed: report.failed_commands,
            rolled_back,
        })
    }

    /// Restore the snapshot taken by the last commit.
    ///
    /// The diff from running to the snapshot is force-applied; the snapshot
    /// itself is kept. Returns a clean report without contacting the device
    /// when there is nothing to undo.
    pub async fn rollback(&mut self) -> Result<CommitReport> {
        self.transition(TransactionState::RollingBack);
        match self.rollback_inner().await {
            Ok(report) => {
                self.transition(if report.is_clean() {
                    TransactionState::Committed
                } else {
                    TransactionState::CommittedWithErrors
                });
                Ok(report)
            }
            Err(e) => {
                self.transition(TransactionState::Fatal);
                Err(e)
            }
        }
    }

    async fn rollback_inner(&mut self) -> Result<CommitReport> {
        if self.original.is_none() {
            return Err(Error::NoSnapshot);
        }
        info!(host = %self.hostname, vdom = ?self.vdom, "Rolling back changes");

        let mut report = self.run_transaction(&ScriptSource::Snapshot, false).await?;
        report.rolled_back = report.is_clean();
        if !report.is_clean() {
            warn!(
                host = %self.hostname,
                failed = report.failed_commands.len(),
                "Rollback left failed commands in place"
            );
        }
        Ok(report)
    }

    /// Send the script, then retry transient failures within the budget.
    async fn run_transaction(&mut self, source: &ScriptSource, snapshot: bool) -> Result<CommitReport> {
        self.transition(TransactionState::Diffing);
        let script = self.script_for(source);
        if script.trim().is_empty() {
            info!(host = %self.hostname, "Nothing to commit");
            return Ok(CommitReport::default());
        }

        let mut failed = self.execute_batch(&script).await?;
        let mut attempts = 1;
        self.reload_running(snapshot).await?;

        let mut retries = 0;
        while retries < self.policy.max_retries && self.policy.should_retry(&failed) {
            retries += 1;
            self.transition(TransactionState::Retrying);
            warn!(
                host = %self.hostname,
                retry = retries,
                max_retries = self.policy.max_retries,
                failed = failed.len(),
                "Transient failures, resubmitting"
            );

            self.transition(TransactionState::Diffing);
            let script = self.script_for(source);
            if script.trim().is_empty() {
                failed.clear();
                break;
            }
            failed = self.execute_batch(&script).await?;
            attempts += 1;
            self.reload_running(false).await?;
        }

        Ok(CommitReport {
            failed_commands: failed,
            attempts,
            rolled_back: false,
        })
    }

    fn script_for(&self, source: &ScriptSource) -> String {
        match source {
            ScriptSource::Candidate => diff::compare(&self.running, &self.candidate),
            ScriptSource::Snapshot => self
                .original
                .as_ref()
                .map(|original| diff::compare(&self.running, original))
                .unwrap_or_default(),
            ScriptSource::Explicit(text) => text.clone(),
        }
    }

    /// Send one batch and return the statements that failed.
    async fn execute_batch(&mut self, script: &str) -> Result<Vec<FailedCommand>> {
        self.transition(TransactionState::Executing);
        let vdom = self.vdom.clone();
        self.execute_command(&batch_command(vdom.as_deref(), script))
            .await?;

        self.transition(TransactionState::Verifying);
        let log = self.execute_command(&lastlog_command(vdom.as_deref())).await?;
        Ok(parse_batch_lastlog(&log))
    }

    /// Rebuild the running tree from the device.
    ///
    /// With `snapshot` the current running tree becomes the rollback
    /// snapshot first.
    async fn reload_running(&mut self, snapshot: bool) -> Result<()> {
        let paths = self.running.paths();
        let fresh = ConfigTree::with_vdom("running", self.vdom.clone());
        let mut previous = std::mem::replace(&mut self.running, fresh);

        if snapshot {
            let root = previous.root();
            previous.set_name(root, "original");
            self.original = Some(previous);
        }

        for path in &paths {
            self.fetch(path, LoadInto::Running).await?;
        }
        Ok(())
    }
}
