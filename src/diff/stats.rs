//! Summary statistics for generated command scripts.

use colored::Colorize;
use serde::Serialize;
use std::fmt;

/// Counts of the statements in a command script
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScriptStats {
    /// `set` statements
    pub sets: usize,
    /// `unset` statements
    pub unsets: usize,
    /// `delete` statements
    pub deletes: usize,
    /// `config`/`edit` statements entering a block
    pub blocks: usize,
}

impl ScriptStats {
    /// Create a new empty stats instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Count the statements of `script`.
    ///
    /// Continuation lines of multi-line values are not statements and are
    /// skipped. A vdom selector counts as blocks.
    pub fn from_script(script: &str) -> Self {
        let mut stats = Self::new();
        for line in script.lines().map(str::trim_start) {
            if line.starts_with("set ") {
                stats.sets += 1;
            } else if line.starts_with("unset ") {
                stats.unsets += 1;
            } else if line.starts_with("delete ") {
                stats.deletes += 1;
            } else if line.starts_with("config ") || line.starts_with("edit ") {
                stats.blocks += 1;
            }
        }
        stats
    }

    /// Check if the script changes anything
    pub fn has_changes(&self) -> bool {
        self.total_changes() > 0
    }

    /// Number of statements that modify the device
    pub fn total_changes(&self) -> usize {
        self.sets + self.unsets + self.deletes
    }

    /// Merge statistics from another instance
    pub fn merge(&mut self, other: &ScriptStats) {
        self.sets += other.sets;
        self.unsets += other.unsets;
        self.deletes += other.deletes;
        self.blocks += other.blocks;
    }

    /// Format as a short summary string
    pub fn short_summary(&self) -> String {
        format!(
            "{} set, {} unset, {} delete",
            self.sets, self.unsets, self.deletes
        )
    }

    /// Format as a colored short summary
    pub fn short_summary_colored(&self) -> String {
        if !self.has_changes() {
            return "No changes".bright_black().to_string();
        }
        format!(
            "{} {} {}",
            format!("{} set", self.sets).green(),
            format!("{} unset", self.unsets).yellow(),
            format!("{} delete", self.deletes).red()
        )
    }
}

impl fmt::Display for ScriptStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.short_summary())
    }
}
