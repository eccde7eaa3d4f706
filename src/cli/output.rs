//! Terminal output for the CLI.
//!
//! Results go to stdout, diagnostics to stderr, so scripts can be piped
//! straight into other tools.

use colored::Colorize;
use serde::Serialize;

use fortisync::diff::ScriptStats;
use fortisync::session::CommitReport;

/// Output formatter for human and JSON modes
pub struct OutputFormatter {
    /// Use colored output
    use_color: bool,
    /// JSON output mode
    json_mode: bool,
    /// Verbosity level
    verbosity: u8,
}

impl OutputFormatter {
    /// Create a new output formatter
    pub fn new(use_color: bool, json_mode: bool, verbosity: u8) -> Self {
        // Respect NO_COLOR environment variable
        let use_color = use_color && std::env::var("NO_COLOR").is_err();

        Self {
            use_color,
            json_mode,
            verbosity,
        }
    }

    /// Switch JSON mode on or off
    pub fn set_json(&mut self, json_mode: bool) {
        self.json_mode = json_mode;
    }

    /// Whether colors are enabled
    pub fn use_color(&self) -> bool {
        self.use_color
    }

    /// Print an error message
    pub fn error(&self, message: &str) {
        if self.json_mode {
            let err = serde_json::json!({ "type": "error", "message": message });
            eprintln!("{}", err);
            return;
        }

        if self.use_color {
            eprintln!("{} {}", "ERROR:".red().bold(), message);
        } else {
            eprintln!("ERROR: {}", message);
        }
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.json_mode {
            let warn = serde_json::json!({ "type": "warning", "message": message });
            eprintln!("{}", warn);
            return;
        }

        if self.use_color {
            eprintln!("{} {}", "WARNING:".yellow().bold(), message);
        } else {
            eprintln!("WARNING: {}", message);
        }
    }

    /// Print an info message (respects verbosity)
    pub fn info(&self, message: &str) {
        if self.verbosity < 1 || self.json_mode {
            return;
        }

        if self.use_color {
            eprintln!("{} {}", "INFO:".blue(), message);
        } else {
            eprintln!("INFO: {}", message);
        }
    }

    /// Print a change summary to stderr, keeping stdout a clean script
    pub fn stats(&self, stats: &ScriptStats) {
        if self.json_mode {
            let summary = serde_json::json!({ "type": "stats", "stats": stats });
            eprintln!("{}", summary);
        } else if self.use_color {
            eprintln!("{}", stats.short_summary_colored());
        } else {
            eprintln!("{}", stats.short_summary());
        }
    }

    /// Print a section header
    pub fn section(&self, title: &str) {
        if self.json_mode {
            return;
        }

        if self.use_color {
            println!("{}", title.cyan().bold());
        } else {
            println!("{}", title);
        }
    }

    /// Print configuration text as is
    pub fn plain(&self, text: &str) {
        if text.ends_with('\n') || text.is_empty() {
            print!("{}", text);
        } else {
            println!("{}", text);
        }
    }

    /// Print a command script, coloring the statements by effect
    pub fn script(&self, script: &str) {
        if !self.use_color {
            self.plain(script);
            return;
        }

        for line in script.lines() {
            let statement = line.trim_start();
            let colored = if statement.starts_with("set ") {
                line.green().to_string()
            } else if statement.starts_with("unset ") || statement.starts_with("delete ") {
                line.red().to_string()
            } else {
                line.normal().to_string()
            };
            println!("{}", colored);
        }
    }

    /// Print any serializable value as pretty JSON
    pub fn json<T: Serialize>(&self, value: &T) {
        match serde_json::to_string_pretty(value) {
            Ok(text) => println!("{}", text),
            Err(e) => self.error(&format!("Failed to serialize output: {}", e)),
        }
    }

    /// Print the outcome of a commit or rollback
    pub fn report(&self, report: &CommitReport) {
        if self.json_mode {
            self.json(report);
            return;
        }

        if report.is_clean() {
            let line = format!("Committed in {} attempt(s)", report.attempts);
            if self.use_color {
                println!("{}", line.green());
            } else {
                println!("{}", line);
            }
            return;
        }

        self.warning(&format!(
            "{} command(s) still failing after {} attempt(s)",
            report.failed_commands.len(),
            report.attempts
        ));
        for failed in &report.failed_commands {
            if self.use_color {
                println!("  {} {}", failed.code.to_string().red(), failed.command);
            } else {
                println!("  {} {}", failed.code, failed.command);
            }
        }
    }
}
