//! Line-oriented diffs of rendered trees, for human review.

use colored::Colorize;
use similar::{ChangeTag, TextDiff};

use crate::tree::ConfigTree;

/// Type of change in a diff line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeType {
    /// Line only in the candidate
    Insert,
    /// Line only in the running config
    Delete,
    /// Line in both
    Equal,
}

impl ChangeType {
    /// Two-character prefix used in plain text output
    pub fn prefix(self) -> &'static str {
        match self {
            ChangeType::Insert => "+ ",
            ChangeType::Delete => "- ",
            ChangeType::Equal => "  ",
        }
    }
}

impl From<ChangeTag> for ChangeType {
    fn from(tag: ChangeTag) -> Self {
        match tag {
            ChangeTag::Insert => ChangeType::Insert,
            ChangeTag::Delete => ChangeType::Delete,
            ChangeTag::Equal => ChangeType::Equal,
        }
    }
}

/// A single line in a text diff
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffLine {
    /// The content of the line, without its newline
    pub content: String,
    /// The type of change
    pub change_type: ChangeType,
}

/// Compare the full rendering of two trees line by line.
pub fn text_diff_lines(running: &ConfigTree, candidate: &ConfigTree) -> Vec<DiffLine> {
    let old = running.to_text();
    let new = candidate.to_text();
    let diff = TextDiff::from_lines(&old, &new);
    let lines = diff
        .iter_all_changes()
        .map(|change| DiffLine {
            content: change.value().trim_end_matches('\n').to_string(),
            change_type: change.tag().into(),
        })
        .collect();
    lines
}

/// Plain text diff: every line prefixed with `"  "`, `"- "` or `"+ "`.
pub fn text_diff(running: &ConfigTree, candidate: &ConfigTree) -> String {
    text_diff_lines(running, candidate)
        .iter()
        .map(|line| format!("{}{}", line.change_type.prefix(), line.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Text diff colored for a terminal.
pub fn colored_text_diff(running: &ConfigTree, candidate: &ConfigTree) -> String {
    text_diff_lines(running, candidate)
        .iter()
        .map(|line| {
            let text = format!("{}{}", line.change_type.prefix(), line.content);
            match line.change_type {
                ChangeType::Insert => text.green().to_string(),
                ChangeType::Delete => text.red().to_string(),
                ChangeType::Equal => text,
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Unified diff (`---`/`+++`/`@@`) of the two renderings.
pub fn unified_diff(running: &ConfigTree, candidate: &ConfigTree, context_lines: usize) -> String {
    let old = running.to_text();
    let new = candidate.to_text();
    let diff = TextDiff::from_lines(&old, &new);
    let unified = diff
        .unified_diff()
        .context_radius(context_lines)
        .header(running.name(), candidate.name())
        .to_string();
    unified
}
