//! Line-oriented parser for block-structured configuration text.
//!
//! Only five statements are recognized (`config`, `edit`, `set`, `end` and
//! `next`); any other line, such as banners, prompts or blank lines, is
//! skipped. Parsing mutates an existing tree in place, so loading the same
//! path twice merges into the blocks that are already there.
//!
//! Command scripts produced by the differ use the same grammar plus `unset`
//! and `delete`; see [`Grammar::Script`].

use super::{BlockKind, ConfigTree, NodeId};
use thiserror::Error;
use tracing::trace;

/// Fields generated by the device that can never be set by hand.
pub const IGNORED_FIELDS: [&str; 2] = ["uuid", "snmp-index"];

/// Errors raised for malformed configuration text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// `end` was found with no enclosing `config` block.
    #[error("line {line}: 'end' without an enclosing config block")]
    UnmatchedEnd {
        /// 1-based line number
        line: usize,
    },

    /// `next` was found at the top of the tree being parsed.
    #[error("line {line}: 'next' without an enclosing block")]
    UnmatchedNext {
        /// 1-based line number
        line: usize,
    },

    /// `set <field>` with nothing after the field name.
    #[error("line {line}: missing value for field '{field}'")]
    MissingValue {
        /// 1-based line number
        line: usize,
        /// Field name
        field: String,
    },

    /// Input ended inside a quoted multi-line value.
    #[error("line {line}: unterminated multi-line value for field '{field}'")]
    UnterminatedValue {
        /// 1-based line number where the value started
        line: usize,
        /// Field name
        field: String,
    },
}

/// Result type for parsing.
pub type ParseResult<T> = std::result::Result<T, ParseError>;

/// Statement set accepted by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Grammar {
    /// Configuration as printed by `show`
    #[default]
    Config,
    /// Configuration plus `unset <field>` and `delete <block>`
    Script,
}

/// A recognized statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Statement<'a> {
    Open(BlockKind, &'a str),
    Set(&'a str),
    Unset(&'a str),
    Delete(&'a str),
    Next,
    End,
}

impl<'a> Statement<'a> {
    /// Classify a trimmed line. `None` means the line is not a statement.
    fn classify(line: &'a str, grammar: Grammar) -> Option<Self> {
        if grammar == Grammar::Script {
            if let Some(rest) = line.strip_prefix("unset ") {
                return Some(Statement::Unset(rest.trim()));
            }
            if let Some(rest) = line.strip_prefix("delete ") {
                return Some(Statement::Delete(rest.trim()));
            }
        }

        if let Some(rest) = line.strip_prefix("config ") {
            Some(Statement::Open(BlockKind::Config, rest.trim()))
        } else if let Some(rest) = line.strip_prefix("edit ") {
            Some(Statement::Open(BlockKind::Edit, rest.trim()))
        } else if let Some(rest) = line.strip_prefix("set ") {
            Some(Statement::Set(rest.trim()))
        } else if line == "next" {
            Some(Statement::Next)
        } else if line == "end" {
            Some(Statement::End)
        } else {
            None
        }
    }
}

/// Remove one pair of surrounding double quotes, if present.
pub fn unquote(name: &str) -> &str {
    name.strip_prefix('"')
        .and_then(|n| n.strip_suffix('"'))
        .unwrap_or(name)
}

/// True when `text` ends with a `"` that is not escaped by a backslash.
fn ends_with_unescaped_quote(text: &str) -> bool {
    match text.strip_suffix('"') {
        Some(head) => !head.ends_with('\\'),
        None => false,
    }
}

/// True when `value` opens and closes its quotes on the same line.
fn is_complete_quoted(value: &str) -> bool {
    value.len() >= 2 && value.starts_with('"') && ends_with_unescaped_quote(value)
}

/// Parse `lines` into the subtree rooted at `into`.
pub fn parse_lines<S: AsRef<str>>(
    tree: &mut ConfigTree,
    into: NodeId,
    lines: &[S],
) -> ParseResult<()> {
    parse_with(tree, into, lines, Grammar::Config)
}

/// Parse `lines` into the subtree rooted at `into` using `grammar`.
pub fn parse_with<S: AsRef<str>>(
    tree: &mut ConfigTree,
    into: NodeId,
    lines: &[S],
    grammar: Grammar,
) -> ParseResult<()> {
    let mut cursor = into;
    let mut index = 0;

    while index < lines.len() {
        let line_no = index + 1;
        let line = lines[index].as_ref().trim();
        index += 1;

        let Some(statement) = Statement::classify(line, grammar) else {
            continue;
        };

        match statement {
            Statement::Open(kind, data) => {
                // `edit ""` keeps its quotes so the block still renders.
                let name = match unquote(data) {
                    "" => data,
                    name => name,
                };
                cursor = tree.add_block(cursor, name, kind);
            }
            Statement::Unset(field) => {
                tree.del_param(cursor, field);
            }
            Statement::Delete(data) => {
                tree.del_block(cursor, unquote(data));
            }
            Statement::Next => {
                cursor = tree
                    .node(cursor)
                    .parent()
                    .ok_or(ParseError::UnmatchedNext { line: line_no })?;
            }
            Statement::End => {
                // `end` closes a config block but may arrive while edit blocks
                // below it are still open; unwind those first.
                while tree.node(cursor).kind() != BlockKind::Config {
                    cursor = tree
                        .node(cursor)
                        .parent()
                        .ok_or(ParseError::UnmatchedEnd { line: line_no })?;
                }
                cursor = tree
                    .node(cursor)
                    .parent()
                    .ok_or(ParseError::UnmatchedEnd { line: line_no })?;
            }
            Statement::Set(data) => {
                let (field, value) = match data.split_once(char::is_whitespace) {
                    Some((field, value)) => (field, value.trim_start()),
                    None => (data, ""),
                };

                if IGNORED_FIELDS.contains(&field) {
                    trace!(field, line = line_no, "Skipping system generated field");
                    continue;
                }
                if value.is_empty() {
                    return Err(ParseError::MissingValue {
                        line: line_no,
                        field: field.to_string(),
                    });
                }

                if !value.contains('"') || is_complete_quoted(value) {
                    tree.set_param(cursor, field, value);
                    continue;
                }

                let mut complete = vec![value.to_string()];
                loop {
                    let Some(next) = lines.get(index) else {
                        return Err(ParseError::UnterminatedValue {
                            line: line_no,
                            field: field.to_string(),
                        });
                    };
                    index += 1;
                    let next = next.as_ref();
                    complete.push(next.to_string());
                    if ends_with_unescaped_quote(next.trim_end()) {
                        break;
                    }
                }
                tree.set_param(cursor, field, complete.join("\n"));
            }
        }
    }

    Ok(())
}
