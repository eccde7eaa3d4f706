//! Differences between configuration trees
//!
//! This module provides two kinds of diff:
//! - Command scripts: the `set`/`unset`/`delete` statements that transform
//!   a running tree into a target tree, ready to be sent to a device
//! - Text diffs of the rendered trees, for human review (plain, colored and
//!   unified)
//!
//! # Example
//!
//! ```rust
//! use fortisync::diff;
//! use fortisync::tree::ConfigTree;
//!
//! let mut running = ConfigTree::new("running");
//! running.parse_config_output("config system dns\n  set primary 8.8.8.8\nend\n").unwrap();
//! let mut candidate = running.clone();
//! let dns = candidate.find(&["system dns"]).unwrap();
//! candidate.set_param(dns, "primary", "1.1.1.1");
//!
//! let script = diff::compare(&running, &candidate);
//! assert!(script.contains("set primary 1.1.1.1"));
//! assert_eq!(diff::compare(&running, &running), "");
//! ```

mod command;
mod stats;
mod text;

pub use command::{compare, diff_blocks, vdom_selector, GLOBAL_VDOM};
pub use stats::ScriptStats;
pub use text::{colored_text_diff, text_diff, text_diff_lines, unified_diff, ChangeType, DiffLine};
