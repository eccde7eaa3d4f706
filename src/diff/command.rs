//! Derive the CLI commands that turn one configuration tree into another.

use crate::tree::render::{indent, render, PARAM_OFFSET};
use crate::tree::{ConfigTree, NodeId};

/// Vdom that selects the global configuration scope.
pub const GLOBAL_VDOM: &str = "global";

/// Opening and closing text of the vdom selector for a top-level script.
pub fn vdom_selector(vdom: Option<&str>) -> (String, &'static str) {
    match vdom {
        Some(GLOBAL_VDOM) => ("config global\n".to_string(), "end"),
        Some(name) => (format!("config vdom\n  edit {name}\n"), "end"),
        None => (String::new(), ""),
    }
}

/// Commands that turn `running` into `target`.
///
/// Returns an empty string when the trees are equivalent. When `running`
/// is scoped to a vdom the script is wrapped in the matching selector.
pub fn compare(running: &ConfigTree, target: &ConfigTree) -> String {
    diff_blocks(running, running.root(), target, target.root(), 0)
}

/// Commands that turn block `a` of `running` into block `b` of `target`.
///
/// The outer block is reached through its full keyword path from the root,
/// nested blocks relative to their parent. The vdom selector of `running` is
/// applied only at indentation level zero.
pub fn diff_blocks(
    running: &ConfigTree,
    a: NodeId,
    target: &ConfigTree,
    b: NodeId,
    indent_level: usize,
) -> String {
    let text = diff_node(running, a, target, b, false, indent_level);
    if text.is_empty() || indent_level != 0 {
        return text;
    }
    let (pre, post) = vdom_selector(running.vdom());
    format!("{pre}{text}{post}")
}

fn diff_node(
    running: &ConfigTree,
    a: NodeId,
    target: &ConfigTree,
    b: NodeId,
    relative: bool,
    indent_level: usize,
) -> String {
    let pad = indent(indent_level);
    let mine = running.node(a);
    let theirs = target.node(b);
    let mut text = String::new();

    for (name, value) in mine.params() {
        match theirs.param(name) {
            None => text.push_str(&format!("{PARAM_OFFSET}{pad}unset {name}\n")),
            Some(wanted) if !same_value(value, wanted) => {
                text.push_str(&format!("{PARAM_OFFSET}{pad}set {name} {wanted}\n"));
            }
            Some(_) => {}
        }
    }
    for (name, wanted) in theirs.params() {
        if !mine.has_param(name) {
            text.push_str(&format!("{PARAM_OFFSET}{pad}set {name} {wanted}\n"));
        }
    }

    for (name, child) in mine.children() {
        match theirs.child(name) {
            None => text.push_str(&format!("{PARAM_OFFSET}{pad}delete {name}\n")),
            Some(other) => {
                text.push_str(&diff_node(running, child, target, other, true, indent_level + 1));
            }
        }
    }
    for (name, child) in theirs.children() {
        if mine.child(name).is_none() {
            text.push_str(&render(target, child, true, indent_level + 1, true));
        }
    }

    if text.is_empty() {
        return text;
    }

    let (fwd, bwd) = if relative {
        (running.rel_open(a), running.rel_close(a))
    } else {
        (running.full_open(a), running.full_close(a))
    };
    format!("{pad}{fwd}{text}{pad}{bwd}")
}

/// Parameter values compare equal once all double quotes are removed.
fn same_value(a: &str, b: &str) -> bool {
    a.chars().filter(|&c| c != '"').eq(b.chars().filter(|&c| c != '"'))
}
