//! Render configuration trees back into CLI text.

use super::{ConfigTree, NodeId};

/// Spaces per nesting level.
pub const INDENT_WIDTH: usize = 4;

/// Extra offset for `set`/`unset`/`delete` lines inside a block.
pub const PARAM_OFFSET: &str = "  ";

/// Indentation for a nesting level.
pub fn indent(level: usize) -> String {
    " ".repeat(INDENT_WIDTH * level)
}

/// Render the block `id` and everything below it.
///
/// With `relative` the block is wrapped in its own `config`/`edit` line only;
/// otherwise it is wrapped in the full chain of keywords from the root.
/// Children are always rendered relative to their parent, one level deeper.
/// With `collapse_empty` a block that produced no lines renders as nothing
/// instead of an empty wrapper.
pub fn render(
    tree: &ConfigTree,
    id: NodeId,
    relative: bool,
    indent_level: usize,
    collapse_empty: bool,
) -> String {
    let (fwd, bwd) = if relative {
        (tree.rel_open(id), tree.rel_close(id))
    } else {
        (tree.full_open(id), tree.full_close(id))
    };
    let pad = indent(indent_level);
    let node = tree.node(id);

    let mut text = String::new();
    for (name, value) in node.params() {
        text.push_str(&format!("{PARAM_OFFSET}{pad}set {name} {value}\n"));
    }
    for (_, child) in node.children() {
        text.push_str(&render(tree, child, true, indent_level + 1, false));
    }

    if text.is_empty() && collapse_empty {
        return text;
    }
    format!("{pad}{fwd}{text}{pad}{bwd}")
}
