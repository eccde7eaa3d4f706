//! Apply a generated command script to an in-memory tree.
//!
//! This is how a commit can be previewed offline: the script that would be
//! sent to the device is replayed against a copy of the running tree.

use super::parser::{self, Grammar, ParseResult};
use super::ConfigTree;
use tracing::debug;

/// Apply `script` (`set`, `unset` and `delete` inside `config`/`edit`
/// wrappers) to `tree`.
///
/// A vdom selector around the whole script is removed first when it matches
/// the tree's vdom.
pub fn apply_script(tree: &mut ConfigTree, script: &str) -> ParseResult<()> {
    let lines: Vec<&str> = script.lines().collect();
    let body = strip_vdom_selector(&lines, tree.vdom());
    debug!(
        lines = body.len(),
        vdom = tree.vdom().unwrap_or_default(),
        "Applying script to tree"
    );
    let root = tree.root();
    parser::parse_with(tree, root, body, Grammar::Script)
}

/// Remove the `config global` / `config vdom` + `edit <vdom>` selector that
/// wraps a top-level script for a vdom-scoped tree.
pub fn strip_vdom_selector<'a, 'b>(lines: &'a [&'b str], vdom: Option<&str>) -> &'a [&'b str] {
    let Some(vdom) = vdom else {
        return lines;
    };
    if lines.last().map(|l| l.trim()) != Some("end") {
        return lines;
    }

    let first = lines.first().map(|l| l.trim());
    let (header, opened) = if vdom == "global" {
        (1, first == Some("config global"))
    } else {
        let edit = lines
            .get(1)
            .and_then(|l| l.trim().strip_prefix("edit "))
            .map(|name| parser::unquote(name.trim()));
        (2, first == Some("config vdom") && edit == Some(vdom))
    };

    if opened && lines.len() > header {
        &lines[header..lines.len() - 1]
    } else {
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_set_unset_delete() {
        let mut tree = ConfigTree::new("running");
        tree.parse_config_output(
            "config router bgp\nset as 1\nset router-id 1.1.1.1\nconfig neighbor\nedit \"10.0.0.1\"\nset remote-as 2\nnext\nend\nend\n",
        )
        .unwrap();

        apply_script(
            &mut tree,
            "config router bgp\n  unset router-id\n  set as 65001\n    config neighbor\n      delete 10.0.0.1\n        edit 10.0.0.2\n          set remote-as 3\n        next\n    end\nend\n",
        )
        .unwrap();

        let bgp = tree.find(&["router bgp"]).unwrap();
        assert_eq!(tree.node(bgp).param("as"), Some("65001"));
        assert!(!tree.node(bgp).has_param("router-id"));
        let neighbors = tree.find(&["router bgp", "neighbor"]).unwrap();
        let names: Vec<_> = tree.node(neighbors).block_names().collect();
        assert_eq!(names, vec!["10.0.0.2"]);
    }

    #[test]
    fn test_strip_global_selector() {
        let lines = vec!["config global", "config system global", "  set hostname a", "end", "end"];
        assert_eq!(
            strip_vdom_selector(&lines, Some("global")),
            &["config system global", "  set hostname a", "end"]
        );
        assert_eq!(strip_vdom_selector(&lines, None).len(), 5);
    }

    #[test]
    fn test_strip_named_vdom_selector() {
        let lines = vec!["config vdom", "  edit customer", "config system settings", "  set opmode nat", "end", "end"];
        assert_eq!(
            strip_vdom_selector(&lines, Some("customer")),
            &["config system settings", "  set opmode nat", "end"]
        );
        assert_eq!(strip_vdom_selector(&lines, Some("other")).len(), 6);
    }

    #[test]
    fn test_apply_scoped_script() {
        let mut tree = ConfigTree::with_vdom("running", Some("global".to_string()));
        apply_script(
            &mut tree,
            "config global\nconfig system global\n  set hostname fw1\nend\nend",
        )
        .unwrap();
        let global = tree.find(&["system global"]).unwrap();
        assert_eq!(tree.node(global).param("hostname"), Some("fw1"));
        assert!(tree.find(&["global"]).is_none());
    }
}
