//! Configuration tree model.
//!
//! A FortiOS-style configuration is a tree of blocks. Every block is either a
//! `config <name>` block (closed by `end`) or an `edit <name>` block (closed
//! by `next`). Blocks hold `set <field> <value>` parameters and nested blocks:
//!
//! ```text
//! config system interface
//!     edit "port1"
//!         set vdom "root"
//!         set mode dhcp
//!         set allowaccess ping
//!     next
//! end
//! ```
//!
//! The tree is stored as an arena: nodes live in a `Vec` owned by
//! [`ConfigTree`] and refer to each other through [`NodeId`] handles. A node
//! owns its children (an ordered map of name to handle) and keeps a plain
//! handle to its parent, so walking up to the root is cheap and there are no
//! reference cycles.
//!
//! # Example
//!
//! ```rust
//! use fortisync::tree::{BlockKind, ConfigTree};
//!
//! let mut tree = ConfigTree::new("running");
//! tree.parse_config_output("config router bgp\n    set as 65001\nend\n").unwrap();
//!
//! let bgp = tree.find(&["router bgp"]).unwrap();
//! assert_eq!(tree.node(bgp).param("as"), Some("65001"));
//!
//! let mut neighbor = ConfigTree::detached("10.6.6.6", BlockKind::Edit);
//! let root = neighbor.root();
//! neighbor.set_param(root, "remote-as", "666");
//!
//! let neighbors = tree.add_block(bgp, "neighbor", BlockKind::Config);
//! tree.set_block(neighbors, &neighbor);
//! assert!(tree.find(&["router bgp", "neighbor", "10.6.6.6"]).is_some());
//! ```

pub mod apply;
pub mod parser;
pub mod render;

pub use apply::apply_script;
pub use parser::{ParseError, ParseResult, IGNORED_FIELDS};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Handle to a node inside a [`ConfigTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Index of the node in its arena
    pub fn index(self) -> usize {
        self.0
    }
}

/// The kind of a configuration block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    /// The synthetic root of a tree. Has no keywords of its own.
    Root,
    /// `config <name>` ... `end`
    Config,
    /// `edit <name>` ... `next`
    Edit,
}

impl BlockKind {
    /// Opening keyword for the block kind (`None` for the root)
    pub fn open_keyword(self) -> Option<&'static str> {
        match self {
            BlockKind::Root => None,
            BlockKind::Config => Some("config"),
            BlockKind::Edit => Some("edit"),
        }
    }

    /// Closing keyword for the block kind (`None` for the root)
    pub fn close_keyword(self) -> Option<&'static str> {
        match self {
            BlockKind::Root => None,
            BlockKind::Config => Some("end"),
            BlockKind::Edit => Some("next"),
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockKind::Root => write!(f, "root"),
            BlockKind::Config => write!(f, "config"),
            BlockKind::Edit => write!(f, "edit"),
        }
    }
}

/// A single block of configuration.
#[derive(Debug, Clone)]
pub struct ConfigNode {
    name: String,
    kind: BlockKind,
    parent: Option<NodeId>,
    parameters: IndexMap<String, String>,
    children: IndexMap<String, NodeId>,
}

impl ConfigNode {
    fn new(name: impl Into<String>, kind: BlockKind, parent: Option<NodeId>) -> Self {
        Self {
            name: name.into(),
            kind,
            parent,
            parameters: IndexMap::new(),
            children: IndexMap::new(),
        }
    }

    /// Block name, e.g. `system interface` or `port1`
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Block kind
    pub fn kind(&self) -> BlockKind {
        self.kind
    }

    /// Enclosing block, `None` for the root
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    // --- parameters ---

    /// Literal value of a parameter (quotes preserved)
    pub fn param(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).map(String::as_str)
    }

    /// Whether the block has a parameter with this name
    pub fn has_param(&self, name: &str) -> bool {
        self.parameters.contains_key(name)
    }

    /// Iterate over `(name, value)` parameter pairs
    pub fn params(&self) -> impl Iterator<Item = (&str, &str)> {
        self.parameters
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Parameter names in iteration order
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.parameters.keys().map(String::as_str)
    }

    /// Number of parameters
    pub fn param_count(&self) -> usize {
        self.parameters.len()
    }

    // --- children ---

    /// Handle of the child block with this name
    pub fn child(&self, name: &str) -> Option<NodeId> {
        self.children.get(name).copied()
    }

    /// Iterate over `(name, handle)` child pairs in insertion order
    pub fn children(&self) -> impl Iterator<Item = (&str, NodeId)> {
        self.children.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Child block names in insertion order
    pub fn block_names(&self) -> impl Iterator<Item = &str> {
        self.children.keys().map(String::as_str)
    }

    /// Number of child blocks
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// True when the block holds neither parameters nor children
    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty() && self.children.is_empty()
    }
}

/// An arena-backed configuration tree.
///
/// The root node is always `NodeId(0)`. Removed blocks are unlinked from
/// their parent and never reachable again; their slots stay in the arena
/// until the tree is dropped.
#[derive(Debug, Clone)]
pub struct ConfigTree {
    nodes: Vec<ConfigNode>,
    vdom: Option<String>,
    loaded_paths: Vec<String>,
}

impl ConfigTree {
    /// Create an empty tree with a synthetic root.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            nodes: vec![ConfigNode::new(name, BlockKind::Root, None)],
            vdom: None,
            loaded_paths: Vec::new(),
        }
    }

    /// Create an empty tree scoped to a vdom.
    pub fn with_vdom(name: impl Into<String>, vdom: Option<String>) -> Self {
        let mut tree = Self::new(name);
        tree.vdom = vdom;
        tree
    }

    /// Create a standalone block that can later be grafted with
    /// [`set_block`](Self::set_block).
    ///
    /// The block has no parent, so it renders without its own keywords until
    /// it is attached somewhere.
    pub fn detached(name: impl Into<String>, kind: BlockKind) -> Self {
        Self {
            nodes: vec![ConfigNode::new(name, kind, None)],
            vdom: None,
            loaded_paths: Vec::new(),
        }
    }

    /// Handle of the root node
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Borrow a node.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not belong to this tree.
    pub fn node(&self, id: NodeId) -> &ConfigNode {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut ConfigNode {
        &mut self.nodes[id.0]
    }

    /// Name of the tree (the root's name)
    pub fn name(&self) -> &str {
        &self.nodes[0].name
    }

    /// Rename a node
    pub fn set_name(&mut self, id: NodeId, name: impl Into<String>) {
        self.node_mut(id).name = name.into();
    }

    /// Vdom the tree is scoped to
    pub fn vdom(&self) -> Option<&str> {
        self.vdom.as_deref()
    }

    /// Scope the tree to a vdom
    pub fn set_vdom(&mut self, vdom: Option<String>) {
        self.vdom = vdom;
    }

    /// Record a query path used to populate this tree
    pub fn add_path(&mut self, path: impl Into<String>) {
        self.loaded_paths.push(path.into());
    }

    /// Query paths recorded with [`add_path`](Self::add_path)
    pub fn loaded_paths(&self) -> &[String] {
        &self.loaded_paths
    }

    /// Paths needed to rebuild this tree from a device.
    ///
    /// Falls back to the top-level block names when nothing was recorded.
    pub fn paths(&self) -> Vec<String> {
        if self.loaded_paths.is_empty() {
            self.node(self.root())
                .block_names()
                .map(String::from)
                .collect()
        } else {
            self.loaded_paths.clone()
        }
    }

    /// Follow a sequence of child names from the root.
    pub fn find(&self, path: &[&str]) -> Option<NodeId> {
        self.find_from(self.root(), path)
    }

    /// Follow a sequence of child names from `start`.
    pub fn find_from(&self, start: NodeId, path: &[&str]) -> Option<NodeId> {
        path.iter()
            .try_fold(start, |id, name| self.node(id).child(name))
    }

    /// Handles from the root down to `id`, inclusive.
    pub fn ancestry(&self, id: NodeId) -> Vec<NodeId> {
        let mut chain = vec![id];
        let mut current = id;
        while let Some(parent) = self.node(current).parent {
            chain.push(parent);
            current = parent;
        }
        chain.reverse();
        chain
    }

    // --- parameter mutation ---

    /// Set a parameter. Remember the quotes if the device needs them.
    pub fn set_param(&mut self, id: NodeId, name: impl Into<String>, value: impl ToString) {
        self.node_mut(id)
            .parameters
            .insert(name.into(), value.to_string());
    }

    /// Remove a parameter, returning its value
    pub fn del_param(&mut self, id: NodeId, name: &str) -> Option<String> {
        self.node_mut(id).parameters.shift_remove(name)
    }

    // --- block mutation ---

    /// Get the child `name` of `parent`, creating it with `kind` if missing.
    pub fn add_block(&mut self, parent: NodeId, name: impl Into<String>, kind: BlockKind) -> NodeId {
        let name = name.into();
        if let Some(existing) = self.node(parent).child(&name) {
            return existing;
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(ConfigNode::new(name.clone(), kind, Some(parent)));
        self.node_mut(parent).children.insert(name, id);
        id
    }

    /// Unlink the child `name` of `parent` and everything below it.
    ///
    /// Returns `true` if a block was removed.
    pub fn del_block(&mut self, parent: NodeId, name: &str) -> bool {
        match self.node_mut(parent).children.shift_remove(name) {
            Some(id) => {
                self.node_mut(id).parent = None;
                true
            }
            None => false,
        }
    }

    /// Remove every block below `id` that ends up with neither parameters
    /// nor children, innermost first. `id` itself is kept.
    ///
    /// Returns the number of blocks removed.
    pub fn prune_empty(&mut self, id: NodeId) -> usize {
        let children: Vec<(String, NodeId)> = self
            .node(id)
            .children()
            .map(|(name, child)| (name.to_string(), child))
            .collect();

        let mut removed = 0;
        for (name, child) in children {
            removed += self.prune_empty(child);
            if self.node(child).is_empty() && self.del_block(id, &name) {
                removed += 1;
            }
        }
        removed
    }

    /// Graft a copy of `block`'s root (and its subtree) as a child of `parent`.
    ///
    /// An existing child with the same name is replaced in place, keeping its
    /// position among its siblings.
    pub fn set_block(&mut self, parent: NodeId, block: &ConfigTree) -> NodeId {
        let source_root = block.node(block.root());
        let kind = match source_root.kind {
            BlockKind::Root => BlockKind::Config,
            kind => kind,
        };
        let name = source_root.name.clone();

        let id = NodeId(self.nodes.len());
        self.nodes.push(ConfigNode::new(name.clone(), kind, Some(parent)));
        if let Some(old) = self.node_mut(parent).children.insert(name, id) {
            self.node_mut(old).parent = None;
        }
        self.copy_subtree(id, block, block.root());
        id
    }

    fn copy_subtree(&mut self, into: NodeId, source: &ConfigTree, from: NodeId) {
        let from_node = source.node(from);
        self.node_mut(into).parameters = from_node.parameters.clone();
        for (child_name, child_id) in from_node.children() {
            let kind = source.node(child_id).kind;
            let new_child = self.add_block(into, child_name, kind);
            self.copy_subtree(new_child, source, child_id);
        }
    }

    // --- keyword text ---

    /// Opening keyword line relative to the parent (`""` when detached).
    pub fn rel_open(&self, id: NodeId) -> String {
        let node = self.node(id);
        match (node.parent, node.kind.open_keyword()) {
            (Some(_), Some(keyword)) => format!("{} {}\n", keyword, node.name),
            _ => String::new(),
        }
    }

    /// Closing keyword line relative to the parent (`""` when detached).
    pub fn rel_close(&self, id: NodeId) -> String {
        let node = self.node(id);
        match (node.parent, node.kind.close_keyword()) {
            (Some(_), Some(keyword)) => format!("{}\n", keyword),
            _ => String::new(),
        }
    }

    /// Opening keyword lines needed to reach `id` from the root.
    pub fn full_open(&self, id: NodeId) -> String {
        self.ancestry(id)
            .into_iter()
            .map(|n| self.rel_open(n))
            .collect()
    }

    /// Closing keyword lines needed to return from `id` to the root.
    pub fn full_close(&self, id: NodeId) -> String {
        self.ancestry(id)
            .into_iter()
            .rev()
            .map(|n| self.rel_close(n))
            .collect()
    }

    // --- parsing and rendering ---

    /// Parse configuration text into the root of this tree.
    pub fn parse_config_output(&mut self, text: &str) -> ParseResult<()> {
        let lines: Vec<&str> = text.lines().collect();
        let root = self.root();
        parser::parse_lines(self, root, &lines)
    }

    /// Parse already-split lines into the root of this tree.
    pub fn parse_lines<S: AsRef<str>>(&mut self, lines: &[S]) -> ParseResult<()> {
        let root = self.root();
        parser::parse_lines(self, root, lines)
    }

    /// Render the whole tree as CLI text.
    pub fn to_text(&self) -> String {
        render::render(self, self.root(), false, 0, false)
    }

    /// True when the two subtrees hold the same parameters and the same
    /// children in the same order. Block names of `a` and `b` themselves are
    /// not compared.
    pub fn same_subtree(&self, a: NodeId, other: &ConfigTree, b: NodeId) -> bool {
        let left = self.node(a);
        let right = other.node(b);

        if left.parameters != right.parameters || left.children.len() != right.children.len() {
            return false;
        }

        left.children
            .iter()
            .zip(right.children.iter())
            .all(|((ln, &lid), (rn, &rid))| {
                ln == rn
                    && self.node(lid).kind == other.node(rid).kind
                    && self.same_subtree(lid, other, rid)
            })
    }
}

impl PartialEq for ConfigTree {
    fn eq(&self, other: &Self) -> bool {
        self.vdom == other.vdom && self.same_subtree(self.root(), other, other.root())
    }
}

impl fmt::Display for ConfigTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bgp_tree() -> ConfigTree {
        let mut tree = ConfigTree::new("running");
        let root = tree.root();
        let bgp = tree.add_block(root, "router bgp", BlockKind::Config);
        tree.set_param(bgp, "as", "65001");
        let neighbors = tree.add_block(bgp, "neighbor", BlockKind::Config);
        let n1 = tree.add_block(neighbors, "10.1.1.1", BlockKind::Edit);
        tree.set_param(n1, "remote-as", "65002");
        tree
    }

    #[test]
    fn test_find_and_params() {
        let tree = bgp_tree();
        let n1 = tree.find(&["router bgp", "neighbor", "10.1.1.1"]).unwrap();
        assert_eq!(tree.node(n1).param("remote-as"), Some("65002"));
        assert_eq!(tree.node(n1).kind(), BlockKind::Edit);
        assert!(tree.find(&["router bgp", "missing"]).is_none());
    }

    #[test]
    fn test_add_block_is_get_or_create() {
        let mut tree = bgp_tree();
        let bgp = tree.find(&["router bgp"]).unwrap();
        let again = tree.add_block(tree.root(), "router bgp", BlockKind::Config);
        assert_eq!(bgp, again);
        assert_eq!(tree.node(tree.root()).child_count(), 1);
    }

    #[test]
    fn test_keyword_paths() {
        let tree = bgp_tree();
        let n1 = tree.find(&["router bgp", "neighbor", "10.1.1.1"]).unwrap();
        assert_eq!(tree.rel_open(n1), "edit 10.1.1.1\n");
        assert_eq!(tree.rel_close(n1), "next\n");
        assert_eq!(
            tree.full_open(n1),
            "config router bgp\nconfig neighbor\nedit 10.1.1.1\n"
        );
        assert_eq!(tree.full_close(n1), "next\nend\nend\n");
        assert_eq!(tree.rel_open(tree.root()), "");
    }

    #[test]
    fn test_detached_block_has_no_keywords_until_grafted() {
        let mut block = ConfigTree::detached("10.6.6.6", BlockKind::Edit);
        let root = block.root();
        block.set_param(root, "remote-as", "666");
        assert_eq!(block.rel_open(root), "");

        let mut tree = bgp_tree();
        let neighbors = tree.find(&["router bgp", "neighbor"]).unwrap();
        let grafted = tree.set_block(neighbors, &block);
        assert_eq!(tree.rel_open(grafted), "edit 10.6.6.6\n");
        assert_eq!(tree.node(grafted).param("remote-as"), Some("666"));
        assert_eq!(tree.node(grafted).parent(), Some(neighbors));
    }

    #[test]
    fn test_set_block_replaces_in_place() {
        let mut tree = bgp_tree();
        let neighbors = tree.find(&["router bgp", "neighbor"]).unwrap();
        tree.add_block(neighbors, "10.2.2.2", BlockKind::Edit);

        let mut replacement = ConfigTree::detached("10.1.1.1", BlockKind::Edit);
        let root = replacement.root();
        replacement.set_param(root, "remote-as", "1");
        tree.set_block(neighbors, &replacement);

        let names: Vec<_> = tree.node(neighbors).block_names().collect();
        assert_eq!(names, vec!["10.1.1.1", "10.2.2.2"]);
        let n1 = tree.find(&["router bgp", "neighbor", "10.1.1.1"]).unwrap();
        assert_eq!(tree.node(n1).param("remote-as"), Some("1"));
    }

    #[test]
    fn test_del_block_and_param() {
        let mut tree = bgp_tree();
        let bgp = tree.find(&["router bgp"]).unwrap();
        assert_eq!(tree.del_param(bgp, "as"), Some("65001".to_string()));
        assert!(tree.del_block(bgp, "neighbor"));
        assert!(!tree.del_block(bgp, "neighbor"));
        assert!(tree.node(bgp).is_empty());
    }

    #[test]
    fn test_prune_empty_cascades() {
        let mut tree = bgp_tree();
        let root = tree.root();
        let dns = tree.add_block(root, "system dns", BlockKind::Config);
        let servers = tree.add_block(dns, "server", BlockKind::Config);
        tree.add_block(servers, "1", BlockKind::Edit);

        assert_eq!(tree.prune_empty(root), 3);
        assert!(tree.find(&["system dns"]).is_none());
        assert!(tree.find(&["router bgp", "neighbor", "10.1.1.1"]).is_some());
        assert_eq!(tree, bgp_tree());
    }

    #[test]
    fn test_paths_fall_back_to_block_names() {
        let mut tree = bgp_tree();
        assert_eq!(tree.paths(), vec!["router bgp".to_string()]);
        tree.add_path("router bgp");
        tree.add_path("system interface");
        assert_eq!(tree.paths().len(), 2);
    }

    #[test]
    fn test_structural_equality_ignores_root_name() {
        let a = bgp_tree();
        let mut b = bgp_tree();
        let root = b.root();
        b.set_name(root, "candidate");
        assert_eq!(a, b);

        let n1 = b.find(&["router bgp", "neighbor", "10.1.1.1"]).unwrap();
        b.set_param(n1, "remote-as", "1");
        assert_ne!(a, b);
    }
}
