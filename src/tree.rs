//! Nested-set trees held as flat arrays
//!
//! Each node carries `(lft, rgt)` bounds; an ancestor's range strictly
//! contains every descendant's range. Nodes live in a `Vec` ordered by `lft`
//! with an id index, so ancestry is a bounds comparison, never a pointer walk.

use std::borrow::Cow;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Which externally persisted tree a node belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TreeKind {
    Groups,
    Assets,
}

impl TreeKind {
    /// Lookup form of a node name. Asset names are case-insensitive, group titles exact.
    pub fn name_key(self, name: &str) -> Cow<'_, str> {
        match self {
            TreeKind::Groups => Cow::Borrowed(name),
            TreeKind::Assets => Cow::Owned(name.to_lowercase()),
        }
    }
}

/// One row of a group or asset tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode {
    pub id: u64,
    /// 0 for the root
    pub parent_id: u64,
    pub lft: u64,
    pub rgt: u64,
    /// Group title or unique asset name
    pub name: String,
    /// Serialized rule record (assets only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<String>,
}

impl TreeNode {
    /// Node with unset bounds; call [`rebuild`] before use
    pub fn new(id: u64, parent_id: u64, name: &str) -> Self {
        TreeNode { id, parent_id, lft: 0, rgt: 0, name: name.to_string(), rules: None }
    }

    pub fn with_rules(mut self, rules: &str) -> Self {
        self.rules = Some(rules.to_string());
        self
    }

    /// Inclusive containment: true for the node itself and its descendants
    #[inline]
    pub fn contains(&self, other: &TreeNode) -> bool {
        self.lft <= other.lft && self.rgt >= other.rgt
    }
}

/// Recompute `lft`/`rgt` from parent ids. Siblings keep their relative order.
///
/// Nodes whose parent is missing are treated as additional roots.
pub fn rebuild(nodes: &mut [TreeNode]) {
    let index: HashMap<u64, usize> = nodes.iter().enumerate().map(|(i, n)| (n.id, i)).collect();
    let mut children: HashMap<u64, Vec<usize>> = HashMap::new();
    let mut roots = Vec::new();
    for (i, n) in nodes.iter().enumerate() {
        if n.parent_id != 0 && index.contains_key(&n.parent_id) && n.parent_id != n.id {
            children.entry(n.parent_id).or_default().push(i);
        } else {
            roots.push(i);
        }
    }

    // Iterative DFS: (node index, entered?)
    let mut counter = 1u64;
    let mut stack: Vec<(usize, bool)> = roots.into_iter().rev().map(|i| (i, false)).collect();
    while let Some((i, entered)) = stack.pop() {
        if entered {
            nodes[i].rgt = counter;
            counter += 1;
            continue;
        }
        nodes[i].lft = counter;
        counter += 1;
        stack.push((i, true));
        if let Some(kids) = children.get(&nodes[i].id) {
            for &k in kids.iter().rev() {
                stack.push((k, false));
            }
        }
    }
}

/// Read-only view over a whole tree
#[derive(Debug, Clone, Default)]
pub struct NestedSet {
    nodes: Vec<TreeNode>,
    index: HashMap<u64, usize>,
}

impl NestedSet {
    pub fn new(mut nodes: Vec<TreeNode>) -> Self {
        nodes.sort_by_key(|n| (n.lft, n.id));
        let index = nodes.iter().enumerate().map(|(i, n)| (n.id, i)).collect();
        NestedSet { nodes, index }
    }

    #[inline]
    pub fn get(&self, id: u64) -> Option<&TreeNode> {
        self.index.get(&id).map(|&i| &self.nodes[i])
    }

    /// Nodes in `lft` order
    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The node with the widest range (first in `lft` order)
    pub fn root(&self) -> Option<&TreeNode> {
        self.nodes.iter().find(|n| n.parent_id == 0).or_else(|| self.nodes.first())
    }

    /// Strict ancestry: `ancestor` contains `node` and is not `node`
    pub fn is_ancestor(&self, ancestor: u64, node: u64) -> bool {
        match (self.get(ancestor), self.get(node)) {
            (Some(a), Some(n)) => a.id != n.id && a.contains(n),
            _ => false,
        }
    }

    /// Ids from the root down to `id` inclusive; empty for unknown ids
    pub fn path(&self, id: u64) -> Vec<u64> {
        let Some(target) = self.get(id) else { return Vec::new() };
        self.nodes.iter().filter(|n| n.contains(target)).map(|n| n.id).collect()
    }

    /// Nodes contained in `id`'s range, optionally including `id` itself
    pub fn descendants(&self, id: u64, include_self: bool) -> Vec<u64> {
        let Some(top) = self.get(id) else { return Vec::new() };
        self.nodes
            .iter()
            .filter(|n| top.contains(n) && (include_self || n.id != id))
            .map(|n| n.id)
            .collect()
    }

    /// Parent-chain length: 1 for a root, 2 for its children, ...
    pub fn depth(&self, id: u64) -> usize {
        let mut depth = 0;
        let mut cur = self.get(id);
        while let Some(n) = cur {
            depth += 1;
            if n.parent_id == 0 || depth > self.nodes.len() {
                break;
            }
            cur = self.get(n.parent_id);
        }
        depth
    }
}
