//! Store and identity-provider seams, plus an in-memory implementation

use std::collections::BTreeMap;
use std::fmt;

use crate::error::{AccessError, Result};
use crate::rules::Identity;
use crate::tree::{rebuild, TreeKind, TreeNode};

/// Reference to an asset: primary key or unique name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AssetRef {
    Id(u64),
    Name(String),
}

impl AssetRef {
    /// Numeric strings are ids, anything else is a name
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        match s.parse::<u64>() {
            Ok(id) => AssetRef::Id(id),
            Err(_) => AssetRef::Name(s.to_string()),
        }
    }

    /// Whether `node` is the asset this reference points at (names ignore case)
    pub fn matches(&self, node: &TreeNode) -> bool {
        match self {
            AssetRef::Id(id) => node.id == *id,
            AssetRef::Name(name) => TreeKind::Assets.name_key(&node.name) == TreeKind::Assets.name_key(name),
        }
    }
}

impl fmt::Display for AssetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetRef::Id(id) => write!(f, "{}", id),
            AssetRef::Name(n) => f.write_str(n),
        }
    }
}

impl From<u64> for AssetRef {
    fn from(id: u64) -> Self {
        AssetRef::Id(id)
    }
}

impl From<&str> for AssetRef {
    fn from(s: &str) -> Self {
        AssetRef::parse(s)
    }
}

/// Relational store holding the group tree, the asset tree and view levels
pub trait Store {
    /// All nodes of a tree ordered by `lft`
    fn load_tree(&self, kind: TreeKind) -> Result<Vec<TreeNode>>;

    /// Raw rules blob of one asset, `None` if the asset does not exist
    fn load_rules(&self, asset: &AssetRef) -> Result<Option<String>>;

    /// Replace an asset's rules blob
    fn write_rules(&mut self, asset: &AssetRef, blob: &str) -> Result<()>;

    fn lookup_id_by_name(&self, kind: TreeKind, name: &str) -> Result<Option<u64>>;

    /// `(level id, JSON list of identities)` for every view level
    fn load_view_levels(&self) -> Result<Vec<(u64, String)>>;
}

/// Source of user identity and group membership
pub trait IdentityProvider {
    /// The user of the current request, if any
    fn current_user(&self) -> Option<u64> {
        None
    }

    /// Groups the user is directly mapped to
    fn groups_of_user(&self, user_id: u64) -> Result<Vec<u64>>;

    /// Distinct users mapped to any of the groups
    fn users_in_groups(&self, group_ids: &[u64]) -> Result<Vec<u64>>;
}

/// Process-local store, mainly for tests and embedding
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    groups: Vec<TreeNode>,
    assets: Vec<TreeNode>,
    members: Vec<(u64, u64)>,
    view_levels: BTreeMap<u64, String>,
    current_user: Option<u64>,
    writes: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a group under `parent_id` (0 for a root) and rebuild bounds
    pub fn add_group(&mut self, id: u64, parent_id: u64, title: &str) -> &mut Self {
        self.groups.retain(|g| g.id != id);
        self.groups.push(TreeNode::new(id, parent_id, title));
        rebuild(&mut self.groups);
        self
    }

    /// Add an asset with its rules blob and rebuild bounds
    pub fn add_asset(&mut self, id: u64, parent_id: u64, name: &str, rules: &str) -> &mut Self {
        self.assets.retain(|a| a.id != id);
        self.assets.push(TreeNode::new(id, parent_id, name).with_rules(rules));
        rebuild(&mut self.assets);
        self
    }

    pub fn map_user(&mut self, user_id: u64, group_id: u64) -> &mut Self {
        if !self.members.contains(&(user_id, group_id)) {
            self.members.push((user_id, group_id));
        }
        self
    }

    pub fn set_view_level(&mut self, id: u64, identities: &[Identity]) -> &mut Self {
        let blob = serde_json::to_string(identities).unwrap_or_else(|_| "[]".into());
        self.view_levels.insert(id, blob);
        self
    }

    pub fn set_current_user(&mut self, user_id: Option<u64>) -> &mut Self {
        self.current_user = user_id;
        self
    }

    /// Number of successful `write_rules` calls
    pub fn writes(&self) -> usize {
        self.writes
    }

    fn tree(&self, kind: TreeKind) -> &[TreeNode] {
        match kind {
            TreeKind::Groups => &self.groups,
            TreeKind::Assets => &self.assets,
        }
    }
}

impl Store for MemoryStore {
    fn load_tree(&self, kind: TreeKind) -> Result<Vec<TreeNode>> {
        let mut nodes = self.tree(kind).to_vec();
        nodes.sort_by_key(|n| n.lft);
        Ok(nodes)
    }

    fn load_rules(&self, asset: &AssetRef) -> Result<Option<String>> {
        Ok(self
            .assets
            .iter()
            .find(|a| asset.matches(a))
            .map(|a| a.rules.clone().unwrap_or_default()))
    }

    fn write_rules(&mut self, asset: &AssetRef, blob: &str) -> Result<()> {
        let node = self
            .assets
            .iter_mut()
            .find(|a| asset.matches(a))
            .ok_or_else(|| AccessError::Persistence(format!("asset '{}' does not exist", asset)))?;
        node.rules = Some(blob.to_string());
        self.writes += 1;
        Ok(())
    }

    fn lookup_id_by_name(&self, kind: TreeKind, name: &str) -> Result<Option<u64>> {
        let key = kind.name_key(name);
        Ok(self.tree(kind).iter().find(|n| kind.name_key(&n.name) == key).map(|n| n.id))
    }

    fn load_view_levels(&self) -> Result<Vec<(u64, String)>> {
        Ok(self.view_levels.iter().map(|(k, v)| (*k, v.clone())).collect())
    }
}

impl IdentityProvider for MemoryStore {
    fn current_user(&self) -> Option<u64> {
        self.current_user
    }

    fn groups_of_user(&self, user_id: u64) -> Result<Vec<u64>> {
        Ok(self.members.iter().filter(|(u, _)| *u == user_id).map(|(_, g)| *g).collect())
    }

    fn users_in_groups(&self, group_ids: &[u64]) -> Result<Vec<u64>> {
        let mut users: Vec<u64> = self
            .members
            .iter()
            .filter(|(_, g)| group_ids.contains(g))
            .map(|(u, _)| *u)
            .collect();
        users.sort_unstable();
        users.dedup();
        Ok(users)
    }
}
