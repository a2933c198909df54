//! Group hierarchy resolution over the nested-set group tree

use tracing::debug;

use crate::access::Access;
use crate::error::{AccessError, Result};
use crate::store::{IdentityProvider, Store};
use crate::tree::{NestedSet, TreeKind};

/// Keep only groups with no ancestor in the same set, sorted ascending
pub fn remove_descendents(tree: &NestedSet, group_ids: &[u64]) -> Vec<u64> {
    let mut eldest: Vec<u64> = group_ids
        .iter()
        .copied()
        .filter(|&g| !group_ids.iter().any(|&other| tree.is_ancestor(other, g)))
        .collect();
    eldest.sort_unstable();
    eldest.dedup();
    eldest
}

/// Given root-first paths, the group closest to the root if every path lies
/// on the longest one; `None` when the lines of descent diverge.
pub fn lowest_ancestor(paths: &[Vec<u64>]) -> Option<u64> {
    let longest = paths.iter().max_by_key(|p| p.len())?;
    let shortest = paths.iter().min_by_key(|p| p.len())?;
    let one_line = paths.iter().all(|p| p.iter().zip(longest.iter()).all(|(a, b)| a == b));
    if one_line {
        shortest.last().copied()
    } else {
        None
    }
}

impl<S: Store + IdentityProvider> Access<S> {
    /// The whole group tree, loaded once per cache lifetime
    pub(crate) fn group_tree(&mut self) -> Result<&NestedSet> {
        if self.cache.user_groups.is_none() {
            let tree = NestedSet::new(self.store.load_tree(TreeKind::Groups)?);
            if tree.root().is_none() {
                return Err(AccessError::Configuration("group tree has no root group".into()));
            }
            debug!(groups = tree.len(), "cached group tree");
            self.cache.user_groups = Some(tree);
        }
        self.cache
            .user_groups
            .as_ref()
            .ok_or_else(|| AccessError::Configuration("group tree unavailable".into()))
    }

    /// Group ids from the root down to `group_id`; empty for unknown groups
    pub fn get_group_path(&mut self, group_id: u64) -> Result<Vec<u64>> {
        if let Some(p) = self.cache.user_group_paths.get(&group_id) {
            return Ok(p.clone());
        }
        let tree = self.group_tree()?;
        if tree.get(group_id).is_none() {
            return Ok(Vec::new());
        }
        let path = tree.path(group_id);
        self.cache.user_group_paths.insert(group_id, path.clone());
        Ok(path)
    }

    /// Drop every group that descends from another group in the set
    pub fn remove_descendent_groups(&mut self, group_ids: &[u64]) -> Result<Vec<u64>> {
        let tree = self.group_tree()?;
        Ok(remove_descendents(tree, group_ids))
    }

    /// Closest-to-root group of a set lying on one line of descent
    pub fn lowest_ancestor_group(&mut self, group_ids: &[u64]) -> Result<Option<u64>> {
        let mut paths = Vec::with_capacity(group_ids.len());
        for &g in group_ids {
            paths.push(self.get_group_path(g)?);
        }
        Ok(lowest_ancestor(&paths))
    }

    /// Id of the group with this exact title
    pub fn get_group_id(&self, title: &str) -> Result<Option<u64>> {
        self.store.lookup_id_by_name(TreeKind::Groups, title.trim())
    }

    /// Users mapped to a group, or to it and any descendant when `recursive`
    pub fn get_users_by_group(&mut self, group_id: u64, recursive: bool) -> Result<Vec<u64>> {
        let groups = if recursive {
            self.group_tree()?.descendants(group_id, true)
        } else {
            vec![group_id]
        };
        self.store.users_in_groups(&groups)
    }

    /// Parent-chain length of a group (1 for the root, 0 if unknown)
    pub fn group_depth(&mut self, group_id: u64) -> Result<usize> {
        Ok(self.group_tree()?.depth(group_id))
    }
}
