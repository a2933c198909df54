//! Transaction wrapper for batched store writes

use heed::RwTxn;

use crate::db::Dbs;
use crate::error::{err, AccessError, Result};
use crate::rules::Identity;
use crate::store::AssetRef;
use crate::tree::{rebuild, TreeKind, TreeNode};

/// Write transaction over an [`LmdbStore`](crate::LmdbStore)
pub struct StoreTx<'a> {
    txn: RwTxn<'a>,
    dbs: &'a Dbs,
    dirty: Vec<TreeKind>,
}

impl<'a> StoreTx<'a> {
    #[inline]
    pub(crate) fn new(txn: RwTxn<'a>, dbs: &'a Dbs) -> Self {
        StoreTx { txn, dbs, dirty: Vec::new() }
    }

    pub(crate) fn commit(mut self) -> Result<()> {
        for kind in std::mem::take(&mut self.dirty) {
            self.rebuild_tree(kind)?;
        }
        self.txn.commit().map_err(err)
    }

    /// Insert or replace a group; bounds are recomputed on commit
    pub fn put_group(&mut self, id: u64, parent_id: u64, title: &str) -> Result<()> {
        self.put_node(TreeKind::Groups, TreeNode::new(id, parent_id, title))
    }

    /// Insert or replace an asset with its rules blob
    pub fn put_asset(&mut self, id: u64, parent_id: u64, name: &str, rules: &str) -> Result<()> {
        self.put_node(TreeKind::Assets, TreeNode::new(id, parent_id, name).with_rules(rules))
    }

    /// Map a user to a group
    #[inline]
    pub fn map_user(&mut self, user_id: u64, group_id: u64) -> Result<()> {
        self.dbs.members.put(&mut self.txn, user_id, group_id)
    }

    /// Remove a user-group mapping
    #[inline]
    pub fn unmap_user(&mut self, user_id: u64, group_id: u64) -> Result<bool> {
        self.dbs.members.del(&mut self.txn, user_id, group_id)
    }

    /// Set the identities allowed to see a view level
    pub fn set_view_level(&mut self, id: u64, identities: &[Identity]) -> Result<()> {
        let blob = serde_json::to_string(identities)?;
        self.dbs.view_levels.put(&mut self.txn, &id.to_be_bytes(), &blob).map_err(err)
    }

    /// Replace the rules blob of an existing asset
    pub fn set_rules(&mut self, asset: &AssetRef, blob: &str) -> Result<()> {
        let id = self
            .dbs
            .resolve(&self.txn, TreeKind::Assets, asset)?
            .ok_or_else(|| AccessError::Persistence(format!("asset '{}' does not exist", asset)))?;
        let mut node = self
            .dbs
            .get_node(&self.txn, TreeKind::Assets, id)?
            .ok_or_else(|| AccessError::Persistence(format!("asset {} vanished", id)))?;
        node.rules = Some(blob.to_string());
        self.write_node(TreeKind::Assets, &node)
    }

    pub(crate) fn clear(&mut self) -> Result<()> {
        self.dbs.groups.clear(&mut self.txn).map_err(err)?;
        self.dbs.assets.clear(&mut self.txn).map_err(err)?;
        self.dbs.group_names.clear(&mut self.txn).map_err(err)?;
        self.dbs.asset_names.clear(&mut self.txn).map_err(err)?;
        self.dbs.members.fwd.clear(&mut self.txn).map_err(err)?;
        self.dbs.members.rev.clear(&mut self.txn).map_err(err)?;
        self.dbs.view_levels.clear(&mut self.txn).map_err(err)
    }

    fn put_node(&mut self, kind: TreeKind, node: TreeNode) -> Result<()> {
        let old = self.dbs.get_node(&self.txn, kind, node.id)?;
        let key = kind.name_key(&node.name);
        if let Some(old) = old {
            let old_key = kind.name_key(&old.name);
            if old_key != key {
                self.dbs.tree(kind).1.delete(&mut self.txn, &old_key).map_err(err)?;
            }
        }
        self.dbs.tree(kind).1.put(&mut self.txn, &key, &node.id).map_err(err)?;
        self.write_node(kind, &node)?;
        if !self.dirty.contains(&kind) {
            self.dirty.push(kind);
        }
        Ok(())
    }

    fn write_node(&mut self, kind: TreeKind, node: &TreeNode) -> Result<()> {
        let json = serde_json::to_string(node)?;
        self.dbs.tree(kind).0.put(&mut self.txn, &node.id.to_be_bytes(), &json).map_err(err)
    }

    fn rebuild_tree(&mut self, kind: TreeKind) -> Result<()> {
        let mut nodes = self.dbs.all_nodes(&self.txn, kind)?;
        rebuild(&mut nodes);
        for n in &nodes {
            self.write_node(kind, n)?;
        }
        Ok(())
    }
}
