//! LMDB-backed store
//!
//! Layout:
//! - `groups`, `assets`: id (8-byte BE) -> JSON [`TreeNode`]
//! - `group_names`, `asset_names`: name -> id (asset names lowercased)
//! - `members` / `members_rev`: [user,group] / [group,user] -> 1
//! - `view_levels`: id -> JSON list of identities

use std::path::Path;

use heed::types::{Bytes, Str, U64};
use heed::{Database, Env, EnvOpenOptions, RoTxn, RwTxn};
use tracing::debug;

use crate::error::{err, AccessError, Result};
use crate::store::{AssetRef, IdentityProvider, Store};
use crate::tree::{TreeKind, TreeNode};
use crate::tx::StoreTx;

// Database type aliases
pub type Db = Database<Bytes, U64<byteorder::BigEndian>>;
pub type DbStr = Database<Bytes, Str>;
pub type DbU64 = Database<Str, U64<byteorder::BigEndian>>;

/// Create a 16-byte key from two u64 values
#[inline]
pub fn key(a: u64, b: u64) -> [u8; 16] {
    let a = a.to_be_bytes();
    let b = b.to_be_bytes();
    [a[0], a[1], a[2], a[3], a[4], a[5], a[6], a[7],
     b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]
}

/// Bidirectional index: fwd[a,b] and rev[b,a] stay in sync
pub struct BiPair {
    pub fwd: Db,
    pub rev: Db,
}

impl BiPair {
    #[inline]
    pub fn put(&self, tx: &mut RwTxn, a: u64, b: u64) -> Result<()> {
        self.fwd.put(tx, &key(a, b), &1).map_err(err)?;
        self.rev.put(tx, &key(b, a), &1).map_err(err)
    }

    #[inline]
    pub fn del(&self, tx: &mut RwTxn, a: u64, b: u64) -> Result<bool> {
        let r = self.fwd.delete(tx, &key(a, b)).map_err(err)?;
        self.rev.delete(tx, &key(b, a)).map_err(err)?;
        Ok(r)
    }

    pub fn list_fwd(&self, tx: &RoTxn, a: u64) -> Result<Vec<u64>> {
        Self::list_pfx(tx, &self.fwd, a)
    }

    pub fn list_rev(&self, tx: &RoTxn, b: u64) -> Result<Vec<u64>> {
        Self::list_pfx(tx, &self.rev, b)
    }

    fn list_pfx(tx: &RoTxn, db: &Db, pfx: u64) -> Result<Vec<u64>> {
        let mut r = Vec::new();
        for item in db.prefix_iter(tx, &pfx.to_be_bytes()).map_err(err)? {
            let (k, _) = item.map_err(err)?;
            if let Some(tail) = k.get(8..16).and_then(|t| <[u8; 8]>::try_from(t).ok()) {
                r.push(u64::from_be_bytes(tail));
            }
        }
        Ok(r)
    }
}

/// All database handles
pub struct Dbs {
    pub groups: DbStr,
    pub assets: DbStr,
    pub group_names: DbU64,
    pub asset_names: DbU64,
    pub members: BiPair,
    pub view_levels: DbStr,
}

impl Dbs {
    pub(crate) fn tree(&self, kind: TreeKind) -> (&DbStr, &DbU64) {
        match kind {
            TreeKind::Groups => (&self.groups, &self.group_names),
            TreeKind::Assets => (&self.assets, &self.asset_names),
        }
    }

    pub(crate) fn get_node(&self, tx: &RoTxn, kind: TreeKind, id: u64) -> Result<Option<TreeNode>> {
        let (nodes, _) = self.tree(kind);
        match nodes.get(tx, &id.to_be_bytes()).map_err(err)? {
            Some(json) => Ok(Some(serde_json::from_str(json)?)),
            None => Ok(None),
        }
    }

    pub(crate) fn resolve(&self, tx: &RoTxn, kind: TreeKind, r: &AssetRef) -> Result<Option<u64>> {
        match r {
            AssetRef::Id(id) => Ok(self.get_node(tx, kind, *id)?.map(|n| n.id)),
            AssetRef::Name(name) => self.tree(kind).1.get(tx, &kind.name_key(name)).map_err(err),
        }
    }

    pub(crate) fn all_nodes(&self, tx: &RoTxn, kind: TreeKind) -> Result<Vec<TreeNode>> {
        let (nodes, _) = self.tree(kind);
        let mut r = Vec::new();
        for item in nodes.iter(tx).map_err(err)? {
            let (_, json) = item.map_err(err)?;
            r.push(serde_json::from_str::<TreeNode>(json)?);
        }
        Ok(r)
    }
}

/// Persistent store on an LMDB environment
pub struct LmdbStore {
    env: Env,
    dbs: Dbs,
    current_user: Option<u64>,
}

impl LmdbStore {
    /// Open (or create) the environment at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        std::fs::create_dir_all(path).map_err(err)?;
        // SAFETY: LMDB requires no other processes access this path concurrently during open.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(1 << 30)
                .max_dbs(8)
                .open(path)
                .map_err(err)?
        };
        let mut tx = env.write_txn().map_err(err)?;
        let dbs = Dbs {
            groups: env.create_database(&mut tx, Some("groups")).map_err(err)?,
            assets: env.create_database(&mut tx, Some("assets")).map_err(err)?,
            group_names: env.create_database(&mut tx, Some("group_names")).map_err(err)?,
            asset_names: env.create_database(&mut tx, Some("asset_names")).map_err(err)?,
            members: BiPair {
                fwd: env.create_database(&mut tx, Some("members")).map_err(err)?,
                rev: env.create_database(&mut tx, Some("members_rev")).map_err(err)?,
            },
            view_levels: env.create_database(&mut tx, Some("view_levels")).map_err(err)?,
        };
        tx.commit().map_err(err)?;
        debug!(path = %path.display(), "opened lmdb access store");
        Ok(LmdbStore { env, dbs, current_user: None })
    }

    /// Execute a read-only operation
    #[inline]
    pub fn read<T, F: FnOnce(&Dbs, &RoTxn) -> Result<T>>(&self, f: F) -> Result<T> {
        f(&self.dbs, &self.env.read_txn().map_err(err)?)
    }

    /// Run several writes in one transaction; nested-set bounds are rebuilt on commit
    pub fn transact<T, F: FnOnce(&mut StoreTx<'_>) -> Result<T>>(&mut self, f: F) -> Result<T> {
        let mut tx = StoreTx::new(self.env.write_txn().map_err(err)?, &self.dbs);
        let r = f(&mut tx)?;
        tx.commit()?;
        Ok(r)
    }

    /// Clear all databases (for testing)
    pub fn clear_all(&mut self) -> Result<()> {
        self.transact(|tx| tx.clear())
    }

    pub fn set_current_user(&mut self, user_id: Option<u64>) {
        self.current_user = user_id;
    }
}

impl Store for LmdbStore {
    fn load_tree(&self, kind: TreeKind) -> Result<Vec<TreeNode>> {
        let mut nodes = self.read(|d, tx| d.all_nodes(tx, kind))?;
        nodes.sort_by_key(|n| n.lft);
        Ok(nodes)
    }

    fn load_rules(&self, asset: &AssetRef) -> Result<Option<String>> {
        self.read(|d, tx| match d.resolve(tx, TreeKind::Assets, asset)? {
            Some(id) => Ok(d.get_node(tx, TreeKind::Assets, id)?.map(|n| n.rules.unwrap_or_default())),
            None => Ok(None),
        })
    }

    fn write_rules(&mut self, asset: &AssetRef, blob: &str) -> Result<()> {
        self.transact(|tx| tx.set_rules(asset, blob))
    }

    fn lookup_id_by_name(&self, kind: TreeKind, name: &str) -> Result<Option<u64>> {
        self.read(|d, tx| d.tree(kind).1.get(tx, &kind.name_key(name)).map_err(err))
    }

    fn load_view_levels(&self) -> Result<Vec<(u64, String)>> {
        self.read(|d, tx| {
            let mut r = Vec::new();
            for item in d.view_levels.iter(tx).map_err(err)? {
                let (k, v) = item.map_err(err)?;
                let id = <[u8; 8]>::try_from(k)
                    .map_err(|_| AccessError::Persistence("bad view level key".into()))?;
                r.push((u64::from_be_bytes(id), v.to_string()));
            }
            Ok(r)
        })
    }
}

impl IdentityProvider for LmdbStore {
    fn current_user(&self) -> Option<u64> {
        self.current_user
    }

    fn groups_of_user(&self, user_id: u64) -> Result<Vec<u64>> {
        self.read(|d, tx| d.members.list_fwd(tx, user_id))
    }

    fn users_in_groups(&self, group_ids: &[u64]) -> Result<Vec<u64>> {
        self.read(|d, tx| {
            let mut users = Vec::new();
            for g in group_ids {
                users.extend(d.members.list_rev(tx, *g)?);
            }
            users.sort_unstable();
            users.dedup();
            Ok(users)
        })
    }
}
