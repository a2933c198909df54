//! Authorization engine
//!
//! [`Access`] owns a store, its configuration and every memo it needs. All
//! decisions fail closed: a missing rule, an unknown asset resolved to the
//! root, or a store error all come out as "denied".

use indexmap::{IndexMap, IndexSet};
use tracing::{debug, warn};

use crate::cache::AccessCache;
use crate::config::AccessConfig;
use crate::constants::GUEST_USER;
use crate::error::{AccessError, Result};
use crate::rules::{group_identity, user_identity, Identity, Rules};
use crate::store::{AssetRef, IdentityProvider, Store};
use crate::tree::{NestedSet, TreeKind};

/// Lowercase, trim, and collapse runs of whitespace or hyphens into a dot
pub fn normalize(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_sep = false;
    for c in s.trim().chars() {
        if c.is_whitespace() || c == '-' {
            if !in_sep {
                out.push('.');
                in_sep = true;
            }
        } else {
            in_sep = false;
            out.extend(c.to_lowercase());
        }
    }
    out
}

/// The authorization engine
pub struct Access<S> {
    pub(crate) store: S,
    pub(crate) config: AccessConfig,
    pub(crate) cache: AccessCache,
}

impl<S: Store + IdentityProvider> Access<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, AccessConfig::default())
    }

    pub fn with_config(store: S, config: AccessConfig) -> Self {
        Access { store, config, cache: AccessCache::new() }
    }

    pub fn config(&self) -> &AccessConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Mutable store access. Memos are not touched; clear them after writing.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn cache(&self) -> &AccessCache {
        &self.cache
    }

    /// Drop every memo (view levels, asset rules, groups, paths, memberships)
    pub fn clear_statics(&mut self) {
        self.cache.clear();
    }

    // ========================================================================
    // Checks
    // ========================================================================

    /// Whether `user_id` may perform `action` on `asset` (empty = root asset).
    ///
    /// Errors are logged and reported as a denial.
    pub fn check(&mut self, user_id: u64, action: &str, asset: &str) -> bool {
        match self.try_check(user_id, action, asset) {
            Ok(d) => d == Some(true),
            Err(e) => {
                warn!(user_id, action, asset, error = %e, "authorization check failed, denying");
                false
            }
        }
    }

    /// Tri-state check: `Some(true)` allowed, `Some(false)` explicitly denied,
    /// `None` when no rule applies (which callers must treat as denied).
    pub fn try_check(&mut self, user_id: u64, action: &str, asset: &str) -> Result<Option<bool>> {
        let action = normalize(action);
        let key = self.asset_key(asset)?;
        let mut identities: Vec<Identity> = vec![user_identity(user_id)?];
        for g in self.get_groups_by_user(user_id, true)? {
            identities.push(group_identity(g)?);
        }
        let rules = self.cached_asset_rules(&key)?;
        Ok(rules.allow(&action, &identities))
    }

    /// Whether members of `group_id` (through its ancestor chain) may perform `action`
    pub fn check_group(&mut self, group_id: u64, action: &str, asset: &str) -> bool {
        match self.try_check_group(group_id, action, asset) {
            Ok(d) => d == Some(true),
            Err(e) => {
                warn!(group_id, action, asset, error = %e, "group check failed, denying");
                false
            }
        }
    }

    pub fn try_check_group(&mut self, group_id: u64, action: &str, asset: &str) -> Result<Option<bool>> {
        let action = normalize(action);
        let key = self.asset_key(asset)?;
        let identities = self
            .get_group_path(group_id)?
            .into_iter()
            .map(group_identity)
            .collect::<Result<Vec<Identity>>>()?;
        let rules = self.cached_asset_rules(&key)?;
        Ok(rules.allow(&action, &identities))
    }

    /// Check for the identity provider's current user (guest when none)
    pub fn authorise_current(&mut self, action: &str, asset: &str) -> bool {
        let user = self.store.current_user().unwrap_or(GUEST_USER);
        self.check(user, action, asset)
    }

    // ========================================================================
    // Rule loading
    // ========================================================================

    /// Id of the designated root asset, by name first, then by tree shape
    pub fn root_asset_id(&self) -> Result<u64> {
        if let Some(id) = self.store.lookup_id_by_name(TreeKind::Assets, &self.config.root_asset_name)? {
            return Ok(id);
        }
        NestedSet::new(self.store.load_tree(TreeKind::Assets)?)
            .root()
            .map(|n| n.id)
            .ok_or_else(|| AccessError::Configuration("no root asset".into()))
    }

    /// Rules of one asset, or merged root-first with all its ancestors.
    ///
    /// An unknown asset resolves to the root asset's own rules.
    pub fn get_asset_rules(&self, asset: &AssetRef, recursive: bool) -> Result<Rules> {
        let blobs: Vec<String> = if recursive {
            let tree = NestedSet::new(self.store.load_tree(TreeKind::Assets)?);
            match tree.nodes().iter().find(|n| asset.matches(n)) {
                Some(node) => tree
                    .path(node.id)
                    .into_iter()
                    .filter_map(|id| tree.get(id))
                    .map(|n| n.rules.clone().unwrap_or_default())
                    .collect(),
                None => Vec::new(),
            }
        } else {
            self.store.load_rules(asset)?.into_iter().collect()
        };

        let blobs = if blobs.is_empty() {
            debug!(%asset, "asset not found, using root rules");
            let root = self.root_asset_id()?;
            let blob = self.store.load_rules(&AssetRef::Id(root))?.ok_or_else(|| {
                AccessError::Configuration(format!("root asset {} cannot be loaded", root))
            })?;
            vec![blob]
        } else {
            blobs
        };

        let mut rules = Rules::new();
        rules.merge_collection(&blobs)?;
        Ok(rules)
    }

    fn asset_key(&self, asset: &str) -> Result<String> {
        let key = normalize(asset);
        if key.is_empty() {
            Ok(self.root_asset_id()?.to_string())
        } else {
            Ok(key)
        }
    }

    fn cached_asset_rules(&mut self, key: &str) -> Result<&Rules> {
        if !self.cache.asset_rules.contains_key(key) {
            let rules = self.get_asset_rules(&AssetRef::parse(key), true)?;
            debug!(asset = key, actions = rules.len(), "cached asset rules");
            self.cache.asset_rules.insert(key.to_string(), rules);
        }
        self.cache
            .asset_rules
            .get(key)
            .ok_or_else(|| AccessError::NotFound(format!("rules for '{}'", key)))
    }

    // ========================================================================
    // Users and view levels
    // ========================================================================

    /// Groups a user is mapped to; with `recursive`, every ancestor as well.
    ///
    /// The guest (id 0) maps to the configured guest group. A user with no
    /// mapping at all falls back to the public group.
    pub fn get_groups_by_user(&mut self, user_id: u64, recursive: bool) -> Result<Vec<u64>> {
        if let Some(g) = self.cache.groups_by_user.get(&(user_id, recursive)) {
            return Ok(g.clone());
        }
        let guest = AccessConfig::is_guest(user_id);
        let result = if guest && !recursive {
            vec![self.config.guest_group]
        } else {
            let direct = if guest {
                vec![self.config.guest_group]
            } else {
                self.store.groups_of_user(user_id)?
            };
            let ids: Vec<u64> = if recursive {
                let tree = self.group_tree()?;
                let mut ids: Vec<u64> = direct.iter().flat_map(|g| tree.path(*g)).collect();
                ids.sort_by_key(|id| (tree.get(*id).map(|n| n.lft), *id));
                ids.dedup();
                ids
            } else {
                // First occurrence wins, mapping order is kept
                direct.into_iter().collect::<IndexSet<u64>>().into_iter().collect()
            };
            if ids.is_empty() {
                vec![self.config.public_group]
            } else {
                ids
            }
        };
        self.cache.groups_by_user.insert((user_id, recursive), result.clone());
        Ok(result)
    }

    /// View levels the user may see. The public level is always first.
    pub fn get_authorised_view_levels(&mut self, user_id: u64) -> Result<Vec<u64>> {
        let me = user_identity(user_id)?;
        let groups = self.get_groups_by_user(user_id, true)?;
        if self.cache.view_levels.is_none() {
            let mut levels = IndexMap::new();
            for (id, blob) in self.store.load_view_levels()? {
                let ids: Vec<Identity> =
                    if blob.trim().is_empty() { Vec::new() } else { serde_json::from_str(&blob)? };
                levels.insert(id, ids);
            }
            debug!(levels = levels.len(), "cached view levels");
            self.cache.view_levels = Some(levels);
        }

        let public = self.config.public_view_level;
        let mut authorised = vec![public];
        if let Some(levels) = &self.cache.view_levels {
            for (level, ids) in levels {
                if *level == public {
                    continue;
                }
                let hit = ids.iter().any(|&id| {
                    if id < 0 {
                        id == me
                    } else {
                        groups.contains(&id.unsigned_abs())
                    }
                });
                if hit {
                    authorised.push(*level);
                }
            }
        }
        Ok(authorised)
    }
}
