//! Process-scoped memoization owned by the engine
//!
//! Nothing here is invalidated automatically. Callers that write rules,
//! groups or memberships must call [`AccessCache::clear`] (or
//! `Access::clear_statics`) before relying on fresh reads.

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::rules::{Identity, Rules};
use crate::tree::NestedSet;

#[derive(Debug, Default)]
pub struct AccessCache {
    /// Level id -> identities allowed to see it
    pub(crate) view_levels: Option<IndexMap<u64, Vec<Identity>>>,
    /// Normalized asset key -> recursive rules
    pub(crate) asset_rules: HashMap<String, Rules>,
    /// Whole group tree, loaded once
    pub(crate) user_groups: Option<NestedSet>,
    /// Group id -> root-first path
    pub(crate) user_group_paths: HashMap<u64, Vec<u64>>,
    /// (user id, recursive) -> group ids
    pub(crate) groups_by_user: HashMap<(u64, bool), Vec<u64>>,
}

impl AccessCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget everything
    pub fn clear(&mut self) {
        self.view_levels = None;
        self.asset_rules.clear();
        self.user_groups = None;
        self.user_group_paths.clear();
        self.groups_by_user.clear();
    }

    /// Whether anything is currently memoized
    pub fn is_empty(&self) -> bool {
        self.view_levels.is_none()
            && self.asset_rules.is_empty()
            && self.user_groups.is_none()
            && self.user_group_paths.is_empty()
            && self.groups_by_user.is_empty()
    }
}
