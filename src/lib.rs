//! accessrules - hierarchical access rules for content assets
//!
//! Decides whether a user or group may perform a named action on a named
//! asset. Groups and assets are nested-set trees; each asset carries a rule
//! record, and the effective record of an asset is the merge of its own with
//! every ancestor's, root first. An explicit deny always wins.
//!
//! ```no_run
//! use accessrules::{Access, MemoryStore};
//!
//! let mut store = MemoryStore::new();
//! store.add_group(1, 0, "Public").add_group(2, 1, "Registered");
//! store.add_asset(1, 0, "root.1", r#"{"core.login.site":{"2":1}}"#);
//! store.map_user(42, 2);
//!
//! let mut access = Access::new(store);
//! assert!(access.check(42, "core.login.site", ""));
//! assert!(!access.check(0, "core.login.site", ""));
//! ```

pub mod access;
pub mod cache;
pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod groups;
pub mod installer;
pub mod manifest;
pub mod rules;
pub mod store;
pub mod tree;
pub mod tx;

pub use access::{normalize, Access};
pub use cache::AccessCache;
pub use config::AccessConfig;
pub use constants::*;
pub use db::LmdbStore;
pub use error::{AccessError, Result};
pub use groups::{lowest_ancestor, remove_descendents};
pub use installer::{Grant, InstallReport};
pub use manifest::{ActionDef, DefaultClause, Manifest};
pub use rules::{group_identity, user_identity, Identity, Rule, Rules};
pub use store::{AssetRef, IdentityProvider, MemoryStore, Store};
pub use tree::{rebuild, NestedSet, TreeKind, TreeNode};
pub use tx::StoreTx;
