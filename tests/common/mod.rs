//! Shared fixture: a stock group tree, root rule and a few users
//!
//! ```text
//! Public(1)
//!   Manager(6)
//!     Administrator(7)
//!   Guest(13)
//!   Registered(2)
//!     Customer Group(12)
//!     Author(3)
//!       Invoice Author(10)
//!       Editor(4)
//!         Publisher(5)
//!   Super Users(8)
//! ```
#![allow(dead_code)]

use accessrules::{Identity, LmdbStore, MemoryStore};

pub const PUBLIC: u64 = 1;
pub const REGISTERED: u64 = 2;
pub const AUTHOR: u64 = 3;
pub const EDITOR: u64 = 4;
pub const PUBLISHER: u64 = 5;
pub const MANAGER: u64 = 6;
pub const ADMIN: u64 = 7;
pub const SUPER_USER: u64 = 8;
pub const INV_AUTHOR: u64 = 10;
pub const CUSTOMER: u64 = 12;
pub const GUEST: u64 = 13;

pub const GROUPS: &[(u64, u64, &str)] = &[
    (PUBLIC, 0, "Public"),
    (MANAGER, PUBLIC, "Manager"),
    (ADMIN, MANAGER, "Administrator"),
    (GUEST, PUBLIC, "Guest"),
    (REGISTERED, PUBLIC, "Registered"),
    (CUSTOMER, REGISTERED, "Customer Group"),
    (AUTHOR, REGISTERED, "Author"),
    (INV_AUTHOR, AUTHOR, "Invoice Author"),
    (EDITOR, AUTHOR, "Editor"),
    (PUBLISHER, EDITOR, "Publisher"),
    (SUPER_USER, PUBLIC, "Super Users"),
];

pub const ROOT_RULE: &str = r#"{"core.login.site":{"6":1,"2":1},"core.login.admin":{"6":1},"core.admin":{"8":1},"core.manage":{"7":1},"core.create":{"6":1,"3":1},"core.delete":{"6":1},"core.edit":{"6":1,"4":1},"core.edit.state":{"6":1,"5":1},"core.edit.own":{"6":1,"3":1}}"#;

pub const ARTICLE: &str = "com_content.article.42";

/// (id, parent, name, rules)
pub const ASSETS: &[(u64, u64, &str, &str)] = &[
    (1, 0, "root.1", ROOT_RULE),
    (2, 1, "com_content", "{}"),
    (3, 2, ARTICLE, r#"{"core.edit":{"4":0},"core.delete":{"-42":1}}"#),
    (4, 1, "com_users", r#"{"core.admin":[],"core.manage":{"2":0}}"#),
];

pub const USER_AUTHOR: u64 = 42;
pub const USER_EDITOR: u64 = 43;
pub const USER_MANAGER_CUSTOMER: u64 = 44;
pub const USER_UNMAPPED: u64 = 45;

pub const MEMBERS: &[(u64, u64)] = &[
    (USER_AUTHOR, AUTHOR),
    (USER_EDITOR, EDITOR),
    (USER_MANAGER_CUSTOMER, MANAGER),
    (USER_MANAGER_CUSTOMER, CUSTOMER),
];

pub const VIEW_LEVELS: &[(u64, &[Identity])] = &[
    (1, &[1]),
    (2, &[6, 2, 8]),
    (3, &[6, 3, 8]),
    (5, &[13]),
    (6, &[-45]),
];

pub const CORE_ACTIONS: &[&str] = &[
    "core.admin",
    "core.manage",
    "core.create",
    "core.delete",
    "core.edit",
    "core.edit.own",
    "core.edit.state",
];

pub fn group_ids() -> Vec<u64> {
    GROUPS.iter().map(|g| g.0).collect()
}

pub fn memory_store() -> MemoryStore {
    let mut s = MemoryStore::new();
    for (id, parent, title) in GROUPS {
        s.add_group(*id, *parent, title);
    }
    for (id, parent, name, rules) in ASSETS {
        s.add_asset(*id, *parent, name, rules);
    }
    for (user, group) in MEMBERS {
        s.map_user(*user, *group);
    }
    for (id, identities) in VIEW_LEVELS {
        s.set_view_level(*id, identities);
    }
    s
}

pub fn lmdb_store(path: &std::path::Path) -> LmdbStore {
    let mut s = LmdbStore::open(path).unwrap();
    s.transact(|tx| {
        for (id, parent, title) in GROUPS {
            tx.put_group(*id, *parent, title)?;
        }
        for (id, parent, name, rules) in ASSETS {
            tx.put_asset(*id, *parent, name, rules)?;
        }
        for (user, group) in MEMBERS {
            tx.map_user(*user, *group)?;
        }
        for (id, identities) in VIEW_LEVELS {
            tx.set_view_level(*id, identities)?;
        }
        Ok(())
    })
    .unwrap();
    s
}

pub fn data(file: &str) -> std::path::PathBuf {
    std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/data").join(file)
}
