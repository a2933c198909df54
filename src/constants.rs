//! Fixed identifiers and the authority ranking table

/// Guest user id (no account)
pub const GUEST_USER: u64 = 0;

/// Public view level, always authorised
pub const PUBLIC_VIEW_LEVEL: u64 = 1;

/// Public group id (tree root in a stock install)
pub const PUBLIC_GROUP: u64 = 1;

/// Name of the designated root asset
pub const ROOT_ASSET_NAME: &str = "root.1";

/// Component whose rules can never be installed or purged
pub const CORE_COMPONENT: &str = "com_core";

/// Namespace of the built-in actions
pub const CORE_ACTION_PREFIX: &str = "core.";

/// Every installable component name starts with this
pub const COMPONENT_PREFIX: &str = "com_";

/// Manifest section holding component-wide actions
pub const COMPONENT_SECTION: &str = "component";

/// Authority weight of each core action, least authoritative first.
///
/// A group's authority index is the sum of the weights of the core actions it
/// is allowed on an asset. The installer prefers the lowest index.
pub const AUTHORITY_WEIGHTS: &[(&str, u32)] = &[
    ("core.create", 1),
    ("core.edit.own", 1),
    ("core.edit", 3),
    ("core.delete", 3),
    ("core.edit.state", 5),
    ("core.manage", 7),
    ("core.admin", 10),
];
