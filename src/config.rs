//! Engine configuration

use serde::Deserialize;

use crate::constants::{
    COMPONENT_PREFIX, CORE_ACTION_PREFIX, CORE_COMPONENT, GUEST_USER, PUBLIC_GROUP,
    PUBLIC_VIEW_LEVEL, ROOT_ASSET_NAME,
};
use crate::error::{AccessError, Result};

/// Settings consumed by the authorization engine and the installer.
///
/// Every field has a default matching a stock installation, so a partial JSON
/// document only needs to name what differs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    /// Group assigned to the guest user
    pub guest_group: u64,
    /// Group used when a user maps to no group at all
    pub public_group: u64,
    /// View level every user may see
    pub public_view_level: u64,
    pub root_asset_name: String,
    pub core_component: String,
    pub core_action_prefix: String,
    pub component_prefix: String,
}

impl Default for AccessConfig {
    fn default() -> Self {
        AccessConfig {
            guest_group: PUBLIC_GROUP,
            public_group: PUBLIC_GROUP,
            public_view_level: PUBLIC_VIEW_LEVEL,
            root_asset_name: ROOT_ASSET_NAME.to_string(),
            core_component: CORE_COMPONENT.to_string(),
            core_action_prefix: CORE_ACTION_PREFIX.to_string(),
            component_prefix: COMPONENT_PREFIX.to_string(),
        }
    }
}

impl AccessConfig {
    /// Parse a JSON configuration document
    pub fn from_json(s: &str) -> Result<Self> {
        let cfg: AccessConfig = serde_json::from_str(s)
            .map_err(|e| AccessError::Configuration(format!("bad access config: {}", e)))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Builder-style override of the guest group
    pub fn with_guest_group(mut self, group: u64) -> Self {
        self.guest_group = group;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.root_asset_name.trim().is_empty() {
            return Err(AccessError::Configuration("root_asset_name is empty".into()));
        }
        if self.component_prefix.is_empty() || self.core_action_prefix.is_empty() {
            return Err(AccessError::Configuration("namespace prefixes must not be empty".into()));
        }
        Ok(())
    }

    /// True when `component` names the core component (case-insensitive)
    pub fn is_core_component(&self, component: &str) -> bool {
        component.trim().eq_ignore_ascii_case(&self.core_component)
    }

    /// Whether a user id denotes the guest
    #[inline]
    pub fn is_guest(user_id: u64) -> bool {
        user_id == GUEST_USER
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg = AccessConfig::from_json(r#"{"guest_group": 13}"#).unwrap();
        assert_eq!(cfg.guest_group, 13);
        assert_eq!(cfg.public_group, 1);
        assert_eq!(cfg.root_asset_name, "root.1");
    }

    #[test]
    fn empty_root_name_rejected() {
        let e = AccessConfig::from_json(r#"{"root_asset_name": " "}"#).unwrap_err();
        assert!(matches!(e, AccessError::Configuration(_)));
    }

    #[test]
    fn core_component_is_case_insensitive() {
        let cfg = AccessConfig::default();
        assert!(cfg.is_core_component("COM_Core"));
        assert!(!cfg.is_core_component("com_content"));
    }
}
