//! Default-rule installation for component actions
//!
//! A component manifest may suggest, per custom action, which existing core
//! permission a group should already hold to receive the new action by
//! default. The installer finds the least authoritative group that satisfies
//! each suggestion and grants the custom action to it on the root asset.

use std::path::Path;

use tracing::{debug, info, warn};

use crate::access::Access;
use crate::constants::{AUTHORITY_WEIGHTS, COMPONENT_SECTION};
use crate::error::{AccessError, Result};
use crate::manifest::{DefaultClause, Manifest};
use crate::rules::{group_identity, Rules};
use crate::store::{AssetRef, IdentityProvider, Store};

/// A default grant made by the installer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grant {
    pub action: String,
    pub group_id: u64,
    /// The clause that produced it
    pub clause: String,
}

/// Outcome of one installation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallReport {
    pub granted: Vec<Grant>,
    /// Clauses for which no group on this system qualifies
    pub skipped: Vec<String>,
    /// Existing component actions removed from the root record
    pub purged: usize,
}

impl InstallReport {
    /// Groups granted `action`, in grant order
    pub fn groups_for(&self, action: &str) -> Vec<u64> {
        self.granted.iter().filter(|g| g.action == action).map(|g| g.group_id).collect()
    }
}

impl<S: Store + IdentityProvider> Access<S> {
    /// Load a manifest file and install its component defaults
    pub fn install_component_default_rules_from_file<P: AsRef<Path>>(
        &mut self,
        component: &str,
        path: P,
    ) -> Result<InstallReport> {
        self.reject_core_install(component)?;
        let manifest = Manifest::from_file(path)?;
        self.install_component_default_rules(component, &manifest)
    }

    /// Install the default grants declared in `manifest` for `component`.
    ///
    /// Every clause is validated and resolved before anything is written. The
    /// root record is then purged of the component's actions, merged with the
    /// new grants and written once. Memos are left as they are.
    pub fn install_component_default_rules(
        &mut self,
        component: &str,
        manifest: &Manifest,
    ) -> Result<InstallReport> {
        self.reject_core_install(component)?;
        let bare = self.component_bare_name(component)?;
        let source = manifest.source().to_string();
        let mut new_rules = Rules::new();
        let mut report = InstallReport::default();

        for def in manifest.actions(COMPONENT_SECTION) {
            let clauses = def.default_clauses();
            if clauses.is_empty() {
                continue;
            }
            if def.name.starts_with(&self.config.core_action_prefix) {
                return Err(AccessError::Validation(format!(
                    "Cannot override default core rule '{}' for component '{}'",
                    def.name, component
                )));
            }
            for raw in clauses {
                let clause = DefaultClause::parse(raw, &def.name, &source, &self.config.component_prefix)?;
                match self.resolve_default_group(&clause, &def.name)? {
                    Some(group_id) => {
                        debug!(action = %def.name, group_id, clause = raw, "default grant");
                        new_rules.merge(&Rules::single(&def.name, group_identity(group_id)?, true));
                        report.granted.push(Grant {
                            action: def.name.clone(),
                            group_id,
                            clause: raw.to_string(),
                        });
                    }
                    None => report.skipped.push(raw.to_string()),
                }
            }
        }

        let root = AssetRef::Id(self.root_asset_id()?);
        let mut root_rules = self.root_rules(&root)?;
        report.purged = root_rules.remove_actions(&format!("{}.", bare));
        root_rules.merge(&new_rules);
        self.store.write_rules(&root, &root_rules.to_json())?;
        info!(
            component,
            granted = report.granted.len(),
            skipped = report.skipped.len(),
            purged = report.purged,
            "installed component default rules"
        );
        Ok(report)
    }

    /// Remove every `<component>.*` action from the root record. Returns how many went.
    pub fn purge_component_default_rules(&mut self, component: &str) -> Result<usize> {
        if self.config.is_core_component(component) {
            return Err(AccessError::Validation("Cannot purge core rules!".into()));
        }
        let bare = self.component_bare_name(component)?;
        let root = AssetRef::Id(self.root_asset_id()?);
        let mut root_rules = self.root_rules(&root)?;
        let purged = root_rules.remove_actions(&format!("{}.", bare));
        self.store.write_rules(&root, &root_rules.to_json())?;
        info!(component, purged, "purged component rules");
        Ok(purged)
    }

    /// Among `group_ids`, the group whose allowed core actions weigh least.
    ///
    /// Ties on one line of descent go to the group closest to the root; ties
    /// across unrelated lines go to the shallowest group, then the lowest id.
    pub fn least_authoritative_group(&mut self, group_ids: &[u64], asset: &str) -> Result<Option<u64>> {
        let mut best: Vec<u64> = Vec::new();
        let mut best_rank = u32::MAX;
        for &g in group_ids {
            let rank = self.authority_index(g, asset)?;
            if rank < best_rank {
                best = vec![g];
                best_rank = rank;
            } else if rank == best_rank && !best.contains(&g) {
                best.push(g);
            }
        }
        match best.len() {
            0 => return Ok(None),
            1 => return Ok(Some(best[0])),
            _ => {}
        }
        if let Some(lowest) = self.lowest_ancestor_group(&best)? {
            return Ok(Some(lowest));
        }
        let mut pick: Option<(usize, u64)> = None;
        for g in best {
            let cand = (self.group_depth(g)?, g);
            if pick.map_or(true, |p| cand < p) {
                pick = Some(cand);
            }
        }
        Ok(pick.map(|(_, g)| g))
    }

    /// Sum of the weights of the core actions `group_id` may perform on `asset`
    pub fn authority_index(&mut self, group_id: u64, asset: &str) -> Result<u32> {
        let mut total = 0;
        for (action, weight) in AUTHORITY_WEIGHTS {
            if self.try_check_group(group_id, action, asset)? == Some(true) {
                total += weight;
            }
        }
        Ok(total)
    }

    fn resolve_default_group(&mut self, clause: &DefaultClause, rule_name: &str) -> Result<Option<u64>> {
        if let Some(hint) = &clause.group_hint {
            if let Some(gid) = self.get_group_id(hint)? {
                if self.try_check_group(gid, &clause.action, &clause.component)? == Some(true) {
                    return Ok(Some(gid));
                }
                debug!(group = %hint, action = %clause.action, "suggested group lacks permission, ignoring");
            }
        }

        let mut all: Vec<u64> = self.group_tree()?.nodes().iter().map(|n| n.id).collect();
        all.sort_unstable();
        let mut passing = Vec::new();
        for g in all {
            if self.try_check_group(g, &clause.action, &clause.component)? == Some(true) {
                passing.push(g);
            }
        }
        if passing.is_empty() {
            warn!(
                rule = rule_name,
                action = %clause.action,
                component = %clause.component,
                "no group has the permission required by this default rule, skipping"
            );
            return Ok(None);
        }
        self.least_authoritative_group(&passing, &clause.component)
    }

    fn reject_core_install(&self, component: &str) -> Result<()> {
        if self.config.is_core_component(component) {
            return Err(AccessError::Validation(format!(
                "Cannot override core rule defaults (component='{}')",
                component
            )));
        }
        Ok(())
    }

    /// `com_example` -> `example`
    fn component_bare_name(&self, component: &str) -> Result<String> {
        let lower = component.trim().to_lowercase();
        lower
            .strip_prefix(&self.config.component_prefix)
            .filter(|b| !b.is_empty())
            .map(str::to_string)
            .ok_or_else(|| {
                AccessError::Validation(format!(
                    "Component name ({}) is malformed; it should be like '{}xyz'",
                    component, self.config.component_prefix
                ))
            })
    }

    fn root_rules(&self, root: &AssetRef) -> Result<Rules> {
        let blob = self
            .store
            .load_rules(root)?
            .ok_or_else(|| AccessError::Configuration(format!("root asset {} cannot be loaded", root)))?;
        Rules::from_json(&blob)
    }
}
