//! Rule records: action -> (identity -> allow/deny)
//!
//! Identities are integers. Positive values are group ids, negative values are
//! `-user_id` overrides for a single user. A stored value of 1 allows, 0 denies.
//!
//! Merging is order-independent for denies: once an identity holds an explicit
//! deny for an action, no later merge can turn it back into an allow. Allows
//! simply accumulate. Serialization keeps insertion order for both actions and
//! identities.

use std::fmt;

use indexmap::IndexMap;
use serde::de::{Deserializer, IgnoredAny};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

use crate::error::{AccessError, Result};

/// Group id (positive) or negated user id
pub type Identity = i64;

/// Identity for a single user's override entries.
///
/// Ids above `i64::MAX` have no identity and are rejected.
#[inline]
pub fn user_identity(user_id: u64) -> Result<Identity> {
    i64::try_from(user_id)
        .ok()
        .and_then(i64::checked_neg)
        .ok_or_else(|| AccessError::Validation(format!("user id {} is out of range", user_id)))
}

/// Identity of a group; ids above `i64::MAX` are rejected
#[inline]
pub fn group_identity(group_id: u64) -> Result<Identity> {
    i64::try_from(group_id)
        .map_err(|_| AccessError::Validation(format!("group id {} is out of range", group_id)))
}

/// Permissions for a single action
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rule {
    data: IndexMap<Identity, bool>,
}

impl Rule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a rule from `(identity, allow)` pairs, merged in order
    pub fn from_pairs<I: IntoIterator<Item = (Identity, bool)>>(pairs: I) -> Self {
        let mut r = Rule::new();
        r.merge_identities(pairs);
        r
    }

    /// Merge one identity. An existing deny always wins.
    pub fn merge_identity(&mut self, identity: Identity, allow: bool) {
        match self.data.get_mut(&identity) {
            Some(cur) if !*cur => {}
            Some(cur) => *cur = allow,
            None => {
                self.data.insert(identity, allow);
            }
        }
    }

    pub fn merge_identities<I: IntoIterator<Item = (Identity, bool)>>(&mut self, pairs: I) {
        for (id, allow) in pairs {
            self.merge_identity(id, allow);
        }
    }

    /// Merge another rule for the same action
    pub fn merge(&mut self, other: &Rule) {
        self.merge_identities(other.iter());
    }

    /// Evaluate against identities in caller order.
    ///
    /// Returns `Some(false)` as soon as an explicit deny is met, `Some(true)` if
    /// some identity is allowed and none denied, `None` if nothing matched.
    pub fn allow(&self, identities: &[Identity]) -> Option<bool> {
        let mut result = None;
        for id in identities {
            if let Some(&v) = self.data.get(id) {
                result = Some(v);
                if !v {
                    break;
                }
            }
        }
        result
    }

    pub fn get(&self, identity: Identity) -> Option<bool> {
        self.data.get(&identity).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Identity, bool)> + '_ {
        self.data.iter().map(|(k, v)| (*k, *v))
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }
}

impl Serialize for Rule {
    fn serialize<S: Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        let mut m = s.serialize_map(Some(self.data.len()))?;
        for (id, allow) in &self.data {
            m.serialize_entry(&id.to_string(), &u8::from(*allow))?;
        }
        m.end()
    }
}

/// Stored form of one action: an object of identity -> 0/1, or an empty list
#[derive(Deserialize)]
#[serde(untagged)]
enum RawRule {
    Map(IndexMap<String, RawFlag>),
    List(Vec<IgnoredAny>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawFlag {
    Int(i64),
    Bool(bool),
    Text(String),
}

impl RawFlag {
    fn allowed(&self) -> bool {
        match self {
            RawFlag::Int(i) => *i != 0,
            RawFlag::Bool(b) => *b,
            RawFlag::Text(t) => !matches!(t.trim(), "" | "0"),
        }
    }
}

impl<'de> Deserialize<'de> for Rule {
    fn deserialize<D: Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let mut rule = Rule::new();
        if let RawRule::Map(m) = RawRule::deserialize(d)? {
            for (k, v) in m {
                // Non-numeric keys are leftovers from empty form submissions
                if let Ok(id) = k.trim().parse::<Identity>() {
                    rule.merge_identity(id, v.allowed());
                }
            }
        }
        Ok(rule)
    }
}

/// A full rule record for one asset
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rules {
    data: IndexMap<String, Rule>,
}

impl Rules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a stored blob. Empty strings and `[]` yield an empty record.
    pub fn from_json(blob: &str) -> Result<Self> {
        let blob = blob.trim();
        if blob.is_empty() {
            return Ok(Rules::new());
        }
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawRules {
            Map(IndexMap<String, Rule>),
            List(Vec<IgnoredAny>),
        }
        Ok(match serde_json::from_str::<RawRules>(blob)? {
            RawRules::Map(data) => Rules { data },
            RawRules::List(_) => Rules::new(),
        })
    }

    /// Record with a single action
    pub fn single(action: &str, identity: Identity, allow: bool) -> Self {
        let mut r = Rules::new();
        r.merge_action(action, &Rule::from_pairs([(identity, allow)]));
        r
    }

    pub fn merge_action(&mut self, action: &str, rule: &Rule) {
        match self.data.get_mut(action) {
            Some(existing) => existing.merge(rule),
            None => {
                self.data.insert(action.to_string(), rule.clone());
            }
        }
    }

    /// Merge every action of `other` into this record
    pub fn merge(&mut self, other: &Rules) {
        for (action, rule) in &other.data {
            self.merge_action(action, rule);
        }
    }

    /// Merge a sequence of stored blobs in order (root-first for inheritance)
    pub fn merge_collection<I, S>(&mut self, blobs: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for blob in blobs {
            let r = Rules::from_json(blob.as_ref())?;
            self.merge(&r);
        }
        Ok(())
    }

    /// Tri-state decision for `action`; `None` when no rule matches
    pub fn allow(&self, action: &str, identities: &[Identity]) -> Option<bool> {
        self.data.get(action).and_then(|r| r.allow(identities))
    }

    /// Actions that evaluate to an explicit allow for the identities
    pub fn get_allowed(&self, identities: &[Identity]) -> Vec<String> {
        self.data
            .iter()
            .filter(|(_, r)| r.allow(identities) == Some(true))
            .map(|(a, _)| a.clone())
            .collect()
    }

    /// Drop every action whose name starts with `prefix`. Returns how many went.
    pub fn remove_actions(&mut self, prefix: &str) -> usize {
        let before = self.data.len();
        self.data.retain(|action, _| !action.starts_with(prefix));
        before - self.data.len()
    }

    pub fn get(&self, action: &str) -> Option<&Rule> {
        self.data.get(action)
    }

    pub fn actions(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Canonical JSON form
    pub fn to_json(&self) -> String {
        // Serializing string-keyed maps of integers cannot fail
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

impl Serialize for Rules {
    fn serialize<S: Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        let mut m = s.serialize_map(Some(self.data.len()))?;
        for (action, rule) in &self.data {
            m.serialize_entry(action, rule)?;
        }
        m.end()
    }
}

impl fmt::Display for Rules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_json())
    }
}
