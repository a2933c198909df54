//! Component action manifests
//!
//! ```xml
//! <access component="com_example">
//!   <section name="component">
//!     <action name="example.publish" title="Publish" description="..."
//!             default="com_content:core.edit.state[Publisher]" />
//!   </section>
//! </access>
//! ```

use std::path::Path;

use serde::Deserialize;
use tracing::warn;

use crate::error::{AccessError, Result};

#[derive(Debug, Deserialize)]
struct RawManifest {
    #[serde(rename = "@component", default)]
    component: Option<String>,
    #[serde(rename = "section", default)]
    sections: Vec<RawSection>,
}

#[derive(Debug, Deserialize)]
struct RawSection {
    #[serde(rename = "@name", default)]
    name: String,
    #[serde(rename = "action", default)]
    actions: Vec<RawAction>,
}

#[derive(Debug, Deserialize)]
struct RawAction {
    #[serde(rename = "@name")]
    name: Option<String>,
    #[serde(rename = "@title")]
    title: Option<String>,
    #[serde(rename = "@description")]
    description: Option<String>,
    #[serde(rename = "@default")]
    default: Option<String>,
}

/// One declared action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionDef {
    pub name: String,
    pub title: String,
    pub description: String,
    /// Comma-separated `component:action[group hint]` clauses
    pub default: Option<String>,
}

impl ActionDef {
    /// Non-empty raw default clauses in declaration order
    pub fn default_clauses(&self) -> Vec<&str> {
        self.default
            .as_deref()
            .map(|d| d.split(',').map(str::trim).filter(|c| !c.is_empty()).collect())
            .unwrap_or_default()
    }
}

/// A parsed manifest
#[derive(Debug)]
pub struct Manifest {
    raw: RawManifest,
    source: String,
}

impl Manifest {
    /// Parse manifest XML. `source` names the document in error messages.
    pub fn parse(xml: &str, source: &str) -> Result<Self> {
        let raw: RawManifest = quick_xml::de::from_str(xml).map_err(|e| {
            AccessError::Validation(format!("Malformed access manifest '{}': {}", source, e))
        })?;
        Ok(Manifest { raw, source: source.to_string() })
    }

    /// Load a manifest file; errors name the file's base name
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let source = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let xml = std::fs::read_to_string(path).map_err(|e| {
            AccessError::NotFound(format!("access manifest '{}': {}", path.display(), e))
        })?;
        Self::parse(&xml, &source)
    }

    /// Document name used in messages
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Component declared on the root element, if any
    pub fn component(&self) -> Option<&str> {
        self.raw.component.as_deref()
    }

    /// Actions of a section. Entries missing a name, title or description are skipped.
    pub fn actions(&self, section: &str) -> Vec<ActionDef> {
        let mut out = Vec::new();
        for s in self.raw.sections.iter().filter(|s| s.name == section) {
            for a in &s.actions {
                match (&a.name, &a.title, &a.description) {
                    (Some(name), Some(title), Some(description)) => out.push(ActionDef {
                        name: name.clone(),
                        title: title.clone(),
                        description: description.clone(),
                        default: a.default.clone().filter(|d| !d.trim().is_empty()),
                    }),
                    _ => warn!(
                        source = %self.source,
                        section,
                        name = a.name.as_deref().unwrap_or(""),
                        "skipping action without name, title or description"
                    ),
                }
            }
        }
        out
    }
}

/// One parsed `component:action[group hint]` clause
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultClause {
    pub component: String,
    pub action: String,
    pub group_hint: Option<String>,
}

impl DefaultClause {
    /// Parse a clause declared for `rule_name` in `source`
    pub fn parse(raw: &str, rule_name: &str, source: &str, component_prefix: &str) -> Result<Self> {
        let raw = raw.trim();
        let Some((component, rest)) = raw.split_once(':') else {
            return Err(AccessError::Validation(format!(
                "Bad rule in '{}', default syntax for rule '{}'. Should be like: 'com_content:core.edit'",
                source, rule_name
            )));
        };
        let component = component.trim();
        if !component.starts_with(component_prefix) {
            return Err(AccessError::Validation(format!(
                "Error in '{}' rule for rule '{}'. Component name ({}) does not begin with '{}' (e.g. 'com_content')",
                source, rule_name, component, component_prefix
            )));
        }
        // Anything after a second colon is ignored
        let rest = rest.split(':').next().unwrap_or_default();
        let (action, group_hint) = match rest.split_once('[') {
            Some((action, hint)) => {
                let hint = hint.trim_matches(|c: char| c == '[' || c == ']' || c.is_whitespace());
                (action.trim(), (!hint.is_empty()).then(|| hint.to_string()))
            }
            None => (rest.trim(), None),
        };
        Ok(DefaultClause { component: component.to_string(), action: action.to_string(), group_hint })
    }
}
