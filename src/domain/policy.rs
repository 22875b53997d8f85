//! Policy definitions, policy instances and the resolve rules compiled from them.
//!
//! A [`PolicyDefinition`] is the schema-bearing description of a policy type. Its
//! `parameters` JSON-schema may mark string fields for secret resolution with a
//! `resolve` list; those markings are compiled into [`ResolveRule`]s keyed by
//! [`policy_key`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Composite key identifying a policy type: `name|version`
pub fn policy_key(name: &str, version: &str) -> String {
    format!("{}|{}", name, version)
}

/// Definition of a policy type, immutable once loaded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyDefinition {
    pub name: String,
    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// JSON-schema-like parameter description, possibly carrying `resolve` markings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
}

impl PolicyDefinition {
    /// The `name|version` key of this definition
    pub fn key(&self) -> String {
        policy_key(&self.name, &self.version)
    }
}

/// A policy attached to an API or to one of its operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyInstance {
    pub name: String,
    pub version: String,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_condition: Option<String>,

    #[serde(default)]
    pub parameters: Map<String, Value>,
}

fn default_enabled() -> bool {
    true
}

impl PolicyInstance {
    /// Create an enabled instance with the given parameters
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        parameters: Map<String, Value>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            enabled: true,
            execution_condition: None,
            parameters,
        }
    }
}

/// A dotted path into a policy instance's parameters, e.g. `params.headers.*.value`.
///
/// The first segment is always `params`; `*` selects every element of an array.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResolveRule {
    pub path: String,
}

impl ResolveRule {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    /// Path segments in order
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.path.split('.')
    }
}

/// Read-only table of compiled resolve rules keyed by `name|version`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolveRuleTable {
    rules: HashMap<String, Vec<ResolveRule>>,
}

impl ResolveRuleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the rules for one policy type, replacing any previous entry
    pub fn insert(&mut self, name: &str, version: &str, rules: Vec<ResolveRule>) {
        self.rules.insert(policy_key(name, version), rules);
    }

    /// Rules for a policy type; empty when the type is unknown or has no secret fields
    pub fn get(&self, name: &str, version: &str) -> &[ResolveRule] {
        self.rules.get(&policy_key(name, version)).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of policy types with at least one rule
    pub fn len(&self) -> usize {
        self.rules.values().filter(|rules| !rules.is_empty()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
