//! Resolve-rule compilation.
//!
//! Walks each policy definition's parameter schema once and records the paths of string
//! fields marked for secret resolution. A schema node marks fields with a `resolve` list
//! of property names and nests further schemas under `properties` (objects) and `items`
//! (arrays):
//!
//! ```yaml
//! parameters:
//!   type: object
//!   properties:
//!     headers:
//!       type: array
//!       items:
//!         type: object
//!         resolve: [value]
//! ```
//!
//! compiles to the single rule `params.headers.*.value`.

use crate::domain::{PolicyDefinition, ResolveRule, ResolveRuleTable};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Root segment of every compiled path
pub const PARAMS_ROOT: &str = "params";

/// Segment selecting every element of an array
pub const WILDCARD: &str = "*";

/// Compile rules for every definition, keyed by the definition's own `name|version`.
pub fn compile_resolve_rules(definitions: &HashMap<String, PolicyDefinition>) -> ResolveRuleTable {
    let mut table = ResolveRuleTable::new();

    for definition in definitions.values() {
        let rules = compile_definition(definition);
        if !rules.is_empty() {
            debug!(
                policy = %definition.name,
                version = %definition.version,
                rule_count = rules.len(),
                "Compiled secret resolve rules"
            );
        }
        table.insert(&definition.name, &definition.version, rules);
    }

    table
}

/// Compile the rules for one definition. Definitions without parameters have none.
///
/// Properties are visited in sorted key order and `resolve` entries in declared order,
/// so the output is deterministic. Repeated paths are kept once.
pub fn compile_definition(definition: &PolicyDefinition) -> Vec<ResolveRule> {
    let Some(parameters) = &definition.parameters else {
        return Vec::new();
    };

    let mut compiler = Compiler { definition, rules: Vec::new(), seen: HashSet::new() };
    compiler.visit(parameters, PARAMS_ROOT.to_string());
    compiler.rules
}

struct Compiler<'a> {
    definition: &'a PolicyDefinition,
    rules: Vec<ResolveRule>,
    seen: HashSet<String>,
}

impl Compiler<'_> {
    fn visit(&mut self, node: &Value, path: String) {
        let Value::Object(schema) = node else {
            return;
        };

        if let Some(resolve) = schema.get("resolve") {
            match resolve {
                Value::Array(fields) => {
                    for field in fields {
                        match field.as_str() {
                            Some(field) => self.push(format!("{}.{}", path, field)),
                            None => self.malformed(&path, "resolve", "entries must be strings"),
                        }
                    }
                }
                _ => self.malformed(&path, "resolve", "must be a list of property names"),
            }
        }

        if let Some(properties) = schema.get("properties") {
            match properties {
                Value::Object(properties) => {
                    let mut names: Vec<&String> = properties.keys().collect();
                    names.sort();
                    for name in names {
                        self.visit(&properties[name.as_str()], format!("{}.{}", path, name));
                    }
                }
                _ => self.malformed(&path, "properties", "must be a map of schemas"),
            }
        }

        if let Some(items) = schema.get("items") {
            match items {
                Value::Object(_) => self.visit(items, format!("{}.{}", path, WILDCARD)),
                _ => self.malformed(&path, "items", "must be a schema"),
            }
        }
    }

    fn push(&mut self, path: String) {
        if self.seen.insert(path.clone()) {
            self.rules.push(ResolveRule::new(path));
        }
    }

    fn malformed(&self, path: &str, keyword: &str, reason: &str) {
        warn!(
            policy = %self.definition.name,
            version = %self.definition.version,
            path = %path,
            keyword = %keyword,
            reason = %reason,
            "Ignoring malformed schema keyword"
        );
    }
}
