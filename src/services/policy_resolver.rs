//! Secret resolution for the policies of a stored API configuration.
//!
//! The resolver never mutates its input. When nothing needs resolving it hands the
//! caller's configuration back borrowed; otherwise it resolves a deep copy, so the
//! plaintext only ever exists in the returned value.

use super::resolve_rules::{compile_resolve_rules, PARAMS_ROOT, WILDCARD};
use super::template::{render_secret_template, TemplateError};
use crate::domain::{PolicyDefinition, PolicyInstance, ResolveRule, ResolveRuleTable, StoredConfig};
use crate::errors::{Result, ValidationError};
use crate::secrets::SecretString;
use serde_json::Value;
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Source of decrypted secret values, looked up by handle
pub trait SecretSource: Send + Sync {
    fn resolve_secret(&self, handle: &str) -> Result<SecretString>;
}

/// Why one resolve rule failed to apply to a policy instance
#[derive(Debug, thiserror::Error)]
enum RuleError {
    #[error("invalid resolve path '{path}'")]
    InvalidPath { path: String },

    #[error("expected an array at '{at}' for resolve path '{path}'")]
    NotAnArray { at: String, path: String },

    #[error("expected an object at '{at}' for resolve path '{path}'")]
    NotAnObject { at: String, path: String },

    #[error("{path}: {source}")]
    Template {
        path: String,
        #[source]
        source: TemplateError,
    },
}

/// Resolves `$secret{...}` tokens in policy parameters using precompiled resolve rules.
///
/// Stateless after construction; safe to share across threads.
pub struct PolicySecretResolver {
    rules: ResolveRuleTable,
    secrets: Arc<dyn SecretSource>,
}

impl PolicySecretResolver {
    /// Compile resolve rules from `name|version → definition` and bind a secret source.
    pub fn new(
        definitions: &HashMap<String, PolicyDefinition>,
        secrets: Arc<dyn SecretSource>,
    ) -> Self {
        Self::from_table(compile_resolve_rules(definitions), secrets)
    }

    /// Use an already compiled rule table
    pub fn from_table(rules: ResolveRuleTable, secrets: Arc<dyn SecretSource>) -> Self {
        debug!(policy_types = rules.len(), "Policy secret resolver ready");
        Self { rules, secrets }
    }

    /// Resolve rules for a policy type; empty when it has no secret fields
    pub fn get_resolve_rules(&self, name: &str, version: &str) -> &[ResolveRule] {
        self.rules.get(name, version)
    }

    fn has_rules(&self, policy: &PolicyInstance) -> bool {
        !self.get_resolve_rules(&policy.name, &policy.version).is_empty()
    }

    /// Resolve every secret reference in the configuration's policies.
    ///
    /// Configurations that are not `RestApi`, or whose policies have no resolve rules,
    /// come back borrowed. Otherwise API-level policies and then each operation's
    /// policies are resolved on a copy. A failing policy stops at its first error and
    /// the remaining policies are still attempted; any failure returns every error,
    /// attributed to `spec.policies[i]` or `spec.operations[j].policies[i]`.
    pub fn resolve_policies<'a>(
        &self,
        stored: &'a StoredConfig,
    ) -> std::result::Result<Cow<'a, StoredConfig>, Vec<ValidationError>> {
        let configuration = &stored.configuration;
        if !configuration.is_rest_api() {
            return Ok(Cow::Borrowed(stored));
        }

        let spec = &configuration.spec;
        let needs_resolution = spec
            .policies
            .iter()
            .chain(spec.operations.iter().flat_map(|op| op.policies.iter()))
            .any(|policy| self.has_rules(policy));
        if !needs_resolution {
            return Ok(Cow::Borrowed(stored));
        }

        let span = crate::resolve_span!(stored.id, configuration.metadata.name);
        let _guard = span.enter();

        let mut resolved = stored.clone();
        let mut errors = Vec::new();

        for (index, policy) in resolved.configuration.spec.policies.iter_mut().enumerate() {
            if let Err(message) = self.resolve_policy(policy) {
                errors.push(ValidationError::new(format!("spec.policies[{}]", index), message));
            }
        }

        for (op_index, operation) in resolved.configuration.spec.operations.iter_mut().enumerate()
        {
            for (index, policy) in operation.policies.iter_mut().enumerate() {
                if let Err(message) = self.resolve_policy(policy) {
                    errors.push(ValidationError::new(
                        format!("spec.operations[{}].policies[{}]", op_index, index),
                        message,
                    ));
                }
            }
        }

        if errors.is_empty() {
            debug!("Resolved policy secrets");
            Ok(Cow::Owned(resolved))
        } else {
            warn!(error_count = errors.len(), "Policy secret resolution failed");
            Err(errors)
        }
    }

    /// Apply every rule of the policy's type, stopping at the first failure.
    fn resolve_policy(&self, policy: &mut PolicyInstance) -> std::result::Result<(), String> {
        let rules = self.get_resolve_rules(&policy.name, &policy.version);
        if rules.is_empty() {
            return Ok(());
        }

        let mut root = Value::Object(std::mem::take(&mut policy.parameters));
        let outcome = rules.iter().try_for_each(|rule| self.apply_rule(&mut root, rule));
        if let Value::Object(parameters) = root {
            policy.parameters = parameters;
        }

        outcome.map_err(|e| {
            debug!(
                policy = %policy.name,
                version = %policy.version,
                error = %e,
                "Policy resolution failed"
            );
            format!("policy '{}' version '{}': {}", policy.name, policy.version, e)
        })
    }

    fn apply_rule(
        &self,
        root: &mut Value,
        rule: &ResolveRule,
    ) -> std::result::Result<(), RuleError> {
        let segments: Vec<&str> = rule.segments().collect();
        let invalid = || RuleError::InvalidPath { path: rule.path.clone() };

        let (target, intermediate) = match segments.split_first() {
            Some((&first, rest)) if first == PARAMS_ROOT => {
                rest.split_last().ok_or_else(invalid).map(|(target, rest)| (*target, rest))?
            }
            _ => return Err(invalid()),
        };
        if target == WILDCARD || segments.iter().any(|s| s.is_empty()) {
            return Err(invalid());
        }

        let mut candidates: Vec<&mut Value> = vec![root];
        for (depth, segment) in intermediate.iter().enumerate() {
            let at = || segments[..=depth].join(".");
            let mut next = Vec::with_capacity(candidates.len());

            for candidate in candidates {
                if *segment == WILDCARD {
                    match candidate {
                        Value::Array(items) => next.extend(items.iter_mut()),
                        _ => {
                            return Err(RuleError::NotAnArray { at: at(), path: rule.path.clone() })
                        }
                    }
                } else {
                    match candidate {
                        Value::Object(map) => next.extend(map.get_mut(*segment)),
                        Value::Null => {}
                        _ => {
                            return Err(RuleError::NotAnObject { at: at(), path: rule.path.clone() })
                        }
                    }
                }
            }

            candidates = next;
        }

        for candidate in candidates {
            let value = match candidate {
                Value::Object(map) => map.get_mut(target),
                Value::Null => None,
                _ => {
                    return Err(RuleError::NotAnObject {
                        at: segments[..=intermediate.len()].join("."),
                        path: rule.path.clone(),
                    })
                }
            };

            if let Some(Value::String(text)) = value {
                let replacement = match render_secret_template(text, |handle| {
                    self.secrets.resolve_secret(handle)
                }) {
                    Ok(Cow::Owned(rendered)) => Some(rendered),
                    Ok(Cow::Borrowed(_)) => None,
                    Err(source) => {
                        return Err(RuleError::Template { path: rule.path.clone(), source })
                    }
                };
                if let Some(rendered) = replacement {
                    *text = rendered;
                }
            }
        }

        Ok(())
    }
}

impl std::fmt::Debug for PolicySecretResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicySecretResolver").field("rules", &self.rules).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ApiConfiguration, ApiMetadata, ApiSpec, Operation, REST_API_KIND};
    use crate::errors::FlowplaneError;
    use serde_json::{json, Map};

    struct StaticSecrets(HashMap<&'static str, &'static str>);

    impl SecretSource for StaticSecrets {
        fn resolve_secret(&self, handle: &str) -> Result<SecretString> {
            self.0
                .get(handle)
                .map(|v| SecretString::new(*v))
                .ok_or_else(|| FlowplaneError::not_found("Secret", handle))
        }
    }

    fn resolver(rules: &[(&str, &[&str])]) -> PolicySecretResolver {
        let mut table = ResolveRuleTable::new();
        for (name, paths) in rules {
            table.insert(name, "v1", paths.iter().map(|p| ResolveRule::new(*p)).collect());
        }
        let secrets =
            StaticSecrets(HashMap::from([("db-pass", "hunter2"), ("api-key", "sk_123")]));
        PolicySecretResolver::from_table(table, Arc::new(secrets))
    }

    fn params(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    fn stored(policies: Vec<PolicyInstance>, operations: Vec<Operation>) -> StoredConfig {
        StoredConfig::new(ApiConfiguration {
            api_version: "flowplane.io/v1alpha1".to_string(),
            kind: REST_API_KIND.to_string(),
            metadata: ApiMetadata { name: "orders-api".to_string() },
            spec: ApiSpec { policies, operations, ..ApiSpec::default() },
        })
    }

    #[test]
    fn test_non_rest_api_is_borrowed() {
        let r = resolver(&[("basic-auth", &["params.password"])]);
        let mut config = stored(
            vec![PolicyInstance::new("basic-auth", "v1", params(json!({"password": "$secret{db-pass}"})))],
            vec![],
        );
        config.configuration.kind = "AsyncApi".to_string();

        assert!(matches!(r.resolve_policies(&config), Ok(Cow::Borrowed(_))));
    }

    #[test]
    fn test_nothing_to_resolve_is_borrowed() {
        let r = resolver(&[("basic-auth", &["params.password"])]);
        let config = stored(
            vec![PolicyInstance::new("cors", "v1", params(json!({"origin": "$secret{db-pass}"})))],
            vec![],
        );

        assert!(matches!(r.resolve_policies(&config), Ok(Cow::Borrowed(_))));
    }

    #[test]
    fn test_resolves_api_and_operation_policies() {
        let r = resolver(&[("basic-auth", &["params.password"])]);
        let config = stored(
            vec![PolicyInstance::new("basic-auth", "v1", params(json!({"password": "$secret{db-pass}"})))],
            vec![Operation {
                method: "GET".to_string(),
                path: "/orders".to_string(),
                policies: vec![PolicyInstance::new(
                    "basic-auth",
                    "v1",
                    params(json!({"password": "pre-$secret{api-key}"})),
                )],
            }],
        );

        let resolved = r.resolve_policies(&config).unwrap();
        let spec = &resolved.configuration.spec;
        assert_eq!(spec.policies[0].parameters["password"], "hunter2");
        assert_eq!(spec.operations[0].policies[0].parameters["password"], "pre-sk_123");
        assert_eq!(config.configuration.spec.policies[0].parameters["password"], "$secret{db-pass}");
    }

    #[test]
    fn test_wildcard_and_skipped_candidates() {
        let r = resolver(&[("set-headers", &["params.headers.*.value"])]);
        let config = stored(
            vec![PolicyInstance::new(
                "set-headers",
                "v1",
                params(json!({"headers": [
                    {"name": "x-api-key", "value": "$secret{api-key}"},
                    {"name": "x-static", "value": "plain"},
                    {"name": "x-count", "value": 3},
                    {"name": "x-none"}
                ]})),
            )],
            vec![],
        );

        let resolved = r.resolve_policies(&config).unwrap();
        let headers = &resolved.configuration.spec.policies[0].parameters["headers"];
        assert_eq!(headers[0]["value"], "sk_123");
        assert_eq!(headers[1]["value"], "plain");
        assert_eq!(headers[2]["value"], 3);
        assert!(headers[3].get("value").is_none());
    }

    #[test]
    fn test_null_intermediate_is_skipped() {
        let r = resolver(&[("jwt", &["params.provider.secret"])]);
        let config =
            stored(vec![PolicyInstance::new("jwt", "v1", params(json!({"provider": null})))], vec![]);

        assert!(r.resolve_policies(&config).is_ok());
    }

    #[test]
    fn test_wildcard_on_non_array_fails() {
        let r = resolver(&[("set-headers", &["params.headers.*.value"])]);
        let config = stored(
            vec![PolicyInstance::new("set-headers", "v1", params(json!({"headers": {"value": "x"}})))],
            vec![],
        );

        let errors = r.resolve_policies(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "spec.policies[0]");
        assert!(errors[0].message.contains("expected an array at 'params.headers'"));
    }

    #[test]
    fn test_property_on_scalar_fails() {
        let r = resolver(&[("jwt", &["params.provider.secret"])]);
        let config =
            stored(vec![PolicyInstance::new("jwt", "v1", params(json!({"provider": "x"})))], vec![]);

        let errors = r.resolve_policies(&config).unwrap_err();
        assert!(errors[0].message.contains("expected an object at 'params.provider'"));
    }

    #[test]
    fn test_scalar_items_under_wildcard_fail() {
        let r = resolver(&[("tags", &["params.tags.*.value"])]);
        let config = stored(
            vec![PolicyInstance::new("tags", "v1", params(json!({"tags": ["a", "b"]})))],
            vec![],
        );

        let errors = r.resolve_policies(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("expected an object at 'params.tags.*'"));
    }

    #[test]
    fn test_invalid_paths_fail() {
        for path in ["params", "config.password", "params..password", "params.*"] {
            let r = resolver(&[("basic-auth", &[path])]);
            let config = stored(
                vec![PolicyInstance::new("basic-auth", "v1", params(json!({"password": "x"})))],
                vec![],
            );
            let errors = r.resolve_policies(&config).unwrap_err();
            assert!(errors[0].message.contains("invalid resolve path"), "{path}");
        }
    }

    #[test]
    fn test_errors_are_attributed_per_policy() {
        let r = resolver(&[("basic-auth", &["params.password", "params.username"])]);
        let config = stored(
            vec![
                PolicyInstance::new("basic-auth", "v1", params(json!({"password": "$secret{db-pass}"}))),
                PolicyInstance::new(
                    "basic-auth",
                    "v1",
                    params(json!({"password": "$secret{missing}", "username": "$secret{gone}"})),
                ),
            ],
            vec![Operation {
                method: "POST".to_string(),
                path: "/orders".to_string(),
                policies: vec![PolicyInstance::new(
                    "basic-auth",
                    "v1",
                    params(json!({"username": "$secret{"})),
                )],
            }],
        );

        let errors = r.resolve_policies(&config).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["spec.policies[1]", "spec.operations[0].policies[0]"]);
        assert!(errors[0].message.contains("'missing'"));
        assert!(!errors[0].message.contains("'gone'"));
        assert!(errors[1].message.contains("malformed"));
    }

    #[test]
    fn test_get_resolve_rules() {
        let r = resolver(&[("basic-auth", &["params.password"])]);
        assert_eq!(r.get_resolve_rules("basic-auth", "v1").len(), 1);
        assert!(r.get_resolve_rules("basic-auth", "v9").is_empty());
    }
}
