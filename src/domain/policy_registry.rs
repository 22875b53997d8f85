//! Registry of policy definitions loaded from disk.
//!
//! Definitions are read from `*.yaml`, `*.yml` and `*.json` files in one directory. Each
//! file holds a single definition. YAML is a superset of JSON, so every file goes through
//! the YAML parser.

use super::policy::{policy_key, PolicyDefinition};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Policy definitions keyed by `name|version`
#[derive(Debug, Clone, Default)]
pub struct PolicyDefinitionRegistry {
    definitions: HashMap<String, PolicyDefinition>,
}

impl PolicyDefinitionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every definition file in `dir`.
    ///
    /// A file that fails to parse fails the whole load. Files are read in name order.
    pub fn load_from_directory(dir: &Path) -> Result<Self, PolicyLoadError> {
        let entries = std::fs::read_dir(dir).map_err(|e| PolicyLoadError::IoError {
            path: dir.to_path_buf(),
            message: e.to_string(),
        })?;

        let mut paths: Vec<PathBuf> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .filter(|path| {
                matches!(
                    path.extension().and_then(|e| e.to_str()),
                    Some("yaml") | Some("yml") | Some("json")
                )
            })
            .collect();
        paths.sort();

        let mut registry = Self::new();
        for path in paths {
            let definition = Self::load_file(&path)?;
            tracing::debug!(
                name = %definition.name,
                version = %definition.version,
                path = %path.display(),
                "Loaded policy definition"
            );
            registry.register(definition).map_err(|e| match e {
                PolicyLoadError::Duplicate { key, .. } => PolicyLoadError::Duplicate { key, path },
                other => other,
            })?;
        }

        tracing::info!(
            dir = %dir.display(),
            count = registry.len(),
            "Policy definitions loaded"
        );

        Ok(registry)
    }

    fn load_file(path: &Path) -> Result<PolicyDefinition, PolicyLoadError> {
        let content = std::fs::read_to_string(path).map_err(|e| PolicyLoadError::IoError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let definition: PolicyDefinition = serde_yaml::from_str(&content).map_err(|e| {
            PolicyLoadError::ParseError { path: path.to_path_buf(), message: e.to_string() }
        })?;

        if definition.name.trim().is_empty() || definition.version.trim().is_empty() {
            return Err(PolicyLoadError::ParseError {
                path: path.to_path_buf(),
                message: "name and version are required".to_string(),
            });
        }

        Ok(definition)
    }

    /// Add a definition; a second definition with the same `name|version` is rejected.
    pub fn register(&mut self, definition: PolicyDefinition) -> Result<(), PolicyLoadError> {
        let key = definition.key();
        if self.definitions.contains_key(&key) {
            return Err(PolicyLoadError::Duplicate { key, path: PathBuf::new() });
        }
        self.definitions.insert(key, definition);
        Ok(())
    }

    pub fn get(&self, name: &str, version: &str) -> Option<&PolicyDefinition> {
        self.definitions.get(&policy_key(name, version))
    }

    /// The `name|version → definition` map consumed by the resolve-rule compiler
    pub fn definitions(&self) -> &HashMap<String, PolicyDefinition> {
        &self.definitions
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

/// Error types for policy definition loading.
#[derive(Debug, thiserror::Error)]
pub enum PolicyLoadError {
    #[error("IO error reading {path}: {message}")]
    IoError { path: PathBuf, message: String },

    #[error("Parse error in {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Duplicate policy definition '{key}' in {path}")]
    Duplicate { key: String, path: PathBuf },
}

impl From<PolicyLoadError> for crate::errors::FlowplaneError {
    fn from(error: PolicyLoadError) -> Self {
        Self::config_with_source("Failed to load policy definitions", Box::new(error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, file: &str, content: &str) {
        fs::write(dir.join(file), content).unwrap();
    }

    #[test]
    fn test_load_yaml_and_json_definitions() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "basic-auth.yaml",
            "name: basic-auth\nversion: v1\nparameters:\n  type: object\n  resolve: [password]\n",
        );
        write(dir.path(), "cors.json", r#"{"name": "cors", "version": "v2"}"#);
        write(dir.path(), "README.md", "not a definition");

        let registry = PolicyDefinitionRegistry::load_from_directory(dir.path()).unwrap();

        assert_eq!(registry.len(), 2);
        assert!(registry.get("basic-auth", "v1").and_then(|d| d.parameters.as_ref()).is_some());
        assert!(registry.get("cors", "v2").is_some());
        assert!(registry.definitions().contains_key("cors|v2"));
    }

    #[test]
    fn test_duplicate_definitions_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.yaml", "name: cors\nversion: v1\n");
        write(dir.path(), "b.yml", "name: cors\nversion: v1\n");

        let err = PolicyDefinitionRegistry::load_from_directory(dir.path()).unwrap_err();
        assert!(matches!(err, PolicyLoadError::Duplicate { ref key, .. } if key == "cors|v1"));
    }

    #[test]
    fn test_malformed_definition_fails() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "broken.yaml", "name: [unclosed\n");

        let err = PolicyDefinitionRegistry::load_from_directory(dir.path()).unwrap_err();
        assert!(matches!(err, PolicyLoadError::ParseError { .. }));
    }

    #[test]
    fn test_missing_directory_fails() {
        let err =
            PolicyDefinitionRegistry::load_from_directory(Path::new("/nonexistent/policies"))
                .unwrap_err();
        assert!(matches!(err, PolicyLoadError::IoError { .. }));
    }
}
