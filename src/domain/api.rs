//! Stored API configurations and the policies attached to them.

use super::id::ConfigId;
use super::policy::PolicyInstance;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The only configuration kind whose policies carry resolvable parameters
pub const REST_API_KIND: &str = "RestApi";

/// A persisted API configuration.
///
/// `Clone` is a full deep copy: the cloned parameter trees share nothing with the
/// original.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredConfig {
    pub id: ConfigId,
    pub configuration: ApiConfiguration,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoredConfig {
    /// Wrap a configuration as a freshly stored, deployed record
    pub fn new(configuration: ApiConfiguration) -> Self {
        let now = Utc::now();
        Self {
            id: ConfigId::new(),
            configuration,
            status: "deployed".to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiConfiguration {
    pub api_version: String,
    pub kind: String,
    pub metadata: ApiMetadata,
    pub spec: ApiSpec,
}

impl ApiConfiguration {
    pub fn is_rest_api(&self) -> bool {
        self.kind == REST_API_KIND
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiMetadata {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiSpec {
    #[serde(default)]
    pub display_name: String,

    #[serde(default)]
    pub version: String,

    #[serde(default)]
    pub context: String,

    /// API-level policies, applied to every operation
    #[serde(default)]
    pub policies: Vec<PolicyInstance>,

    #[serde(default)]
    pub operations: Vec<Operation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub method: String,
    pub path: String,

    #[serde(default)]
    pub policies: Vec<PolicyInstance>,
}
