//! Secret entities: the user-submitted configuration document and the decrypted view
//! returned by the secret service.

use super::id::SecretId;
use crate::secrets::SecretString;
use crate::validation::secret_config::{
    validate_api_version, validate_resource_name, validate_secret_kind, validate_secret_value,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// `apiVersion` every secret configuration must declare
pub const SECRET_API_VERSION: &str = "flowplane.io/v1alpha1";

/// `kind` every secret configuration must declare
pub const SECRET_KIND: &str = "Secret";

/// Upper bound on a secret value, in UTF-8 bytes
pub const MAX_SECRET_VALUE_BYTES: usize = 10 * 1024;

/// A secret as submitted by users, in YAML or JSON.
///
/// Every field defaults when absent so that validation, not parsing, reports what is
/// missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct SecretConfiguration {
    #[validate(custom(function = validate_api_version))]
    pub api_version: String,

    #[validate(custom(function = validate_secret_kind))]
    pub kind: String,

    #[validate(nested)]
    pub metadata: SecretMetadata,

    #[validate(nested)]
    pub spec: SecretSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SecretMetadata {
    /// Becomes the secret's handle
    #[validate(
        length(min = 1, max = 253, message = "must be between 1 and 253 characters"),
        custom(function = validate_resource_name)
    )]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct SecretSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 253, message = "must be at most 253 characters"))]
    pub display_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 1024, message = "must be at most 1024 characters"))]
    pub description: Option<String>,

    #[validate(custom(function = validate_secret_value))]
    pub value: SecretString,
}

/// A stored secret with its plaintext attached by the secret service.
///
/// `value` is populated only on results of the service and is never serialized; the
/// remaining fields mirror the persisted record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Secret {
    pub id: SecretId,

    /// User-chosen unique name; changes on rename, unlike `id`
    pub handle: String,

    pub display_name: Option<String>,

    pub description: Option<String>,

    /// Marshaled encrypted payload
    pub ciphertext: String,

    /// Provider that sealed `ciphertext`
    pub provider: String,

    /// Key version that sealed `ciphertext`
    pub key_version: String,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    #[serde(skip)]
    pub value: Option<SecretString>,
}

impl Secret {
    /// Decrypted value, if this secret came back from the service
    pub fn value(&self) -> Option<&str> {
        self.value.as_ref().map(SecretString::expose_secret)
    }
}
