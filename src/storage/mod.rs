//! # Secret Storage
//!
//! The persistence boundary for encrypted secrets. A [`SecretStore`] holds
//! [`SecretRecord`]s keyed by handle and never sees plaintext: the secret service seals
//! values before they reach the store and opens them after they leave it.

pub mod memory;

pub use memory::InMemorySecretStore;

use crate::domain::SecretId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Result type for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// A persisted secret. Carries the marshaled encrypted payload, never the plaintext.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretRecord {
    pub id: SecretId,
    pub handle: String,
    pub display_name: Option<String>,
    pub description: Option<String>,

    /// Marshaled [`EncryptedPayload`](crate::secrets::EncryptedPayload)
    pub ciphertext: String,

    pub provider: String,
    pub key_version: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Errors reported by a [`SecretStore`]
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Secret '{handle}' not found")]
    NotFound { handle: String },

    #[error("Secret '{handle}' already exists")]
    AlreadyExists { handle: String },

    #[error("Secret store failure: {message}")]
    Backend {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl StoreError {
    pub fn not_found(handle: impl Into<String>) -> Self {
        Self::NotFound { handle: handle.into() }
    }

    pub fn already_exists(handle: impl Into<String>) -> Self {
        Self::AlreadyExists { handle: handle.into() }
    }

    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend { message: message.into(), source: None }
    }

    /// Whether this error means "no such handle"
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Persistence for encrypted secret records, keyed by handle.
///
/// Implementations must be safe for concurrent use and must make a write to a single
/// handle atomic. They must not cache or ever receive plaintext.
pub trait SecretStore: Send + Sync {
    /// Persist a new record; fails with `AlreadyExists` if the handle is taken
    fn save_secret(&self, record: SecretRecord) -> StoreResult<()>;

    /// Fetch the record stored under `handle`
    fn get_secret(&self, handle: &str) -> StoreResult<SecretRecord>;

    /// Replace the record stored under `current_handle`.
    ///
    /// When `record.handle` differs from `current_handle` the record moves to the new
    /// handle; a new handle held by a different secret fails with `AlreadyExists`.
    fn update_secret(&self, current_handle: &str, record: SecretRecord) -> StoreResult<()>;

    fn delete_secret(&self, handle: &str) -> StoreResult<()>;

    fn secret_exists(&self, handle: &str) -> StoreResult<bool>;

    /// Every stored handle
    fn get_secrets(&self) -> StoreResult<Vec<String>>;
}
