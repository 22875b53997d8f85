//! Secret lifecycle: create, read, update, delete and list encrypted secrets.
//!
//! Plaintext enters through [`SecretParams`], is sealed by the primary encryption
//! provider before it reaches the [`SecretStore`], and is only reconstituted on the way
//! out. Stored records carry the provider and key version that sealed them, so rotating
//! the primary never breaks reads of older secrets.

use super::policy_resolver::SecretSource;
use crate::config::EncryptionConfig;
use crate::domain::{Secret, SecretConfiguration, SecretId};
use crate::errors::{FlowplaneError, Result};
use crate::secrets::{EncryptedPayload, ProviderManager, SecretString};
use crate::storage::{SecretRecord, SecretStore, StoreError};
use crate::validation::{parse_secret_configuration, validate_secret_configuration};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, info, instrument};
use zeroize::Zeroizing;

const RESOURCE_TYPE: &str = "Secret";

/// Raw input for create and update
#[derive(Clone)]
pub struct SecretParams {
    /// Secret configuration document
    pub data: Vec<u8>,

    /// MIME type of `data`
    pub content_type: String,

    /// Caller's request id, recorded on log spans
    pub correlation_id: Option<String>,
}

impl SecretParams {
    pub fn new(data: impl Into<Vec<u8>>, content_type: impl Into<String>) -> Self {
        Self { data: data.into(), content_type: content_type.into(), correlation_id: None }
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }
}

impl std::fmt::Debug for SecretParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretParams")
            .field("data", &format_args!("[{} bytes]", self.data.len()))
            .field("content_type", &self.content_type)
            .field("correlation_id", &self.correlation_id)
            .finish()
    }
}

/// Service for the encrypted secret lifecycle
#[derive(Clone)]
pub struct SecretService {
    store: Arc<dyn SecretStore>,
    encryption: Arc<ProviderManager>,
}

impl SecretService {
    pub fn new(store: Arc<dyn SecretStore>, encryption: Arc<ProviderManager>) -> Self {
        Self { store, encryption }
    }

    /// Build the provider manager from configuration
    pub fn from_config(store: Arc<dyn SecretStore>, config: &EncryptionConfig) -> Result<Self> {
        let encryption = ProviderManager::from_config(config)?;
        Ok(Self::new(store, Arc::new(encryption)))
    }

    /// Parse, validate, encrypt and persist a new secret.
    ///
    /// The handle is the configuration's `metadata.name`; an existing handle is a
    /// conflict. The returned secret carries the plaintext value.
    #[instrument(
        skip(self, params),
        fields(handle = tracing::field::Empty, correlation_id = ?params.correlation_id),
        name = "create_secret"
    )]
    pub fn create_secret(&self, params: SecretParams) -> Result<Secret> {
        let config = parse_and_validate(&params)?;
        let handle = config.metadata.name.clone();
        tracing::Span::current().record("handle", handle.as_str());

        if self.store.secret_exists(&handle).map_err(|e| self.store_error(&handle, "check", e))? {
            return Err(conflict(&handle));
        }

        let (payload, ciphertext) = self.seal(&handle, &config.spec.value)?;
        let now = Utc::now();
        let record = SecretRecord {
            id: SecretId::new(),
            handle: handle.clone(),
            display_name: config.spec.display_name,
            description: config.spec.description,
            ciphertext,
            provider: payload.provider,
            key_version: payload.key_version,
            created_at: now,
            updated_at: now,
        };

        self.store
            .save_secret(record.clone())
            .map_err(|e| self.store_error(&handle, "create", e))?;

        info!(
            secret_id = %record.id,
            provider = %record.provider,
            key_version = %record.key_version,
            "Created secret"
        );

        Ok(into_secret(record, Some(config.spec.value)))
    }

    /// Fetch and decrypt a secret by handle.
    #[instrument(skip(self), name = "get_secret")]
    pub fn get(&self, handle: &str) -> Result<Secret> {
        let record = self.store.get_secret(handle).map_err(|e| self.store_error(handle, "get", e))?;
        let value = self.open(&record)?;
        Ok(into_secret(record, Some(value)))
    }

    /// Replace a secret's configuration and value, possibly renaming it.
    ///
    /// The id and creation time are kept; the value is re-encrypted under the current
    /// primary provider. Renaming onto a handle owned by another secret is a conflict.
    /// The result is re-read from the store.
    #[instrument(
        skip(self, params),
        fields(new_handle = tracing::field::Empty, correlation_id = ?params.correlation_id),
        name = "update_secret"
    )]
    pub fn update_secret(&self, handle: &str, params: SecretParams) -> Result<Secret> {
        let config = parse_and_validate(&params)?;
        let new_handle = config.metadata.name.clone();
        tracing::Span::current().record("new_handle", new_handle.as_str());

        let existing =
            self.store.get_secret(handle).map_err(|e| self.store_error(handle, "update", e))?;

        if new_handle != handle
            && self
                .store
                .secret_exists(&new_handle)
                .map_err(|e| self.store_error(&new_handle, "check", e))?
        {
            return Err(conflict(&new_handle));
        }

        let (payload, ciphertext) = self.seal(&new_handle, &config.spec.value)?;
        let record = SecretRecord {
            id: existing.id,
            handle: new_handle.clone(),
            display_name: config.spec.display_name,
            description: config.spec.description,
            ciphertext,
            provider: payload.provider,
            key_version: payload.key_version,
            created_at: existing.created_at,
            updated_at: Utc::now(),
        };

        self.store
            .update_secret(handle, record)
            .map_err(|e| self.store_error(handle, "update", e))?;

        info!(renamed = new_handle != handle, "Updated secret");

        self.get(&new_handle)
    }

    /// Delete a secret by handle.
    #[instrument(skip(self), name = "delete_secret")]
    pub fn delete(&self, handle: &str) -> Result<()> {
        self.store.delete_secret(handle).map_err(|e| self.store_error(handle, "delete", e))?;
        info!("Deleted secret");
        Ok(())
    }

    /// Every stored handle
    pub fn get_secrets(&self) -> Result<Vec<String>> {
        self.store.get_secrets().map_err(|e| self.store_error("*", "list", e))
    }

    /// Whether the secret was sealed by anything other than the current primary key
    pub fn needs_rotation(&self, secret: &Secret) -> bool {
        self.encryption.is_stale(&secret.provider, &secret.key_version)
    }

    /// Encrypt with the primary provider and encode the payload for storage.
    fn seal(&self, handle: &str, value: &SecretString) -> Result<(EncryptedPayload, String)> {
        let payload = self.encryption.encrypt(value.expose_secret().as_bytes()).map_err(|e| {
            error!(handle = %handle, error = %e, "Failed to encrypt secret");
            FlowplaneError::from(e)
        })?;

        let encoded = payload.marshal().map_err(|e| {
            error!(
                handle = %handle,
                provider = %payload.provider,
                error = %e,
                "Encryption provider produced an unstorable payload"
            );
            FlowplaneError::encryption(e.to_string())
        })?;

        Ok((payload, encoded))
    }

    fn open(&self, record: &SecretRecord) -> Result<SecretString> {
        let payload = EncryptedPayload::unmarshal(&record.ciphertext).map_err(|e| {
            error!(handle = %record.handle, error = %e, "Stored secret payload is unreadable");
            FlowplaneError::from(e)
        })?;

        let plaintext = Zeroizing::new(self.encryption.decrypt(&payload).map_err(|e| {
            error!(
                handle = %record.handle,
                provider = %payload.provider,
                key_version = %payload.key_version,
                error = %e,
                "Failed to decrypt secret"
            );
            FlowplaneError::from(e)
        })?);

        let value = std::str::from_utf8(&plaintext).map_err(|_| {
            error!(handle = %record.handle, "Decrypted secret is not valid UTF-8");
            FlowplaneError::decryption(format!(
                "Secret '{}' did not decrypt to valid UTF-8",
                record.handle
            ))
        })?;

        Ok(SecretString::new(value))
    }

    /// Map a store failure; "not found" is an expected outcome and logged at debug only.
    fn store_error(&self, handle: &str, operation: &str, error: StoreError) -> FlowplaneError {
        match error {
            StoreError::NotFound { handle } => {
                debug!(handle = %handle, operation = %operation, "Secret not found");
                FlowplaneError::not_found(RESOURCE_TYPE, handle)
            }
            StoreError::AlreadyExists { handle } => conflict(&handle),
            other => {
                error!(
                    handle = %handle,
                    operation = %operation,
                    error = %other,
                    "Secret store operation failed"
                );
                FlowplaneError::storage_with_source(
                    format!("Failed to {} secret '{}'", operation, handle),
                    other,
                )
            }
        }
    }
}

impl SecretSource for SecretService {
    fn resolve_secret(&self, handle: &str) -> Result<SecretString> {
        let span = crate::secret_span!("resolve_secret", handle);
        let _guard = span.enter();

        self.get(handle)?
            .value
            .ok_or_else(|| FlowplaneError::internal(format!("Secret '{}' has no value", handle)))
    }
}

impl std::fmt::Debug for SecretService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretService").field("encryption", &self.encryption).finish_non_exhaustive()
    }
}

fn parse_and_validate(params: &SecretParams) -> Result<SecretConfiguration> {
    let config = parse_secret_configuration(&params.data, &params.content_type)?;

    let errors = validate_secret_configuration(&config);
    if !errors.is_empty() {
        debug!(error_count = errors.len(), "Secret configuration rejected");
        return Err(FlowplaneError::invalid_configuration(errors));
    }

    Ok(config)
}

fn conflict(handle: &str) -> FlowplaneError {
    FlowplaneError::conflict(format!("Secret '{}' already exists", handle), RESOURCE_TYPE)
}

fn into_secret(record: SecretRecord, value: Option<SecretString>) -> Secret {
    Secret {
        id: record.id,
        handle: record.handle,
        display_name: record.display_name,
        description: record.description,
        ciphertext: record.ciphertext,
        provider: record.provider,
        key_version: record.key_version,
        created_at: record.created_at,
        updated_at: record.updated_at,
        value,
    }
}
