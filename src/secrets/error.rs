//! Error types for encryption provider operations.

use crate::errors::FlowplaneError;
use thiserror::Error;

/// Result type for encryption operations.
pub type Result<T> = std::result::Result<T, EncryptionError>;

/// Errors raised by encryption providers and the payload envelope.
///
/// Messages identify providers and key versions by name only; key bytes, nonces and
/// plaintext never appear.
#[derive(Error, Debug)]
pub enum EncryptionError {
    /// No provider with this name is registered.
    #[error("Unknown encryption provider: {provider}")]
    UnknownProvider { provider: String },

    /// The provider does not hold the requested key version.
    #[error("Unknown key version '{key_version}' for provider '{provider}'")]
    UnknownKeyVersion { provider: String, key_version: String },

    /// Key material could not be loaded.
    #[error("Invalid key '{key_version}': {reason}")]
    InvalidKey { key_version: String, reason: String },

    /// Stored payload could not be parsed.
    #[error("Malformed encrypted payload: {reason}")]
    MalformedPayload { reason: String },

    /// Sealing failed.
    #[error("Encryption failed for provider '{provider}'")]
    SealFailed { provider: String },

    /// Opening failed: tampered ciphertext or wrong key.
    #[error("Decryption failed for provider '{provider}' - authentication failed")]
    OpenFailed { provider: String },

    /// Provider set is inconsistent.
    #[error("Encryption configuration error: {message}")]
    Configuration { message: String },
}

impl EncryptionError {
    pub fn unknown_provider(provider: impl Into<String>) -> Self {
        Self::UnknownProvider { provider: provider.into() }
    }

    pub fn unknown_key_version(provider: impl Into<String>, key_version: impl Into<String>) -> Self {
        Self::UnknownKeyVersion { provider: provider.into(), key_version: key_version.into() }
    }

    pub fn invalid_key(key_version: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidKey { key_version: key_version.into(), reason: reason.into() }
    }

    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedPayload { reason: reason.into() }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration { message: message.into() }
    }
}

impl From<EncryptionError> for FlowplaneError {
    fn from(error: EncryptionError) -> Self {
        match error {
            EncryptionError::SealFailed { .. } => FlowplaneError::encryption(error.to_string()),
            EncryptionError::InvalidKey { .. } | EncryptionError::Configuration { .. } => {
                FlowplaneError::config(error.to_string())
            }
            _ => FlowplaneError::decryption(error.to_string()),
        }
    }
}
