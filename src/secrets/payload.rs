//! Versioned envelope for ciphertext produced by an encryption provider.
//!
//! The stored form is a small JSON document:
//!
//! ```text
//! {"v":1,"provider":"aesgcm","keyVersion":"2024-01","ciphertext":"<base64>"}
//! ```
//!
//! Recording the provider and key version next to the ciphertext is what lets payloads
//! written under a retired key stay decryptable after the primary key changes.

use super::error::{EncryptionError, Result};
use base64::Engine;
use serde::{Deserialize, Serialize};

/// Current envelope format version
pub const PAYLOAD_FORMAT_VERSION: u32 = 1;

/// Ciphertext plus the identity of the provider and key that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedPayload {
    pub provider: String,
    pub key_version: String,
    pub ciphertext: Vec<u8>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePayload {
    v: u32,
    provider: String,
    key_version: String,
    ciphertext: String,
}

impl EncryptedPayload {
    pub fn new(
        provider: impl Into<String>,
        key_version: impl Into<String>,
        ciphertext: Vec<u8>,
    ) -> Self {
        Self { provider: provider.into(), key_version: key_version.into(), ciphertext }
    }

    /// Serialize to the storable string form.
    ///
    /// Payloads without a provider or key version are rejected here as well as in
    /// [`EncryptedPayload::unmarshal`], so nothing is stored that cannot be read back.
    pub fn marshal(&self) -> Result<String> {
        validate_identity(&self.provider, &self.key_version)?;

        let wire = WirePayload {
            v: PAYLOAD_FORMAT_VERSION,
            provider: self.provider.clone(),
            key_version: self.key_version.clone(),
            ciphertext: base64::engine::general_purpose::STANDARD.encode(&self.ciphertext),
        };

        serde_json::to_string(&wire)
            .map_err(|e| EncryptionError::malformed(format!("failed to encode payload: {}", e)))
    }

    /// Parse the storable string form produced by [`EncryptedPayload::marshal`].
    pub fn unmarshal(encoded: &str) -> Result<Self> {
        let wire: WirePayload = serde_json::from_str(encoded)
            .map_err(|e| EncryptionError::malformed(format!("invalid envelope: {}", e)))?;

        if wire.v != PAYLOAD_FORMAT_VERSION {
            return Err(EncryptionError::malformed(format!(
                "unsupported payload version {}",
                wire.v
            )));
        }
        validate_identity(&wire.provider, &wire.key_version)?;

        let ciphertext = base64::engine::general_purpose::STANDARD
            .decode(wire.ciphertext.as_bytes())
            .map_err(|_| EncryptionError::malformed("ciphertext is not valid base64"))?;

        Ok(Self { provider: wire.provider, key_version: wire.key_version, ciphertext })
    }
}

fn validate_identity(provider: &str, key_version: &str) -> Result<()> {
    if provider.is_empty() {
        return Err(EncryptionError::malformed("provider is empty"));
    }
    if key_version.is_empty() {
        return Err(EncryptionError::malformed("key version is empty"));
    }
    Ok(())
}
