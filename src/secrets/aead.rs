//! AEAD encryption provider backed by `ring`.
//!
//! Supports AES-256-GCM and ChaCha20-Poly1305 with 256-bit keys. Each seal uses a fresh
//! random 96-bit nonce, which is prepended to the sealed bytes:
//!
//! ```text
//! ciphertext = nonce (12 bytes) || sealed plaintext || tag (16 bytes)
//! ```
//!
//! ## Key Rotation
//!
//! A provider holds one or more key versions. The first configured key is the primary and
//! is used for every new encryption; the remaining keys are only used to open payloads
//! that name them, so values written before a rotation keep decrypting until rewritten.

use super::error::{EncryptionError, Result};
use super::payload::EncryptedPayload;
use super::provider::EncryptionProvider;
use crate::config::KeyConfig;
use base64::Engine;
use ring::aead::{self, Aad, BoundKey, Nonce, NonceSequence, UnboundKey};
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, error, instrument};
use zeroize::Zeroizing;

/// Size of the AEAD nonce in bytes
const NONCE_SIZE: usize = 12;

/// Size of the AEAD authentication tag in bytes
const TAG_SIZE: usize = 16;

/// Required key length in bytes
pub const KEY_SIZE: usize = 32;

/// AEAD algorithm used by an [`AeadProvider`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AeadAlgorithm {
    #[default]
    #[serde(rename = "aes-256-gcm")]
    Aes256Gcm,
    #[serde(rename = "chacha20-poly1305")]
    ChaCha20Poly1305,
}

impl AeadAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Aes256Gcm => "aes-256-gcm",
            Self::ChaCha20Poly1305 => "chacha20-poly1305",
        }
    }

    fn ring_algorithm(&self) -> &'static aead::Algorithm {
        match self {
            Self::Aes256Gcm => &aead::AES_256_GCM,
            Self::ChaCha20Poly1305 => &aead::CHACHA20_POLY1305,
        }
    }
}

impl FromStr for AeadAlgorithm {
    type Err = EncryptionError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "aes-256-gcm" => Ok(Self::Aes256Gcm),
            "chacha20-poly1305" => Ok(Self::ChaCha20Poly1305),
            other => Err(EncryptionError::configuration(format!(
                "unsupported algorithm '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for AeadAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Single-use nonce sequence for one seal/open call
struct SingleNonce {
    nonce: Option<[u8; NONCE_SIZE]>,
}

impl SingleNonce {
    fn new(nonce_bytes: [u8; NONCE_SIZE]) -> Self {
        Self { nonce: Some(nonce_bytes) }
    }
}

impl NonceSequence for SingleNonce {
    fn advance(&mut self) -> std::result::Result<Nonce, ring::error::Unspecified> {
        self.nonce.take().map(Nonce::assume_unique_for_key).ok_or(ring::error::Unspecified)
    }
}

/// Encryption provider sealing values with a versioned set of AEAD keys.
#[derive(Clone)]
pub struct AeadProvider {
    name: String,
    algorithm: AeadAlgorithm,
    primary_version: String,
    keys: Arc<HashMap<String, Zeroizing<[u8; KEY_SIZE]>>>,
    rng: Arc<SystemRandom>,
}

impl AeadProvider {
    /// Build a provider from base64 key configuration. The first key is the primary.
    pub fn new(
        name: impl Into<String>,
        algorithm: AeadAlgorithm,
        key_configs: &[KeyConfig],
    ) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(EncryptionError::configuration("provider name cannot be empty"));
        }

        let primary_version = key_configs
            .first()
            .map(|k| k.version.clone())
            .ok_or_else(|| {
                EncryptionError::configuration(format!("provider '{}' has no keys", name))
            })?;

        let mut keys = HashMap::with_capacity(key_configs.len());
        for key_config in key_configs {
            if key_config.version.is_empty() {
                return Err(EncryptionError::invalid_key("", "key version cannot be empty"));
            }

            let key = decode_key(&key_config.version, key_config.key.expose_secret())?;
            if keys.insert(key_config.version.clone(), key).is_some() {
                return Err(EncryptionError::configuration(format!(
                    "duplicate key version '{}' for provider '{}'",
                    key_config.version, name
                )));
            }
        }

        debug!(
            provider = %name,
            algorithm = %algorithm,
            key_version = %primary_version,
            key_count = keys.len(),
            "Encryption provider initialized"
        );

        Ok(Self {
            name,
            algorithm,
            primary_version,
            keys: Arc::new(keys),
            rng: Arc::new(SystemRandom::new()),
        })
    }

    fn key(&self, version: &str) -> Result<&[u8; KEY_SIZE]> {
        self.keys
            .get(version)
            .map(|k| &**k)
            .ok_or_else(|| EncryptionError::unknown_key_version(&self.name, version))
    }
}

fn decode_key(version: &str, encoded: &str) -> Result<Zeroizing<[u8; KEY_SIZE]>> {
    let bytes = Zeroizing::new(
        base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|_| EncryptionError::invalid_key(version, "key is not valid base64"))?,
    );

    if bytes.len() != KEY_SIZE {
        return Err(EncryptionError::invalid_key(
            version,
            format!("key must be {} bytes (256 bits), got {} bytes", KEY_SIZE, bytes.len()),
        ));
    }

    let mut key = Zeroizing::new([0u8; KEY_SIZE]);
    key.copy_from_slice(&bytes);
    Ok(key)
}

impl EncryptionProvider for AeadProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn key_version(&self) -> &str {
        &self.primary_version
    }

    #[instrument(skip(self, plaintext), fields(provider = %self.name, plaintext_len = plaintext.len()))]
    fn encrypt(&self, plaintext: &[u8]) -> Result<EncryptedPayload> {
        let seal_failed = || EncryptionError::SealFailed { provider: self.name.clone() };

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        self.rng.fill(&mut nonce_bytes).map_err(|_| {
            error!(provider = %self.name, "Failed to generate random nonce");
            seal_failed()
        })?;

        let key = self.key(&self.primary_version)?;
        let unbound_key = UnboundKey::new(self.algorithm.ring_algorithm(), key).map_err(|_| {
            error!(provider = %self.name, "Failed to create encryption key");
            seal_failed()
        })?;
        let mut sealing_key = aead::SealingKey::new(unbound_key, SingleNonce::new(nonce_bytes));

        let mut sealed = plaintext.to_vec();
        sealed.reserve(TAG_SIZE);
        sealing_key.seal_in_place_append_tag(Aad::empty(), &mut sealed).map_err(|_| {
            error!(provider = %self.name, "Encryption failed");
            seal_failed()
        })?;

        let mut ciphertext = Vec::with_capacity(NONCE_SIZE + sealed.len());
        ciphertext.extend_from_slice(&nonce_bytes);
        ciphertext.extend_from_slice(&sealed);

        debug!(ciphertext_len = ciphertext.len(), "Sealed secret payload");

        Ok(EncryptedPayload::new(&self.name, &self.primary_version, ciphertext))
    }

    #[instrument(
        skip(self, payload),
        fields(provider = %self.name, key_version = %payload.key_version, ciphertext_len = payload.ciphertext.len())
    )]
    fn decrypt(&self, payload: &EncryptedPayload) -> Result<Vec<u8>> {
        if payload.provider != self.name {
            return Err(EncryptionError::unknown_provider(&payload.provider));
        }

        if payload.ciphertext.len() < NONCE_SIZE + TAG_SIZE {
            return Err(EncryptionError::malformed(
                "ciphertext too short (missing nonce or authentication tag)",
            ));
        }

        let key = self.key(&payload.key_version)?;
        let (nonce, sealed) = payload.ciphertext.split_at(NONCE_SIZE);
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        nonce_bytes.copy_from_slice(nonce);

        let open_failed = || EncryptionError::OpenFailed { provider: self.name.clone() };
        let unbound_key =
            UnboundKey::new(self.algorithm.ring_algorithm(), key).map_err(|_| open_failed())?;
        let mut opening_key = aead::OpeningKey::new(unbound_key, SingleNonce::new(nonce_bytes));

        let mut buffer = sealed.to_vec();
        let plaintext = opening_key.open_in_place(Aad::empty(), &mut buffer).map_err(|_| {
            error!(provider = %self.name, "Decryption failed - possible tampering or wrong key");
            open_failed()
        })?;

        Ok(plaintext.to_vec())
    }
}

impl fmt::Debug for AeadProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AeadProvider")
            .field("name", &self.name)
            .field("algorithm", &self.algorithm)
            .field("primary_version", &self.primary_version)
            .field("keys", &"[REDACTED]")
            .finish()
    }
}
