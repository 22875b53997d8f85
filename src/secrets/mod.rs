//! Envelope encryption for secret values.
//!
//! Secret plaintext is sealed by an [`EncryptionProvider`] into an [`EncryptedPayload`]
//! that records which provider and key version produced it. The [`ProviderManager`]
//! seals new values with the configured primary provider and opens stored payloads with
//! the provider named inside them, which keeps provider and key rotation non-disruptive:
//! old secrets keep working until they are rewritten.
//!
//! # Security Considerations
//!
//! - Plaintext only ever lives in a [`SecretString`], which redacts itself and is zeroed
//!   on drop
//! - Key material is zeroed on drop and never appears in `Debug` output or errors
//! - Errors name providers and key versions, never algorithms' internal state

pub mod aead;
pub mod error;
pub mod payload;
pub mod provider;
pub mod types;

pub use aead::{AeadAlgorithm, AeadProvider};
pub use error::EncryptionError;
pub use payload::EncryptedPayload;
pub use provider::{EncryptionProvider, ProviderManager};
pub use types::SecretString;
