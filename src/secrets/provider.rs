//! Encryption provider abstraction and the manager that routes between providers.

use super::aead::AeadProvider;
use super::error::{EncryptionError, Result};
use super::payload::EncryptedPayload;
use crate::config::EncryptionConfig;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// A pluggable encryption primitive.
///
/// Implementations must be safe for concurrent use. `encrypt` always seals under the
/// provider's current key version; `decrypt` must honour the key version recorded in the
/// payload.
pub trait EncryptionProvider: Send + Sync + fmt::Debug {
    /// Stable provider identifier written into every payload
    fn name(&self) -> &str;

    /// Key version new payloads are sealed with
    fn key_version(&self) -> &str;

    fn encrypt(&self, plaintext: &[u8]) -> Result<EncryptedPayload>;

    fn decrypt(&self, payload: &EncryptedPayload) -> Result<Vec<u8>>;
}

/// Ordered set of providers with an explicit primary.
///
/// New values are always sealed by the primary. Payloads are opened by whichever provider
/// they name, so switching the primary never strands previously written secrets.
#[derive(Clone)]
pub struct ProviderManager {
    providers: Vec<Arc<dyn EncryptionProvider>>,
    primary: usize,
}

impl ProviderManager {
    /// Create a manager from already-built providers.
    pub fn new(providers: Vec<Arc<dyn EncryptionProvider>>, primary: &str) -> Result<Self> {
        if providers.is_empty() {
            return Err(EncryptionError::configuration("at least one provider is required"));
        }

        for (index, provider) in providers.iter().enumerate() {
            if providers[..index].iter().any(|p| p.name() == provider.name()) {
                return Err(EncryptionError::configuration(format!(
                    "duplicate provider '{}'",
                    provider.name()
                )));
            }
        }

        let primary = providers.iter().position(|p| p.name() == primary).ok_or_else(|| {
            EncryptionError::configuration(format!(
                "primary provider '{}' is not configured",
                primary
            ))
        })?;

        info!(
            primary_provider = %providers[primary].name(),
            key_version = %providers[primary].key_version(),
            provider_count = providers.len(),
            "Secret encryption providers initialized"
        );

        Ok(Self { providers, primary })
    }

    /// Build every provider described by the configuration.
    pub fn from_config(config: &EncryptionConfig) -> Result<Self> {
        let providers = config
            .providers
            .iter()
            .map(|p| {
                AeadProvider::new(&p.name, p.algorithm, &p.keys)
                    .map(|provider| Arc::new(provider) as Arc<dyn EncryptionProvider>)
            })
            .collect::<Result<Vec<_>>>()?;

        Self::new(providers, &config.primary_provider)
    }

    /// Provider used for new encryptions
    pub fn primary(&self) -> &dyn EncryptionProvider {
        self.providers[self.primary].as_ref()
    }

    /// Look up a provider by name
    pub fn provider(&self, name: &str) -> Option<&dyn EncryptionProvider> {
        self.providers.iter().find(|p| p.name() == name).map(|p| p.as_ref())
    }

    /// Seal with the primary provider's current key
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<EncryptedPayload> {
        self.primary().encrypt(plaintext)
    }

    /// Open a payload with the provider recorded in the payload itself
    pub fn decrypt(&self, payload: &EncryptedPayload) -> Result<Vec<u8>> {
        let provider = self
            .provider(&payload.provider)
            .ok_or_else(|| EncryptionError::unknown_provider(&payload.provider))?;

        debug!(
            provider = %payload.provider,
            key_version = %payload.key_version,
            "Decrypting payload"
        );

        provider.decrypt(payload)
    }

    /// Whether a payload was sealed by something other than the current primary key
    pub fn is_stale(&self, provider: &str, key_version: &str) -> bool {
        let primary = self.primary();
        primary.name() != provider || primary.key_version() != key_version
    }
}

impl fmt::Debug for ProviderManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderManager")
            .field("primary", &self.primary().name())
            .field("providers", &self.providers.iter().map(|p| p.name()).collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderConfig;
    use crate::secrets::aead::tests::key_config;
    use crate::secrets::aead::AeadAlgorithm;

    fn aead(name: &str, version: &str, byte: u8) -> Arc<dyn EncryptionProvider> {
        Arc::new(
            AeadProvider::new(name, AeadAlgorithm::Aes256Gcm, &[key_config(version, byte)])
                .unwrap(),
        )
    }

    #[test]
    fn test_encrypts_with_primary() {
        let manager = ProviderManager::new(vec![aead("p1", "v1", 1), aead("p2", "v2", 2)], "p2")
            .unwrap();

        let payload = manager.encrypt(b"value").unwrap();
        assert_eq!(payload.provider, "p2");
        assert_eq!(payload.key_version, "v2");
        assert_eq!(manager.decrypt(&payload).unwrap(), b"value");
    }

    #[test]
    fn test_decrypts_with_provider_named_in_payload() {
        let old = ProviderManager::new(vec![aead("p1", "v1", 1)], "p1").unwrap();
        let payload = old.encrypt(b"legacy").unwrap();

        let rotated =
            ProviderManager::new(vec![aead("p2", "v2", 2), aead("p1", "v1", 1)], "p2").unwrap();
        assert_eq!(rotated.decrypt(&payload).unwrap(), b"legacy");
        assert!(rotated.is_stale("p1", "v1"));
        assert!(!rotated.is_stale("p2", "v2"));
    }

    #[test]
    fn test_unknown_provider_fails() {
        let manager = ProviderManager::new(vec![aead("p1", "v1", 1)], "p1").unwrap();
        let payload = EncryptedPayload::new("vault-transit", "v1", vec![0; 40]);

        assert!(matches!(
            manager.decrypt(&payload),
            Err(EncryptionError::UnknownProvider { .. })
        ));
    }

    #[test]
    fn test_rejects_bad_provider_sets() {
        assert!(ProviderManager::new(vec![], "p1").is_err());
        assert!(ProviderManager::new(vec![aead("p1", "v1", 1)], "p2").is_err());
        assert!(ProviderManager::new(vec![aead("p1", "v1", 1), aead("p1", "v2", 2)], "p1")
            .is_err());
    }

    #[test]
    fn test_from_config() {
        let config = EncryptionConfig {
            primary_provider: "aesgcm".to_string(),
            providers: vec![ProviderConfig {
                name: "aesgcm".to_string(),
                algorithm: AeadAlgorithm::Aes256Gcm,
                keys: vec![key_config("2024-06", 9)],
            }],
        };

        let manager = ProviderManager::from_config(&config).unwrap();
        assert_eq!(manager.primary().name(), "aesgcm");
        assert_eq!(manager.primary().key_version(), "2024-06");
    }
}
