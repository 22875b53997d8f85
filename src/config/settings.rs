//! # Configuration Settings
//!
//! Defines the configuration structure for secret resolution.

use crate::errors::{FlowplaneError, Result};
use crate::secrets::{AeadAlgorithm, SecretString};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use validator::Validate;

/// Provider name used when encryption is configured from the environment
pub const DEFAULT_PROVIDER_NAME: &str = "aesgcm";

/// Key version used when `FLOWPLANE_SECRET_KEY_VERSION` is not set
pub const DEFAULT_KEY_VERSION: &str = "default";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Secret storage and encryption configuration
    #[validate(nested)]
    pub secrets: SecretsConfig,

    /// Policy definition loading
    pub policies: PolicyConfig,

    /// Logging configuration
    #[validate(nested)]
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        Validate::validate(self).map_err(FlowplaneError::from)?;
        self.validate_custom()
    }

    /// Checks the validator derive cannot express
    fn validate_custom(&self) -> Result<()> {
        let encryption = &self.secrets.encryption;

        if !encryption.providers.iter().any(|p| p.name == encryption.primary_provider) {
            return Err(FlowplaneError::validation_field(
                format!(
                    "Primary provider '{}' is not among the configured providers",
                    encryption.primary_provider
                ),
                "secrets.encryption.primary_provider",
            ));
        }

        for (index, provider) in encryption.providers.iter().enumerate() {
            if encryption.providers[..index].iter().any(|p| p.name == provider.name) {
                return Err(FlowplaneError::validation_field(
                    format!("Provider '{}' is configured more than once", provider.name),
                    "secrets.encryption.providers",
                ));
            }
        }

        Ok(())
    }
}

/// Secret subsystem configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SecretsConfig {
    #[validate(nested)]
    pub encryption: EncryptionConfig,
}

/// Encryption providers and the explicit primary used for new writes
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct EncryptionConfig {
    /// Provider that seals new and updated secrets
    #[validate(length(min = 1, message = "Primary provider cannot be empty"))]
    pub primary_provider: String,

    /// Every provider able to open stored payloads
    #[validate(length(min = 1, message = "At least one encryption provider is required"), nested)]
    pub providers: Vec<ProviderConfig>,
}

impl Default for EncryptionConfig {
    fn default() -> Self {
        Self { primary_provider: DEFAULT_PROVIDER_NAME.to_string(), providers: Vec::new() }
    }
}

impl EncryptionConfig {
    /// Load a single-provider configuration from environment variables
    ///
    /// - `FLOWPLANE_SECRET_ENCRYPTION_KEY`: base64-encoded 32-byte primary key
    /// - `FLOWPLANE_SECRET_KEY_VERSION`: primary key version (default `default`)
    /// - `FLOWPLANE_SECRET_PREVIOUS_KEYS`: retired keys as `version=base64,...`
    /// - `FLOWPLANE_SECRET_ALGORITHM`: `aes-256-gcm` (default) or `chacha20-poly1305`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let key = lookup("FLOWPLANE_SECRET_ENCRYPTION_KEY").ok_or_else(|| {
            FlowplaneError::config(
                "FLOWPLANE_SECRET_ENCRYPTION_KEY environment variable not set. \
                 Generate a key with: openssl rand -base64 32",
            )
        })?;

        let version = lookup("FLOWPLANE_SECRET_KEY_VERSION")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_KEY_VERSION.to_string());

        let algorithm = match lookup("FLOWPLANE_SECRET_ALGORITHM") {
            Some(value) if !value.is_empty() => value
                .parse::<AeadAlgorithm>()
                .map_err(|e| FlowplaneError::config(e.to_string()))?,
            _ => AeadAlgorithm::default(),
        };

        let mut keys = vec![KeyConfig { version, key: SecretString::new(key) }];
        if let Some(previous) = lookup("FLOWPLANE_SECRET_PREVIOUS_KEYS") {
            for entry in previous.split(',').map(str::trim).filter(|e| !e.is_empty()) {
                let (version, key) = entry.split_once('=').ok_or_else(|| {
                    FlowplaneError::config(
                        "FLOWPLANE_SECRET_PREVIOUS_KEYS entries must look like version=base64key",
                    )
                })?;
                keys.push(KeyConfig {
                    version: version.trim().to_string(),
                    key: SecretString::new(key.trim()),
                });
            }
        }

        Ok(Self {
            primary_provider: DEFAULT_PROVIDER_NAME.to_string(),
            providers: vec![ProviderConfig {
                name: DEFAULT_PROVIDER_NAME.to_string(),
                algorithm,
                keys,
            }],
        })
    }
}

/// One encryption provider and its key ring
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ProviderConfig {
    #[validate(length(min = 1, message = "Provider name cannot be empty"))]
    pub name: String,

    #[serde(default)]
    pub algorithm: AeadAlgorithm,

    /// Key versions, primary first
    #[validate(length(min = 1, message = "Provider needs at least one key"), nested)]
    pub keys: Vec<KeyConfig>,
}

/// A versioned base64 key
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct KeyConfig {
    #[validate(length(min = 1, message = "Key version cannot be empty"))]
    pub version: String,

    pub key: SecretString,
}

/// Where policy definitions are loaded from
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Directory of `*.yaml`/`*.json` policy definitions
    pub definitions_dir: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Tracing service name
    #[validate(length(min = 1, message = "Service name cannot be empty"))]
    pub service_name: String,

    /// Log level (trace, debug, info, warn, error) or a full filter directive
    #[validate(length(min = 1, message = "Log level cannot be empty"))]
    pub log_level: String,

    /// Enable JSON structured logging
    pub json_logging: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            service_name: "flowplane-secrets".to_string(),
            log_level: "info".to_string(),
            json_logging: false,
        }
    }
}
