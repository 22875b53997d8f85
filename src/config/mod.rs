//! # Configuration Management
//!
//! Layered configuration for the secret subsystem: built-in defaults, an optional
//! configuration file (YAML, TOML or JSON, chosen by extension) and `FLOWPLANE__`-prefixed
//! environment variables, in increasing order of precedence.
//!
//! Nested keys use a double underscore, e.g.
//! `FLOWPLANE__OBSERVABILITY__LOG_LEVEL=debug`.

pub mod settings;

pub use settings::{
    AppConfig, EncryptionConfig, KeyConfig, ObservabilityConfig, PolicyConfig, ProviderConfig,
    SecretsConfig, DEFAULT_KEY_VERSION, DEFAULT_PROVIDER_NAME,
};

use crate::errors::Result;
use std::path::Path;

impl AppConfig {
    /// Load, merge and validate configuration.
    ///
    /// When no encryption provider is configured but `FLOWPLANE_SECRET_ENCRYPTION_KEY` is
    /// set, the single-key environment configuration is used instead.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("FLOWPLANE")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let mut app_config: AppConfig = builder.build()?.try_deserialize()?;

        if app_config.secrets.encryption.providers.is_empty()
            && std::env::var_os("FLOWPLANE_SECRET_ENCRYPTION_KEY").is_some()
        {
            app_config.secrets.encryption = EncryptionConfig::from_env()?;
        }

        app_config.validate()?;

        tracing::debug!(
            primary_provider = %app_config.secrets.encryption.primary_provider,
            provider_count = app_config.secrets.encryption.providers.len(),
            definitions_dir = ?app_config.policies.definitions_dir,
            "Configuration loaded"
        );

        Ok(app_config)
    }
}
