//! # Flowplane Secrets
//!
//! Secure policy parameter resolution for the Flowplane control plane.
//!
//! Policies attached to an API configuration may reference secrets with
//! `$secret{handle}` tokens inside their string parameters. Before the configuration is
//! translated for the data plane, those tokens are replaced with decrypted values. The
//! crate owns both halves of that flow:
//!
//! ```text
//! PolicyDefinitions ──compile──► ResolveRuleTable
//!                                      │
//! StoredConfig ──► PolicySecretResolver ──► resolved copy (or field errors)
//!                                      │
//!                               SecretService ──► SecretStore (ciphertext only)
//!                                      │
//!                               ProviderManager (envelope encryption)
//! ```
//!
//! ## Core Components
//!
//! - **Secret Service**: create, read, update, delete and list secrets; values are sealed
//!   by the primary encryption provider and never stored in plaintext
//! - **Resolve-Rule Compiler**: turns `resolve` markings in policy parameter schemas into
//!   dotted paths, once, at startup
//! - **Policy Secret Resolver**: applies those paths to a stored configuration and
//!   expands every secret token, reporting failures per policy
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use flowplane_secrets::{
//!     AppConfig, InMemorySecretStore, PolicyDefinitionRegistry, PolicySecretResolver,
//!     Result, SecretService,
//! };
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! fn main() -> Result<()> {
//!     let config = AppConfig::load(Some(Path::new("flowplane.yaml")))?;
//!     flowplane_secrets::observability::init_logging(&config.observability)?;
//!
//!     let secrets = Arc::new(SecretService::from_config(
//!         Arc::new(InMemorySecretStore::new()),
//!         &config.secrets.encryption,
//!     )?);
//!
//!     let registry = PolicyDefinitionRegistry::load_from_directory(Path::new("policies"))?;
//!     let _resolver = PolicySecretResolver::new(registry.definitions(), secrets);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod domain;
pub mod errors;
pub mod observability;
pub mod secrets;
pub mod services;
pub mod storage;
pub mod validation;

// Re-export commonly used types and traits
pub use config::AppConfig;
pub use domain::{
    PolicyDefinition, PolicyDefinitionRegistry, PolicyInstance, ResolveRule, ResolveRuleTable,
    Secret, StoredConfig,
};
pub use errors::{FlowplaneError, Result, ValidationError};
pub use secrets::{EncryptedPayload, EncryptionProvider, ProviderManager, SecretString};
pub use services::{PolicySecretResolver, SecretParams, SecretService, SecretSource};
pub use storage::{InMemorySecretStore, SecretStore};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
