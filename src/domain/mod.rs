//! Domain layer
//!
//! Pure data types shared by the secret service and the policy resolver. Nothing here
//! performs I/O except [`PolicyDefinitionRegistry::load_from_directory`].
//!
//! ## Module Organization
//!
//! - `id`: Type-safe identifiers with the NewType pattern
//! - `policy`: Policy definitions, instances and compiled resolve rules
//! - `policy_registry`: Loading policy definitions from a directory
//! - `api`: Stored API configurations whose policies get resolved
//! - `secret`: Secret configuration documents and decrypted secrets

pub mod api;
pub mod id;
pub mod policy;
pub mod policy_registry;
pub mod secret;

pub use api::{ApiConfiguration, ApiMetadata, ApiSpec, Operation, StoredConfig, REST_API_KIND};
pub use id::{ConfigId, SecretId};
pub use policy::{policy_key, PolicyDefinition, PolicyInstance, ResolveRule, ResolveRuleTable};
pub use policy_registry::{PolicyDefinitionRegistry, PolicyLoadError};
pub use secret::{
    Secret, SecretConfiguration, SecretMetadata, SecretSpec, MAX_SECRET_VALUE_BYTES,
    SECRET_API_VERSION, SECRET_KIND,
};
