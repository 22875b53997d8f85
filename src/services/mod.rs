//! Business logic services
//!
//! - `resolve_rules`: compiles policy definition schemas into resolve rules
//! - `template`: `$secret{handle}` expansion inside string parameters
//! - `policy_resolver`: resolves secret references across a stored API configuration
//! - `secret_service`: the encrypted secret lifecycle, and the secret source the
//!   resolver reads from

pub mod policy_resolver;
pub mod resolve_rules;
pub mod secret_service;
pub mod template;

pub use policy_resolver::{PolicySecretResolver, SecretSource};
pub use resolve_rules::{compile_definition, compile_resolve_rules};
pub use secret_service::{SecretParams, SecretService};
pub use template::{contains_secret_template, render_secret_template, TemplateError};
