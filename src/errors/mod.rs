//! # Error Handling
//!
//! Error types for secret resolution and the secret lifecycle, built on `thiserror`.
//!
//! Messages produced here are safe to show to operators: they name handles, fields and
//! policies but never plaintext values, ciphertext, algorithms or key material.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Custom result type for Flowplane operations
pub type Result<T> = std::result::Result<T, FlowplaneError>;

/// A field-attributed validation failure.
///
/// Used both for secret configuration validation (`metadata.name`, `spec.value`, ...) and
/// for policy resolution, where `field` is the structural path of the failing policy
/// (`spec.operations[1].policies[0]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field: field.into(), message: message.into() }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Main error type for the secret subsystem
#[derive(thiserror::Error, Debug)]
pub enum FlowplaneError {
    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Single validation failure
    #[error("Validation error: {message}")]
    Validation { message: String, field: Option<String> },

    /// Structured validation failure listing every violated field
    #[error("Validation failed: {}", format_validation_errors(.errors))]
    InvalidConfiguration { errors: Vec<ValidationError> },

    /// Resource not found errors
    #[error("Resource not found: {resource_type} with ID '{id}'")]
    NotFound { resource_type: String, id: String },

    /// Resource conflict errors (e.g., already exists)
    #[error("Resource conflict: {message}")]
    Conflict { message: String, resource_type: String },

    /// Encryption provider failed to seal a value
    #[error("Encryption error: {message}")]
    Encryption { message: String },

    /// Encryption provider failed to open a payload
    #[error("Decryption error: {message}")]
    Decryption { message: String },

    /// Secret store failures
    #[error("Storage error: {context}")]
    Storage {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Serialization/deserialization errors
    #[error("Serialization error: {context}")]
    Serialization {
        #[source]
        source: serde_json::Error,
        context: String,
    },

    /// Internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

impl FlowplaneError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config { message: message.into(), source: None }
    }

    /// Create a configuration error with source
    pub fn config_with_source<S: Into<String>>(
        message: S,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Config { message: message.into(), source: Some(source) }
    }

    /// Create a validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation { message: message.into(), field: None }
    }

    /// Create a validation error with field information
    pub fn validation_field<S: Into<String>, F: Into<String>>(message: S, field: F) -> Self {
        Self::Validation { message: message.into(), field: Some(field.into()) }
    }

    /// Create a multi-field validation error
    pub fn invalid_configuration(errors: Vec<ValidationError>) -> Self {
        Self::InvalidConfiguration { errors }
    }

    /// Create a not found error
    pub fn not_found<R: Into<String>, I: Into<String>>(resource_type: R, id: I) -> Self {
        Self::NotFound { resource_type: resource_type.into(), id: id.into() }
    }

    /// Create a conflict error
    pub fn conflict<M: Into<String>, R: Into<String>>(message: M, resource_type: R) -> Self {
        Self::Conflict { message: message.into(), resource_type: resource_type.into() }
    }

    pub fn encryption<S: Into<String>>(message: S) -> Self {
        Self::Encryption { message: message.into() }
    }

    pub fn decryption<S: Into<String>>(message: S) -> Self {
        Self::Decryption { message: message.into() }
    }

    /// Create a storage error without an underlying source
    pub fn storage<S: Into<String>>(context: S) -> Self {
        Self::Storage { context: context.into(), source: None }
    }

    /// Create a storage error wrapping the store's own error
    pub fn storage_with_source<S: Into<String>>(
        context: S,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Storage { context: context.into(), source: Some(Box::new(source)) }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal { message: message.into() }
    }

    /// Whether this is the distinguished "not found" condition
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Field-level errors carried by this error, if any
    pub fn validation_errors(&self) -> Option<&[ValidationError]> {
        match self {
            Self::InvalidConfiguration { errors } => Some(errors),
            _ => None,
        }
    }

    /// Get the HTTP status code that should be returned for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Config { .. } => 500,
            Self::Validation { .. } => 400,
            Self::InvalidConfiguration { .. } => 400,
            Self::NotFound { .. } => 404,
            Self::Conflict { .. } => 409,
            Self::Encryption { .. } => 500,
            Self::Decryption { .. } => 500,
            Self::Storage { .. } => 500,
            Self::Serialization { .. } => 400,
            Self::Internal { .. } => 500,
        }
    }
}

impl From<serde_json::Error> for FlowplaneError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization { source: error, context: "JSON serialization failed".to_string() }
    }
}

impl From<config::ConfigError> for FlowplaneError {
    fn from(error: config::ConfigError) -> Self {
        Self::config_with_source("Configuration loading failed", Box::new(error))
    }
}

impl From<validator::ValidationErrors> for FlowplaneError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::invalid_configuration(crate::validation::flatten_validation_errors(&errors))
    }
}
