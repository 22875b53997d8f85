//! # Structured Logging
//!
//! Subscriber setup and span macros for the secret subsystem.
//!
//! Spans carry handles, policy names and correlation ids. Secret values never appear in
//! any span or event; callers record handles only.

use crate::config::{AppConfig, ObservabilityConfig};
use crate::errors::{FlowplaneError, Result};
use tracing_subscriber::EnvFilter;

/// Create a tracing span for a secret lifecycle operation.
///
/// ```rust,ignore
/// let span = secret_span!("create_secret", "payments-api-key");
/// let span = secret_span!("get_secret", handle, correlation_id = "req-42");
/// ```
#[macro_export]
macro_rules! secret_span {
    ($operation:expr, $handle:expr) => {
        tracing::debug_span!(
            "secret_operation",
            operation = %$operation,
            handle = %$handle,
            operation_id = %uuid::Uuid::new_v4(),
            correlation_id = tracing::field::Empty
        )
    };
    ($operation:expr, $handle:expr, $($field:tt)*) => {
        tracing::debug_span!(
            "secret_operation",
            operation = %$operation,
            handle = %$handle,
            operation_id = %uuid::Uuid::new_v4(),
            $($field)*
        )
    };
}

/// Create a tracing span for resolving the policies of one stored API configuration.
///
/// ```rust,ignore
/// let span = resolve_span!(stored.id, stored.configuration.metadata.name);
/// ```
#[macro_export]
macro_rules! resolve_span {
    ($config_id:expr, $config_name:expr) => {
        tracing::debug_span!(
            "policy_resolution",
            config_id = %$config_id,
            config_name = %$config_name,
            operation_id = %uuid::Uuid::new_v4()
        )
    };
    ($config_id:expr, $config_name:expr, $($field:tt)*) => {
        tracing::debug_span!(
            "policy_resolution",
            config_id = %$config_id,
            config_name = %$config_name,
            operation_id = %uuid::Uuid::new_v4(),
            $($field)*
        )
    };
}

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` wins over the configured level when set. Calling this more than once is
/// harmless: a subscriber installed elsewhere (e.g. by a test harness) is left in place.
pub fn init_logging(config: &ObservabilityConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.log_level).map_err(|e| {
            FlowplaneError::config_with_source(
                format!("Invalid log level '{}'", config.log_level),
                Box::new(e),
            )
        })?,
    };

    let installed = if config.json_logging {
        tracing_subscriber::fmt().json().with_env_filter(filter).try_init().is_ok()
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).try_init().is_ok()
    };

    if installed {
        tracing::info!(
            service_name = %config.service_name,
            log_level = %config.log_level,
            json_logging = config.json_logging,
            "Logging initialized"
        );
    }

    Ok(())
}

/// Log configuration at startup
pub fn log_config_info(config: &AppConfig) {
    let encryption = &config.secrets.encryption;
    tracing::info!(
        primary_provider = %encryption.primary_provider,
        providers = ?encryption.providers.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
        definitions_dir = ?config.policies.definitions_dir,
        service_name = %config.observability.service_name,
        "Flowplane secret resolution configuration"
    );
}
