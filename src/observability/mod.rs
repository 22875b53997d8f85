//! # Observability Infrastructure
//!
//! Structured logging for secret lifecycle and policy resolution, built on `tracing`.

pub mod logging;

pub use logging::{init_logging, log_config_info};
