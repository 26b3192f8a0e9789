//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (attempts >= 1, timeouts > 0)
//! - Check that addresses and URLs parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RelayConfig → Result<(), Vec<ValidationError>>

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::RelayConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// Check every semantic constraint and report all failures.
pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let client = &config.client;

    if client.retry_attempts == 0 {
        errors.push(ValidationError::new("client.retry_attempts", "must be at least 1"));
    }
    if client.timeout_ms == 0 {
        errors.push(ValidationError::new("client.timeout_ms", "must be greater than 0"));
    }
    if client.enable_cache {
        if client.cache_ttl_ms == 0 {
            errors.push(ValidationError::new("client.cache_ttl_ms", "must be greater than 0 when caching is enabled"));
        }
        if client.cache_max_entries == 0 {
            errors.push(ValidationError::new("client.cache_max_entries", "must be greater than 0 when caching is enabled"));
        }
    }
    if client.auth_field.trim().is_empty() {
        errors.push(ValidationError::new("client.auth_field", "must not be empty"));
    }

    match Url::parse(&config.transport.endpoint) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => errors.push(ValidationError::new(
            "transport.endpoint",
            format!("unsupported scheme '{}'", url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new("transport.endpoint", e.to_string())),
    }

    if config.credentials.refresh_command.trim().is_empty() {
        errors.push(ValidationError::new("credentials.refresh_command", "must not be empty"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
