//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Reject zero timeouts and pool caps, which would make every request fail
//! - Check endpoint ids are present and unique
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: CourierConfig → Result<(), Vec<ValidationError>>

use std::collections::HashSet;
use thiserror::Error;

use crate::config::schema::CourierConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("api endpoint #{0} has an empty id")]
    EmptyApiId(usize),

    #[error("api endpoint {0:?} is defined more than once")]
    DuplicateApiId(String),

    #[error("api endpoint {0:?} has an empty url")]
    EmptyApiUrl(String),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &CourierConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let standard = &config.transport.standard;
    let pooled = &config.transport.pooled;

    let positive = [
        ("transport.standard.dial_timeout_secs", standard.dial_timeout_secs as u128),
        ("transport.standard.idle_timeout_secs", standard.idle_timeout_secs as u128),
        ("transport.standard.request_timeout_secs", standard.request_timeout_secs as u128),
        ("transport.standard.max_idle_connections", standard.max_idle_connections as u128),
        ("transport.pooled.dial_timeout_secs", pooled.dial_timeout_secs as u128),
        ("transport.pooled.idle_timeout_secs", pooled.idle_timeout_secs as u128),
        ("transport.pooled.read_timeout_ms", pooled.read_timeout_ms as u128),
        ("transport.pooled.write_timeout_ms", pooled.write_timeout_ms as u128),
        ("transport.pooled.max_connections_per_host", pooled.max_connections_per_host as u128),
    ];
    for (field, value) in positive {
        if value == 0 {
            errors.push(ValidationError::Zero(field));
        }
    }

    let mut seen = HashSet::new();
    for (index, endpoint) in config.api.endpoints.iter().enumerate() {
        if endpoint.id.is_empty() {
            errors.push(ValidationError::EmptyApiId(index));
            continue;
        }
        if !seen.insert(endpoint.id.as_str()) {
            errors.push(ValidationError::DuplicateApiId(endpoint.id.clone()));
        }
        if endpoint.url.is_empty() {
            errors.push(ValidationError::EmptyApiUrl(endpoint.id.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
