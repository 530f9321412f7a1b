//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses and URLs
//! - Validate value ranges (timeouts > 0, backoff bounds ordered)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: SiteConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::SiteConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address '{value}'")]
    InvalidAddress { field: &'static str, value: String },

    #[error("backend.url: invalid URL '{0}'")]
    InvalidUrl(String),

    #[error("backend.anon_key must be set when backend.url is configured")]
    MissingApiKey,

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("realtime.reconnect_base_ms ({base}) exceeds reconnect_max_ms ({max})")]
    BackoffBounds { base: u64, max: u64 },

    #[error("server.admin_api_key must not be empty")]
    EmptyAdminKey,
}

/// Validate a configuration, collecting every error.
pub fn validate_config(config: &SiteConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "server.bind_address",
            value: config.server.bind_address.clone(),
        });
    }

    if config.server.admin_api_key.trim().is_empty() {
        errors.push(ValidationError::EmptyAdminKey);
    }

    if let Some(raw) = &config.backend.url {
        let valid = Url::parse(raw)
            .map(|u| matches!(u.scheme(), "http" | "https"))
            .unwrap_or(false);
        if !valid {
            errors.push(ValidationError::InvalidUrl(raw.clone()));
        }
        if config.backend.anon_key.is_empty() {
            errors.push(ValidationError::MissingApiKey);
        }
    }

    let positive = [
        ("backend.timeout_secs", config.backend.timeout_secs),
        ("server.request_timeout_secs", config.server.request_timeout_secs),
        ("realtime.heartbeat_secs", config.realtime.heartbeat_secs),
    ];
    for (field, value) in positive {
        if value == 0 {
            errors.push(ValidationError::Zero(field));
        }
    }

    if config.realtime.reconnect_base_ms > config.realtime.reconnect_max_ms {
        errors.push(ValidationError::BackoffBounds {
            base: config.realtime.reconnect_base_ms,
            max: config.realtime.reconnect_max_ms,
        });
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
