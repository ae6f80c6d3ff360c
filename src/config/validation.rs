//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (ceiling > 0, timeouts > 0, status codes)
//! - Check that addresses and URLs parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::config::schema::ServiceConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Validate a configuration, collecting every error found.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.service.name.trim().is_empty() {
        errors.push(ValidationError::new("service.name", "must not be empty"));
    }
    if config.service.host.trim().is_empty() {
        errors.push(ValidationError::new("service.host", "must not be empty"));
    }
    if !config.service.base_path.starts_with('/') {
        errors.push(ValidationError::new(
            "service.base_path",
            format!("must start with '/', got {:?}", config.service.base_path),
        ));
    }

    if config.admission.ceiling == 0 {
        errors.push(ValidationError::new("admission.ceiling", "must be at least 1"));
    }
    if !(400..=599).contains(&config.admission.shed_status) {
        errors.push(ValidationError::new(
            "admission.shed_status",
            format!("must be a 4xx or 5xx status, got {}", config.admission.shed_status),
        ));
    }

    if config.shutdown.grace_millis == 0 {
        errors.push(ValidationError::new("shutdown.grace_millis", "must be greater than 0"));
    }

    if config.discovery.timeout_millis == 0 {
        errors.push(ValidationError::new("discovery.timeout_millis", "must be greater than 0"));
    }
    if config.discovery.publish_attempts == 0 {
        errors.push(ValidationError::new("discovery.publish_attempts", "must be at least 1"));
    }
    if let Some(registry_url) = &config.discovery.registry_url {
        if let Err(e) = url::Url::parse(registry_url) {
            errors.push(ValidationError::new(
                "discovery.registry_url",
                format!("invalid URL {:?}: {}", registry_url, e),
            ));
        }
    }

    if config.http.request_timeout_secs == 0 {
        errors.push(ValidationError::new("http.request_timeout_secs", "must be greater than 0"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("invalid socket address {:?}", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
