//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges and addresses
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function: ForgeConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::ForgeConfig;

/// One semantic problem with a config.
#[derive(Debug, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a loaded config.
pub fn validate_config(config: &ForgeConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.control.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError {
            field: "control.bind_address",
            message: format!("'{}' is not a valid socket address", config.control.bind_address),
        });
    }
    if config.control.api_key.is_empty() {
        errors.push(ValidationError {
            field: "control.api_key",
            message: "must not be empty".to_string(),
        });
    }
    if config.storage.state_path.is_empty() {
        errors.push(ValidationError {
            field: "storage.state_path",
            message: "must not be empty".to_string(),
        });
    }
    if config.intercept.max_rules == 0 {
        errors.push(ValidationError {
            field: "intercept.max_rules",
            message: "must be at least 1".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
