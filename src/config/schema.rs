//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the daemon.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ForgeConfig {
    /// Control API settings.
    pub control: ControlConfig,

    /// Persistent state settings.
    pub storage: StorageConfig,

    /// Interception layer settings.
    pub intercept: InterceptConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Control API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Bind address (e.g., "127.0.0.1:8780").
    pub bind_address: String,

    /// API key for authentication (Bearer token).
    pub api_key: String,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8780".to_string(),
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
        }
    }
}

/// Persistent state configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the saved-state JSON file.
    pub state_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            state_path: "header-forge.state.json".to_string(),
        }
    }
}

/// Interception layer configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct InterceptConfig {
    /// Maximum installed rules.
    pub max_rules: usize,
}

impl Default for InterceptConfig {
    fn default() -> Self {
        Self {
            max_rules: crate::intercept::memory::DEFAULT_MAX_RULES,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}
