//! Configuration validation
//!
//! Ensures configuration values are within valid ranges and don't conflict
//! with each other.

use crate::{BotControlConfig, ConfigError, ConfigResult};

/// Validation errors that can occur during config validation
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValidationError {
    InvalidPort { port_name: String },
    PortConflict { port1: String, port2: String, port: u16 },
    MissingRequired { field: String },
    InvalidValue { field: String, reason: String },
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidPort { port_name } => write!(f, "Port {} must not be 0", port_name),
            Self::PortConflict { port1, port2, port } => {
                write!(f, "Port conflict: {} and {} both use port {}", port1, port2, port)
            }
            Self::MissingRequired { field } => {
                write!(f, "Missing required configuration: {}", field)
            }
            Self::InvalidValue { field, reason } => {
                write!(f, "Invalid configuration value for {}: {}", field, reason)
            }
        }
    }
}

/// Validate the complete configuration
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` listing every problem found
pub fn validate_config(config: &BotControlConfig) -> ConfigResult<()> {
    let errors = collect_errors(config);
    if errors.is_empty() {
        return Ok(());
    }

    let error_messages = errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::ValidationError(format!(
        "Configuration validation failed:\n{}",
        error_messages
    )))
}

fn collect_errors(config: &BotControlConfig) -> Vec<ConfigValidationError> {
    let mut errors = Vec::new();

    for (field, value) in [
        ("connection.protocol", &config.connection.protocol),
        ("connection.host", &config.connection.host),
        ("server.bind_host", &config.server.bind_host),
        ("publisher.bind_host", &config.publisher.bind_host),
    ] {
        if value.trim().is_empty() {
            errors.push(ConfigValidationError::MissingRequired {
                field: field.to_string(),
            });
        }
    }

    let ports = [
        ("connection.request_port", config.connection.request_port),
        ("connection.publish_port", config.connection.publish_port),
        ("server.port", config.server.port),
    ];
    for (name, port) in ports {
        if port == 0 {
            errors.push(ConfigValidationError::InvalidPort {
                port_name: name.to_string(),
            });
        }
    }

    // The publish port is bound locally alongside the reply server and is a
    // separate endpoint from the robot's request port.
    for (a, b) in [(ports[0], ports[1]), (ports[1], ports[2])] {
        if a.1 != 0 && a.1 == b.1 {
            errors.push(ConfigValidationError::PortConflict {
                port1: a.0.to_string(),
                port2: b.0.to_string(),
                port: a.1,
            });
        }
    }

    if config.client.queue_capacity == 0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "client.queue_capacity".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    if config.publisher.queue_capacity == 0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "publisher.queue_capacity".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    if config.subscriber.topics.iter().any(|t| t.chars().any(char::is_whitespace)) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "subscriber.topics".to_string(),
            reason: "topics must not contain whitespace".to_string(),
        });
    }

    errors
}
