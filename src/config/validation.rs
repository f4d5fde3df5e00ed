//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (ports, status codes)
//! - Detect duplicate vhost patterns
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Regex syntax is checked later, when the route table is compiled

use std::collections::HashSet;

use thiserror::Error;

use crate::config::schema::{HookAction, ProxyConfig};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("listener has no bind addresses")]
    NoBindAddresses,

    #[error("vhost #{index} has an empty pattern")]
    EmptyPattern { index: usize },

    #[error("vhost pattern `{pattern}` is declared more than once")]
    DuplicateVhost { pattern: String },

    #[error("vhost `{vhost}` has invalid port `{port}`")]
    InvalidPort { vhost: String, port: String },

    #[error("hook `{pattern}` in vhost `{vhost}` has invalid status {status}")]
    InvalidStatus {
        vhost: String,
        pattern: String,
        status: u16,
    },
}

/// Validate a parsed configuration.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind.is_empty() {
        errors.push(ValidationError::NoBindAddresses);
    }

    let mut seen = HashSet::new();
    for (index, vhost) in config.vhosts.iter().enumerate() {
        if vhost.pattern.is_empty() {
            errors.push(ValidationError::EmptyPattern { index });
            continue;
        }
        if !seen.insert(vhost.pattern.as_str()) {
            errors.push(ValidationError::DuplicateVhost {
                pattern: vhost.pattern.clone(),
            });
        }

        if let Some(port) = &vhost.port {
            if port.resolve().is_none() {
                errors.push(ValidationError::InvalidPort {
                    vhost: vhost.pattern.clone(),
                    port: port.to_string(),
                });
            }
        }

        for function in &vhost.functions {
            if let HookAction::Respond { status, .. } = function.action {
                if !(100..=999).contains(&status) {
                    errors.push(ValidationError::InvalidStatus {
                        vhost: vhost.pattern.clone(),
                        pattern: function.pattern.clone(),
                        status,
                    });
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{HookEntry, PortValue, VhostEntry};

    fn vhost(pattern: &str, port: Option<PortValue>) -> VhostEntry {
        VhostEntry {
            pattern: pattern.into(),
            host: None,
            port,
            rules: Vec::new(),
            functions: Vec::new(),
        }
    }

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&ProxyConfig::default()).is_ok());
    }

    #[test]
    fn collects_every_error() {
        let mut config = ProxyConfig::default();
        config.listener.bind.clear();
        config.vhosts.push(vhost("example.com", Some(PortValue::Text("http".into()))));
        config.vhosts.push(vhost("example.com", Some(PortValue::Number(8080))));
        config.vhosts.push(vhost("", None));

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::NoBindAddresses,
                ValidationError::InvalidPort {
                    vhost: "example.com".into(),
                    port: "http".into(),
                },
                ValidationError::DuplicateVhost {
                    pattern: "example.com".into(),
                },
                ValidationError::EmptyPattern { index: 2 },
            ]
        );
    }

    #[test]
    fn rejects_out_of_range_hook_status() {
        let mut config = ProxyConfig::default();
        let mut entry = vhost("example.com", None);
        entry.functions.push(HookEntry {
            pattern: "/gone".into(),
            action: HookAction::Respond {
                status: 42,
                content_type: None,
                body: String::new(),
            },
        });
        config.vhosts.push(entry);

        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(errors[0], ValidationError::InvalidStatus { status: 42, .. }));
    }
}
