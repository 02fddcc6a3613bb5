//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check listen addresses and upstream URIs parse
//! - Check the certificate/key pair is complete
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: Config → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use axum::http::Uri;

use crate::config::schema::{BackendConfig, Config};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address {value:?}")]
    InvalidAddress { field: String, value: String },

    #[error("tls: cert and key must be configured together")]
    IncompleteKeypair,

    #[error("hosts[{index}]: no hostnames configured")]
    NoHostnames { index: usize },

    #[error("hosts[{index}]: empty hostname pattern")]
    EmptyHostname { index: usize },

    #[error("hosts[{index}]: invalid upstream {value:?} (expected http://host:port)")]
    InvalidUpstream { index: usize, value: String },
}

/// Validate a parsed configuration, collecting every error.
pub fn validate_config(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    // Listen addresses may name a host; the metrics exporter needs an IP.
    let addresses = [
        ("tls.listen", config.tls.listen.as_deref(), is_listen_address as fn(&str) -> bool),
        ("http.listen", config.http.listen.as_deref(), is_listen_address),
        ("redirector.listen", config.redirector.listen.as_deref(), is_listen_address),
        (
            "observability.metrics_address",
            config.observability.metrics_address.as_deref(),
            is_socket_address,
        ),
    ];
    for (field, value, valid) in addresses {
        if let Some(value) = value {
            if !valid(value) {
                errors.push(ValidationError::InvalidAddress {
                    field: field.to_string(),
                    value: value.to_string(),
                });
            }
        }
    }

    if config.tls.cert.is_some() != config.tls.key.is_some() {
        errors.push(ValidationError::IncompleteKeypair);
    }

    for (index, host) in config.hosts.iter().enumerate() {
        if host.hostnames.is_empty() {
            errors.push(ValidationError::NoHostnames { index });
        }
        if host.hostnames.iter().any(|h| h.trim().is_empty()) {
            errors.push(ValidationError::EmptyHostname { index });
        }
        if let BackendConfig::Proxy { upstream } = &host.backend {
            if !is_http_upstream(upstream) {
                errors.push(ValidationError::InvalidUpstream {
                    index,
                    value: upstream.clone(),
                });
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_socket_address(value: &str) -> bool {
    value.parse::<SocketAddr>().is_ok()
}

/// `ip:port` or `host:port`; host names are resolved when the listener binds.
fn is_listen_address(value: &str) -> bool {
    is_socket_address(value)
        || value
            .rsplit_once(':')
            .is_some_and(|(host, port)| !host.is_empty() && !host.contains(':') && port.parse::<u16>().is_ok())
}

fn is_http_upstream(value: &str) -> bool {
    match value.parse::<Uri>() {
        Ok(uri) => uri.scheme_str() == Some("http") && uri.authority().is_some(),
        Err(_) => false,
    }
}
