//! Virtual host lookup and dispatch.
//!
//! # Responsibilities
//! - Store virtual hosts in configured order
//! - Select the handler for a request's host
//! - Dispatch the request, or answer 404 when nothing matches
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) scan over hosts and their patterns; first match wins
//! - Missing host falls back to the configured default host

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::backend::{self, BackendError, RequestHandler};
use crate::config::HostConfig;
use crate::routing::matcher::HostPattern;

/// A virtual host: ordered patterns and the handler they select.
pub struct VirtualHost {
    patterns: Vec<HostPattern>,
    handler: Arc<dyn RequestHandler>,
}

impl VirtualHost {
    pub fn new<I, P>(patterns: I, handler: Arc<dyn RequestHandler>) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        Self {
            patterns: patterns.into_iter().map(HostPattern::new).collect(),
            handler,
        }
    }
}

impl std::fmt::Debug for VirtualHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualHost")
            .field("patterns", &self.patterns)
            .finish_non_exhaustive()
    }
}

/// Routes requests to virtual hosts by host name.
#[derive(Debug)]
pub struct VirtualHostRouter {
    hosts: Vec<VirtualHost>,
    default_host: String,
}

impl VirtualHostRouter {
    pub fn new(hosts: Vec<VirtualHost>, default_host: impl Into<String>) -> Self {
        Self {
            hosts,
            default_host: default_host.into().to_ascii_lowercase(),
        }
    }

    /// Build the router and every backend handler from configuration.
    pub fn from_config(hosts: &[HostConfig], default_host: &str) -> Result<Self, BackendError> {
        let hosts = hosts
            .iter()
            .map(|host| {
                let handler = backend::build(&host.backend)?;
                Ok(VirtualHost::new(host.hostnames.iter().cloned(), handler))
            })
            .collect::<Result<Vec<_>, BackendError>>()?;

        tracing::info!(hosts = hosts.len(), default_host = %default_host, "Virtual hosts configured");
        Ok(Self::new(hosts, default_host))
    }

    /// Find the handler for `host`. An empty host is replaced by the default host.
    pub fn select(&self, host: &str) -> Option<&Arc<dyn RequestHandler>> {
        let host = normalize_host(host);
        let host = if host.is_empty() { self.default_host.as_str() } else { host.as_str() };

        self.hosts
            .iter()
            .find(|vhost| vhost.patterns.iter().any(|pattern| pattern.matches(host)))
            .map(|vhost| &vhost.handler)
    }

    /// Dispatch a request to its virtual host.
    pub async fn dispatch(&self, request: Request<Body>) -> Response {
        let host = request_host(&request).unwrap_or_default();
        match self.select(&host) {
            Some(handler) => handler.handle(request).await,
            None => {
                tracing::warn!(host = %host, path = %request.uri().path(), "No virtual host matched");
                (StatusCode::NOT_FOUND, "No matching virtual host").into_response()
            }
        }
    }
}

/// Host identifier of a request: the `Host` header, else the URI authority.
pub fn request_host<B>(request: &Request<B>) -> Option<String> {
    request
        .headers()
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string)
        .or_else(|| request.uri().authority().map(|a| a.as_str().to_string()))
}

/// Lowercase a host and strip any port suffix (IPv6 literals keep their brackets).
fn normalize_host(host: &str) -> String {
    let host = host.trim();
    let without_port = if host.starts_with('[') {
        match host.find(']') {
            Some(end) => &host[..=end],
            None => host,
        }
    } else {
        match host.rsplit_once(':') {
            Some((name, port)) if port.bytes().all(|b| b.is_ascii_digit()) => name,
            _ => host,
        }
    };
    without_port.to_ascii_lowercase()
}
