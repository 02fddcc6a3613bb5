//! Configuration schema definitions.
//!
//! This module defines the complete startup configuration for the server.
//! All types derive Serde traits for deserialization from the TOML file.

use std::path::{Path, PathBuf};
use serde::Deserialize;

/// Root configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// TLS endpoint (demultiplexed with SSH).
    pub tls: TlsConfig,

    /// Plain-HTTP endpoint serving the virtual hosts without TLS.
    pub http: EndpointConfig,

    /// Plain-HTTP endpoint redirecting everything to HTTPS.
    pub redirector: EndpointConfig,

    /// Virtual hosts, checked in order.
    pub hosts: Vec<HostConfig>,

    /// Host name substituted when a request carries none.
    pub default_host: String,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tls: TlsConfig::default(),
            http: EndpointConfig::default(),
            redirector: EndpointConfig::default(),
            hosts: Vec::new(),
            default_host: "localhost".to_string(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// A plain listening endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Listen address, `ip:port` or `host:port` (e.g., "0.0.0.0:80"). Unset disables the endpoint.
    pub listen: Option<String>,
}

/// TLS endpoint configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TlsConfig {
    /// Listen address, `ip:port` or `host:port` (e.g., "0.0.0.0:443"). Unset disables the endpoint.
    pub listen: Option<String>,

    /// Path to the PEM certificate chain, leaf first.
    pub cert: Option<PathBuf>,

    /// Path to the PEM private key.
    pub key: Option<PathBuf>,

    /// Local SSH service that SSH-classified connections are forwarded to.
    pub ssh: Option<String>,

    /// Deadline for reading the protocol preamble, in seconds. 0 disables it.
    pub sniff_timeout_secs: u64,

    /// Strict-Transport-Security policy.
    pub hsts: HstsConfig,

    /// Public-Key-Pins policy.
    pub hpkp: HpkpConfig,
}

impl TlsConfig {
    /// Certificate and key paths, when both are configured.
    pub fn keypair(&self) -> Option<(&Path, &Path)> {
        Some((self.cert.as_deref()?, self.key.as_deref()?))
    }
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            listen: None,
            cert: None,
            key: None,
            ssh: None,
            sniff_timeout_secs: 10,
            hsts: HstsConfig::default(),
            hpkp: HpkpConfig::default(),
        }
    }
}

/// HSTS policy. A zero duration disables the header.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HstsConfig {
    pub seconds: u64,
    pub subdomains: bool,
}

/// HPKP policy. A zero duration disables the header.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HpkpConfig {
    pub seconds: u64,
    pub subdomains: bool,

    /// Base64 SHA-256 SPKI digests of backup keys, emitted verbatim.
    pub backup_keys: Vec<String>,
}

/// A virtual host: ordered hostname globs plus the backend serving them.
#[derive(Debug, Clone, Deserialize)]
pub struct HostConfig {
    /// Hostname glob patterns; first match wins.
    pub hostnames: Vec<String>,

    /// Backend that handles matched requests.
    pub backend: BackendConfig,
}

/// Backend kinds available to virtual hosts.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendConfig {
    /// Reverse proxy to an HTTP upstream (e.g., "http://127.0.0.1:3000").
    Proxy { upstream: String },

    /// Static files served from a directory.
    Files { root: PathBuf },
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` overrides it.
    pub log_level: String,

    /// Prometheus exporter bind address. Unset disables metrics export.
    pub metrics_address: Option<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_address: None,
        }
    }
}
