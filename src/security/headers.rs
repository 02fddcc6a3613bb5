//! Transport-security response headers.
//!
//! # Responsibilities
//! - Compute `Strict-Transport-Security` from the HSTS policy
//! - Compute `Public-Key-Pins` from the HPKP policy and the leaf SPKI
//! - Attach both to every response of the TLS endpoint
//!
//! # Design Decisions
//! - Values are computed once at startup and shared by every response
//! - A zero duration means the header is never sent
//! - Backup pins are emitted verbatim, in configured order

use axum::http::header::{HeaderName, HeaderValue, InvalidHeaderValue, STRICT_TRANSPORT_SECURITY};
use axum::Router;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use sha2::{Digest, Sha256};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::config::{HpkpConfig, HstsConfig, TlsConfig};

/// `Public-Key-Pins` header name.
pub const PUBLIC_KEY_PINS: HeaderName = HeaderName::from_static("public-key-pins");

/// Error type for header computation.
#[derive(Debug, thiserror::Error)]
pub enum HeaderError {
    #[error("invalid {header} value {value:?}: {source}")]
    InvalidValue {
        header: &'static str,
        value: String,
        source: InvalidHeaderValue,
    },
}

/// Precomputed security header values for the TLS endpoint.
#[derive(Debug, Clone, Default)]
pub struct SecurityHeaders {
    hsts: Option<HeaderValue>,
    hpkp: Option<HeaderValue>,
}

impl SecurityHeaders {
    /// Compute header values from the TLS policy and the leaf certificate's SPKI.
    pub fn compute(config: &TlsConfig, leaf_spki: &[u8]) -> Result<Self, HeaderError> {
        let hsts = hsts_value(&config.hsts)
            .map(|value| to_header_value("Strict-Transport-Security", value))
            .transpose()?;

        let hpkp = if config.hpkp.seconds > 0 {
            if config.hpkp.backup_keys.is_empty() {
                tracing::warn!("HPKP is enabled without backup_keys; rotating the key will lock clients out");
            }
            let value = hpkp_value(&pin_sha256(leaf_spki), &config.hpkp);
            Some(to_header_value("Public-Key-Pins", value)?)
        } else {
            None
        };

        Ok(Self { hsts, hpkp })
    }

    pub fn hsts(&self) -> Option<&HeaderValue> {
        self.hsts.as_ref()
    }

    pub fn hpkp(&self) -> Option<&HeaderValue> {
        self.hpkp.as_ref()
    }

    /// Add the configured headers to every response produced by `router`.
    pub fn apply<S>(&self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        let mut router = router;
        if let Some(value) = &self.hsts {
            router = router.layer(SetResponseHeaderLayer::appending(
                STRICT_TRANSPORT_SECURITY,
                value.clone(),
            ));
        }
        if let Some(value) = &self.hpkp {
            router = router.layer(SetResponseHeaderLayer::appending(
                PUBLIC_KEY_PINS,
                value.clone(),
            ));
        }
        router
    }
}

fn to_header_value(header: &'static str, value: String) -> Result<HeaderValue, HeaderError> {
    HeaderValue::from_str(&value).map_err(|source| HeaderError::InvalidValue {
        header,
        value,
        source,
    })
}

/// Base64 SHA-256 digest of a DER-encoded SubjectPublicKeyInfo.
pub fn pin_sha256(spki: &[u8]) -> String {
    STANDARD.encode(Sha256::digest(spki))
}

/// `Strict-Transport-Security` value, or `None` when disabled.
pub fn hsts_value(policy: &HstsConfig) -> Option<String> {
    if policy.seconds == 0 {
        return None;
    }
    let mut value = format!("max-age={}", policy.seconds);
    if policy.subdomains {
        value.push_str("; includeSubdomains");
    }
    Some(value)
}

/// `Public-Key-Pins` value for a primary pin and the backup pins in `policy`.
pub fn hpkp_value(primary_pin: &str, policy: &HpkpConfig) -> String {
    let mut clauses = Vec::with_capacity(policy.backup_keys.len() + 3);
    clauses.push(format!("pin-sha256=\"{primary_pin}\""));
    for key in &policy.backup_keys {
        clauses.push(format!("pin-sha256=\"{key}\""));
    }
    clauses.push(format!("max-age={}", policy.seconds));
    if policy.subdomains {
        clauses.push("includeSubdomains".to_string());
    }
    clauses.join("; ")
}
