//! TLS key material loading.
//!
//! # Responsibilities
//! - Load the PEM certificate chain and private key
//! - Verify the key belongs to the leaf certificate
//! - Extract the leaf's SubjectPublicKeyInfo for key pinning
//! - Build the rustls server configuration once
//!
//! # Design Decisions
//! - Every failure here is startup-fatal, never a runtime condition
//! - The leaf is the first certificate of the chain

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use rustls::crypto::CryptoProvider;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::sign::CertifiedKey;
use rustls::ServerConfig;

/// Error type for key material loading.
#[derive(Debug, thiserror::Error)]
pub enum TlsError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("no certificates found in {0}")]
    NoCertificates(String),

    #[error("no private key found in {0}")]
    NoPrivateKey(String),

    #[error("failed to parse leaf certificate: {0}")]
    InvalidCertificate(String),

    #[error("private key does not match the leaf certificate")]
    KeyMismatch,

    #[error("TLS configuration error: {0}")]
    Rustls(#[from] rustls::Error),
}

/// Certificate chain, private key and derived data, loaded once at startup.
#[derive(Debug)]
pub struct KeyMaterial {
    leaf_spki: Vec<u8>,
    server_config: Arc<ServerConfig>,
}

impl KeyMaterial {
    /// Load and verify a certificate chain and key from PEM files.
    pub fn load(cert_path: &Path, key_path: &Path) -> Result<Self, TlsError> {
        let chain = read_certs(cert_path)?;
        let key = read_key(key_path)?;
        Self::from_der(chain, key)
    }

    /// Build key material from DER-encoded certificates and key.
    pub fn from_der(
        chain: Vec<CertificateDer<'static>>,
        key: PrivateKeyDer<'static>,
    ) -> Result<Self, TlsError> {
        let leaf = chain.first().ok_or_else(|| TlsError::NoCertificates("chain".into()))?;
        let leaf_spki = spki_of(leaf)?;
        let certificates = chain.len();

        let provider = Arc::new(rustls::crypto::aws_lc_rs::default_provider());
        check_key_matches(&provider, &chain, &key)?;

        let mut server_config = ServerConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()?
            .with_no_client_auth()
            .with_single_cert(chain, key)?;
        server_config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];

        tracing::info!(certificates = certificates, "TLS key material loaded");

        Ok(Self {
            leaf_spki,
            server_config: Arc::new(server_config),
        })
    }

    /// DER-encoded SubjectPublicKeyInfo of the leaf certificate.
    pub fn leaf_spki(&self) -> &[u8] {
        &self.leaf_spki
    }

    /// Shared rustls configuration (ALPN h2, http/1.1).
    pub fn server_config(&self) -> Arc<ServerConfig> {
        Arc::clone(&self.server_config)
    }
}

fn read_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>, TlsError> {
    let mut reader = open(path)?;
    let certs = rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| TlsError::Io {
            path: path.display().to_string(),
            source,
        })?;
    if certs.is_empty() {
        return Err(TlsError::NoCertificates(path.display().to_string()));
    }
    Ok(certs)
}

fn read_key(path: &Path) -> Result<PrivateKeyDer<'static>, TlsError> {
    let mut reader = open(path)?;
    rustls_pemfile::private_key(&mut reader)
        .map_err(|source| TlsError::Io {
            path: path.display().to_string(),
            source,
        })?
        .ok_or_else(|| TlsError::NoPrivateKey(path.display().to_string()))
}

fn open(path: &Path) -> Result<BufReader<File>, TlsError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| TlsError::Io {
            path: path.display().to_string(),
            source,
        })
}

fn spki_of(cert: &CertificateDer<'_>) -> Result<Vec<u8>, TlsError> {
    let (_, parsed) = x509_parser::parse_x509_certificate(cert.as_ref())
        .map_err(|e| TlsError::InvalidCertificate(e.to_string()))?;
    Ok(parsed.public_key().raw.to_vec())
}

fn check_key_matches(
    provider: &CryptoProvider,
    chain: &[CertificateDer<'static>],
    key: &PrivateKeyDer<'static>,
) -> Result<(), TlsError> {
    let signing_key = provider.key_provider.load_private_key(key.clone_key())?;
    match CertifiedKey::new(chain.to_vec(), signing_key).keys_match() {
        Ok(()) => Ok(()),
        Err(rustls::Error::InconsistentKeys(rustls::InconsistentKeys::Unknown)) => {
            tracing::warn!("Unable to verify that the private key matches the certificate");
            Ok(())
        }
        Err(rustls::Error::InconsistentKeys(_)) => Err(TlsError::KeyMismatch),
        Err(e) => Err(e.into()),
    }
}
