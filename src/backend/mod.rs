//! Request handling backends.
//!
//! # Data Flow
//! ```text
//! VirtualHostRouter (matched host)
//!     → RequestHandler::handle(request)
//!         → proxy.rs (forward to an HTTP upstream)
//!         → files.rs (serve a directory)
//!     → Response
//! ```
//!
//! # Design Decisions
//! - Backends are opaque to routing and header injection: one trait, one method
//! - All backends are built at startup, before any endpoint serves

pub mod files;
pub mod proxy;

use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use futures_util::future::BoxFuture;

use crate::config::BackendConfig;

pub use files::FileBackend;
pub use proxy::ProxyBackend;

/// The capability a virtual host needs: turn a request into a response.
pub trait RequestHandler: Send + Sync {
    fn handle(&self, request: Request<Body>) -> BoxFuture<'static, Response>;
}

/// Error type for backend construction.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("invalid upstream {upstream:?}: {reason}")]
    InvalidUpstream { upstream: String, reason: String },
}

/// Build the handler described by a backend configuration.
pub fn build(config: &BackendConfig) -> Result<Arc<dyn RequestHandler>, BackendError> {
    match config {
        BackendConfig::Proxy { upstream } => Ok(Arc::new(ProxyBackend::new(upstream)?)),
        BackendConfig::Files { root } => Ok(Arc::new(FileBackend::new(root))),
    }
}
