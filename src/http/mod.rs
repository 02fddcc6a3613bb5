//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection (served by axum-server, HTTP/1.1 or HTTP/2)
//!     → server.rs (endpoint app)
//!         redirector: 301 → https://host/path
//!         http:       virtual host router → backend
//!         tls:        security headers → virtual host router → backend
//!     → Send to client
//! ```

pub mod server;

pub use server::{redirect_app, secure_app, vhost_app};
