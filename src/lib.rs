//! Serve SSH and HTTPS on one port.
//!
//! Connections on the TLS port are classified by their first bytes: SSH
//! clients are bridged to a local SSH service, everything else is TLS
//! terminated and routed to virtual hosts. Plain-HTTP and redirector
//! endpoints run alongside.

// Core subsystems
pub mod config;
pub mod http;
pub mod net;
pub mod routing;

// Request handlers
pub mod backend;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::Config;
pub use lifecycle::Orchestrator;
