//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection on the TLS port
//!     → keepalive.rs (enable TCP keepalive at accept time)
//!     → demux.rs (sniff preamble: SSH or other)
//!         SSH   → passthrough.rs (bridge to the local SSH service)
//!         other → prefetch.rs (replay sniffed bytes)
//!               → TLS handshake (rustls, configured by tls.rs)
//!               → Hand off to HTTP layer
//! ```
//!
//! # Design Decisions
//! - Each wrapper is an axum-server acceptor around an inner acceptor, so they compose
//! - Keepalive sits beneath demux: the socket option is set before any byte is read
//! - Acceptors run inside the per-connection task, never in the accept loop

pub mod demux;
pub mod keepalive;
pub mod passthrough;
pub mod prefetch;
pub mod tls;

pub use demux::{DemuxAcceptor, Protocol};
pub use keepalive::KeepaliveAcceptor;
pub use prefetch::PrefetchedStream;
pub use tls::KeyMaterial;
