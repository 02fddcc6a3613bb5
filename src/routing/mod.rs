//! Virtual host routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (Host header or URI authority)
//!     → router.rs (normalize host, default-host fallback, ordered lookup)
//!     → matcher.rs (evaluate hostname globs)
//!     → Return: matched backend handler, or 404
//!
//! Host Compilation (at startup):
//!     HostConfig[]
//!     → Compile hostname globs
//!     → Build backend handlers
//!     → Freeze as immutable VirtualHostRouter
//! ```
//!
//! # Design Decisions
//! - Hosts compiled at startup, immutable at runtime
//! - No regex in hot path (glob segments only)
//! - Deterministic: first match wins across hosts and within a host's patterns

pub mod matcher;
pub mod router;

pub use matcher::HostPattern;
pub use router::{VirtualHost, VirtualHostRouter};
