//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     TLS policy + leaf SPKI → headers.rs → SecurityHeaders (immutable)
//!
//! Every TLS response:
//!     → headers.rs layer appends Strict-Transport-Security / Public-Key-Pins
//! ```

pub mod headers;

pub use headers::SecurityHeaders;
