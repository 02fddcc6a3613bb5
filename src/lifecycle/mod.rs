//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load key material → Build virtual hosts → Compute headers → Bind listeners
//!     → Spawn one task per endpoint → Wait for the first exit
//! ```
//!
//! # Design Decisions
//! - Ordered startup: handlers first, listeners last (traffic only when ready)
//! - No graceful drain: the first endpoint exit terminates the process

pub mod startup;

pub use startup::{EndpointExit, EndpointKind, Orchestrator, StartupError};
