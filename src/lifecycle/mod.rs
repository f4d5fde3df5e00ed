//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! SIGTERM/SIGINT (shutdown.rs)
//!     → Shutdown::trigger
//!     → every server task stops accepting and drains
//! ```

pub mod shutdown;

pub use shutdown::{wait_for_signal, Shutdown};
