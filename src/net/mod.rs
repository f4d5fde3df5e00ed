//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! ListenerConfig (port + bind addresses)
//!     → listener.rs (one TcpListener per address)
//!     → Hand off to HTTP layer, one server task per listener
//! ```

pub mod listener;

pub use listener::{bind_all, ListenerError};
