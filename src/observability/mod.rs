//! Observability subsystem.
//!
//! Every subsystem logs through `tracing`. Each request runs inside a span
//! carrying a UUID `request_id`, opened by the HTTP layer.

pub mod logging;
