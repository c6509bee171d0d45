//! Message routing module
//!
//! Turns broker deliveries into handler calls: decode the payload, find the
//! first matching route, invoke its handler.

/// Dispatch-on-receive sequence
pub mod dispatcher;

pub use dispatcher::{DispatchOutcome, Dispatcher, Handler, Payload};
