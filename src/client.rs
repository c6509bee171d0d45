//! Plugin client module
//!
//! This module provides plugin configuration, the reactor handle and its
//! builder, and typed publishers.

/// Reactor configuration
pub mod config;
/// Client error types
pub mod error;
/// Typed MQTT publishers
pub mod publisher;
/// Reactor handle, builder and event loop
pub mod reactor;

// Re-export commonly used types for convenience
pub use config::{ReactorConfig, ReactorSettings};
pub use error::{ConnectionEstablishmentError, ReactorError};
pub use publisher::MessagePublisher;
pub use reactor::{MqttReactor, ReactorBuilder};

// Connection type is available from the root level
// Use: mqtt_reactor::ReactorConnection
