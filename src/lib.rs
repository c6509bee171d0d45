//! # MQTT Reactor
//!
//! Route-based MQTT plugins: topic templates with named placeholders are
//! compiled to subscription filters, and incoming messages are dispatched to
//! the first route whose template matches.
//!
//! ## Features
//!
//! - **Route Templates**: `devices/{device_id}/status` subscribes to
//!   `devices/+/status` and hands `device_id` to the handler
//! - **First Match Wins**: Routes are tried in registration order
//! - **JSON Payloads**: Payloads are decoded as JSON, invalid or empty
//!   payloads reach the handler as `None`
//! - **Exit Route**: `{base}/{plugin}/exit` stops the plugin
//! - **Graceful Shutdown**: Ctrl-C or an exit request disconnects cleanly
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mqtt_reactor::{MqttReactor, QoS, ReactorConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ReactorConfig::localhost("device-monitor");
//!     let mut builder = MqttReactor::builder(config)?;
//!
//!     let reactor = builder.reactor();
//!     builder.add_route("devices/{device_id}/status", move |payload, params| {
//!         let device_id = params.get("device_id").unwrap_or_default();
//!         let reply = serde_json::json!({ "device": device_id, "seen": payload });
//!         let _ = reactor.try_send_message(
//!             "devices/monitor/seen",
//!             &reply,
//!             false,
//!             QoS::AtMostOnce,
//!         );
//!     })?;
//!
//!     let (_reactor, connection) = builder.connect().await?;
//!     connection.run_until_exit().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Route Templates
//!
//! Each `/`-separated segment of a template is either a literal or a
//! `{name}` placeholder occupying the whole segment:
//!
//! - `{name}` becomes `+` in the subscription filter and captures one level
//! - literals must match exactly and may not contain `+` or `#`
//! - a topic matches only with the same number of levels as the template

#![warn(missing_docs)]

// Core modules
pub mod client;
pub mod connection;
pub mod message_serializer;
pub mod routing;
pub mod topic;

// === Core Public API ===
// Main reactor types
pub use client::{
	MessagePublisher, MqttReactor, ReactorBuilder, ReactorConfig,
	ReactorError, ReactorSettings,
};
pub use connection::ReactorConnection;

// Message serialization
pub use message_serializer::{JsonSerializer, MessageSerializer};

// Routing
pub use routing::{DispatchOutcome, Dispatcher, Handler, Payload};
pub use topic::{RouteParams, RouteTable, RouteTemplate};

// Essential external types
pub use rumqttc::{MqttOptions, QoS};

/// Result type alias for operations that may fail with ReactorError
pub type Result<T> = std::result::Result<T, ReactorError>;

/// Prelude module for convenient imports
///
/// ```rust
/// use mqtt_reactor::prelude::*;
/// ```
pub mod prelude {
	//! Essential types for most plugins

	pub use crate::{
		MqttReactor, Payload, QoS, ReactorConfig, ReactorConnection,
		ReactorError, Result, RouteParams,
	};
}

/// Error types used throughout the library
///
/// ```rust
/// use mqtt_reactor::errors::*;
/// ```
pub mod errors {
	//! All error types used in the library

	pub use crate::client::{ConnectionEstablishmentError, ReactorError};
	pub use crate::topic::{
		RouteTemplateError, TopicError, TopicFormatError, TopicMatchError,
	};
}
