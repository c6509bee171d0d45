use rumqttc::{ClientError, OptionError};

use crate::topic::{RouteTemplateError, TopicError};

/// Errors while waiting for the broker to accept the connection
#[derive(Debug, thiserror::Error)]
pub enum ConnectionEstablishmentError {
	/// Transport or protocol failure before CONNACK
	#[error("Network connection failed: {0}")]
	Network(#[from] rumqttc::ConnectionError),

	/// Broker answered CONNACK with a refusal code
	#[error("Broker rejected connection: {code:?}")]
	BrokerRejected {
		/// Return code sent by the broker
		code: rumqttc::ConnectReturnCode,
	},

	/// No CONNACK within the configured timeout
	#[error("Connection establishment timed out after {timeout_millis}ms")]
	Timeout {
		/// Configured timeout
		timeout_millis: u64,
	},
}

/// Errors that can occur in reactor operations
#[derive(Debug, thiserror::Error)]
pub enum ReactorError {
	/// Request could not be queued to the rumqttc event loop
	#[error("Client operation failed: {0}")]
	ClientOperation(#[from] ClientError),

	/// Configuration errors when parsing MQTT options
	#[error("Configuration error: {0}")]
	Configuration(#[from] OptionError),

	/// Invalid configuration parameter values
	#[error("Invalid configuration value: {0}")]
	ConfigurationValue(String),

	/// Serialization errors when converting data to bytes
	#[error("Serialization error: {0}")]
	Serialization(String),

	/// Route template rejected at registration
	#[error("Route template error: {0}")]
	RouteTemplate(#[from] RouteTemplateError),

	/// Topic-related errors (formatting, publish validation)
	#[error("Topic error: {0}")]
	Topic(#[from] TopicError),

	/// Connection establishment failed
	#[error("Failed to establish connection: {0}")]
	ConnectionEstablishment(#[from] ConnectionEstablishmentError),

	/// Publishing before `connect()` completed
	#[error("Reactor is not connected to a broker")]
	NotConnected,
}

impl From<std::convert::Infallible> for ReactorError {
	fn from(never: std::convert::Infallible) -> Self {
		match never {}
	}
}
