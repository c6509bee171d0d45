//! Message serialization traits and implementations.

use std::fmt::Debug;

use serde::Serialize;
use serde::de::DeserializeOwned;

/// Trait for serializing and deserializing MQTT message payloads.
///
/// Implement this trait to use custom serialization formats.
pub trait MessageSerializer<T>:
	Default + Clone + Send + Sync + 'static
{
	/// Error type for serialization failures
	type SerializeError: Debug + Send + Sync + 'static;
	/// Error type for deserialization failures
	type DeserializeError: Debug + Send + Sync + 'static;

	/// Convert data to bytes for MQTT transmission
	fn serialize(&self, data: &T) -> Result<Vec<u8>, Self::SerializeError>;
	/// Convert bytes from MQTT into typed data
	fn deserialize(&self, bytes: &[u8]) -> Result<T, Self::DeserializeError>;
}

/// JSON serializer, the wire format plugins exchange.
///
/// Works for any serde type, including `serde_json::Value` for payloads of
/// unknown shape.
#[derive(Clone, Default, Debug)]
pub struct JsonSerializer;

impl JsonSerializer {
	/// Creates a new serializer.
	pub fn new() -> Self {
		Self
	}
}

impl<T> MessageSerializer<T> for JsonSerializer
where T: Serialize + DeserializeOwned + 'static
{
	type DeserializeError = serde_json::Error;
	type SerializeError = serde_json::Error;

	fn serialize(&self, data: &T) -> Result<Vec<u8>, Self::SerializeError> {
		serde_json::to_vec(data)
	}

	fn deserialize(&self, bytes: &[u8]) -> Result<T, Self::DeserializeError> {
		serde_json::from_slice(bytes)
	}
}
