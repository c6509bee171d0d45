use std::marker::PhantomData;

use arcstr::ArcStr;
use rumqttc::{AsyncClient, QoS};

use super::error::ReactorError;
use crate::message_serializer::{JsonSerializer, MessageSerializer};

/// Typed publisher for a specific topic.
///
/// Created via `MqttReactor::publisher()`. Supports QoS and retain
/// configuration.
pub struct MessagePublisher<T, F = JsonSerializer> {
	client: AsyncClient,
	topic: ArcStr,
	qos: QoS,
	retain: bool,
	serializer: F,
	_phantom: PhantomData<T>,
}

impl<T, F> MessagePublisher<T, F>
where F: MessageSerializer<T>
{
	pub(crate) fn new(
		client: AsyncClient,
		serializer: F,
		topic: impl Into<ArcStr>,
	) -> Self {
		Self {
			client,
			topic: topic.into(),
			qos: QoS::AtMostOnce,
			retain: false,
			serializer,
			_phantom: PhantomData,
		}
	}

	/// Sets Quality of Service level for published messages.
	pub fn with_qos(mut self, qos: QoS) -> Self {
		self.qos = qos;
		self
	}

	/// Sets retain flag for published messages.
	pub fn with_retain(mut self, retain: bool) -> Self {
		self.retain = retain;
		self
	}

	/// Get the topic this publisher is configured for.
	pub fn topic(&self) -> &ArcStr {
		&self.topic
	}

	/// Get qos level for this publisher.
	pub fn qos(&self) -> QoS {
		self.qos
	}

	/// Get retain flag for this publisher.
	pub fn retain(&self) -> bool {
		self.retain
	}

	/// Publishes data to the configured topic.
	pub async fn publish(&self, data: &T) -> Result<(), ReactorError> {
		let payload = self.encode(data)?;
		self.client
			.publish(self.topic.as_str(), self.qos, self.retain, payload)
			.await
			.map_err(ReactorError::from)
	}

	/// Publishes without waiting for room in the request channel.
	///
	/// Usable from route handlers, which run on the event loop task.
	pub fn try_publish(&self, data: &T) -> Result<(), ReactorError> {
		let payload = self.encode(data)?;
		self.client
			.try_publish(self.topic.as_str(), self.qos, self.retain, payload)
			.map_err(ReactorError::from)
	}

	/// Clear retained message for this topic
	///
	/// Sends an empty payload with retain=true to remove any retained message.
	/// Uses the same QoS level as configured for this publisher.
	pub async fn clear_retained(&self) -> Result<(), ReactorError> {
		self.client
			.publish(self.topic.as_str(), self.qos, true, Vec::new())
			.await
			.map_err(ReactorError::from)
	}

	fn encode(&self, data: &T) -> Result<Vec<u8>, ReactorError> {
		self.serializer
			.serialize(data)
			.map_err(|e| ReactorError::Serialization(format!("{e:?}")))
	}
}
