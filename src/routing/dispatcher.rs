//! Dispatch of broker deliveries to route handlers

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, error, trace, warn};

use crate::message_serializer::{JsonSerializer, MessageSerializer};
use crate::topic::{RouteParams, RouteTable};

/// Decoded message payload. `None` when the payload was empty or not valid
/// JSON.
pub type Payload = Option<serde_json::Value>;

/// Route handler: receives the decoded payload and the captured parameters.
///
/// Handlers run on the event loop task, one message at a time, and must not
/// block.
pub type Handler = Arc<dyn Fn(Payload, &RouteParams) + Send + Sync>;

/// What happened to a single delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
	/// A route matched and its handler returned normally
	Handled,
	/// No route matched the topic
	Unmatched,
	/// A route matched and its handler panicked
	HandlerPanicked,
}

/// Routes deliveries to handlers over a frozen [`RouteTable`].
///
/// Cloning is cheap; clones share the table.
#[derive(Clone)]
pub struct Dispatcher<S = JsonSerializer> {
	routes: Arc<RouteTable<Handler>>,
	serializer: S,
}

impl Dispatcher<JsonSerializer> {
	/// Freezes `routes` and decodes payloads as JSON.
	pub fn new(routes: RouteTable<Handler>) -> Self {
		Self::with_serializer(routes, JsonSerializer)
	}
}

impl<S> Dispatcher<S>
where S: MessageSerializer<serde_json::Value>
{
	/// Freezes `routes` and decodes payloads with `serializer`.
	pub fn with_serializer(routes: RouteTable<Handler>, serializer: S) -> Self {
		Self {
			routes: Arc::new(routes),
			serializer,
		}
	}

	/// The routes this dispatcher serves.
	pub fn routes(&self) -> &RouteTable<Handler> {
		&self.routes
	}

	/// Handles one delivery.
	///
	/// A payload that fails to decode is logged and passed on as `None`; the
	/// handler is still called. An unmatched topic is a no-op. A panicking
	/// handler is logged and reported, it never unwinds into the caller.
	pub fn dispatch(&self, topic: &str, payload: &[u8]) -> DispatchOutcome {
		let payload = self.decode(topic, payload);

		let Some(matched) = self.routes.match_topic(topic) else {
			trace!(topic, "No route for topic");
			return DispatchOutcome::Unmatched;
		};

		let handler = matched.handler();
		let params = matched.params();
		debug!(
			topic,
			route = %matched.template(),
			params = ?params,
			"Dispatching message"
		);

		match panic::catch_unwind(AssertUnwindSafe(|| handler(payload, params)))
		{
			| Ok(()) => DispatchOutcome::Handled,
			| Err(cause) => {
				let reason = cause
					.downcast_ref::<&str>()
					.copied()
					.or_else(|| cause.downcast_ref::<String>().map(String::as_str))
					.unwrap_or("<non-string panic payload>");
				error!(
					topic,
					route = %matched.template(),
					reason,
					"Route handler panicked"
				);
				DispatchOutcome::HandlerPanicked
			}
		}
	}

	fn decode(&self, topic: &str, bytes: &[u8]) -> Payload {
		if bytes.is_empty() {
			debug!(topic, "Empty MQTT payload (likely retain clear event)");
			return None;
		}
		match self.serializer.deserialize(bytes) {
			| Ok(value) => Some(value),
			| Err(err) => {
				warn!(
					topic,
					payload_size = bytes.len(),
					error = ?err,
					"Message contains invalid JSON"
				);
				None
			}
		}
	}
}

impl<S> std::fmt::Debug for Dispatcher<S> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Dispatcher")
			.field("routes", &self.routes.len())
			.field("filters", &self.routes.subscription_filters())
			.finish()
	}
}
