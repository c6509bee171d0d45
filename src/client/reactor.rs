//! Plugin reactor: route registration, broker connection and event loop

use std::fmt::Display;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use arcstr::ArcStr;
use rumqttc::Packet::{self, Disconnect, Publish};
use rumqttc::{AsyncClient, ConnAck, ConnectReturnCode, EventLoop, QoS};
use rumqttc::{Event::Incoming, Event::Outgoing};
use tokio::sync::Notify;
use tokio::time;
use tracing::{debug, error, info, warn};

use super::config::{ReactorConfig, url_safe};
use super::error::{ConnectionEstablishmentError, ReactorError};
use super::publisher::MessagePublisher;
use crate::connection::ReactorConnection;
use crate::message_serializer::{JsonSerializer, MessageSerializer};
use crate::routing::{Dispatcher, Handler, Payload};
use crate::topic::{
	RouteParams, RouteTable, RouteTemplate, RouteTemplateError, TopicError,
	validation,
};

struct Shared {
	client: OnceLock<AsyncClient>,
	subscription_filters: OnceLock<Arc<[ArcStr]>>,
	exit_requested: AtomicBool,
	exit_notify: Notify,
	plugin_name: String,
	url_safe_plugin_name: String,
	client_id: String,
	base: String,
	serializer: JsonSerializer,
}

/// Handle to a plugin's broker connection.
///
/// Cheap to clone. A handle obtained from [`ReactorBuilder::reactor`] can be
/// captured by route handlers before the connection exists; publishing
/// through it fails with [`ReactorError::NotConnected`] until `connect()`
/// has completed.
#[derive(Clone)]
pub struct MqttReactor {
	shared: Arc<Shared>,
}

impl std::fmt::Debug for MqttReactor {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("MqttReactor")
			.field("plugin_name", &self.shared.plugin_name)
			.field("client_id", &self.shared.client_id)
			.field("connected", &self.is_connected())
			.field("exiting", &self.is_exiting())
			.finish()
	}
}

impl MqttReactor {
	/// Start registering routes for a plugin.
	pub fn builder(
		config: ReactorConfig,
	) -> Result<ReactorBuilder, RouteTemplateError> {
		ReactorBuilder::new(config)
	}

	fn unbound(config: &ReactorConfig) -> Self {
		Self {
			shared: Arc::new(Shared {
				client: OnceLock::new(),
				subscription_filters: OnceLock::new(),
				exit_requested: AtomicBool::new(false),
				exit_notify: Notify::new(),
				plugin_name: config.plugin_name().to_string(),
				url_safe_plugin_name: url_safe(config.plugin_name()),
				client_id: config.client_id(),
				base: config.base().to_string(),
				serializer: JsonSerializer,
			}),
		}
	}

	/// Plugin name as configured
	pub fn plugin_name(&self) -> &str {
		&self.shared.plugin_name
	}

	/// Plugin name as it appears in topics
	pub fn url_safe_plugin_name(&self) -> &str {
		&self.shared.url_safe_plugin_name
	}

	/// MQTT client id
	pub fn client_id(&self) -> &str {
		&self.shared.client_id
	}

	/// Base topic
	pub fn base(&self) -> &str {
		&self.shared.base
	}

	/// Filters subscribed after each connect. Empty before `connect()`.
	pub fn subscription_filters(&self) -> &[ArcStr] {
		self.shared
			.subscription_filters
			.get()
			.map(|filters| &filters[..])
			.unwrap_or_default()
	}

	/// True once `connect()` has completed
	pub fn is_connected(&self) -> bool {
		self.shared.client.get().is_some()
	}

	/// True once [`exit`](Self::exit) has been called
	pub fn is_exiting(&self) -> bool {
		self.shared.exit_requested.load(Ordering::Acquire)
	}

	fn client(&self) -> Result<&AsyncClient, ReactorError> {
		self.shared.client.get().ok_or(ReactorError::NotConnected)
	}

	/// Serializes `msg` as JSON and publishes it.
	pub async fn send_message<T>(
		&self,
		topic: &str,
		msg: &T,
		retain: bool,
		qos: QoS,
	) -> Result<(), ReactorError>
	where
		JsonSerializer: MessageSerializer<T>,
	{
		validation::validate_publish_topic(topic)?;
		let payload = self.encode(msg)?;
		self.client()?
			.publish(topic, qos, retain, payload)
			.await
			.map_err(ReactorError::from)
	}

	/// Formats `template` with `params` (in placeholder order) and publishes
	/// `msg` there as JSON.
	pub async fn send_to_template<T>(
		&self,
		template: &RouteTemplate,
		params: &[&(dyn Display + Sync)],
		msg: &T,
		retain: bool,
		qos: QoS,
	) -> Result<(), ReactorError>
	where
		JsonSerializer: MessageSerializer<T>,
	{
		let topic = {
			let params: Vec<&dyn Display> =
				params.iter().map(|&param| param as &dyn Display).collect();
			template.format_topic(&params).map_err(TopicError::from)?
		};
		self.send_message(&topic, msg, retain, qos).await
	}

	/// Non-blocking [`send_message`](Self::send_message) for use inside
	/// route handlers.
	pub fn try_send_message<T>(
		&self,
		topic: &str,
		msg: &T,
		retain: bool,
		qos: QoS,
	) -> Result<(), ReactorError>
	where
		JsonSerializer: MessageSerializer<T>,
	{
		validation::validate_publish_topic(topic)?;
		let payload = self.encode(msg)?;
		self.client()?
			.try_publish(topic, qos, retain, payload)
			.map_err(ReactorError::from)
	}

	/// Create typed publisher for specific topic.
	///
	/// Topic must not contain wildcard characters (`+`, `#`).
	pub fn publisher<T>(
		&self,
		topic: impl Into<ArcStr>,
	) -> Result<MessagePublisher<T>, ReactorError>
	where
		JsonSerializer: MessageSerializer<T>,
	{
		let topic = topic.into();
		validation::validate_publish_topic(topic.as_str())?;
		Ok(MessagePublisher::new(
			self.client()?.clone(),
			self.shared.serializer.clone(),
			topic,
		))
	}

	fn encode<T>(&self, msg: &T) -> Result<Vec<u8>, ReactorError>
	where JsonSerializer: MessageSerializer<T> {
		self.shared
			.serializer
			.serialize(msg)
			.map_err(|e| ReactorError::Serialization(format!("{e:?}")))
	}

	/// Asks the plugin to stop: sends DISCONNECT, which ends the event loop.
	///
	/// Safe to call from route handlers and more than once.
	pub fn exit(&self) {
		if self.shared.exit_requested.swap(true, Ordering::AcqRel) {
			return;
		}
		info!(plugin = %self.plugin_name(), "Exit requested");
		self.shared.exit_notify.notify_waiters();
		let Some(client) = self.shared.client.get() else {
			return;
		};
		if let Err(err) = client.try_disconnect() {
			// Request channel is full: wait for room off the caller's task.
			match tokio::runtime::Handle::try_current() {
				| Ok(runtime) => {
					debug!(error = %err, "Request channel busy, deferring MQTT Disconnect");
					let reactor = self.clone();
					runtime.spawn(async move { reactor.disconnect().await });
				}
				| Err(_) => {
					warn!(error = %err, "Failed to queue MQTT Disconnect");
				}
			}
		}
	}

	/// Queues DISCONNECT, waiting for room in the request channel.
	pub(crate) async fn disconnect(&self) {
		if let Some(client) = self.shared.client.get() {
			if let Err(err) = client.disconnect().await {
				debug!(error = %err, "MQTT Disconnect not queued");
			}
		}
	}

	/// Resolves once [`exit`](Self::exit) has been called.
	pub async fn exit_requested(&self) {
		loop {
			let notified = self.shared.exit_notify.notified();
			if self.is_exiting() {
				return;
			}
			notified.await;
		}
	}
}

/// Registration phase of a plugin: routes are added here, then frozen by
/// [`connect`](Self::connect).
pub struct ReactorBuilder {
	config: ReactorConfig,
	routes: RouteTable<Handler>,
	reactor: MqttReactor,
}

impl ReactorBuilder {
	/// Creates the builder and, unless disabled in the settings, registers
	/// the exit route as the first route.
	pub fn new(config: ReactorConfig) -> Result<Self, RouteTemplateError> {
		let reactor = MqttReactor::unbound(&config);
		let mut builder = Self {
			routes: RouteTable::new(),
			reactor,
			config,
		};
		if builder.config.settings.exit_route {
			let reactor = builder.reactor.clone();
			let exit_topic = builder.config.exit_topic();
			builder.add_route(&exit_topic, move |_, _| reactor.exit())?;
		}
		Ok(builder)
	}

	/// Handle for route handlers to publish or exit through.
	pub fn reactor(&self) -> MqttReactor {
		self.reactor.clone()
	}

	/// Configuration the reactor will connect with
	pub fn config(&self) -> &ReactorConfig {
		&self.config
	}

	/// Registers `handler` for topics matching `template`.
	///
	/// Earlier routes take precedence over later ones.
	pub fn add_route<F>(
		&mut self,
		template: &str,
		handler: F,
	) -> Result<&mut Self, RouteTemplateError>
	where
		F: Fn(Payload, &RouteParams) + Send + Sync + 'static,
	{
		let fresh = self.routes.add_route(template, Arc::new(handler) as Handler)?;
		debug!(template, fresh_filter = fresh, "Route added");
		Ok(self)
	}

	/// Routes registered so far, exit route included
	pub fn routes(&self) -> &RouteTable<Handler> {
		&self.routes
	}

	/// Connects to the broker, subscribes every route filter and starts the
	/// event loop.
	///
	/// Returns the reactor handle and the connection handle. Keep the
	/// connection alive for the session, call
	/// [`ReactorConnection::shutdown`] or
	/// [`ReactorConnection::run_until_exit`] when done.
	pub async fn connect(
		self,
	) -> Result<(MqttReactor, ReactorConnection), ReactorError> {
		let Self {
			config,
			routes,
			reactor,
		} = self;
		let ReactorConfig {
			connection,
			settings,
			..
		} = config;

		if settings.event_loop_capacity == 0 {
			return Err(ReactorError::ConfigurationValue(
				"event_loop_capacity must be greater than 0".to_string(),
			));
		}

		let (client, new_event_loop) =
			AsyncClient::new(connection, settings.event_loop_capacity);

		let timeout_millis = settings.connection_timeout_millis;
		let connected_event_loop = time::timeout(
			Duration::from_millis(timeout_millis),
			establish_connection(new_event_loop),
		)
		.await
		.map_err(|_| ConnectionEstablishmentError::Timeout { timeout_millis })??;

		let filters: Arc<[ArcStr]> = routes.subscription_filters().into();
		reactor
			.shared
			.client
			.set(client.clone())
			.map_err(|_| already_connected())?;
		reactor
			.shared
			.subscription_filters
			.set(filters.clone())
			.map_err(|_| already_connected())?;

		let event_loop = EventLoopTask {
			client: client.clone(),
			dispatcher: Dispatcher::new(routes),
			filters: filters.clone(),
			subscribe_qos: settings.subscribe_qos,
			max_consecutive_errors: settings.max_consecutive_errors,
			reactor: reactor.clone(),
		};
		let event_loop_handle = tokio::spawn(async move {
			event_loop.run(connected_event_loop).await;
		});
		let connection =
			ReactorConnection::new(reactor.clone(), event_loop_handle);

		// The event loop must already be polling: subscribe() waits for room
		// in the request channel.
		if let Err(err) =
			subscribe_all(&client, &filters, settings.subscribe_qos).await
		{
			if let Err(shutdown_err) = connection.shutdown().await {
				warn!(error = %shutdown_err, "Failed to shut down after subscribe error");
			}
			return Err(err.into());
		}

		info!(
			plugin = %reactor.plugin_name(),
			client_id = %reactor.client_id(),
			filters = filters.len(),
			"Plugin connected"
		);
		Ok((reactor, connection))
	}
}

fn already_connected() -> ReactorError {
	ReactorError::ConfigurationValue("reactor is already connected".to_string())
}

async fn establish_connection(
	mut event_loop: EventLoop,
) -> Result<EventLoop, ConnectionEstablishmentError> {
	loop {
		match event_loop.poll().await {
			| Ok(Incoming(Packet::ConnAck(ConnAck { code, .. }))) => {
				if code == ConnectReturnCode::Success {
					debug!("MQTT connection established successfully");
					return Ok(event_loop);
				} else {
					debug!(code = ?code, "MQTT connection rejected by broker");
					return Err(ConnectionEstablishmentError::BrokerRejected {
						code,
					});
				}
			}
			| Ok(notification) => {
				debug!(notification = ?notification, "Bootstrap phase notification");
			}
			| Err(connection_err) => {
				debug!(error = %connection_err, "MQTT connection error during bootstrap phase");
				return Err(ConnectionEstablishmentError::Network(connection_err));
			}
		}
	}
}

async fn subscribe_all(
	client: &AsyncClient,
	filters: &[ArcStr],
	qos: QoS,
) -> Result<(), rumqttc::ClientError> {
	for filter in filters {
		debug!(filter = %filter, qos = ?qos, "Subscribing");
		client.subscribe(filter.as_str(), qos).await?;
	}
	Ok(())
}

struct EventLoopTask {
	client: AsyncClient,
	dispatcher: Dispatcher,
	filters: Arc<[ArcStr]>,
	subscribe_qos: QoS,
	max_consecutive_errors: u32,
	reactor: MqttReactor,
}

impl EventLoopTask {
	/// Polls the connection and dispatches deliveries until DISCONNECT, an
	/// exit request, or too many consecutive errors.
	async fn run(self, mut event_loop: EventLoop) {
		let mut error_count = 0;
		const INITIAL_RETRY_DELAY: Duration = Duration::from_millis(100);
		const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

		loop {
			match event_loop.poll().await {
				| Ok(Incoming(Packet::ConnAck(ConnAck {
					session_present: false,
					code: ConnectReturnCode::Success,
				}))) => {
					error_count = 0;
					info!(
						"MQTT reconnected without session, resubscribing to \
						 route filters"
					);
					// Spawned so the loop keeps polling while subscribe()
					// waits for channel room.
					let client = self.client.clone();
					let filters = self.filters.clone();
					let qos = self.subscribe_qos;
					tokio::spawn(async move {
						if let Err(err) = subscribe_all(&client, &filters, qos).await
						{
							error!(error = ?err, "Failed to resubscribe to route filters");
						}
					});
				}
				| Ok(Incoming(Packet::ConnAck(ConnAck {
					session_present: true,
					code: ConnectReturnCode::Success,
				}))) => {
					error_count = 0;
					info!(
						"MQTT reconnected with session preserved, \
						 subscriptions maintained by broker"
					);
				}
				| Ok(Incoming(Publish(p))) => {
					error_count = 0;
					debug!(topic = %p.topic, payload_size = p.payload.len(), "Received MQTT message");
					self.dispatcher.dispatch(&p.topic, &p.payload);
				}
				| Ok(Incoming(Disconnect)) => {
					info!("Received MQTT Disconnect packet from server");
					break;
				}
				| Ok(Outgoing(rumqttc::Outgoing::Disconnect)) => {
					info!("Sent MQTT Disconnect packet to server");
					break;
				}
				| Ok(notification) => {
					error_count = 0;
					debug!(notification = ?notification, "Received OTHER MQTT notification");
				}
				| Err(err) => {
					if self.reactor.is_exiting() {
						info!(error = %err, "Connection closed after exit request");
						break;
					}

					error_count += 1;
					error!(error_count = error_count, error = %err, "MQTT event loop error");

					if error_count >= self.max_consecutive_errors {
						error!(
							error_count = error_count,
							max_errors = self.max_consecutive_errors,
							"Too many consecutive errors, terminating event \
							 loop"
						);
						break;
					}

					// Exponential backoff, rumqttc reconnects on the next poll
					let delay = INITIAL_RETRY_DELAY
						* 2_u32.pow((error_count - 1).min(10));
					let delay = delay.min(MAX_RETRY_DELAY);

					warn!(delay = ?delay, error_count = error_count, "Retrying MQTT connection");
					tokio::select! {
						() = time::sleep(delay) => {}
						() = self.reactor.exit_requested() => {
							info!("Exit requested during reconnect backoff");
							break;
						}
					}
				}
			}
		}
		info!("MQTT event loop terminated");
	}
}
