//! Configuration for plugin reactor initialization

use std::time::Duration;

use rumqttc::{MqttOptions, OptionError, QoS};
use url::form_urlencoded;
use uuid::Uuid;

/// Base topic every plugin lives under unless configured otherwise
pub const DEFAULT_BASE: &str = "microdrop";

/// Keep-alive interval used when none is configured
pub const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(60);

/// Client-level behavior settings
#[derive(Debug, Clone)]
pub struct ReactorSettings {
	/// Capacity of the rumqttc request channel
	pub event_loop_capacity: usize,
	/// How long `connect()` waits for the broker's CONNACK
	pub connection_timeout_millis: u64,
	/// Event loop stops after this many errors in a row
	pub max_consecutive_errors: u32,
	/// QoS used when subscribing route filters
	pub subscribe_qos: QoS,
	/// Register the `{base}/{plugin}/exit` route
	pub exit_route: bool,
}

impl Default for ReactorSettings {
	fn default() -> Self {
		Self {
			event_loop_capacity: 10,
			connection_timeout_millis: 5000,
			max_consecutive_errors: 10,
			subscribe_qos: QoS::AtMostOnce,
			exit_route: true,
		}
	}
}

/// Configuration for plugin reactor creation
#[derive(Debug, Clone)]
pub struct ReactorConfig {
	/// Underlying MQTT connection options (from rumqttc)
	pub connection: MqttOptions,
	/// Client-level behavior settings
	pub settings: ReactorSettings,
	plugin_name: String,
	base: String,
}

impl ReactorConfig {
	/// Create config with default settings and a generated client id
	pub fn new(plugin_name: &str, host: &str, port: u16) -> Self {
		let mut connection =
			MqttOptions::new(generate_client_id(plugin_name), host, port);
		connection.set_keep_alive(DEFAULT_KEEP_ALIVE);
		Self {
			connection,
			settings: ReactorSettings::default(),
			plugin_name: plugin_name.to_string(),
			base: DEFAULT_BASE.to_string(),
		}
	}

	/// Create config for localhost:1883
	pub fn localhost(plugin_name: &str) -> Self {
		Self::new(plugin_name, "localhost", 1883)
	}

	/// Parse configuration from MQTT URL
	///
	/// Supports: tcp://, mqtt://, ssl://, mqtts://, ws://, wss://. A
	/// `client_id` query parameter is generated when the URL has none.
	pub fn from_url(plugin_name: &str, url: &str) -> Result<Self, OptionError> {
		let url = if url.contains("client_id=") {
			url.to_string()
		} else {
			let client_id: String =
				form_urlencoded::byte_serialize(generate_client_id(plugin_name).as_bytes())
					.collect();
			let separator = if url.contains('?') { '&' } else { '?' };
			format!("{url}{separator}client_id={client_id}")
		};
		Ok(Self {
			connection: MqttOptions::parse_url(url)?,
			settings: ReactorSettings::default(),
			plugin_name: plugin_name.to_string(),
			base: DEFAULT_BASE.to_string(),
		})
	}

	/// Set the keep-alive interval
	pub fn set_keep_alive(&mut self, keep_alive: Duration) -> &mut Self {
		self.connection.set_keep_alive(keep_alive);
		self
	}

	/// Set the base topic the exit route lives under
	pub fn set_base(&mut self, base: impl Into<String>) -> &mut Self {
		self.base = base.into();
		self
	}

	/// Plugin name as configured
	pub fn plugin_name(&self) -> &str {
		&self.plugin_name
	}

	/// Plugin name safe to embed in topics and URLs
	pub fn url_safe_plugin_name(&self) -> String {
		url_safe(&self.plugin_name)
	}

	/// Base topic
	pub fn base(&self) -> &str {
		&self.base
	}

	/// MQTT client id sent to the broker
	pub fn client_id(&self) -> String {
		self.connection.client_id()
	}

	/// Topic that makes the plugin exit: `{base}/{url_safe_plugin_name}/exit`
	pub fn exit_topic(&self) -> String {
		format!("{}/{}/exit", self.base, self.url_safe_plugin_name())
	}
}

/// Percent-encodes `name` for use as a single topic level.
///
/// The form encoder turns spaces into `+`, which is a wildcard in MQTT
/// filters, so they are re-encoded as `%20`.
pub fn url_safe(name: &str) -> String {
	form_urlencoded::byte_serialize(name.as_bytes())
		.collect::<String>()
		.replace('+', "%20")
}

/// Client id unique to this process: `{url_safe_plugin_name}>>{uuid}`.
pub fn generate_client_id(plugin_name: &str) -> String {
	format!("{}>>{}", url_safe(plugin_name), Uuid::new_v4().simple())
}
