//! # Echo Plugin - MQTT Reactor Example
//!
//! A small plugin that echoes device status updates and shows the plugin
//! lifecycle:
//!
//! - Route templates with placeholders: `devices/{device_id}/status`
//! - Publishing from inside a handler with `try_send_message`
//! - Payloads that are not JSON reach the handler as `None`
//! - Stopping via Ctrl-C or by publishing to `microdrop/echo%20plugin/exit`
//!
//! Try it with mosquitto:
//! ```bash
//! mosquitto_sub -t 'echo/#' -v &
//! mosquitto_pub -t devices/pump-1/status -m '{"on": true}'
//! mosquitto_pub -t 'microdrop/echo%20plugin/exit' -n
//! ```

mod shared;

use mqtt_reactor::{MqttReactor, QoS, ReactorConfig};
use serde_json::json;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	shared::tracing::init();

	let url = shared::config::broker_url();
	let config = ReactorConfig::from_url("echo plugin", &url)?;
	println!("Exit topic: {}", config.exit_topic());

	let mut builder = MqttReactor::builder(config)?;

	let reactor = builder.reactor();
	builder.add_route("devices/{device_id}/status", move |payload, params| {
		let device_id = params.get("device_id").unwrap_or_default();
		println!("{device_id}: {payload:?}");

		let echo = json!({ "device_id": device_id, "status": payload });
		let topic = format!("echo/{device_id}/status");
		if let Err(e) =
			reactor.try_send_message(&topic, &echo, false, QoS::AtMostOnce)
		{
			eprintln!("Echo failed: {e}");
		}
	})?;

	builder.add_route("devices/{device_id}/{field}", |payload, params| {
		println!(
			"Unhandled field {:?} of {:?}: {payload:?}",
			params.get("field"),
			params.get("device_id"),
		);
	})?;

	let (reactor, connection) = match builder.connect().await {
		| Ok(connected) => connected,
		| Err(e) => {
			shared::config::print_connection_error(&url, &e);
			return Err(e.into());
		}
	};

	println!("Subscribed to: {:?}", reactor.subscription_filters());
	connection.run_until_exit().await?;
	println!("Bye");
	Ok(())
}
