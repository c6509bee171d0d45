//! Integration tests for the reactor lifecycle that need no broker
//!
//! Connection tests point at a port nothing listens on.

use std::time::Duration;

use mqtt_reactor::errors::{
	ConnectionEstablishmentError, TopicError, TopicFormatError,
};
use mqtt_reactor::{
	MqttReactor, QoS, ReactorConfig, ReactorError, RouteParams, RouteTemplate,
};
use serde_json::json;

#[test]
fn test_exit_route_registered_first() {
	let mut builder =
		MqttReactor::builder(ReactorConfig::localhost("dmf-device-ui")).unwrap();
	builder.add_route("microdrop/{plugin}/ping", |_, _| {}).unwrap();

	let templates: Vec<String> = builder
		.routes()
		.routes()
		.map(|route| route.template().template().to_string())
		.collect();
	assert_eq!(
		templates,
		["microdrop/dmf-device-ui/exit", "microdrop/{plugin}/ping"]
	);
	assert_eq!(
		builder.routes().subscription_filters(),
		["microdrop/dmf-device-ui/exit", "microdrop/+/ping"]
	);
}

#[test]
fn test_exit_route_uses_url_safe_name_and_base() {
	let mut config = ReactorConfig::localhost("step label");
	config.set_base("lab");
	let builder = MqttReactor::builder(config).unwrap();

	assert_eq!(builder.reactor().url_safe_plugin_name(), "step%20label");
	assert!(
		builder
			.routes()
			.match_topic("lab/step%20label/exit")
			.is_some()
	);
	assert!(builder.routes().match_topic("microdrop/step label/exit").is_none());
}

#[test]
fn test_exit_route_can_be_disabled() {
	let mut config = ReactorConfig::localhost("sensor");
	config.settings.exit_route = false;
	let builder = MqttReactor::builder(config).unwrap();

	assert!(builder.routes().is_empty());
	assert!(builder.routes().subscription_filters().is_empty());
}

#[test]
fn test_exit_route_handler_requests_exit() {
	let builder =
		MqttReactor::builder(ReactorConfig::localhost("sensor")).unwrap();
	let reactor = builder.reactor();
	assert!(!reactor.is_exiting());

	let matched = builder
		.routes()
		.match_topic("microdrop/sensor/exit")
		.unwrap();
	(matched.handler())(None, &RouteParams::new());

	assert!(reactor.is_exiting());
}

#[test]
fn test_invalid_template_rejected_by_builder() {
	let mut builder =
		MqttReactor::builder(ReactorConfig::localhost("sensor")).unwrap();

	assert!(builder.add_route("a/{}/b", |_, _| {}).is_err());
	assert!(builder.add_route("a/#", |_, _| {}).is_err());
	assert!(builder.add_route("", |_, _| {}).is_err());
	assert_eq!(builder.routes().len(), 1);
}

#[test]
fn test_client_id_prefixed_with_plugin_name() {
	let builder =
		MqttReactor::builder(ReactorConfig::localhost("my plugin")).unwrap();
	let reactor = builder.reactor();

	assert!(reactor.client_id().starts_with("my%20plugin>>"));
	assert_eq!(reactor.plugin_name(), "my plugin");
	assert_eq!(reactor.base(), "microdrop");
	assert!(!reactor.is_connected());
	assert!(reactor.subscription_filters().is_empty());
}

#[tokio::test]
async fn test_publishing_before_connect_fails() {
	let builder =
		MqttReactor::builder(ReactorConfig::localhost("sensor")).unwrap();
	let reactor = builder.reactor();

	let result = reactor
		.send_message("sensor/reading", &json!({"t": 21.5}), false, QoS::AtMostOnce)
		.await;
	assert!(matches!(result, Err(ReactorError::NotConnected)));

	let result =
		reactor.try_send_message("sensor/reading", &json!(1), false, QoS::AtLeastOnce);
	assert!(matches!(result, Err(ReactorError::NotConnected)));

	let publisher = reactor.publisher::<serde_json::Value>("sensor/reading");
	assert!(matches!(publisher, Err(ReactorError::NotConnected)));
}

#[tokio::test]
async fn test_publishing_to_wildcard_topic_fails() {
	let builder =
		MqttReactor::builder(ReactorConfig::localhost("sensor")).unwrap();
	let reactor = builder.reactor();

	let result = reactor
		.send_message("sensor/+/reading", &json!(1), false, QoS::AtMostOnce)
		.await;
	assert!(matches!(
		result,
		Err(ReactorError::Topic(TopicError::InvalidPublishTopic { .. }))
	));

	let publisher = reactor.publisher::<serde_json::Value>("sensor/#");
	assert!(matches!(publisher, Err(ReactorError::Topic(_))));
}

#[tokio::test]
async fn test_send_to_template_formats_before_publishing() {
	let builder =
		MqttReactor::builder(ReactorConfig::localhost("sensor")).unwrap();
	let reactor = builder.reactor();
	let template = RouteTemplate::compile("devices/{device_id}/cmd").unwrap();

	let result = reactor
		.send_to_template(&template, &[], &json!("on"), false, QoS::AtMostOnce)
		.await;
	assert!(matches!(
		result,
		Err(ReactorError::Topic(TopicError::Format(
			TopicFormatError::ParameterCountMismatch {
				expected: 1,
				provided: 0,
			}
		)))
	));

	let result = reactor
		.send_to_template(&template, &[&"+"], &json!("on"), false, QoS::AtMostOnce)
		.await;
	assert!(matches!(
		result,
		Err(ReactorError::Topic(TopicError::InvalidPublishTopic { .. }))
	));

	let result = reactor
		.send_to_template(
			&template,
			&[&"pump-1"],
			&json!("on"),
			false,
			QoS::AtMostOnce,
		)
		.await;
	assert!(matches!(result, Err(ReactorError::NotConnected)));
}

#[tokio::test]
async fn test_exit_before_connect_resolves_waiters() {
	let builder =
		MqttReactor::builder(ReactorConfig::localhost("sensor")).unwrap();
	let reactor = builder.reactor();

	let waiter = {
		let reactor = reactor.clone();
		tokio::spawn(async move { reactor.exit_requested().await })
	};
	reactor.exit();
	reactor.exit();

	tokio::time::timeout(Duration::from_secs(1), waiter)
		.await
		.expect("exit_requested() did not resolve")
		.unwrap();
	assert!(reactor.is_exiting());
}

#[tokio::test]
async fn test_connect_to_unreachable_broker_fails() {
	let mut config = ReactorConfig::new("sensor", "127.0.0.1", 1);
	config.settings.connection_timeout_millis = 2000;
	let builder = MqttReactor::builder(config).unwrap();
	let reactor = builder.reactor();

	let result = builder.connect().await;

	assert!(matches!(
		result,
		Err(ReactorError::ConnectionEstablishment(
			ConnectionEstablishmentError::Network(_)
				| ConnectionEstablishmentError::Timeout { .. }
		))
	));
	assert!(!reactor.is_connected());
}

#[tokio::test]
async fn test_zero_capacity_rejected() {
	let mut config = ReactorConfig::localhost("sensor");
	config.settings.event_loop_capacity = 0;
	let builder = MqttReactor::builder(config).unwrap();

	let result = builder.connect().await;
	assert!(matches!(result, Err(ReactorError::ConfigurationValue(_))));
}
