use std::env;

/// Get MQTT broker URL from environment variable or use default
///
/// Loads configuration from .env files in this order:
/// 1. demos/.env.local (if exists, ignored by git)
/// 2. demos/.env (committed defaults)
/// 3. Environment variables
/// 4. Hardcoded default
///
/// # Examples
/// - `MQTT_BROKER=mqtt://broker.hivemq.com:1883` - Public broker
/// - `MQTT_BROKER=mqtt://localhost:1883` - Local broker (default)
pub fn broker_url() -> String {
	dotenv::dotenv().ok();
	if std::path::Path::new("demos/.env.local").exists() {
		dotenv::from_filename("demos/.env.local").ok();
	}

	env::var("MQTT_BROKER").unwrap_or_else(|_| "mqtt://localhost:1883".to_string())
}

/// Print a hint for the most common connection failure
pub fn print_connection_error(url: &str, err: &dyn std::error::Error) {
	eprintln!("Failed to connect to {url}: {err}");
	eprintln!(
		"Start a local broker (e.g. `mosquitto -p 1883`) or set MQTT_BROKER \
		 in demos/.env.local"
	);
}
