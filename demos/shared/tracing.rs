use tracing_subscriber::EnvFilter;

/// Logs to stderr when `RUST_LOG` is set (environment or `demos/.env`),
/// e.g. `RUST_LOG=mqtt_reactor=debug`. Silent otherwise.
pub fn init() {
	dotenv::from_filename("demos/.env").ok();
	let Ok(filter) = EnvFilter::try_from_default_env() else {
		return;
	};
	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_target(false)
		.compact()
		.init();
}
