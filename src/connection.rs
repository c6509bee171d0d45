//! Plugin connection lifecycle management
//!
//! This module provides the connection lifecycle management separated from
//! the reactor handle used for publishing.

use tracing::{error, info, warn};

use crate::client::{MqttReactor, ReactorError};

/// Connection handle for lifecycle management
///
/// Owns the event loop task. Keep it alive for the duration of the MQTT
/// session and finish with [`shutdown`](Self::shutdown) or
/// [`run_until_exit`](Self::run_until_exit).
pub struct ReactorConnection {
	reactor: MqttReactor,
	event_loop_handle: Option<tokio::task::JoinHandle<()>>,
}

impl ReactorConnection {
	pub(crate) fn new(
		reactor: MqttReactor,
		event_loop_handle: tokio::task::JoinHandle<()>,
	) -> Self {
		Self {
			reactor,
			event_loop_handle: Some(event_loop_handle),
		}
	}

	/// True once the event loop task has ended.
	pub fn is_finished(&self) -> bool {
		self.event_loop_handle
			.as_ref()
			.is_none_or(|handle| handle.is_finished())
	}

	/// Gracefully shutdown the connection by:
	/// 1. Marking the plugin as exiting
	/// 2. Sending MQTT Disconnect packet (triggers event loop termination)
	/// 3. Waiting for event loop to finish processing
	pub async fn shutdown(mut self) -> Result<(), ReactorError> {
		let Some(handle) = self.event_loop_handle.take() else {
			return Ok(());
		};

		self.reactor.exit();
		if !handle.is_finished() {
			// exit() may not have found room for DISCONNECT
			self.reactor.disconnect().await;
		}

		if let Err(e) = handle.await {
			warn!(error = %e, "Event loop task failed");
		}
		Ok(())
	}

	/// Runs until Ctrl-C, an exit request (e.g. the exit route) or the end of
	/// the event loop, then shuts down.
	pub async fn run_until_exit(mut self) -> Result<(), ReactorError> {
		let Some(handle) = self.event_loop_handle.as_mut() else {
			return Ok(());
		};

		let event_loop_finished = tokio::select! {
			res = tokio::signal::ctrl_c() => {
				match res {
					| Ok(()) => info!("Interrupt received, exiting"),
					| Err(err) => warn!(error = %err, "Failed to listen for Ctrl-C, exiting"),
				}
				false
			}
			() = self.reactor.exit_requested() => false,
			res = handle => {
				if let Err(e) = res {
					warn!(error = %e, "Event loop task failed");
				}
				true
			}
		};

		if event_loop_finished {
			self.event_loop_handle = None;
		}
		self.shutdown().await
	}
}

impl Drop for ReactorConnection {
	fn drop(&mut self) {
		if self
			.event_loop_handle
			.as_ref()
			.is_some_and(|handle| !handle.is_finished())
		{
			error!(
				"ReactorConnection dropped without calling shutdown(). Please \
				 call shutdown() and await its completion before dropping."
			);
		}
	}
}
