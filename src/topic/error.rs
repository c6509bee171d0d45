//! Error types and utilities for the topic module
//!
//! This module contains the composite error type and shared constants
//! for the entire topic module, while individual error types remain
//! in their respective modules.

use thiserror::Error;

use super::route_segment::RouteTemplateError;
use super::route_template::TopicFormatError;

/// Comprehensive error type for all topic-related operations
///
/// This enum aggregates the errors of the topic submodules, providing a
/// single error type for the public API while keeping the detailed error
/// from each submodule.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TopicError {
	/// Route template compilation error
	#[error("Route template error: {0}")]
	Template(#[from] RouteTemplateError),

	/// Topic formatting error when substituting parameters
	#[error("Topic format error: {0}")]
	Format(#[from] TopicFormatError),

	/// Topic cannot be used for publishing
	#[error("Topic '{topic}' is invalid for publishing: {reason}")]
	InvalidPublishTopic {
		/// The rejected topic
		topic: String,
		/// Why it was rejected
		reason: String,
	},
}

impl TopicError {
	/// Creates a new InvalidPublishTopic error
	pub fn invalid_publish_topic(
		topic: impl Into<String>,
		reason: impl Into<String>,
	) -> Self {
		Self::InvalidPublishTopic {
			topic: topic.into(),
			reason: reason.into(),
		}
	}
}

/// Convenient Result type for topic operations
pub type TopicResult<T> = Result<T, TopicError>;

/// Convenient Result type for route template compilation
pub type TemplateResult<T> = Result<T, RouteTemplateError>;

/// Topic processing limits and constants
pub mod limits {
	/// Maximum topic length accepted by the MQTT protocol (UTF-8 bytes)
	pub const MAX_TOPIC_LENGTH: usize = 65535;
}

/// Validation utilities for topic operations
pub mod validation {
	use super::limits::MAX_TOPIC_LENGTH;
	use super::{TopicError, TopicResult};

	/// Validates a concrete topic for publishing.
	///
	/// Publish topics must be non-empty, fit the protocol length limit and
	/// contain no wildcard (`+`, `#`) or NUL characters.
	pub fn validate_publish_topic(topic: &str) -> TopicResult<()> {
		if topic.is_empty() || topic.len() > MAX_TOPIC_LENGTH {
			return Err(TopicError::invalid_publish_topic(
				topic,
				"Topic is empty or too long",
			));
		}
		if topic.chars().any(|c| matches!(c, '\0' | '#' | '+')) {
			return Err(TopicError::invalid_publish_topic(
				topic,
				"Topic contains illegal characters ('#', '+', or null byte)",
			));
		}
		Ok(())
	}
}
