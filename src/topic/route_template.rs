//! Route template compilation and matching

use std::collections::HashSet;
use std::convert::TryFrom;
use std::fmt::{self, Display, Write};
use std::slice::Iter;

use arcstr::ArcStr;
use thiserror::Error;

use super::error::TemplateResult;
use super::route_segment::{RouteSegment, RouteTemplateError};
use super::topic_path::{RouteParams, TopicMatchError, TopicPath};

/// Error types for formatting topics with parameters
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TopicFormatError {
	/// Parameter count mismatch when formatting a topic
	#[error(
		"Parameter count mismatch: expected {expected}, provided {provided}"
	)]
	ParameterCountMismatch {
		/// Expected number of parameters
		expected: usize,
		/// Number of parameters actually provided
		provided: usize,
	},
	/// Error during formatting, e.g. a failing `Display` impl
	#[error("Error formatting topic")]
	FormatError {
		#[source]
		/// The underlying formatting error
		source: fmt::Error,
	},
}

impl From<fmt::Error> for TopicFormatError {
	fn from(source: fmt::Error) -> Self {
		TopicFormatError::FormatError { source }
	}
}

/// Compiled route template.
///
/// Holds the original template (`microdrop/{device_id}/exit`), its segments,
/// and the broker subscription filter derived from them
/// (`microdrop/+/exit`). The filter is computed once at compile time and
/// never diverges from the segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTemplate {
	template: ArcStr, // as written by the plugin author
	subscription_filter: ArcStr, // captures replaced by "+"
	segments: Vec<RouteSegment>,
}

impl RouteTemplate {
	/// Compiles a `/`-delimited template into segments and a filter.
	pub fn compile(template: impl Into<ArcStr>) -> TemplateResult<Self> {
		let template = template.into();
		if template.is_empty() || template.trim().is_empty() {
			return Err(RouteTemplateError::EmptyTemplate);
		}

		let segments: Result<Vec<_>, _> = template
			.split('/')
			.map(|s| template.substr_from(s))
			.map(RouteSegment::try_from)
			.collect();

		let segments =
			segments.map_err(|err| err.in_template(template.as_str()))?;

		{
			let mut seen_names = HashSet::new();
			for name in segments.iter().filter_map(RouteSegment::param_name) {
				if !seen_names.insert(name.as_str()) {
					return Err(RouteTemplateError::duplicate_parameter(
						template.as_str(),
						name.as_str(),
					));
				}
			}
		}

		Ok(Self {
			subscription_filter: ArcStr::from(Self::to_subscription_filter(
				&segments,
			)),
			template,
			segments,
		})
	}

	/// Returns the MQTT filter to subscribe with.
	pub fn subscription_filter(&self) -> ArcStr {
		self.subscription_filter.clone()
	}

	/// Returns the template as written, with named placeholders.
	pub fn template(&self) -> ArcStr {
		self.template.clone()
	}

	/// Returns iterator over template segments.
	pub fn iter(&self) -> Iter<'_, RouteSegment> {
		self.segments.iter()
	}

	/// Returns number of segments in template.
	pub fn len(&self) -> usize {
		self.segments.len()
	}

	/// Always false: compilation rejects empty templates.
	pub fn is_empty(&self) -> bool {
		self.segments.is_empty()
	}

	/// Returns template segments as slice.
	pub fn slice(&self) -> &[RouteSegment] {
		&self.segments
	}

	/// Names of the captures, in template order.
	pub fn param_names(&self) -> impl Iterator<Item = &str> {
		self.segments
			.iter()
			.filter_map(RouteSegment::param_name)
			.map(|name| name.as_str())
	}

	fn str_len(segments: &[RouteSegment]) -> usize {
		if segments.is_empty() {
			return 0;
		}
		(segments.len() - 1) + // slashes count
		segments.iter().map(|s| s.as_filter().len()).sum::<usize>()
	}

	fn to_subscription_filter(segments: &[RouteSegment]) -> String {
		let mut filter = String::with_capacity(Self::str_len(segments));
		segments.iter().enumerate().for_each(|(i, segment)| {
			if i > 0 {
				filter.push('/');
			}
			filter.push_str(segment.as_filter());
		});
		filter
	}

	/// Formats a concrete topic by substituting captures with `params`, in
	/// template order.
	pub fn format_topic(
		&self,
		params: &[&dyn Display],
	) -> Result<String, TopicFormatError> {
		let capture_count =
			self.segments.iter().filter(|s| s.is_capture()).count();

		if params.len() != capture_count {
			return Err(TopicFormatError::ParameterCountMismatch {
				expected: capture_count,
				provided: params.len(),
			});
		}

		let mut result = String::with_capacity(self.template.len() + 10); //Est.
		let mut param_index = 0;

		for (i, segment) in self.segments.iter().enumerate() {
			if i > 0 {
				result.push('/');
			}

			match segment {
				| RouteSegment::Literal(s) => result.push_str(s),
				| RouteSegment::Capture(_) => {
					write!(result, "{}", params[param_index])?;
					param_index += 1;
				}
			}
		}

		Ok(result)
	}

	/// Matches a topic against this template, extracting parameters.
	///
	/// Segment counts must be equal; literals must be equal; captures bind
	/// the topic segment verbatim (including the empty segment).
	pub fn try_match(
		&self,
		topic: &TopicPath,
	) -> Result<RouteParams, TopicMatchError> {
		if topic.len() != self.len() {
			return Err(TopicMatchError::SegmentCountMismatch {
				expected: self.len(),
				found: topic.len(),
			});
		}

		let mut params = RouteParams::new();
		for (position, (pattern_segment, topic_segment)) in
			self.iter().zip(topic.segments()).enumerate()
		{
			match pattern_segment {
				| RouteSegment::Literal(expected) => {
					if topic_segment != expected {
						return Err(TopicMatchError::SegmentMismatch {
							expected: expected.to_string(),
							found: topic_segment.to_string(),
							position,
						});
					}
				}
				| RouteSegment::Capture(name) => {
					params.push(name.clone(), topic_segment.clone());
				}
			}
		}
		Ok(params)
	}
}

impl std::fmt::Display for RouteTemplate {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.template)
	}
}

impl TryFrom<String> for RouteTemplate {
	type Error = RouteTemplateError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		Self::compile(value)
	}
}

impl TryFrom<&str> for RouteTemplate {
	type Error = RouteTemplateError;

	fn try_from(value: &str) -> Result<Self, Self::Error> {
		Self::compile(value)
	}
}

impl TryFrom<ArcStr> for RouteTemplate {
	type Error = RouteTemplateError;

	fn try_from(value: ArcStr) -> Result<Self, Self::Error> {
		Self::compile(value)
	}
}
