//! Route template segment types and parsing

use std::borrow::Cow;
use std::convert::TryFrom;

use arcstr::Substr;
use thiserror::Error;

/// Error types for route template compilation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouteTemplateError {
	/// Empty or whitespace-only template
	#[error("Route template cannot be empty")]
	EmptyTemplate,

	/// Segment with unbalanced or misplaced braces
	#[error(
		"Malformed placeholder '{segment}' in route template '{template}': \
		 placeholders must span the whole segment as {{name}}"
	)]
	MalformedPlaceholder {
		/// The template being compiled
		template: String,
		/// The offending segment
		segment: String,
	},

	/// Placeholder without a parameter name
	#[error("Empty placeholder '{{}}' in route template '{template}'")]
	EmptyPlaceholder {
		/// The template being compiled
		template: String,
	},

	/// Literal segment containing MQTT wildcard characters
	#[error(
		"Literal segment '{segment}' in route template '{template}' contains \
		 an MQTT wildcard (+ or #)"
	)]
	WildcardInLiteral {
		/// The template being compiled
		template: String,
		/// The offending segment
		segment: String,
	},

	/// Same parameter name captured twice
	#[error("Parameter '{name}' appears more than once in route template '{template}'")]
	DuplicateParameter {
		/// The template being compiled
		template: String,
		/// The repeated parameter name
		name: String,
	},
}

impl RouteTemplateError {
	/// Creates a new MalformedPlaceholder error
	pub fn malformed_placeholder(
		template: impl Into<String>,
		segment: impl Into<String>,
	) -> Self {
		Self::MalformedPlaceholder {
			template: template.into(),
			segment: segment.into(),
		}
	}

	/// Creates a new EmptyPlaceholder error
	pub fn empty_placeholder(template: impl Into<String>) -> Self {
		Self::EmptyPlaceholder {
			template: template.into(),
		}
	}

	/// Creates a new WildcardInLiteral error
	pub fn wildcard_in_literal(
		template: impl Into<String>,
		segment: impl Into<String>,
	) -> Self {
		Self::WildcardInLiteral {
			template: template.into(),
			segment: segment.into(),
		}
	}

	/// Creates a new DuplicateParameter error
	pub fn duplicate_parameter(
		template: impl Into<String>,
		name: impl Into<String>,
	) -> Self {
		Self::DuplicateParameter {
			template: template.into(),
			name: name.into(),
		}
	}

	/// Attaches the full template text to an error raised for a lone segment.
	pub(crate) fn in_template(self, template: &str) -> Self {
		match self {
			| Self::MalformedPlaceholder { segment, .. } => {
				Self::malformed_placeholder(template, segment)
			}
			| Self::EmptyPlaceholder { .. } => Self::empty_placeholder(template),
			| Self::WildcardInLiteral { segment, .. } => {
				Self::wildcard_in_literal(template, segment)
			}
			| Self::DuplicateParameter { name, .. } => {
				Self::duplicate_parameter(template, name)
			}
			| Self::EmptyTemplate => Self::EmptyTemplate,
		}
	}
}

impl From<std::convert::Infallible> for RouteTemplateError {
	fn from(never: std::convert::Infallible) -> Self {
		match never {}
	}
}

/// Route template segment: literal string or named capture
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RouteSegment {
	/// Literal segment, must equal the topic segment exactly
	Literal(Substr),
	/// Named `{param}` capture, matches any single topic segment
	Capture(Substr),
}

impl RouteSegment {
	/// Returns the segment as it appears in the broker subscription filter.
	pub fn as_filter(&self) -> &str {
		match self {
			| RouteSegment::Literal(s) => s,
			| RouteSegment::Capture(_) => "+",
		}
	}

	/// Returns the segment as it appears in the route template.
	pub fn as_template(&self) -> Cow<'_, str> {
		match self {
			| RouteSegment::Literal(s) => Cow::Borrowed(s),
			| RouteSegment::Capture(name) => Cow::Owned(format!("{{{name}}}")),
		}
	}

	/// Returns parameter name for captures.
	pub fn param_name(&self) -> Option<&Substr> {
		match self {
			| RouteSegment::Capture(name) => Some(name),
			| RouteSegment::Literal(_) => None,
		}
	}

	/// Returns true if this segment is a capture.
	pub fn is_capture(&self) -> bool {
		matches!(self, RouteSegment::Capture(_))
	}
}

impl std::fmt::Display for RouteSegment {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.as_template())
	}
}

impl TryFrom<Substr> for RouteSegment {
	type Error = RouteTemplateError;

	/// Parses a single segment. Errors carry the segment as the template;
	/// [`RouteTemplate`](super::RouteTemplate) rewrites them with the full
	/// template text.
	fn try_from(segment: Substr) -> Result<Self, Self::Error> {
		let res = match segment.as_str() {
			| "{}" => {
				return Err(RouteTemplateError::empty_placeholder(
					segment.as_str(),
				));
			}
			| s if s.len() > 2 && s.starts_with('{') && s.ends_with('}') => {
				let inner = &s[1 .. s.len() - 1];
				if inner.contains(['{', '}']) {
					return Err(RouteTemplateError::malformed_placeholder(
						s, s,
					));
				}
				RouteSegment::Capture(segment.substr_from(inner))
			}
			| s if s.contains(['{', '}']) => {
				return Err(RouteTemplateError::malformed_placeholder(s, s));
			}
			| s if s.contains(['+', '#']) => {
				return Err(RouteTemplateError::wildcard_in_literal(s, s));
			}
			| _ => RouteSegment::Literal(segment),
		};
		Ok(res)
	}
}
