//! Split topic paths and the parameters bound when a route matches them
#![allow(missing_docs)]

use std::fmt;

use arcstr::{ArcStr, Substr};
use smallvec::SmallVec;
use thiserror::Error;

/// Topic string pre-split into `/`-delimited segments.
///
/// Segments are substrings of `path`, so splitting allocates only the
/// segment vector.
#[derive(Debug, Clone)]
pub struct TopicPath {
	path: ArcStr,
	segments: Vec<Substr>,
}

impl TopicPath {
	pub fn new(path: impl Into<ArcStr>) -> Self {
		let path = path.into();
		let segments: Vec<Substr> =
			path.split('/').map(|s| path.substr_from(s)).collect();
		Self { path, segments }
	}

	pub fn path(&self) -> &ArcStr {
		&self.path
	}

	pub fn segments(&self) -> &[Substr] {
		&self.segments
	}

	pub fn len(&self) -> usize {
		self.segments.len()
	}

	pub fn is_empty(&self) -> bool {
		self.path.is_empty()
	}
}

impl fmt::Display for TopicPath {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.path)
	}
}

impl From<&str> for TopicPath {
	fn from(value: &str) -> Self {
		Self::new(value)
	}
}

impl From<String> for TopicPath {
	fn from(value: String) -> Self {
		Self::new(value)
	}
}

impl From<ArcStr> for TopicPath {
	fn from(value: ArcStr) -> Self {
		Self::new(value)
	}
}

/// Why a single route template rejected a topic.
///
/// Only used for diagnostics; the route table treats every variant as
/// "no match".
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TopicMatchError {
	#[error("segment count mismatch: template has {expected}, topic has {found}")]
	SegmentCountMismatch { expected: usize, found: usize },

	#[error("expected '{expected}' at position {position}, found '{found}'")]
	SegmentMismatch {
		expected: String,
		found: String,
		position: usize,
	},
}

/// Parameters captured by a route match, in template order.
///
/// Maps parameter name to the literal topic segment bound at that position.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct RouteParams {
	params: SmallVec<[(Substr, Substr); 4]>,
}

impl RouteParams {
	pub fn new() -> Self {
		Self::default()
	}

	pub(crate) fn push(&mut self, name: Substr, value: Substr) {
		self.params.push((name, value));
	}

	/// Value bound to `name`, if the matched template captures it.
	pub fn get(&self, name: &str) -> Option<&str> {
		self.params
			.iter()
			.find(|(n, _)| n.as_str() == name)
			.map(|(_, value)| value.as_str())
	}

	/// Value of the capture at `index` in template order.
	pub fn get_index(&self, index: usize) -> Option<&str> {
		self.params.get(index).map(|(_, value)| value.as_str())
	}

	pub fn contains(&self, name: &str) -> bool {
		self.get(name).is_some()
	}

	pub fn len(&self) -> usize {
		self.params.len()
	}

	pub fn is_empty(&self) -> bool {
		self.params.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
		self.params
			.iter()
			.map(|(name, value)| (name.as_str(), value.as_str()))
	}
}

impl fmt::Debug for RouteParams {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_map().entries(self.iter()).finish()
	}
}

impl<'a> IntoIterator for &'a RouteParams {
	type IntoIter = Box<dyn Iterator<Item = (&'a str, &'a str)> + 'a>;
	type Item = (&'a str, &'a str);

	fn into_iter(self) -> Self::IntoIter {
		Box::new(self.iter())
	}
}
