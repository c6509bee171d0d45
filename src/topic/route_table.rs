#![allow(missing_docs)]
use std::collections::HashSet;

use arcstr::ArcStr;
use tracing::trace;

use super::route_segment::RouteTemplateError;
use super::route_template::RouteTemplate;
use super::topic_path::{RouteParams, TopicPath};

/// A compiled route template paired with its handler.
#[derive(Debug, Clone)]
pub struct Route<H> {
	template: RouteTemplate,
	handler: H,
}

impl<H> Route<H> {
	pub fn template(&self) -> &RouteTemplate {
		&self.template
	}

	pub fn handler(&self) -> &H {
		&self.handler
	}

	pub fn subscription_filter(&self) -> ArcStr {
		self.template.subscription_filter()
	}
}

/// Result of a successful [`RouteTable::match_topic`].
#[derive(Debug)]
pub struct RouteMatch<'a, H> {
	route: &'a Route<H>,
	params: RouteParams,
}

impl<'a, H> RouteMatch<'a, H> {
	pub fn handler(&self) -> &'a H {
		&self.route.handler
	}

	pub fn template(&self) -> &'a RouteTemplate {
		&self.route.template
	}

	pub fn params(&self) -> &RouteParams {
		&self.params
	}

	pub fn into_params(self) -> RouteParams {
		self.params
	}
}

/// Ordered set of routes plus the deduplicated broker filters they need.
///
/// Routes are tried in registration order and the first structural match
/// wins, so `a/{x}/c` registered before `a/b/{y}` always takes `a/b/c`.
#[derive(Debug, Clone)]
pub struct RouteTable<H> {
	routes: Vec<Route<H>>,
	subscription_filters: Vec<ArcStr>,
	known_filters: HashSet<ArcStr>,
}

impl<H> Default for RouteTable<H> {
	fn default() -> Self {
		Self::new()
	}
}

impl<H> RouteTable<H> {
	pub fn new() -> Self {
		Self {
			routes: Vec::new(),
			subscription_filters: Vec::new(),
			known_filters: HashSet::new(),
		}
	}

	/// Compiles `template` and appends it with `handler`.
	///
	/// Returns `true` when the route introduced a filter not seen before.
	/// On error nothing is added.
	pub fn add_route(
		&mut self,
		template: impl TryInto<RouteTemplate, Error: Into<RouteTemplateError>>,
		handler: H,
	) -> Result<bool, RouteTemplateError> {
		let template = template.try_into().map_err(Into::into)?;
		let filter = template.subscription_filter();

		let fresh_filter = self.known_filters.insert(filter.clone());
		if fresh_filter {
			self.subscription_filters.push(filter);
		}

		trace!(
			template = %template,
			filter = %template.subscription_filter(),
			fresh_filter,
			"Route registered"
		);
		self.routes.push(Route { template, handler });
		Ok(fresh_filter)
	}

	/// Finds the first route matching `topic`.
	///
	/// `None` means no handler for this topic; it is not an error.
	pub fn match_topic<'a>(
		&'a self,
		topic: impl Into<TopicPath>,
	) -> Option<RouteMatch<'a, H>> {
		let topic = topic.into();
		self.match_path(&topic)
	}

	/// Same as [`match_topic`](Self::match_topic) for an already split path.
	pub fn match_path<'a>(
		&'a self,
		topic: &TopicPath,
	) -> Option<RouteMatch<'a, H>> {
		self.routes.iter().find_map(|route| {
			match route.template.try_match(topic) {
				| Ok(params) => Some(RouteMatch { route, params }),
				| Err(reason) => {
					trace!(
						topic = %topic,
						template = %route.template,
						%reason,
						"Route skipped"
					);
					None
				}
			}
		})
	}

	/// Deduplicated filters, in first-registration order.
	pub fn subscription_filters(&self) -> &[ArcStr] {
		&self.subscription_filters
	}

	pub fn routes(&self) -> impl Iterator<Item = &Route<H>> {
		self.routes.iter()
	}

	pub fn len(&self) -> usize {
		self.routes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.routes.is_empty()
	}
}
