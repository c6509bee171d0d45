//! Topic handling module
//!
//! Compiles route templates into broker subscription filters, matches
//! inbound topics against them and extracts named parameters.

pub mod error;
pub mod route_segment;
pub mod route_table;
/// Route template compilation and matching
pub mod route_template;
pub mod topic_path;


// Re-export commonly used types for convenience
pub use error::{TemplateResult, TopicError, TopicResult};
pub use error::{limits, validation};
pub use route_segment::{RouteSegment, RouteTemplateError};
pub use route_table::{Route, RouteMatch, RouteTable};
pub use route_template::{RouteTemplate, TopicFormatError};
pub use topic_path::{RouteParams, TopicMatchError, TopicPath};
