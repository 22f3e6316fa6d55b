//! Error types and constants for the topic module
//!
//! Individual error types live next to the type they validate; this module
//! aggregates them into a single [`TopicError`].

use thiserror::Error;

use super::topic_filter::TopicFilterError;
use super::topic_name::TopicNameError;

/// Comprehensive error type for all topic-related operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TopicError {
	/// Topic name parsing or validation error
	#[error("Topic name error: {0}")]
	Name(#[from] TopicNameError),

	/// Topic filter parsing or validation error
	#[error("Topic filter error: {0}")]
	Filter(#[from] TopicFilterError),
}

/// Convenient Result type for topic operations
pub type TopicResult<T> = Result<T, TopicError>;

/// Topic processing limits and constants
pub mod limits {
	/// Maximum encoded length of a topic name or filter (UTF-8 string limit)
	pub const MAX_TOPIC_LENGTH: usize = 65_535;

	/// Topic level separator
	pub const LEVEL_SEPARATOR: char = '/';

	/// Single-level wildcard
	pub const SINGLE_LEVEL_WILDCARD: char = '+';

	/// Multi-level wildcard
	pub const MULTI_LEVEL_WILDCARD: char = '#';

	/// Prefix of shared subscription filters
	pub const SHARE_PREFIX: &str = "$share/";
}
