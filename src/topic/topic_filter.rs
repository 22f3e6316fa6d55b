//! MQTT topic filters and the filter/topic match decision

use std::fmt;
use std::hash::{Hash, Hasher};

use arcstr::{ArcStr, Substr};
use thiserror::Error;

use super::limits::{MAX_TOPIC_LENGTH, SHARE_PREFIX};
use super::topic_name::TopicName;

/// Error types for topic filter parsing
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TopicFilterError {
	/// Empty filter is not valid
	#[error("Topic filter cannot be empty")]
	Empty,

	/// Filter exceeds the MQTT string length limit
	#[error("Topic filter is too long: {length} > {max}")]
	TooLong {
		/// Actual length in bytes
		length: usize,
		/// Maximum allowed length in bytes
		max: usize,
	},

	/// Hash wildcard (#) used not at the end of the filter
	#[error(
		"Invalid topic filter '{filter}': # wildcard can only be the last \
		 segment"
	)]
	HashPosition {
		/// The invalid filter
		filter: String,
	},

	/// Wildcard characters (+ or #) mixed with other characters in a segment
	#[error("Invalid wildcard usage in segment '{segment}'")]
	WildcardUsage {
		/// The offending segment
		segment: String,
	},

	/// Null character inside the filter
	#[error("Topic filter contains a null character")]
	NullCharacter,

	/// Malformed `$share/{group}/{filter}` filter
	#[error("Invalid shared subscription filter '{filter}'")]
	InvalidShare {
		/// The invalid filter
		filter: String,
	},
}

impl TopicFilterError {
	/// Creates a new HashPosition error
	pub fn hash_position(filter: impl Into<String>) -> Self {
		Self::HashPosition {
			filter: filter.into(),
		}
	}

	/// Creates a new WildcardUsage error
	pub fn wildcard_usage(segment: impl Into<String>) -> Self {
		Self::WildcardUsage {
			segment: segment.into(),
		}
	}

	/// Creates a new InvalidShare error
	pub fn invalid_share(filter: impl Into<String>) -> Self {
		Self::InvalidShare {
			filter: filter.into(),
		}
	}
}

/// One level of a topic filter: literal string or wildcard
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FilterSegment {
	/// Literal segment, matched by equality (may be empty)
	Literal(Substr),
	/// Single-level wildcard `+`
	SingleLevel,
	/// Multi-level wildcard `#`
	MultiLevel,
}

impl FilterSegment {
	pub fn as_str(&self) -> &str {
		match self {
			| FilterSegment::Literal(s) => s,
			| FilterSegment::SingleLevel => "+",
			| FilterSegment::MultiLevel => "#",
		}
	}

	pub fn is_wildcard(&self) -> bool {
		!matches!(self, FilterSegment::Literal(_))
	}

	fn parse(segment: Substr) -> Result<Self, TopicFilterError> {
		let res = match segment.as_str() {
			| "+" => FilterSegment::SingleLevel,
			| "#" => FilterSegment::MultiLevel,
			| s if s.contains(['+', '#']) => {
				return Err(TopicFilterError::wildcard_usage(s));
			}
			| _ => FilterSegment::Literal(segment),
		};
		Ok(res)
	}
}

impl fmt::Display for FilterSegment {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.as_str())
	}
}

/// Parsed MQTT topic filter.
///
/// Shared subscription filters (`$share/{group}/{filter}`) keep their full
/// text for identity but match topics through the inner filter. Two filters
/// are equal when their full text is equal.
#[derive(Clone)]
pub struct TopicFilter {
	filter: ArcStr,
	share_group: Option<Substr>,
	segments: Vec<FilterSegment>,
}

impl TopicFilter {
	/// Parses and validates a topic filter.
	pub fn new(filter: impl Into<ArcStr>) -> Result<Self, TopicFilterError> {
		let filter = filter.into();
		if filter.is_empty() {
			return Err(TopicFilterError::Empty);
		}
		if filter.len() > MAX_TOPIC_LENGTH {
			return Err(TopicFilterError::TooLong {
				length: filter.len(),
				max: MAX_TOPIC_LENGTH,
			});
		}
		if filter.contains('\0') {
			return Err(TopicFilterError::NullCharacter);
		}

		let (share_group, effective) = match filter.strip_prefix(SHARE_PREFIX)
		{
			| Some(rest) => {
				let (group, inner) = rest.split_once('/').ok_or_else(|| {
					TopicFilterError::invalid_share(filter.as_str())
				})?;
				if group.is_empty()
					|| group.contains(['+', '#'])
					|| inner.is_empty()
				{
					return Err(TopicFilterError::invalid_share(
						filter.as_str(),
					));
				}
				(Some(filter.substr_from(group)), filter.substr_from(inner))
			}
			| None => (None, filter.substr(..)),
		};

		let segments = effective
			.split('/')
			.map(|s| effective.substr_from(s))
			.map(FilterSegment::parse)
			.collect::<Result<Vec<_>, _>>()?;

		if let Some(hash_pos) = segments
			.iter()
			.position(|s| matches!(s, FilterSegment::MultiLevel))
		{
			if hash_pos != segments.len() - 1 {
				return Err(TopicFilterError::hash_position(filter.as_str()));
			}
		}

		Ok(Self {
			filter,
			share_group,
			segments,
		})
	}

	/// Full filter text, including any `$share/{group}/` prefix.
	pub fn as_str(&self) -> &str {
		&self.filter
	}

	pub fn as_arcstr(&self) -> &ArcStr {
		&self.filter
	}

	/// Segments of the filter that are matched against topics.
	pub fn segments(&self) -> &[FilterSegment] {
		&self.segments
	}

	pub fn share_group(&self) -> Option<&str> {
		self.share_group.as_deref()
	}

	pub fn is_shared(&self) -> bool {
		self.share_group.is_some()
	}

	pub fn has_wildcards(&self) -> bool {
		self.segments.iter().any(FilterSegment::is_wildcard)
	}

	/// Decides whether `topic` is matched by this filter.
	///
	/// A wildcard in the first position never matches a topic starting
	/// with `$`.
	pub fn matches(&self, topic: &TopicName) -> bool {
		if topic.is_system()
			&& self.segments.first().is_some_and(FilterSegment::is_wildcard)
		{
			return false;
		}
		segments_match(&self.segments, topic.segments())
	}
}

fn segments_match(filter: &[FilterSegment], topic: &[Substr]) -> bool {
	let mut topic = topic.iter();
	for (position, segment) in filter.iter().enumerate() {
		match segment {
			// '#' anywhere but last is rejected at parse time
			| FilterSegment::MultiLevel => return position + 1 == filter.len(),
			| FilterSegment::SingleLevel => {
				if topic.next().is_none() {
					return false;
				}
			}
			| FilterSegment::Literal(expected) => {
				if topic.next() != Some(expected) {
					return false;
				}
			}
		}
	}
	topic.next().is_none()
}

/// Matches raw strings without requiring pre-validated input.
///
/// Malformed filters or topics are a non-match rather than an error.
///
/// ```rust
/// use mqtt_publish_router::topic::matches;
///
/// assert!(matches("sport/+/player", "sport/tennis/player"));
/// assert!(matches("sport/#", "sport"));
/// assert!(!matches("+", "$SYS/uptime"));
/// assert!(!matches("sport/#/player", "sport/tennis/player"));
/// ```
pub fn matches(filter: &str, topic: &str) -> bool {
	let Ok(filter) = TopicFilter::new(filter) else {
		return false;
	};
	let Ok(topic) = TopicName::new(topic) else {
		return false;
	};
	filter.matches(&topic)
}

impl PartialEq for TopicFilter {
	fn eq(&self, other: &Self) -> bool {
		self.filter == other.filter
	}
}

impl Eq for TopicFilter {}

impl Hash for TopicFilter {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.filter.hash(state);
	}
}

impl PartialOrd for TopicFilter {
	fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
		Some(self.cmp(other))
	}
}

impl Ord for TopicFilter {
	fn cmp(&self, other: &Self) -> std::cmp::Ordering {
		self.filter.cmp(&other.filter)
	}
}

impl TryFrom<&str> for TopicFilter {
	type Error = TopicFilterError;

	fn try_from(value: &str) -> Result<Self, Self::Error> {
		Self::new(value)
	}
}

impl TryFrom<String> for TopicFilter {
	type Error = TopicFilterError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		Self::new(value)
	}
}

impl fmt::Display for TopicFilter {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.filter)
	}
}

impl fmt::Debug for TopicFilter {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "TopicFilter({:?})", self.filter.as_str())
	}
}
