use std::fmt;

use arcstr::{ArcStr, Substr};
use thiserror::Error;

use super::limits::MAX_TOPIC_LENGTH;

/// Errors that can occur while parsing a concrete topic name
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TopicNameError {
	/// Topic name is empty
	#[error("Topic name cannot be empty")]
	Empty,

	/// Topic name exceeds the MQTT string length limit
	#[error("Topic name is too long: {length} > {max}")]
	TooLong {
		/// Actual length in bytes
		length: usize,
		/// Maximum allowed length in bytes
		max: usize,
	},

	/// Topic name contains a wildcard or a null character
	#[error("Topic name '{topic}' contains illegal character {character:?}")]
	IllegalCharacter {
		/// The offending topic
		topic: String,
		/// The character that is not allowed
		character: char,
	},
}

/// A concrete, wildcard-free topic as received with a PUBLISH.
///
/// Segments are split on `/`; empty segments are kept, so `"a//b"` has three
/// segments and `"/a"` starts with an empty one.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct TopicName {
	path: ArcStr,
	segments: Vec<Substr>,
}

impl TopicName {
	/// Parses and validates a topic name.
	pub fn new(path: impl Into<ArcStr>) -> Result<Self, TopicNameError> {
		let path = path.into();
		if path.is_empty() {
			return Err(TopicNameError::Empty);
		}
		if path.len() > MAX_TOPIC_LENGTH {
			return Err(TopicNameError::TooLong {
				length: path.len(),
				max: MAX_TOPIC_LENGTH,
			});
		}
		if let Some(character) =
			path.chars().find(|c| matches!(c, '+' | '#' | '\0'))
		{
			return Err(TopicNameError::IllegalCharacter {
				topic: path.to_string(),
				character,
			});
		}
		Ok(Self::new_unchecked(path))
	}

	/// Splits `path` into segments without validating it.
	pub(crate) fn new_unchecked(path: ArcStr) -> Self {
		let segments: Vec<Substr> =
			path.split('/').map(|s| path.substr_from(s)).collect();
		Self { path, segments }
	}

	pub fn as_str(&self) -> &str {
		&self.path
	}

	pub fn path(&self) -> ArcStr {
		self.path.clone()
	}

	pub fn segments(&self) -> &[Substr] {
		&self.segments
	}

	/// True for topics reserved for server use, such as `$SYS/...`.
	pub fn is_system(&self) -> bool {
		self.path.starts_with('$')
	}
}

impl TryFrom<&str> for TopicName {
	type Error = TopicNameError;

	fn try_from(value: &str) -> Result<Self, Self::Error> {
		Self::new(value)
	}
}

impl TryFrom<String> for TopicName {
	type Error = TopicNameError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		Self::new(value)
	}
}

impl fmt::Display for TopicName {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.path)
	}
}

impl fmt::Debug for TopicName {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "TopicName({:?})", self.path.as_str())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_empty_segments_are_preserved() {
		let topic = TopicName::new("a//b").unwrap();
		let segments: Vec<&str> =
			topic.segments().iter().map(Substr::as_str).collect();
		assert_eq!(segments, vec!["a", "", "b"]);

		let topic = TopicName::new("/a/").unwrap();
		assert_eq!(topic.segments().len(), 3);
	}

	#[test]
	fn test_rejects_wildcards_and_empty() {
		assert_eq!(TopicName::new(""), Err(TopicNameError::Empty));
		assert!(matches!(
			TopicName::new("a/+/b"),
			Err(TopicNameError::IllegalCharacter { character: '+', .. })
		));
		assert!(matches!(
			TopicName::new("a/#"),
			Err(TopicNameError::IllegalCharacter { character: '#', .. })
		));
		assert!(TopicName::new("a\0b").is_err());
	}

	#[test]
	fn test_rejects_too_long() {
		let long = "a".repeat(MAX_TOPIC_LENGTH + 1);
		assert!(matches!(
			TopicName::new(long),
			Err(TopicNameError::TooLong { .. })
		));
	}

	#[test]
	fn test_system_topic() {
		assert!(TopicName::new("$SYS/uptime").unwrap().is_system());
		assert!(!TopicName::new("sys/$uptime").unwrap().is_system());
	}
}
