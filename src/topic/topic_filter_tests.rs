//! Tests for TopicFilter parsing and the match decision

use proptest::prelude::*;

use super::{matches, FilterSegment, TopicFilter, TopicFilterError, TopicName};

fn filter(s: &str) -> TopicFilter {
	TopicFilter::new(s).expect("Filter should be valid")
}

fn topic(s: &str) -> TopicName {
	TopicName::new(s).expect("Topic should be valid")
}

mod parsing {
	use super::*;

	#[test]
	fn test_literal_and_wildcard_segments() {
		let f = filter("sport/+/player/#");
		assert_eq!(
			f.segments(),
			&[
				FilterSegment::Literal("sport".into()),
				FilterSegment::SingleLevel,
				FilterSegment::Literal("player".into()),
				FilterSegment::MultiLevel,
			]
		);
		assert!(f.has_wildcards());
		assert!(!f.is_shared());
	}

	#[test]
	fn test_hash_must_be_last() {
		assert_eq!(
			TopicFilter::new("sport/#/player"),
			Err(TopicFilterError::hash_position("sport/#/player"))
		);
	}

	#[test]
	fn test_wildcard_must_fill_segment() {
		assert_eq!(
			TopicFilter::new("sport+/player"),
			Err(TopicFilterError::wildcard_usage("sport+"))
		);
		assert_eq!(
			TopicFilter::new("sport/ten#"),
			Err(TopicFilterError::wildcard_usage("ten#"))
		);
	}

	#[test]
	fn test_empty_and_null() {
		assert_eq!(TopicFilter::new(""), Err(TopicFilterError::Empty));
		assert_eq!(
			TopicFilter::new("a/\0"),
			Err(TopicFilterError::NullCharacter)
		);
	}

	#[test]
	fn test_shared_subscription() {
		let f = filter("$share/group1/sport/+");
		assert!(f.is_shared());
		assert_eq!(f.share_group(), Some("group1"));
		assert_eq!(f.as_str(), "$share/group1/sport/+");
		assert_eq!(f.segments().len(), 2);
	}

	#[test]
	fn test_invalid_shared_subscription() {
		for invalid in ["$share/group", "$share//a", "$share/g+/a", "$share/g/"]
		{
			assert!(
				matches!(
					TopicFilter::new(invalid),
					Err(TopicFilterError::InvalidShare { .. })
				),
				"'{invalid}' should be rejected"
			);
		}
	}

	#[test]
	fn test_equality_uses_full_text() {
		assert_eq!(filter("a/b"), filter("a/b"));
		assert_ne!(filter("a/b"), filter("$share/g/a/b"));
	}
}

mod matching {
	use super::*;

	#[test]
	fn test_single_level_wildcard() {
		assert!(matches("sport/+/player", "sport/tennis/player"));
		assert!(!matches("sport/+/player", "sport/tennis/open/player"));
		assert!(matches("sport/+", "sport/"));
		assert!(!matches("sport/+", "sport"));
		assert!(matches("+/+", "/finance"));
	}

	#[test]
	fn test_multi_level_wildcard() {
		assert!(matches("sport/#", "sport/tennis/player"));
		assert!(matches("sport/#", "sport"));
		assert!(matches("sport/tennis/#", "sport/tennis"));
		assert!(matches("#", "sport/tennis/player"));
		assert!(!matches("sport/tennis/#", "sport"));
	}

	#[test]
	fn test_dollar_topics_are_not_matched_by_leading_wildcards() {
		assert!(!matches("+", "$SYS/uptime"));
		assert!(!matches("#", "$SYS/uptime"));
		assert!(!matches("+/uptime", "$SYS/uptime"));
		assert!(matches("$SYS/#", "$SYS/uptime"));
		assert!(matches("$SYS/+", "$SYS/uptime"));
	}

	#[test]
	fn test_empty_segments_are_literal() {
		assert!(matches("a//b", "a//b"));
		assert!(!matches("a/b", "a//b"));
		assert!(matches("a/+/b", "a//b"));
	}

	#[test]
	fn test_shared_filter_matches_inner_filter() {
		let f = filter("$share/g/sport/#");
		assert!(f.matches(&topic("sport/tennis")));
		assert!(!f.matches(&topic("news/tennis")));

		let f = filter("$share/g/+");
		assert!(!f.matches(&topic("$SYS")));
	}

	#[test]
	fn test_malformed_input_is_non_match() {
		assert!(!matches("sport/#/player", "sport/tennis/player"));
		assert!(!matches("sport/+", "sport/+"));
		assert!(!matches("", "sport"));
		assert!(!matches("sport", ""));
	}

	#[test]
	fn test_segment_count_mismatch_is_non_match() {
		assert!(!matches("a/b/c", "a/b"));
		assert!(!matches("a/b", "a/b/c"));
	}
}

fn literal_segment() -> impl Strategy<Value = String> {
	"[a-z0-9 ]{0,6}"
}

fn topic_string() -> impl Strategy<Value = String> {
	prop::collection::vec(literal_segment(), 1 .. 6)
		.prop_map(|segments| segments.join("/"))
		.prop_filter("topic cannot be empty", |t| !t.is_empty())
}

mod deep_paths {
	use super::*;
	use crate::topic::limits::MAX_TOPIC_LENGTH;

	/// `levels` segments of `segment`, joined by `/`.
	fn deep(segment: &str, levels: usize) -> String {
		vec![segment; levels].join("/")
	}

	#[test]
	fn test_longest_valid_paths_are_accepted() {
		// single character levels fill the length limit exactly
		let path = deep("a", MAX_TOPIC_LENGTH / 2 + 1);
		assert_eq!(path.len(), MAX_TOPIC_LENGTH);
		assert!(TopicName::new(path.as_str()).is_ok());
		assert_eq!(filter(&path).segments().len(), MAX_TOPIC_LENGTH / 2 + 1);
	}

	#[test]
	fn test_deepest_paths_match_without_overflow() {
		let levels = MAX_TOPIC_LENGTH / 2 + 1;
		let path = deep("a", levels);

		assert!(matches(&path, &path));
		assert!(matches(&deep("+", levels), &path));
		assert!(matches(&format!("{}/#", deep("a", levels - 1)), &path));
		assert!(!matches(&deep("+", levels - 1), &path));
		assert!(!matches(&format!("{}/b", deep("a", levels - 1)), &path));
	}
}

proptest! {
	#[test]
	fn prop_literal_filter_matches_only_equal_topic(
		f in topic_string(),
		t in topic_string()
	) {
		prop_assert_eq!(matches(&f, &t), f == t);
	}

	#[test]
	fn prop_topic_matches_itself_and_hash(t in topic_string()) {
		prop_assert!(matches(&t, &t));
		prop_assert!(matches("#", &t));
		let parent_hash = format!("{t}/#");
		prop_assert!(matches(&parent_hash, &t));
	}

	#[test]
	fn prop_plus_replaces_any_single_segment(
		segments in prop::collection::vec(literal_segment(), 1 .. 6),
		index in any::<prop::sample::Index>()
	) {
		let topic = segments.join("/");
		prop_assume!(!topic.is_empty());
		let mut pattern = segments.clone();
		pattern[index.index(segments.len())] = "+".to_string();
		prop_assert!(matches(&pattern.join("/"), &topic));
	}
}
