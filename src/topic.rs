//! Topic handling module
//!
//! Concrete topic names, topic filters with MQTT wildcards, and the
//! segment-keyed trie used to find every filter matching a topic.

// Submodules
pub mod error;
pub mod topic_filter;
pub mod topic_matcher;
pub mod topic_name;

#[cfg(test)]
mod topic_filter_tests;

// Re-export commonly used types for convenience
pub use error::{limits, TopicError, TopicResult};
pub use topic_filter::{matches, FilterSegment, TopicFilter, TopicFilterError};
pub use topic_matcher::{Len, TopicMatcherNode};
pub use topic_name::{TopicName, TopicNameError};
