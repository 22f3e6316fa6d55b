//! # MQTT Publish Router
//!
//! Routing core for inbound MQTT PUBLISH packets: decides which listeners
//! receive a publish, and in which order.
//!
//! ## Features
//!
//! - **Topic Filters**: Validation and matching of MQTT filters (`+`, `#`,
//!   `$share/{group}/...`) with the `$`-topic exclusion rule
//! - **Indexed Lookup**: Segment-keyed trie, lookup cost follows the matching
//!   paths instead of the number of filters
//! - **Subscription Flows**: Listeners registered per filter, applied from
//!   SUBSCRIBE/SUBACK and UNSUBSCRIBE/UNSUBACK pairs
//! - **Global Listeners**: `ALL_SUBSCRIPTIONS`, `ALL_PUBLISHES` and
//!   `REMAINING_PUBLISHES` categories
//! - **O(1) Cancellation**: Handle based lists with idempotent removal
//! - **Async Dispatcher**: Optional `tokio` task that owns the router and
//!   delivers publishes to channel based listeners
//!
//! ## Quick Start
//!
//! ```rust
//! use mqtt_publish_router::prelude::*;
//!
//! let mut router = IncomingPublishFlows::new();
//! let request = SubscribeRequest::single(TopicFilter::new("sport/+/player")?, QoS::AtLeastOnce);
//! let ack = SubAck::new(vec![SubAckReasonCode::GrantedQos1]);
//! let flow = router.subscribe(&request, &ack, Some("scores")).expect("subscription applied");
//! router.register_global(GlobalPublishFilter::AllPublishes, "audit");
//!
//! let targets: Vec<_> = router
//! 	.route(&TopicName::new("sport/tennis/player")?)
//! 	.iter()
//! 	.map(|f| *f.listener)
//! 	.collect();
//! assert_eq!(targets, ["scores", "audit"]);
//!
//! router.cancel(flow);
//! # Ok::<(), mqtt_publish_router::Error>(())
//! ```
//!
//! ## Routing Order
//!
//! 1. Listeners of every subscription filter matching the topic
//! 2. `ALL_SUBSCRIPTIONS` listeners, when a filter matched
//! 3. `ALL_PUBLISHES` listeners
//! 4. `REMAINING_PUBLISHES` listeners, only when nothing else was selected

pub mod config;
pub mod handle_list;
pub mod message;
pub mod routing;
pub mod topic;

use thiserror::Error;

// === Core Public API ===
pub use handle_list::{Handle, HandleList};
pub use routing::{
	FlowId, FlowKind, GlobalPublishFilter, IncomingPublishFlows, RoutedFlow,
	SubscriptionFlows,
};
pub use topic::{TopicFilter, TopicName};

// Dispatcher
pub use config::DispatcherSettings;
pub use routing::{
	DispatcherController, DispatcherHandler, PublishDispatcher, PublishListener,
};

// Essential external types
pub use rumqttc::QoS;

/// Errors raised anywhere in the crate.
///
/// Routing itself never fails; errors come from parsing topics, configuring
/// messages and talking to the dispatcher.
#[derive(Error, Debug)]
pub enum Error {
	#[error(transparent)]
	Topic(#[from] topic::TopicError),
	#[error(transparent)]
	Disconnect(#[from] message::DisconnectError),
	#[error(transparent)]
	Dispatch(#[from] routing::DispatchError),
	#[error(transparent)]
	Config(#[from] config::ConfigError),
}

impl From<topic::TopicNameError> for Error {
	fn from(err: topic::TopicNameError) -> Self {
		Error::Topic(err.into())
	}
}

impl From<topic::TopicFilterError> for Error {
	fn from(err: topic::TopicFilterError) -> Self {
		Error::Topic(err.into())
	}
}

/// Result type alias for operations that may fail with [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Prelude module for convenient imports
///
/// ```rust
/// use mqtt_publish_router::prelude::*;
/// ```
pub mod prelude {
	//! Essential types for routing inbound publishes

	pub use crate::message::{
		IncomingPublish, SubAck, SubAckReasonCode, SubscribeRequest, UnsubAck,
		UnsubAckReasonCode, UnsubscribeRequest,
	};
	pub use crate::{
		DispatcherHandler, DispatcherSettings, Error, FlowId, FlowKind,
		GlobalPublishFilter, IncomingPublishFlows, PublishDispatcher,
		PublishListener, QoS, Result, TopicFilter, TopicName,
	};
}

/// Error types used throughout the library
///
/// ```rust
/// use mqtt_publish_router::errors::*;
/// ```
pub mod errors {
	//! All error types used in the library

	pub use crate::Error;
	pub use crate::config::ConfigError;
	pub use crate::message::DisconnectError;
	pub use crate::routing::DispatchError;
	pub use crate::topic::{TopicError, TopicFilterError, TopicNameError};
}
