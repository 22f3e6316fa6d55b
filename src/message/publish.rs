//! Inbound PUBLISH as seen by the router

use bytes::Bytes;
use rumqttc::QoS;

use crate::topic::{TopicName, TopicNameError};

/// Inbound PUBLISH.
///
/// Only `topic` is interpreted by routing; the rest is carried through to
/// listeners untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingPublish {
	pub topic: TopicName,
	pub payload: Bytes,
	pub qos: QoS,
	pub retain: bool,
}

impl IncomingPublish {
	pub fn new(topic: TopicName, payload: impl Into<Bytes>) -> Self {
		Self {
			topic,
			payload: payload.into(),
			qos: QoS::AtMostOnce,
			retain: false,
		}
	}

	pub fn qos(mut self, qos: QoS) -> Self {
		self.qos = qos;
		self
	}

	pub fn retain(mut self, retain: bool) -> Self {
		self.retain = retain;
		self
	}
}

impl TryFrom<rumqttc::Publish> for IncomingPublish {
	type Error = TopicNameError;

	fn try_from(publish: rumqttc::Publish) -> Result<Self, Self::Error> {
		Ok(Self {
			topic: TopicName::new(publish.topic)?,
			payload: publish.payload,
			qos: publish.qos,
			retain: publish.retain,
		})
	}
}
