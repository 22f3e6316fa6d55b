//! UNSUBSCRIBE request and UNSUBACK acknowledgment

use crate::topic::{TopicFilter, TopicFilterError};

/// UNSUBSCRIBE request; UNSUBACK reason codes are aligned with its filters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnsubscribeRequest {
	filters: Vec<TopicFilter>,
}

impl UnsubscribeRequest {
	pub fn new(filters: Vec<TopicFilter>) -> Self {
		Self { filters }
	}

	pub fn single(filter: TopicFilter) -> Self {
		Self::new(vec![filter])
	}

	pub fn add(mut self, filter: TopicFilter) -> Self {
		self.filters.push(filter);
		self
	}

	pub fn filters(&self) -> &[TopicFilter] {
		&self.filters
	}

	pub fn len(&self) -> usize {
		self.filters.len()
	}

	pub fn is_empty(&self) -> bool {
		self.filters.is_empty()
	}
}

impl TryFrom<&rumqttc::Unsubscribe> for UnsubscribeRequest {
	type Error = TopicFilterError;

	fn try_from(
		unsubscribe: &rumqttc::Unsubscribe,
	) -> Result<Self, Self::Error> {
		unsubscribe
			.topics
			.iter()
			.map(|topic| TopicFilter::new(topic.as_str()))
			.collect::<Result<Vec<_>, _>>()
			.map(Self::new)
	}
}

/// UNSUBACK reason codes (MQTT 5.0, section 3.11.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum UnsubAckReasonCode {
	Success = 0x00,
	NoSubscriptionsExisted = 0x11,
	UnspecifiedError = 0x80,
	ImplementationSpecificError = 0x83,
	NotAuthorized = 0x87,
	TopicFilterInvalid = 0x8F,
	PacketIdentifierInUse = 0x91,
}

impl UnsubAckReasonCode {
	pub fn code(self) -> u8 {
		self as u8
	}

	pub fn is_error(self) -> bool {
		self.code() >= 0x80
	}

	pub fn from_code(code: u8) -> Option<Self> {
		let reason = match code {
			| 0x00 => Self::Success,
			| 0x11 => Self::NoSubscriptionsExisted,
			| 0x80 => Self::UnspecifiedError,
			| 0x83 => Self::ImplementationSpecificError,
			| 0x87 => Self::NotAuthorized,
			| 0x8F => Self::TopicFilterInvalid,
			| 0x91 => Self::PacketIdentifierInUse,
			| _ => return None,
		};
		Some(reason)
	}
}

/// UNSUBACK acknowledgment.
///
/// MQTT 3.1.1 UNSUBACK packets carry no reason codes; they are represented
/// by [`UnsubAck::AllSuccess`], which applies to every requested filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnsubAck {
	/// One reason code per requested filter (MQTT 5.0)
	ReasonCodes(Vec<UnsubAckReasonCode>),
	/// Every filter was unsubscribed (MQTT 3.1.1)
	AllSuccess,
}

impl UnsubAck {
	/// Whether the entry at `index` of the request was unsubscribed.
	///
	/// Positions without a reason code count as not applied.
	pub fn is_success(&self, index: usize) -> bool {
		match self {
			| UnsubAck::AllSuccess => true,
			| UnsubAck::ReasonCodes(codes) => {
				codes.get(index).is_some_and(|code| !code.is_error())
			}
		}
	}

	pub fn reason_codes(&self) -> Option<&[UnsubAckReasonCode]> {
		match self {
			| UnsubAck::ReasonCodes(codes) => Some(codes),
			| UnsubAck::AllSuccess => None,
		}
	}
}

impl From<&rumqttc::UnsubAck> for UnsubAck {
	fn from(_: &rumqttc::UnsubAck) -> Self {
		UnsubAck::AllSuccess
	}
}
