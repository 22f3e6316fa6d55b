//! SUBSCRIBE request and SUBACK acknowledgment

use rumqttc::QoS;

use crate::topic::{TopicFilter, TopicFilterError};

/// One entry of a SUBSCRIBE request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
	/// Filter to subscribe to.
	pub filter: TopicFilter,
	/// Maximum QoS requested for this filter.
	pub qos: QoS,
}

impl Subscription {
	pub fn new(filter: TopicFilter, qos: QoS) -> Self {
		Self { filter, qos }
	}
}

/// SUBSCRIBE request as sent to the broker.
///
/// The order of subscriptions is significant: SUBACK reason codes are
/// aligned with it by position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscribeRequest {
	subscriptions: Vec<Subscription>,
}

impl SubscribeRequest {
	pub fn new(subscriptions: Vec<Subscription>) -> Self {
		Self { subscriptions }
	}

	/// Request for a single filter.
	pub fn single(filter: TopicFilter, qos: QoS) -> Self {
		Self::new(vec![Subscription::new(filter, qos)])
	}

	/// Appends a subscription, keeping request order.
	pub fn add(mut self, filter: TopicFilter, qos: QoS) -> Self {
		self.subscriptions.push(Subscription::new(filter, qos));
		self
	}

	pub fn subscriptions(&self) -> &[Subscription] {
		&self.subscriptions
	}

	pub fn len(&self) -> usize {
		self.subscriptions.len()
	}

	pub fn is_empty(&self) -> bool {
		self.subscriptions.is_empty()
	}
}

impl TryFrom<&rumqttc::Subscribe> for SubscribeRequest {
	type Error = TopicFilterError;

	fn try_from(subscribe: &rumqttc::Subscribe) -> Result<Self, Self::Error> {
		subscribe
			.filters
			.iter()
			.map(|f| {
				TopicFilter::new(f.path.as_str())
					.map(|filter| Subscription::new(filter, f.qos))
			})
			.collect::<Result<Vec<_>, _>>()
			.map(Self::new)
	}
}

/// SUBACK reason codes (MQTT 5.0, section 3.9.3).
///
/// Codes of `0x80` and above are errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SubAckReasonCode {
	GrantedQos0 = 0x00,
	GrantedQos1 = 0x01,
	GrantedQos2 = 0x02,
	UnspecifiedError = 0x80,
	ImplementationSpecificError = 0x83,
	NotAuthorized = 0x87,
	TopicFilterInvalid = 0x8F,
	PacketIdentifierInUse = 0x91,
	QuotaExceeded = 0x97,
	SharedSubscriptionsNotSupported = 0x9E,
	SubscriptionIdentifiersNotSupported = 0xA1,
	WildcardSubscriptionsNotSupported = 0xA2,
}

impl SubAckReasonCode {
	pub fn code(self) -> u8 {
		self as u8
	}

	pub fn is_error(self) -> bool {
		self.code() >= 0x80
	}

	/// QoS granted by the broker, `None` for error codes.
	pub fn granted_qos(self) -> Option<QoS> {
		match self {
			| Self::GrantedQos0 => Some(QoS::AtMostOnce),
			| Self::GrantedQos1 => Some(QoS::AtLeastOnce),
			| Self::GrantedQos2 => Some(QoS::ExactlyOnce),
			| _ => None,
		}
	}

	pub fn from_code(code: u8) -> Option<Self> {
		let reason = match code {
			| 0x00 => Self::GrantedQos0,
			| 0x01 => Self::GrantedQos1,
			| 0x02 => Self::GrantedQos2,
			| 0x80 => Self::UnspecifiedError,
			| 0x83 => Self::ImplementationSpecificError,
			| 0x87 => Self::NotAuthorized,
			| 0x8F => Self::TopicFilterInvalid,
			| 0x91 => Self::PacketIdentifierInUse,
			| 0x97 => Self::QuotaExceeded,
			| 0x9E => Self::SharedSubscriptionsNotSupported,
			| 0xA1 => Self::SubscriptionIdentifiersNotSupported,
			| 0xA2 => Self::WildcardSubscriptionsNotSupported,
			| _ => return None,
		};
		Some(reason)
	}
}

impl From<QoS> for SubAckReasonCode {
	fn from(qos: QoS) -> Self {
		match qos {
			| QoS::AtMostOnce => Self::GrantedQos0,
			| QoS::AtLeastOnce => Self::GrantedQos1,
			| QoS::ExactlyOnce => Self::GrantedQos2,
		}
	}
}

impl From<rumqttc::SubscribeReasonCode> for SubAckReasonCode {
	fn from(code: rumqttc::SubscribeReasonCode) -> Self {
		match code {
			| rumqttc::SubscribeReasonCode::Success(qos) => qos.into(),
			// MQTT 3.1.1 only knows a single failure code (0x80)
			| rumqttc::SubscribeReasonCode::Failure => Self::UnspecifiedError,
		}
	}
}

/// SUBACK acknowledgment: one reason code per requested subscription.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubAck {
	reason_codes: Vec<SubAckReasonCode>,
}

impl SubAck {
	pub fn new(reason_codes: Vec<SubAckReasonCode>) -> Self {
		Self { reason_codes }
	}

	pub fn reason_codes(&self) -> &[SubAckReasonCode] {
		&self.reason_codes
	}
}

impl From<&rumqttc::SubAck> for SubAck {
	fn from(suback: &rumqttc::SubAck) -> Self {
		Self::new(suback.return_codes.iter().map(|c| (*c).into()).collect())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_error_classification() {
		assert!(!SubAckReasonCode::GrantedQos0.is_error());
		assert!(!SubAckReasonCode::GrantedQos2.is_error());
		assert!(SubAckReasonCode::UnspecifiedError.is_error());
		assert!(SubAckReasonCode::WildcardSubscriptionsNotSupported.is_error());
	}

	#[test]
	fn test_code_roundtrip_and_unknown() {
		assert_eq!(
			SubAckReasonCode::from_code(0x97),
			Some(SubAckReasonCode::QuotaExceeded)
		);
		assert_eq!(SubAckReasonCode::from_code(0x42), None);
	}

	#[test]
	fn test_from_rumqttc_suback() {
		let suback = rumqttc::SubAck::new(
			7,
			vec![
				rumqttc::SubscribeReasonCode::Success(QoS::AtLeastOnce),
				rumqttc::SubscribeReasonCode::Failure,
			],
		);
		let ack = SubAck::from(&suback);
		assert_eq!(
			ack.reason_codes(),
			&[
				SubAckReasonCode::GrantedQos1,
				SubAckReasonCode::UnspecifiedError
			]
		);
		assert_eq!(ack.reason_codes()[0].granted_qos(), Some(QoS::AtLeastOnce));
	}

	#[test]
	fn test_from_rumqttc_subscribe() {
		let mut subscribe =
			rumqttc::Subscribe::new("sensors/+", QoS::AtMostOnce);
		subscribe.add("alerts/#".to_string(), QoS::ExactlyOnce);

		let request = SubscribeRequest::try_from(&subscribe).unwrap();
		assert_eq!(request.len(), 2);
		assert_eq!(request.subscriptions()[1].filter.as_str(), "alerts/#");
		assert_eq!(request.subscriptions()[1].qos, QoS::ExactlyOnce);

		let invalid = rumqttc::Subscribe::new("a/#/b", QoS::AtMostOnce);
		assert!(SubscribeRequest::try_from(&invalid).is_err());
	}
}
