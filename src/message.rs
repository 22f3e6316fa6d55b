//! Protocol message value objects consumed or produced around the router
//!
//! These types carry exactly what routing needs from SUBSCRIBE, SUBACK,
//! UNSUBSCRIBE, UNSUBACK and PUBLISH packets, plus the DISCONNECT
//! configuration used by the session layer. Wire encoding is left to
//! `rumqttc`; conversions from its packet types are provided.

pub mod disconnect;
pub mod publish;
pub mod subscribe;
pub mod unsubscribe;

pub use disconnect::{
	Disconnect, DisconnectConfig, DisconnectError, DisconnectReasonCode,
	SessionExpiry,
};
pub use publish::IncomingPublish;
pub use subscribe::{SubAck, SubAckReasonCode, SubscribeRequest, Subscription};
pub use unsubscribe::{UnsubAck, UnsubAckReasonCode, UnsubscribeRequest};
