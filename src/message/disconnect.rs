//! DISCONNECT message configuration
//!
//! A [`DisconnectConfig`] is filled in with chained setters and turned into
//! an immutable [`Disconnect`] by one of three terminal functions:
//!
//! - [`build`] returns the value on its own,
//! - [`apply_nested`] hands it to an enclosing configuration,
//! - [`send`] hands it to whatever transmits it.
//!
//! ```rust
//! use std::time::Duration;
//! use mqtt_publish_router::message::disconnect::{self, DisconnectConfig, DisconnectReasonCode};
//!
//! let config = DisconnectConfig::new()
//! 	.reason_code(DisconnectReasonCode::DisconnectWithWillMessage)
//! 	.session_expiry_interval(Duration::from_secs(600))?
//! 	.reason_string("maintenance")?;
//! let sent = disconnect::send(config, |message| message.reason_code());
//! assert_eq!(sent, DisconnectReasonCode::DisconnectWithWillMessage);
//! # Ok::<(), mqtt_publish_router::message::DisconnectError>(())
//! ```

use std::time::Duration;

use thiserror::Error;

use crate::topic::limits::MAX_TOPIC_LENGTH;

/// Errors raised while configuring a DISCONNECT
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DisconnectError {
	/// Session expiry interval does not fit the four byte wire field
	#[error(
		"Session expiry interval of {seconds}s exceeds the maximum of {max}s"
	)]
	SessionExpiryOutOfRange {
		/// Requested interval in seconds
		seconds: u64,
		/// Largest representable interval in seconds
		max: u64,
	},

	/// String property longer than an MQTT UTF-8 string can encode
	#[error("{field} is {len} bytes long, the maximum is {max}")]
	StringTooLong {
		field: &'static str,
		len: usize,
		max: usize,
	},

	/// String property containing the null character U+0000
	#[error("{field} must not contain the null character")]
	NullCharacter { field: &'static str },
}

/// Checks a DISCONNECT string property against the MQTT UTF-8 string rules.
fn checked_string(
	field: &'static str,
	value: impl Into<String>,
) -> Result<String, DisconnectError> {
	let value = value.into();
	if value.len() > MAX_TOPIC_LENGTH {
		return Err(DisconnectError::StringTooLong {
			field,
			len: value.len(),
			max: MAX_TOPIC_LENGTH,
		});
	}
	if value.contains('\0') {
		return Err(DisconnectError::NullCharacter { field });
	}
	Ok(value)
}

/// DISCONNECT reason codes (MQTT 5.0, section 3.14.2.1).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DisconnectReasonCode {
	#[default]
	NormalDisconnection = 0x00,
	DisconnectWithWillMessage = 0x04,
	UnspecifiedError = 0x80,
	MalformedPacket = 0x81,
	ProtocolError = 0x82,
	ImplementationSpecificError = 0x83,
	NotAuthorized = 0x87,
	ServerBusy = 0x89,
	ServerShuttingDown = 0x8B,
	KeepAliveTimeout = 0x8D,
	SessionTakenOver = 0x8E,
	TopicFilterInvalid = 0x8F,
	TopicNameInvalid = 0x90,
	ReceiveMaximumExceeded = 0x93,
	TopicAliasInvalid = 0x94,
	PacketTooLarge = 0x95,
	MessageRateTooHigh = 0x96,
	QuotaExceeded = 0x97,
	AdministrativeAction = 0x98,
	PayloadFormatInvalid = 0x99,
	RetainNotSupported = 0x9A,
	QosNotSupported = 0x9B,
	UseAnotherServer = 0x9C,
	ServerMoved = 0x9D,
	SharedSubscriptionsNotSupported = 0x9E,
	ConnectionRateExceeded = 0x9F,
	MaximumConnectTime = 0xA0,
	SubscriptionIdentifiersNotSupported = 0xA1,
	WildcardSubscriptionsNotSupported = 0xA2,
}

impl DisconnectReasonCode {
	pub fn code(self) -> u8 {
		self as u8
	}

	pub fn is_error(self) -> bool {
		self.code() >= 0x80
	}

	/// Whether a client is allowed to put this code in its own DISCONNECT.
	pub fn can_be_sent_by_client(self) -> bool {
		matches!(
			self,
			Self::NormalDisconnection
				| Self::DisconnectWithWillMessage
				| Self::UnspecifiedError
				| Self::MalformedPacket
				| Self::ProtocolError
				| Self::ImplementationSpecificError
				| Self::TopicNameInvalid
				| Self::ReceiveMaximumExceeded
				| Self::TopicAliasInvalid
				| Self::PacketTooLarge
				| Self::MessageRateTooHigh
				| Self::QuotaExceeded
				| Self::AdministrativeAction
				| Self::PayloadFormatInvalid
		)
	}
}

/// Session expiry interval carried by a DISCONNECT.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionExpiry {
	/// Keep the interval negotiated in CONNECT (property omitted)
	#[default]
	FromConnect,
	/// Explicit interval in seconds
	Seconds(u32),
}

/// Immutable DISCONNECT message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Disconnect {
	reason_code: DisconnectReasonCode,
	session_expiry: SessionExpiry,
	server_reference: Option<String>,
	reason_string: Option<String>,
	user_properties: Vec<(String, String)>,
}

impl Disconnect {
	pub fn reason_code(&self) -> DisconnectReasonCode {
		self.reason_code
	}

	pub fn session_expiry(&self) -> SessionExpiry {
		self.session_expiry
	}

	pub fn server_reference(&self) -> Option<&str> {
		self.server_reference.as_deref()
	}

	pub fn reason_string(&self) -> Option<&str> {
		self.reason_string.as_deref()
	}

	pub fn user_properties(&self) -> &[(String, String)] {
		&self.user_properties
	}
}

/// Settings for a DISCONNECT; see the [module docs](self).
#[derive(Debug, Clone, Default)]
pub struct DisconnectConfig {
	reason_code: DisconnectReasonCode,
	session_expiry: SessionExpiry,
	server_reference: Option<String>,
	reason_string: Option<String>,
	user_properties: Vec<(String, String)>,
}

impl DisconnectConfig {
	/// Normal disconnection, session expiry taken from CONNECT.
	pub fn new() -> Self {
		Self::default()
	}

	pub fn reason_code(mut self, reason_code: DisconnectReasonCode) -> Self {
		self.reason_code = reason_code;
		self
	}

	/// Sets the session expiry interval, truncated to whole seconds.
	///
	/// # Errors
	/// Returns `DisconnectError::SessionExpiryOutOfRange` when the interval
	/// does not fit an unsigned 32 bit number of seconds.
	pub fn session_expiry_interval(
		mut self,
		interval: Duration,
	) -> Result<Self, DisconnectError> {
		let seconds = interval.as_secs();
		let seconds = u32::try_from(seconds).map_err(|_| {
			DisconnectError::SessionExpiryOutOfRange {
				seconds,
				max: u64::from(u32::MAX),
			}
		})?;
		self.session_expiry = SessionExpiry::Seconds(seconds);
		Ok(self)
	}

	/// Sets the server the client is told to use instead.
	///
	/// # Errors
	/// Returns `DisconnectError::StringTooLong` above 65535 bytes and
	/// `DisconnectError::NullCharacter` when the text contains U+0000.
	pub fn server_reference(
		mut self,
		reference: impl Into<String>,
	) -> Result<Self, DisconnectError> {
		let reference = checked_string("server reference", reference)?;
		self.server_reference = Some(reference);
		Ok(self)
	}

	pub fn clear_server_reference(mut self) -> Self {
		self.server_reference = None;
		self
	}

	/// Sets the human readable reason. Same limits as
	/// [`server_reference`](Self::server_reference).
	pub fn reason_string(
		mut self,
		reason: impl Into<String>,
	) -> Result<Self, DisconnectError> {
		self.reason_string = Some(checked_string("reason string", reason)?);
		Ok(self)
	}

	pub fn clear_reason_string(mut self) -> Self {
		self.reason_string = None;
		self
	}

	/// Appends a user property. Name and value are checked separately.
	pub fn user_property(
		mut self,
		name: impl Into<String>,
		value: impl Into<String>,
	) -> Result<Self, DisconnectError> {
		let name = checked_string("user property name", name)?;
		let value = checked_string("user property value", value)?;
		self.user_properties.push((name, value));
		Ok(self)
	}

	pub fn clear_user_properties(mut self) -> Self {
		self.user_properties.clear();
		self
	}
}

/// Produces the standalone DISCONNECT value.
pub fn build(config: DisconnectConfig) -> Disconnect {
	Disconnect {
		reason_code: config.reason_code,
		session_expiry: config.session_expiry,
		server_reference: config.server_reference,
		reason_string: config.reason_string,
		user_properties: config.user_properties,
	}
}

/// Builds the message and passes it to the enclosing configuration.
pub fn apply_nested<P>(
	config: DisconnectConfig,
	parent: impl FnOnce(Disconnect) -> P,
) -> P {
	parent(build(config))
}

/// Builds the message and passes it to the sender.
pub fn send<P>(
	config: DisconnectConfig,
	sender: impl FnOnce(Disconnect) -> P,
) -> P {
	sender(build(config))
}
