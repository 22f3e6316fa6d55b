//! Configuration for the publish dispatcher

use std::time::Duration;

use thiserror::Error;

/// Invalid [`DispatcherSettings`] values
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
	/// A channel capacity or limit was set to zero
	#[error("{field} must be greater than zero")]
	Zero {
		/// Name of the offending setting
		field: &'static str,
	},
}

/// Dispatcher performance and behavior settings
#[derive(Debug, Clone)]
pub struct DispatcherSettings {
	/// Capacity of the command channel feeding the dispatcher
	pub command_channel_capacity: usize,
	/// Capacity of each listener's publish channel
	pub listener_channel_capacity: usize,
	/// Maximum number of deliveries waiting on full listener channels
	pub max_pending_slow_sends: usize,
	/// How long a delivery may wait on a full listener channel
	pub slow_send_timeout: Duration,
	/// How long shutdown waits for pending slow deliveries
	pub shutdown_drain_timeout: Duration,
}

impl Default for DispatcherSettings {
	fn default() -> Self {
		Self {
			command_channel_capacity: 100,
			listener_channel_capacity: 500,
			max_pending_slow_sends: 100,
			slow_send_timeout: Duration::from_secs(2),
			shutdown_drain_timeout: Duration::from_millis(500),
		}
	}
}

impl DispatcherSettings {
	/// Checks that every capacity is usable.
	///
	/// Tokio channels panic on a zero capacity, so this runs before the
	/// dispatcher is spawned. Zero timeouts are allowed and mean "do not
	/// wait".
	pub fn validate(&self) -> Result<(), ConfigError> {
		let capacities = [
			("command_channel_capacity", self.command_channel_capacity),
			("listener_channel_capacity", self.listener_channel_capacity),
			("max_pending_slow_sends", self.max_pending_slow_sends),
		];
		match capacities.into_iter().find(|(_, value)| *value == 0) {
			| Some((field, _)) => Err(ConfigError::Zero { field }),
			| None => Ok(()),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_defaults_are_valid() {
		let settings = DispatcherSettings::default();
		assert_eq!(settings.command_channel_capacity, 100);
		assert_eq!(settings.listener_channel_capacity, 500);
		assert_eq!(settings.max_pending_slow_sends, 100);
		assert_eq!(settings.slow_send_timeout, Duration::from_secs(2));
		assert_eq!(settings.shutdown_drain_timeout, Duration::from_millis(500));
		assert!(settings.validate().is_ok());
	}

	#[test]
	fn test_zero_capacity_is_rejected() {
		let settings = DispatcherSettings {
			listener_channel_capacity: 0,
			..Default::default()
		};
		assert_eq!(
			settings.validate(),
			Err(ConfigError::Zero {
				field: "listener_channel_capacity"
			})
		);
		assert_eq!(
			settings.validate().unwrap_err().to_string(),
			"listener_channel_capacity must be greater than zero"
		);
	}
}
