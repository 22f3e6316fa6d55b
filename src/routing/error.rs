use thiserror::Error;

/// Errors returned when talking to a [`PublishDispatcher`](super::PublishDispatcher)
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchError {
	/// The dispatcher task has stopped and no longer accepts commands
	#[error("Dispatcher command channel closed")]
	ChannelClosed,
	/// The dispatcher stopped before answering the command
	#[error("Dispatcher dropped the response")]
	ResponseLost,
}
