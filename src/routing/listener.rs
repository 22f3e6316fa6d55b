use std::sync::Arc;

use tokio::sync::mpsc::{
	Receiver, Sender,
	error::{SendError, TrySendError},
};
use tracing::{debug, warn};

use super::dispatcher::Command;
use super::flow::FlowId;
use crate::message::IncomingPublish;

/// Receiving end of a flow registered with a
/// [`PublishDispatcher`](super::PublishDispatcher).
///
/// Dropping the listener cancels its flow. The cancel is queued with a
/// non-blocking send, so if the command channel is full at drop time it is
/// skipped with a warning. The flow, and its filter in
/// [`active_filters`](super::DispatcherHandler::active_filters), then stays
/// registered until the next publish routed to it finds the listener channel
/// closed. Use [`cancel`](Self::cancel) to wait for room instead.
#[derive(Debug)]
pub struct PublishListener {
	receiver: Receiver<Arc<IncomingPublish>>,
	cancel_tx: Option<Sender<Command>>,
	id: FlowId,
}

impl PublishListener {
	pub(crate) fn new(
		receiver: Receiver<Arc<IncomingPublish>>,
		cancel_tx: Sender<Command>,
		id: FlowId,
	) -> Self {
		Self {
			receiver,
			cancel_tx: Some(cancel_tx),
			id,
		}
	}

	pub fn id(&self) -> FlowId {
		self.id
	}

	/// Receives the next publish routed to this flow.
	///
	/// Returns `None` once the flow has been removed by the dispatcher
	/// (unsubscribe, shutdown) and every buffered publish was consumed.
	pub async fn recv(&mut self) -> Option<Arc<IncomingPublish>> {
		self.receiver.recv().await
	}

	/// Receives a buffered publish without waiting.
	pub fn try_recv(&mut self) -> Option<Arc<IncomingPublish>> {
		self.receiver.try_recv().ok()
	}

	/// Cancels the flow, waiting for room in the command channel.
	pub async fn cancel(mut self) -> Result<(), SendError<FlowId>> {
		let Some(cancel_tx) = self.cancel_tx.take() else {
			warn!(flow = %self.id, "Flow already cancelled");
			return Ok(());
		};
		cancel_tx
			.send(Command::Cancel(self.id))
			.await
			.map_err(|_| SendError(self.id))
	}

	/// Cancels the flow without waiting.
	///
	/// On a full command channel the listener stays active and the call can
	/// be retried.
	pub fn cancel_immediate(&mut self) -> Result<(), TrySendError<FlowId>> {
		let Some(cancel_tx) = self.cancel_tx.take() else {
			warn!(flow = %self.id, "Flow already cancelled");
			return Ok(());
		};
		match cancel_tx.try_send(Command::Cancel(self.id)) {
			| Ok(()) => Ok(()),
			| Err(TrySendError::Full(_)) => {
				warn!(flow = %self.id, "Command channel full, cancel not sent");
				self.cancel_tx = Some(cancel_tx);
				Err(TrySendError::Full(self.id))
			}
			| Err(TrySendError::Closed(_)) => Err(TrySendError::Closed(self.id)),
		}
	}
}

impl Drop for PublishListener {
	fn drop(&mut self) {
		let Some(cancel_tx) = self.cancel_tx.take() else {
			return;
		};
		match cancel_tx.try_send(Command::Cancel(self.id)) {
			| Ok(()) => {
				debug!(flow = %self.id, "Flow cancelled in Drop");
			}
			// Dispatcher already gone, nothing left to cancel
			| Err(TrySendError::Closed(_)) => {}
			| Err(TrySendError::Full(_)) => {
				// the dispatcher drops the flow on its next delivery attempt
				warn!(flow = %self.id, "Command channel full, cancel in Drop skipped");
			}
		}
	}
}
