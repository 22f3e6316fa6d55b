//! Task that owns an [`IncomingPublishFlows`] and delivers publishes
//!
//! The router must only be touched from one execution context. The
//! dispatcher is that context: registrations, cancellations and inbound
//! publishes are sent to it as commands over one channel and applied in
//! order, so a mutation issued before a [`DispatcherHandler::dispatch`] is
//! always visible to it.

use std::sync::Arc;

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use tokio::{
	sync::{
		mpsc::{
			Receiver, Sender, channel,
			error::{SendTimeoutError, TrySendError},
		},
		oneshot,
	},
	task::{JoinError, JoinHandle},
};
use tracing::{debug, error, info, warn};

use super::error::DispatchError;
use super::flow::{FlowId, GlobalPublishFilter};
use super::incoming_publish_flows::IncomingPublishFlows;
use super::listener::PublishListener;
use crate::config::{ConfigError, DispatcherSettings};
use crate::message::{
	IncomingPublish, SubAck, SubscribeRequest, UnsubAck, UnsubscribeRequest,
};
use crate::topic::TopicFilter;

type ListenerSender = Sender<Arc<IncomingPublish>>;

type SlowSendResult =
	(FlowId, Result<(), SendTimeoutError<Arc<IncomingPublish>>>);

#[derive(Debug)]
pub(crate) enum Command {
	Subscribe {
		request: SubscribeRequest,
		ack: SubAck,
		with_listener: bool,
		response_tx: oneshot::Sender<Option<PublishListener>>,
	},
	Unsubscribe {
		request: UnsubscribeRequest,
		ack: UnsubAck,
		response_tx: oneshot::Sender<Vec<FlowId>>,
	},
	RegisterGlobal {
		category: GlobalPublishFilter,
		response_tx: oneshot::Sender<PublishListener>,
	},
	Cancel(FlowId),
	Dispatch(IncomingPublish),
	ActiveFilters(oneshot::Sender<Vec<TopicFilter>>),
}

/// Actor owning the publish router.
pub struct PublishDispatcher {
	flows: IncomingPublishFlows<ListenerSender>,
	settings: DispatcherSettings,
	command_rx: Receiver<Command>,
	/// Handed to listeners so they can cancel themselves
	command_tx: Sender<Command>,
	shutdown_rx: oneshot::Receiver<()>,
	slow_send_futures: FuturesUnordered<JoinHandle<SlowSendResult>>,
}

impl PublishDispatcher {
	/// Spawns the dispatcher on the current tokio runtime.
	///
	/// # Errors
	/// Returns [`ConfigError`] when `settings` fail validation.
	pub fn spawn(
		settings: DispatcherSettings,
	) -> Result<(DispatcherController, DispatcherHandler), ConfigError> {
		settings.validate()?;
		let (command_tx, command_rx) = channel(settings.command_channel_capacity);
		let (shutdown_tx, shutdown_rx) = oneshot::channel();
		let actor = Self {
			flows: IncomingPublishFlows::new(),
			settings,
			command_rx,
			command_tx: command_tx.clone(),
			shutdown_rx,
			slow_send_futures: FuturesUnordered::new(),
		};
		let join_handle = tokio::spawn(actor.run());

		let controller = DispatcherController {
			shutdown_tx,
			join_handle,
		};
		let handler = DispatcherHandler { command_tx };
		Ok((controller, handler))
	}

	async fn run(mut self) {
		loop {
			tokio::select! {
				_ = &mut self.shutdown_rx => {
					info!("PublishDispatcher: Shutdown signal received");
					break;
				}
				Some(slow_send_res) = self.slow_send_futures.next() => {
					self.handle_slow_send(slow_send_res);
				}
				cmd = self.command_rx.recv() => {
					let Some(cmd) = cmd else {
						info!("PublishDispatcher: Command channel closed, exiting");
						break;
					};
					self.handle_command(cmd);
				}
			}
		}
		info!("PublishDispatcher: Exiting run loop");
		self.cleanup().await
	}

	fn handle_command(&mut self, cmd: Command) {
		match cmd {
			| Command::Subscribe {
				request,
				ack,
				with_listener,
				response_tx,
			} => self.handle_subscribe(&request, &ack, with_listener, response_tx),
			| Command::Unsubscribe {
				request,
				ack,
				response_tx,
			} => {
				let removed = self.flows.unsubscribe(&request, &ack);
				if response_tx.send(removed).is_err() {
					warn!("Could not send unsubscribe response (receiver dropped)");
				}
			}
			| Command::RegisterGlobal {
				category,
				response_tx,
			} => self.handle_register_global(category, response_tx),
			| Command::Cancel(id) => {
				if !self.flows.cancel(id) {
					debug!(flow = %id, "Cancel for unknown or removed flow ignored");
				}
			}
			| Command::Dispatch(publish) => self.handle_dispatch(publish),
			| Command::ActiveFilters(response_tx) => {
				if response_tx.send(self.flows.active_filters()).is_err() {
					warn!("Could not send active filters (receiver dropped)");
				}
			}
		}
	}

	fn handle_subscribe(
		&mut self,
		request: &SubscribeRequest,
		ack: &SubAck,
		with_listener: bool,
		response_tx: oneshot::Sender<Option<PublishListener>>,
	) {
		let listener = if with_listener {
			let (channel_tx, channel_rx) =
				channel(self.settings.listener_channel_capacity);
			self.flows
				.subscribe(request, ack, Some(channel_tx))
				.map(|id| PublishListener::new(channel_rx, self.command_tx.clone(), id))
		} else {
			self.flows.subscribe(request, ack, None);
			None
		};

		let id = listener.as_ref().map(PublishListener::id);
		if response_tx.send(listener).is_err() {
			warn!(flow = ?id, "Could not send subscribe response (receiver dropped)");
			if let Some(id) = id {
				self.flows.cancel(id);
			}
		}
	}

	fn handle_register_global(
		&mut self,
		category: GlobalPublishFilter,
		response_tx: oneshot::Sender<PublishListener>,
	) {
		let (channel_tx, channel_rx) =
			channel(self.settings.listener_channel_capacity);
		let id = self.flows.register_global(category, channel_tx);
		let listener =
			PublishListener::new(channel_rx, self.command_tx.clone(), id);
		if response_tx.send(listener).is_err() {
			warn!(flow = %id, "Could not send global listener (receiver dropped)");
			self.flows.cancel(id);
		}
	}

	fn handle_dispatch(&mut self, publish: IncomingPublish) {
		let publish = Arc::new(publish);
		let mut closed_flows = Vec::new();
		let routed = self.flows.route(&publish.topic);
		if routed.is_empty() {
			debug!(topic = %publish.topic, "Publish matched no flow, dropped");
		}

		for flow in routed {
			match flow.listener.try_send(Arc::clone(&publish)) {
				| Ok(()) => {}
				| Err(TrySendError::Closed(_)) => closed_flows.push(flow.id),
				| Err(TrySendError::Full(msg)) => {
					if self.slow_send_futures.len()
						>= self.settings.max_pending_slow_sends
					{
						error!(
							flow = %flow.id,
							topic = %publish.topic,
							queue_size = self.slow_send_futures.len(),
							"Too many slow sends in processing queue. Message dropped",
						);
						continue;
					}
					let sender = flow.listener.clone();
					let id = flow.id;
					let timeout = self.settings.slow_send_timeout;
					self.slow_send_futures.push(tokio::spawn(async move {
						(id, sender.send_timeout(msg, timeout).await)
					}));
				}
			}
		}

		for id in closed_flows {
			debug!(flow = %id, "Listener channel closed, cancelling flow");
			self.flows.cancel(id);
		}
	}

	fn handle_slow_send(
		&mut self,
		slow_send_res: Result<SlowSendResult, JoinError>,
	) {
		match slow_send_res {
			| Ok((_, Ok(()))) => {}
			| Ok((id, Err(SendTimeoutError::Closed(msg)))) => {
				self.flows.cancel(id);
				error!(
					flow = %id,
					topic = %msg.topic,
					"Slow send channel closed, message dropped. Cancelling flow",
				);
			}
			| Ok((id, Err(SendTimeoutError::Timeout(msg)))) => {
				error!(
					flow = %id,
					topic = %msg.topic,
					"Slow send timeout for listener. Message dropped",
				);
			}
			| Err(err) => {
				error!(error = ?err, "Failed to complete slow send task");
			}
		}
	}

	/// Drains pending slow sends within the configured timeout, then drops
	/// every flow, which closes all listener channels.
	async fn cleanup(&mut self) {
		let drain_timeout = self.settings.shutdown_drain_timeout;
		let process_slow_sends = async {
			while let Some(slow_send_res) = self.slow_send_futures.next().await
			{
				self.handle_slow_send(slow_send_res);
			}
		};
		if tokio::time::timeout(drain_timeout, process_slow_sends)
			.await
			.is_err()
		{
			warn!(
				timeout_ms = drain_timeout.as_millis() as u64,
				"PublishDispatcher: Cleanup slow send timeout"
			);
		}

		for handle in self.slow_send_futures.iter() {
			handle.abort();
		}
		self.flows.clear();
	}
}

/// Stops the dispatcher task.
#[derive(Debug)]
pub struct DispatcherController {
	shutdown_tx: oneshot::Sender<()>,
	join_handle: JoinHandle<()>,
}

impl DispatcherController {
	/// Signals shutdown and waits for the task to finish.
	///
	/// Listener channels are closed once this returns.
	pub async fn shutdown(self) -> Result<(), JoinError> {
		let _ = self.shutdown_tx.send(()).inspect_err(|_| {
			warn!("DispatcherController: Dispatcher already stopped");
		});
		self.join_handle.await.inspect_err(|e| {
			warn!(error = ?e, "DispatcherController: Dispatcher task failed");
		})
	}
}

/// Cloneable entry point to a running dispatcher.
#[derive(Debug, Clone)]
pub struct DispatcherHandler {
	command_tx: Sender<Command>,
}

impl DispatcherHandler {
	async fn request<R>(
		&self,
		command: impl FnOnce(oneshot::Sender<R>) -> Command,
	) -> Result<R, DispatchError> {
		let (tx, rx) = oneshot::channel();
		self.command_tx
			.send(command(tx))
			.await
			.map_err(|_| DispatchError::ChannelClosed)?;
		rx.await.map_err(|_| DispatchError::ResponseLost)
	}

	/// Applies an acknowledged SUBSCRIBE and returns a listener for it.
	///
	/// Returns `Ok(None)` when every entry was rejected by the broker.
	pub async fn apply_subscribe(
		&self,
		request: SubscribeRequest,
		ack: SubAck,
	) -> Result<Option<PublishListener>, DispatchError> {
		self.request(|response_tx| Command::Subscribe {
			request,
			ack,
			with_listener: true,
			response_tx,
		})
		.await
	}

	/// Applies an acknowledged SUBSCRIBE without a listener.
	///
	/// The filters only count as matched for
	/// [`GlobalPublishFilter::AllSubscriptions`] listeners.
	pub async fn track_subscribe(
		&self,
		request: SubscribeRequest,
		ack: SubAck,
	) -> Result<(), DispatchError> {
		self.request(|response_tx| Command::Subscribe {
			request,
			ack,
			with_listener: false,
			response_tx,
		})
		.await
		.map(|_| ())
	}

	/// Applies an acknowledged UNSUBSCRIBE.
	///
	/// Returns the flows that were removed because they lost their last
	/// filter; their listeners see the end of their stream.
	pub async fn apply_unsubscribe(
		&self,
		request: UnsubscribeRequest,
		ack: UnsubAck,
	) -> Result<Vec<FlowId>, DispatchError> {
		self.request(|response_tx| Command::Unsubscribe {
			request,
			ack,
			response_tx,
		})
		.await
	}

	pub async fn register_global(
		&self,
		category: GlobalPublishFilter,
	) -> Result<PublishListener, DispatchError> {
		self.request(|response_tx| Command::RegisterGlobal {
			category,
			response_tx,
		})
		.await
	}

	/// Queues an inbound publish for routing.
	pub async fn dispatch(
		&self,
		publish: IncomingPublish,
	) -> Result<(), DispatchError> {
		self.command_tx
			.send(Command::Dispatch(publish))
			.await
			.map_err(|_| DispatchError::ChannelClosed)
	}

	/// Filters with at least one registration, sorted. Used to resubscribe
	/// after a reconnect.
	pub async fn active_filters(&self) -> Result<Vec<TopicFilter>, DispatchError> {
		self.request(Command::ActiveFilters).await
	}
}
