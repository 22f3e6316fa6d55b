use std::collections::HashMap;

use tracing::{debug, warn};

use super::flow::{FlowId, FlowKind, GlobalPublishFilter, RoutedFlow};
use super::subscription_flows::SubscriptionFlows;
use crate::handle_list::{Handle, HandleList};
use crate::message::{SubAck, SubscribeRequest, UnsubAck, UnsubscribeRequest};
use crate::topic::{TopicFilter, TopicName};

#[derive(Debug)]
struct FlowEntry<L> {
	kind: FlowKind,
	listener: L,
	/// Position in the category list, only for global flows
	global_handle: Option<Handle>,
}

type GlobalFlows = [Option<HandleList<FlowId>>; GlobalPublishFilter::COUNT];

/// Router of inbound publishes to subscription and global listeners.
///
/// Owns the listeners of type `L` and hands out [`FlowId`]s for them.
///
/// # Confinement
///
/// The router does no locking. Every method, including the read-only
/// [`route`](Self::route) and [`find_matching`](Self::find_matching), must be
/// called from the one execution context that owns it. Cancellation requested
/// elsewhere has to be forwarded to that context first (see
/// [`PublishDispatcher`](super::PublishDispatcher)).
#[derive(Debug)]
pub struct IncomingPublishFlows<L> {
	subscription_flows: SubscriptionFlows,
	global_flows: GlobalFlows,
	flows: HashMap<FlowId, FlowEntry<L>>,
	next_id: usize,
}

impl<L> Default for IncomingPublishFlows<L> {
	fn default() -> Self {
		Self {
			subscription_flows: SubscriptionFlows::new(),
			global_flows: [None, None, None],
			flows: HashMap::new(),
			next_id: 0,
		}
	}
}

impl<L> IncomingPublishFlows<L> {
	pub fn new() -> Self {
		Self::default()
	}

	/// Applies an acknowledged SUBSCRIBE.
	///
	/// Every entry whose SUBACK reason code is not an error is registered
	/// under its filter; failed entries are skipped. With a `listener` the
	/// entries are registered for a new flow whose id is returned. Without
	/// one the filters are tracked only, which still counts as a match for
	/// [`GlobalPublishFilter::AllSubscriptions`].
	///
	/// Returns `None` when no listener was given or no entry was applied;
	/// the listener is dropped in the latter case.
	///
	/// Must be called from the owning context.
	pub fn subscribe(
		&mut self,
		request: &SubscribeRequest,
		ack: &SubAck,
		listener: Option<L>,
	) -> Option<FlowId> {
		let codes = ack.reason_codes();
		if codes.len() != request.len() {
			warn!(
				requested = request.len(),
				acknowledged = codes.len(),
				"SUBACK reason codes do not match SUBSCRIBE entries, extra entries ignored"
			);
		}

		let id = listener.as_ref().map(|_| self.allocate_id());
		let mut applied = 0;
		for (subscription, code) in request.subscriptions().iter().zip(codes) {
			if code.is_error() {
				debug!(
					filter = %subscription.filter,
					reason_code = code.code(),
					"Subscription rejected by broker, not registered"
				);
				continue;
			}
			self.subscription_flows.subscribe(&subscription.filter, id);
			applied += 1;
		}

		let (id, listener) = id.zip(listener)?;
		if applied == 0 {
			debug!(flow = %id, "No subscription applied, dropping listener");
			return None;
		}
		self.flows.insert(
			id,
			FlowEntry {
				kind: FlowKind::Subscription,
				listener,
				global_handle: None,
			},
		);
		Some(id)
	}

	/// Applies an acknowledged UNSUBSCRIBE.
	///
	/// Each filter whose reason code is a success is torn down completely;
	/// [`UnsubAck::AllSuccess`] applies to every filter. Flows left without
	/// any filter are removed and their listeners dropped; their ids are
	/// returned.
	///
	/// Must be called from the owning context.
	pub fn unsubscribe(
		&mut self,
		request: &UnsubscribeRequest,
		ack: &UnsubAck,
	) -> Vec<FlowId> {
		if let Some(codes) = ack.reason_codes() {
			if codes.len() != request.len() {
				warn!(
					requested = request.len(),
					acknowledged = codes.len(),
					"UNSUBACK reason codes do not match UNSUBSCRIBE entries, extra entries ignored"
				);
			}
		}

		let mut removed = Vec::new();
		for (index, filter) in request.filters().iter().enumerate() {
			if !ack.is_success(index) {
				debug!(filter = %filter, "Unsubscribe not acknowledged, keeping filter");
				continue;
			}
			for id in self.subscription_flows.unsubscribe(filter, None) {
				if self.flows.remove(&id).is_some() {
					debug!(flow = %id, "Flow lost its last filter, removed");
					removed.push(id);
				}
			}
		}
		removed
	}

	/// Registers a listener for one of the global categories.
	///
	/// Must be called from the owning context.
	pub fn register_global(
		&mut self,
		category: GlobalPublishFilter,
		listener: L,
	) -> FlowId {
		let id = self.allocate_id();
		let list = self.global_flows[category.index()]
			.get_or_insert_with(HandleList::new);
		let handle = list.add(id);
		self.flows.insert(
			id,
			FlowEntry {
				kind: category.into(),
				listener,
				global_handle: Some(handle),
			},
		);
		debug!(flow = %id, category = %category, "Registered global flow");
		id
	}

	/// Removes a flow of any kind and drops its listener.
	///
	/// Unknown or already cancelled ids are ignored and yield `false`.
	///
	/// Must be called from the owning context.
	pub fn cancel(&mut self, id: FlowId) -> bool {
		let Some(entry) = self.flows.remove(&id) else {
			return false;
		};
		match (entry.kind.global_filter(), entry.global_handle) {
			| (Some(category), Some(handle)) => {
				self.remove_global(category, handle)
			}
			| _ => {
				self.subscription_flows.cancel(id);
			}
		}
		debug!(flow = %id, kind = ?entry.kind, "Cancelled flow");
		true
	}

	/// Like [`cancel`](Self::cancel), but only acts on global flows.
	///
	/// Must be called from the owning context.
	pub fn cancel_global(&mut self, id: FlowId) -> bool {
		match self.flows.get(&id) {
			| Some(entry) if entry.kind.is_global() => self.cancel(id),
			| _ => false,
		}
	}

	/// Appends the flows that should receive a publish on `topic` to `out`.
	///
	/// Order: subscription flows of every matching filter, then
	/// [`AllSubscriptions`](GlobalPublishFilter::AllSubscriptions) when a
	/// filter matched or `out` is not empty, then
	/// [`AllPublishes`](GlobalPublishFilter::AllPublishes), and finally
	/// [`RemainingPublishes`](GlobalPublishFilter::RemainingPublishes) only
	/// if `out` is still empty.
	///
	/// Must be called from the owning context.
	pub fn find_matching<'a>(
		&'a self,
		topic: &TopicName,
		out: &mut Vec<RoutedFlow<'a, L>>,
	) {
		let mut ids = Vec::new();
		let matched = self.subscription_flows.find_matching(topic, &mut ids);
		out.extend(ids.into_iter().filter_map(|id| self.routed(id)));

		if matched || !out.is_empty() {
			self.append_global(GlobalPublishFilter::AllSubscriptions, out);
		}
		self.append_global(GlobalPublishFilter::AllPublishes, out);
		if out.is_empty() {
			self.append_global(GlobalPublishFilter::RemainingPublishes, out);
		}
	}

	/// Ordered flows for a publish on `topic`, see
	/// [`find_matching`](Self::find_matching).
	///
	/// Must be called from the owning context.
	pub fn route(&self, topic: &TopicName) -> Vec<RoutedFlow<'_, L>> {
		let mut out = Vec::new();
		self.find_matching(topic, &mut out);
		out
	}

	pub fn listener(&self, id: FlowId) -> Option<&L> {
		self.flows.get(&id).map(|entry| &entry.listener)
	}

	pub fn kind(&self, id: FlowId) -> Option<FlowKind> {
		self.flows.get(&id).map(|entry| entry.kind)
	}

	/// Number of live flows of all kinds.
	pub fn len(&self) -> usize {
		self.flows.len()
	}

	pub fn is_empty(&self) -> bool {
		self.flows.is_empty() && self.subscription_flows.is_empty()
	}

	/// Number of flows registered for `category`.
	pub fn global_count(&self, category: GlobalPublishFilter) -> usize {
		self.global_flows[category.index()]
			.as_ref()
			.map_or(0, HandleList::len)
	}

	/// Whether `category` currently holds its list storage.
	pub fn has_global_list(&self, category: GlobalPublishFilter) -> bool {
		self.global_flows[category.index()].is_some()
	}

	pub fn subscription_flows(&self) -> &SubscriptionFlows {
		&self.subscription_flows
	}

	/// Filters with at least one registration, sorted.
	pub fn active_filters(&self) -> Vec<TopicFilter> {
		self.subscription_flows.active_filters()
	}

	/// Drops every flow and registration. Flow ids are not reused afterwards.
	///
	/// Must be called from the owning context.
	pub fn clear(&mut self) {
		self.subscription_flows.clear();
		self.global_flows = [None, None, None];
		self.flows.clear();
	}

	fn allocate_id(&mut self) -> FlowId {
		let id = FlowId(self.next_id);
		self.next_id += 1;
		id
	}

	fn routed(&self, id: FlowId) -> Option<RoutedFlow<'_, L>> {
		self.flows.get(&id).map(|entry| RoutedFlow {
			id,
			kind: entry.kind,
			listener: &entry.listener,
		})
	}

	fn append_global<'a>(
		&'a self,
		category: GlobalPublishFilter,
		out: &mut Vec<RoutedFlow<'a, L>>,
	) {
		if let Some(list) = &self.global_flows[category.index()] {
			out.extend(list.iter().filter_map(|(_, id)| self.routed(*id)));
		}
	}

	fn remove_global(&mut self, category: GlobalPublishFilter, handle: Handle) {
		let slot = &mut self.global_flows[category.index()];
		if let Some(list) = slot {
			list.remove(handle);
			if list.is_empty() {
				*slot = None;
				debug!(category = %category, "Last global flow removed, list released");
			}
		}
	}
}
