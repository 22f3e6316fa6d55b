use std::collections::{BTreeMap, HashMap, HashSet};

use arcstr::ArcStr;
use smallvec::SmallVec;
use tracing::debug;

use super::flow::FlowId;
use crate::handle_list::{Handle, HandleList};
use crate::topic::{TopicFilter, TopicMatcherNode, TopicName};

/// Flows registered under one filter. `None` entries are tracking-only
/// registrations without a receiver.
#[derive(Debug)]
struct SubscribedFilter {
	filter: TopicFilter,
	flows: HandleList<Option<FlowId>>,
}

impl SubscribedFilter {
	fn live_flows(&self) -> impl Iterator<Item = FlowId> + '_ {
		self.flows.iter().filter_map(|(_, flow)| *flow)
	}
}

/// Filters sharing one trie position, keyed by full filter text
/// (`a/b` and `$share/g/a/b` land on the same node).
type FilterTable = BTreeMap<ArcStr, SubscribedFilter>;

type FlowHandles = SmallVec<[(TopicFilter, Handle); 2]>;

/// Flows that lost their last filter in an unsubscribe.
pub type OrphanedFlows = SmallVec<[FlowId; 4]>;

/// Registry of topic filters and the flows subscribed under them.
///
/// A filter is present only while at least one registration exists for it.
/// Not thread safe: every method must be called from the single context
/// that owns the router.
#[derive(Debug, Default)]
pub struct SubscriptionFlows {
	matcher: TopicMatcherNode<FilterTable>,
	flow_handles: HashMap<FlowId, FlowHandles>,
}

impl SubscriptionFlows {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers `flow` under `filter`, creating the filter if needed.
	///
	/// `None` records a tracking-only registration. Registering the same
	/// flow twice under one filter keeps a single entry.
	pub fn subscribe(&mut self, filter: &TopicFilter, flow: Option<FlowId>) {
		if let Some(id) = flow {
			let already_subscribed = self
				.flow_handles
				.get(&id)
				.is_some_and(|handles| handles.iter().any(|(f, _)| f == filter));
			if already_subscribed {
				debug!(flow = %id, filter = %filter, "Flow already subscribed to filter");
				return;
			}
		}

		let table = self.matcher.get_or_create(filter);
		let entry = table
			.entry(filter.as_arcstr().clone())
			.or_insert_with(|| SubscribedFilter {
				filter: filter.clone(),
				flows: HandleList::new(),
			});
		let handle = entry.flows.add(flow);

		if let Some(id) = flow {
			self.flow_handles
				.entry(id)
				.or_default()
				.push((filter.clone(), handle));
		}
		debug!(filter = %filter, flow = ?flow, "Subscribed flow to filter");
	}

	/// Removes `flow` from `filter`, or every registration of `filter` when
	/// `flow` is `None`.
	///
	/// Returns the flows that are no longer subscribed to any filter.
	pub fn unsubscribe(
		&mut self,
		filter: &TopicFilter,
		flow: Option<FlowId>,
	) -> OrphanedFlows {
		let mut orphaned = OrphanedFlows::new();
		match flow {
			| Some(id) => {
				let Some(handles) = self.flow_handles.get_mut(&id) else {
					return orphaned;
				};
				let Some(pos) = handles.iter().position(|(f, _)| f == filter)
				else {
					return orphaned;
				};
				let (_, handle) = handles.remove(pos);
				if handles.is_empty() {
					self.flow_handles.remove(&id);
					orphaned.push(id);
				}
				self.remove_handle(filter, handle);
			}
			| None => {
				let mut removed = None;
				self.matcher.update_node(filter.segments(), |table| {
					removed = table.remove(filter.as_arcstr());
				});
				let Some(entry) = removed else {
					return orphaned;
				};
				for id in entry.live_flows() {
					if self.detach_filter(id, filter) {
						orphaned.push(id);
					}
				}
			}
		}
		debug!(filter = %filter, flow = ?flow, orphaned = orphaned.len(), "Unsubscribed filter");
		orphaned
	}

	/// Removes `flow` from every filter it is registered under.
	///
	/// Returns `false` when the flow was not registered (already cancelled).
	pub fn cancel(&mut self, flow: FlowId) -> bool {
		let Some(handles) = self.flow_handles.remove(&flow) else {
			return false;
		};
		for (filter, handle) in &handles {
			self.remove_handle(filter, *handle);
		}
		debug!(flow = %flow, filters = handles.len(), "Cancelled subscription flow");
		true
	}

	/// Appends the flows of every filter matching `topic` to `out`, each flow
	/// at most once, in trie order then registration order.
	///
	/// Returns whether any filter matched, even if it only holds
	/// tracking-only registrations.
	pub fn find_matching(&self, topic: &TopicName, out: &mut Vec<FlowId>) -> bool {
		let entries: SmallVec<[&SubscribedFilter; 4]> = self
			.matcher
			.find_by_topic(topic)
			.into_iter()
			.flat_map(BTreeMap::values)
			.collect();
		match entries.as_slice() {
			| [] => false,
			// one filter holds each flow at most once
			| [entry] => {
				out.extend(entry.live_flows());
				true
			}
			| entries => {
				let mut seen = HashSet::new();
				for entry in entries {
					let fresh = entry.live_flows().filter(|id| seen.insert(*id));
					out.extend(fresh);
				}
				true
			}
		}
	}

	/// Whether `filter` currently has at least one registration.
	pub fn contains(&self, filter: &TopicFilter) -> bool {
		self.matcher
			.get(filter)
			.is_some_and(|table| table.contains_key(filter.as_arcstr()))
	}

	/// Number of registrations (including tracking-only) under `filter`.
	pub fn registration_count(&self, filter: &TopicFilter) -> usize {
		self.matcher
			.get(filter)
			.and_then(|table| table.get(filter.as_arcstr()))
			.map_or(0, |entry| entry.flows.len())
	}

	/// Filters `flow` is registered under, in registration order.
	pub fn filters_of(&self, flow: FlowId) -> Vec<TopicFilter> {
		self.flow_handles
			.get(&flow)
			.map(|handles| handles.iter().map(|(f, _)| f.clone()).collect())
			.unwrap_or_default()
	}

	/// All filters with at least one registration, sorted.
	pub fn active_filters(&self) -> Vec<TopicFilter> {
		let mut filters = Vec::new();
		self.matcher.for_each(&mut |table: &FilterTable| {
			filters.extend(table.values().map(|entry| entry.filter.clone()));
		});
		filters.sort();
		filters
	}

	pub fn is_empty(&self) -> bool {
		self.matcher.is_empty()
	}

	/// Drops every registration.
	pub fn clear(&mut self) {
		self.matcher = TopicMatcherNode::new();
		self.flow_handles.clear();
	}

	fn remove_handle(&mut self, filter: &TopicFilter, handle: Handle) {
		let key = filter.as_arcstr();
		self.matcher.update_node(filter.segments(), |table| {
			if let Some(entry) = table.get_mut(key) {
				entry.flows.remove(handle);
				if entry.flows.is_empty() {
					table.remove(key);
				}
			}
		});
	}

	/// Forgets that `flow` is registered under `filter`. Returns `true`
	/// when that was its last filter.
	fn detach_filter(&mut self, flow: FlowId, filter: &TopicFilter) -> bool {
		let Some(handles) = self.flow_handles.get_mut(&flow) else {
			return false;
		};
		handles.retain(|(f, _)| f != filter);
		if handles.is_empty() {
			self.flow_handles.remove(&flow);
			return true;
		}
		false
	}
}
