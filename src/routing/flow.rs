//! Identity and kind of registered publish listeners ("flows")

use std::fmt::{self, Display};

/// Identifier of one registered listener.
///
/// Allocated by [`IncomingPublishFlows`](super::IncomingPublishFlows) and
/// never reused within one router.
#[derive(Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Copy, Clone)]
pub struct FlowId(pub(crate) usize);

impl Display for FlowId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "FlowId({})", self.0)
	}
}

/// Client-wide listener categories, independent of any subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlobalPublishFilter {
	/// Publishes matched by at least one subscription
	AllSubscriptions,
	/// Every publish
	AllPublishes,
	/// Publishes that no other listener receives
	RemainingPublishes,
}

impl GlobalPublishFilter {
	pub const COUNT: usize = 3;

	pub const ALL: [GlobalPublishFilter; Self::COUNT] = [
		GlobalPublishFilter::AllSubscriptions,
		GlobalPublishFilter::AllPublishes,
		GlobalPublishFilter::RemainingPublishes,
	];

	pub(crate) fn index(self) -> usize {
		match self {
			| GlobalPublishFilter::AllSubscriptions => 0,
			| GlobalPublishFilter::AllPublishes => 1,
			| GlobalPublishFilter::RemainingPublishes => 2,
		}
	}
}

impl Display for GlobalPublishFilter {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			| GlobalPublishFilter::AllSubscriptions => "ALL_SUBSCRIPTIONS",
			| GlobalPublishFilter::AllPublishes => "ALL_PUBLISHES",
			| GlobalPublishFilter::RemainingPublishes => "REMAINING_PUBLISHES",
		};
		f.write_str(name)
	}
}

/// What a flow was registered as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Registered under one or more topic filters
	Subscription,
	/// Global listener, see [`GlobalPublishFilter::AllSubscriptions`]
	AllSubscriptions,
	/// Global listener, see [`GlobalPublishFilter::AllPublishes`]
	AllPublishes,
	/// Global listener, see [`GlobalPublishFilter::RemainingPublishes`]
	RemainingPublishes,
}

impl FlowKind {
	/// Global category, `None` for subscription flows.
	pub fn global_filter(self) -> Option<GlobalPublishFilter> {
		match self {
			| FlowKind::Subscription => None,
			| FlowKind::AllSubscriptions => {
				Some(GlobalPublishFilter::AllSubscriptions)
			}
			| FlowKind::AllPublishes => Some(GlobalPublishFilter::AllPublishes),
			| FlowKind::RemainingPublishes => {
				Some(GlobalPublishFilter::RemainingPublishes)
			}
		}
	}

	pub fn is_global(self) -> bool {
		self.global_filter().is_some()
	}
}

impl From<GlobalPublishFilter> for FlowKind {
	fn from(filter: GlobalPublishFilter) -> Self {
		match filter {
			| GlobalPublishFilter::AllSubscriptions => FlowKind::AllSubscriptions,
			| GlobalPublishFilter::AllPublishes => FlowKind::AllPublishes,
			| GlobalPublishFilter::RemainingPublishes => {
				FlowKind::RemainingPublishes
			}
		}
	}
}

/// One entry of a routing result.
#[derive(Debug)]
pub struct RoutedFlow<'a, L> {
	pub id: FlowId,
	pub kind: FlowKind,
	pub listener: &'a L,
}

impl<L> Clone for RoutedFlow<'_, L> {
	fn clone(&self) -> Self {
		*self
	}
}

impl<L> Copy for RoutedFlow<'_, L> {}
