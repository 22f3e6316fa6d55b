//! Routing of inbound publishes to listeners
//!
//! [`SubscriptionFlows`] keeps the flows registered per topic filter,
//! [`IncomingPublishFlows`] adds the global categories and decides the
//! delivery order, and [`PublishDispatcher`] runs the router on a dedicated
//! task and feeds the [`PublishListener`]s.

pub mod dispatcher;
/// Dispatcher error types
pub mod error;
pub mod flow;
pub mod incoming_publish_flows;
pub mod listener;
pub mod subscription_flows;

pub use dispatcher::{DispatcherController, DispatcherHandler, PublishDispatcher};
pub use error::DispatchError;
pub use flow::{FlowId, FlowKind, GlobalPublishFilter, RoutedFlow};
pub use incoming_publish_flows::IncomingPublishFlows;
pub use listener::PublishListener;
pub use subscription_flows::{OrphanedFlows, SubscriptionFlows};
