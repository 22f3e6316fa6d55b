use std::time::Duration;

use mqtt_publish_router::errors::DispatchError;
use mqtt_publish_router::prelude::*;
use tokio::time::timeout;

fn init_tracing() {
	let _ = tracing_subscriber::fmt()
		.with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
		.with_test_writer()
		.try_init();
}

fn filter(s: &str) -> TopicFilter {
	TopicFilter::new(s).unwrap()
}

fn publish(topic: &str, payload: &'static str) -> IncomingPublish {
	IncomingPublish::new(TopicName::new(topic).unwrap(), payload)
}

fn granted(request: &SubscribeRequest) -> SubAck {
	SubAck::new(vec![SubAckReasonCode::GrantedQos1; request.len()])
}

async fn subscribe(
	handler: &DispatcherHandler,
	f: &str,
) -> PublishListener {
	let request = SubscribeRequest::single(filter(f), QoS::AtLeastOnce);
	let ack = granted(&request);
	handler
		.apply_subscribe(request, ack)
		.await
		.unwrap()
		.expect("subscription applied")
}

async fn recv_payload(listener: &mut PublishListener) -> Option<String> {
	timeout(Duration::from_secs(1), listener.recv())
		.await
		.expect("receive timed out")
		.map(|p| String::from_utf8_lossy(&p.payload).into_owned())
}

#[tokio::test]
async fn test_subscription_receives_matching_publishes() {
	init_tracing();
	let (controller, handler) =
		PublishDispatcher::spawn(DispatcherSettings::default()).unwrap();
	let mut listener = subscribe(&handler, "sensors/+/temp").await;

	handler.dispatch(publish("sensors/kitchen/temp", "21")).await.unwrap();
	handler.dispatch(publish("sensors/kitchen/humidity", "40")).await.unwrap();
	handler.dispatch(publish("sensors/hall/temp", "19")).await.unwrap();

	assert_eq!(recv_payload(&mut listener).await.as_deref(), Some("21"));
	assert_eq!(recv_payload(&mut listener).await.as_deref(), Some("19"));

	controller.shutdown().await.unwrap();
	assert_eq!(recv_payload(&mut listener).await, None);
}

#[tokio::test]
async fn test_global_listeners_follow_routing_order() {
	init_tracing();
	let (controller, handler) =
		PublishDispatcher::spawn(DispatcherSettings::default()).unwrap();
	let mut all = handler
		.register_global(GlobalPublishFilter::AllPublishes)
		.await
		.unwrap();
	let mut subscribed = handler
		.register_global(GlobalPublishFilter::AllSubscriptions)
		.await
		.unwrap();
	let mut remaining = handler
		.register_global(GlobalPublishFilter::RemainingPublishes)
		.await
		.unwrap();
	let mut direct = subscribe(&handler, "a/#").await;

	handler.dispatch(publish("a/b", "one")).await.unwrap();
	handler.dispatch(publish("x/y", "two")).await.unwrap();

	assert_eq!(recv_payload(&mut direct).await.as_deref(), Some("one"));
	assert_eq!(recv_payload(&mut subscribed).await.as_deref(), Some("one"));
	assert_eq!(recv_payload(&mut all).await.as_deref(), Some("one"));
	assert_eq!(recv_payload(&mut all).await.as_deref(), Some("two"));

	// ALL_PUBLISHES always receives, so REMAINING_PUBLISHES never fires
	controller.shutdown().await.unwrap();
	assert_eq!(recv_payload(&mut remaining).await, None);
	assert_eq!(recv_payload(&mut subscribed).await, None);
}

#[tokio::test]
async fn test_remaining_publishes_catches_unrouted() {
	let (controller, handler) =
		PublishDispatcher::spawn(DispatcherSettings::default()).unwrap();
	let mut remaining = handler
		.register_global(GlobalPublishFilter::RemainingPublishes)
		.await
		.unwrap();
	let mut direct = subscribe(&handler, "known").await;

	handler.dispatch(publish("known", "routed")).await.unwrap();
	handler.dispatch(publish("unknown", "fallback")).await.unwrap();

	assert_eq!(recv_payload(&mut direct).await.as_deref(), Some("routed"));
	assert_eq!(
		recv_payload(&mut remaining).await.as_deref(),
		Some("fallback")
	);
	controller.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_tracking_only_subscription_feeds_all_subscriptions() {
	let (controller, handler) =
		PublishDispatcher::spawn(DispatcherSettings::default()).unwrap();
	let mut observer = handler
		.register_global(GlobalPublishFilter::AllSubscriptions)
		.await
		.unwrap();
	let request = SubscribeRequest::single(filter("status/#"), QoS::AtMostOnce);
	let ack = granted(&request);
	handler.track_subscribe(request, ack).await.unwrap();

	handler.dispatch(publish("other", "skip")).await.unwrap();
	handler.dispatch(publish("status/up", "seen")).await.unwrap();

	assert_eq!(recv_payload(&mut observer).await.as_deref(), Some("seen"));
	assert_eq!(handler.active_filters().await.unwrap(), vec![filter("status/#")]);
	controller.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_rejected_subscription_returns_no_listener() {
	let (controller, handler) =
		PublishDispatcher::spawn(DispatcherSettings::default()).unwrap();
	let request = SubscribeRequest::single(filter("secret/#"), QoS::AtLeastOnce);
	let ack = SubAck::new(vec![SubAckReasonCode::NotAuthorized]);

	let listener = handler.apply_subscribe(request, ack).await.unwrap();
	assert!(listener.is_none());
	assert!(handler.active_filters().await.unwrap().is_empty());
	controller.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_drop_cancels_flow() {
	let (controller, handler) =
		PublishDispatcher::spawn(DispatcherSettings::default()).unwrap();
	let listener = subscribe(&handler, "a/b").await;
	let mut other = subscribe(&handler, "c").await;

	drop(listener);
	// commands are applied in order, so the cancel lands before this query
	assert_eq!(handler.active_filters().await.unwrap(), vec![filter("c")]);

	other.cancel_immediate().unwrap();
	assert!(handler.active_filters().await.unwrap().is_empty());
	// a second cancel is a no-op
	other.cancel_immediate().unwrap();
	controller.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_drop_on_full_command_channel_cancels_on_next_delivery() {
	let settings = DispatcherSettings {
		command_channel_capacity: 1,
		..Default::default()
	};
	let (controller, handler) = PublishDispatcher::spawn(settings).unwrap();
	let listener = subscribe(&handler, "a").await;

	// the dispatcher task cannot run until this task yields
	handler.dispatch(publish("filler", "x")).await.unwrap();
	drop(listener);
	assert_eq!(handler.active_filters().await.unwrap(), vec![filter("a")]);

	handler.dispatch(publish("a", "lost")).await.unwrap();
	assert!(handler.active_filters().await.unwrap().is_empty());
	controller.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_async_cancel() {
	let (controller, handler) =
		PublishDispatcher::spawn(DispatcherSettings::default()).unwrap();
	let listener = subscribe(&handler, "a").await;

	listener.cancel().await.unwrap();
	assert!(handler.active_filters().await.unwrap().is_empty());
	controller.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_unsubscribe_ends_listener_stream() {
	let (controller, handler) =
		PublishDispatcher::spawn(DispatcherSettings::default()).unwrap();
	let mut a = subscribe(&handler, "a").await;
	let mut b = subscribe(&handler, "b").await;

	let request = UnsubscribeRequest::single(filter("a")).add(filter("b"));
	let removed = handler
		.apply_unsubscribe(request, UnsubAck::AllSuccess)
		.await
		.unwrap();

	assert_eq!(removed, vec![a.id(), b.id()]);
	assert_eq!(recv_payload(&mut a).await, None);
	assert_eq!(recv_payload(&mut b).await, None);
	controller.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_unsubscribe_error_code_keeps_filter() {
	let (controller, handler) =
		PublishDispatcher::spawn(DispatcherSettings::default()).unwrap();
	let mut listener = subscribe(&handler, "a").await;

	let ack = UnsubAck::ReasonCodes(vec![UnsubAckReasonCode::NotAuthorized]);
	let removed = handler
		.apply_unsubscribe(UnsubscribeRequest::single(filter("a")), ack)
		.await
		.unwrap();
	assert!(removed.is_empty());

	handler.dispatch(publish("a", "still here")).await.unwrap();
	assert_eq!(
		recv_payload(&mut listener).await.as_deref(),
		Some("still here")
	);
	controller.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_full_listener_gets_slow_send() {
	let settings = DispatcherSettings {
		listener_channel_capacity: 1,
		..Default::default()
	};
	let (controller, handler) = PublishDispatcher::spawn(settings).unwrap();
	let mut listener = subscribe(&handler, "t").await;

	handler.dispatch(publish("t", "first")).await.unwrap();
	handler.dispatch(publish("t", "second")).await.unwrap();

	assert_eq!(recv_payload(&mut listener).await.as_deref(), Some("first"));
	assert_eq!(recv_payload(&mut listener).await.as_deref(), Some("second"));
	controller.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_handler_fails_after_shutdown() {
	let (controller, handler) =
		PublishDispatcher::spawn(DispatcherSettings::default()).unwrap();
	controller.shutdown().await.unwrap();

	assert_eq!(
		handler.dispatch(publish("a", "late")).await,
		Err(DispatchError::ChannelClosed)
	);
	assert_eq!(
		handler.active_filters().await,
		Err(DispatchError::ChannelClosed)
	);
}

#[tokio::test]
async fn test_invalid_settings_are_rejected() {
	let settings = DispatcherSettings {
		command_channel_capacity: 0,
		..Default::default()
	};
	assert!(PublishDispatcher::spawn(settings).is_err());
}
