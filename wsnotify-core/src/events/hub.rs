//! In-process fan-out transport.
//!
//! The hub keeps, per topic, the list of live subscriptions. Each
//! subscription owns a bounded queue; publishing pushes the event into the
//! queue of every subscription whose identity passes the event's filter.
//! Nothing here blocks: a full queue drops the event for that subscriber,
//! a closed queue removes the subscription.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};
use uuid::Uuid;
use wsnotify_sdk::objects::{Event, RoutedEvent, Topic};

use super::transport::{Accepted, DeliveryError, SessionFilter, Transport};

/// Default queue size for each subscription.
///
/// Enough to absorb bursts while keeping memory per connection bounded.
pub const DEFAULT_SUBSCRIBER_BUFFER: usize = 256;

struct Slot {
    id: Uuid,
    filter: SessionFilter,
    tx: mpsc::Sender<Arc<Event>>,
}

/// Receiving end of one topic subscription.
///
/// Dropping it ends the subscription; the hub prunes it on the next
/// publish to the topic.
pub struct Subscription {
    id: Uuid,
    topic: Topic,
    rx: mpsc::Receiver<Arc<Event>>,
}

impl Subscription {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn topic(&self) -> Topic {
        self.topic
    }

    /// Wait for the next event. `None` once the hub is closed.
    pub async fn recv(&mut self) -> Option<Arc<Event>> {
        self.rx.recv().await
    }

    /// Take the next queued event without waiting.
    pub fn try_recv(&mut self) -> Option<Arc<Event>> {
        self.rx.try_recv().ok()
    }

    pub fn into_stream(self) -> ReceiverStream<Arc<Event>> {
        ReceiverStream::new(self.rx)
    }
}

/// The in-process [`Transport`].
pub struct Hub {
    topics: DashMap<Topic, Vec<Slot>>,
    buffer: usize,
    closed: AtomicBool,
}

impl Hub {
    /// Create a hub whose subscriptions queue up to `buffer` events each.
    pub fn new(buffer: usize) -> Self {
        Self {
            topics: DashMap::new(),
            buffer: buffer.max(1),
            closed: AtomicBool::new(false),
        }
    }

    /// Remove a subscription. Returns `false` if it was not found.
    pub fn unsubscribe(&self, topic: Topic, id: Uuid) -> bool {
        let Some(mut slots) = self.topics.get_mut(&topic) else {
            return false;
        };
        let before = slots.len();
        slots.retain(|slot| slot.id != id);
        before != slots.len()
    }

    /// Number of subscriptions currently registered on a topic.
    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.topics.get(&topic).map_or(0, |slots| slots.len())
    }

    /// Stop accepting events and end every subscription.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.topics.clear();
        info!("Event hub closed");
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new(DEFAULT_SUBSCRIBER_BUFFER)
    }
}

impl Transport for Hub {
    type Subscription = Subscription;

    fn publish(
        &self,
        topic: Topic,
        filter: &SessionFilter,
        event: &Event,
    ) -> Result<Accepted, DeliveryError> {
        if self.is_closed() {
            return Err(DeliveryError::Closed);
        }

        let mut recipients = 0;
        // The shard write lock serializes publishes to the same topic, which
        // keeps every subscriber's queue in publish order.
        if let Some(mut slots) = self.topics.get_mut(&topic) {
            let shared = Arc::new(event.clone());
            slots.retain(|slot| {
                if !filter.admits(&slot.filter) {
                    return true;
                }
                match slot.tx.try_send(Arc::clone(&shared)) {
                    Ok(()) => {
                        recipients += 1;
                        true
                    }
                    Err(TrySendError::Full(_)) => {
                        warn!(
                            subscription = %slot.id,
                            %topic,
                            event = event.id(),
                            "Subscriber queue full, dropping event"
                        );
                        true
                    }
                    Err(TrySendError::Closed(_)) => {
                        debug!(subscription = %slot.id, %topic, "Pruning closed subscription");
                        false
                    }
                }
            });
        }

        Ok(Accepted { recipients })
    }

    fn subscribe(
        &self,
        topic: Topic,
        filter: SessionFilter,
    ) -> Result<Subscription, DeliveryError> {
        // Checked under the shard lock: `close` flags the hub before clearing,
        // so a slot inserted here is either refused or cleared with the rest.
        let mut slots = self.topics.entry(topic).or_default();
        if self.is_closed() {
            return Err(DeliveryError::Closed);
        }

        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(self.buffer);
        debug!(
            subscription = %id,
            %topic,
            session_id = ?filter.session_id,
            user_id = ?filter.user_id,
            "New subscription"
        );
        slots.push(Slot { id, filter, tx });

        Ok(Subscription { id, topic, rx })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use wsnotify_sdk::objects::{
        ServerConfigurationChangedEvent, SessionTaskInfo, SessionTaskInfoEvent,
    };

    fn identity(session: &str, user: Option<&str>) -> SessionFilter {
        SessionFilter::new(Some(session.to_string()), user.map(String::from))
    }

    fn task_event(task_id: &str, session: &str, running: bool) -> Event {
        let payload = SessionTaskInfo::new(task_id, None, running).unwrap();
        SessionTaskInfoEvent::scoped(payload, Some(session.to_string()), None).into()
    }

    fn publish(hub: &Hub, event: &Event) -> Accepted {
        hub.publish(event.topic(), &SessionFilter::for_event(event), event)
            .unwrap()
    }

    #[tokio::test]
    async fn test_broadcast_reaches_all_subscribers() {
        let hub = Hub::default();
        let mut a = hub
            .subscribe(Topic::ServerConfig, identity("S1", None))
            .unwrap();
        let mut b = hub
            .subscribe(Topic::ServerConfig, identity("S2", Some("bob")))
            .unwrap();

        let event: Event = ServerConfigurationChangedEvent::default().into();
        assert_eq!(publish(&hub, &event).recipients, 2);

        assert_eq!(*a.recv().await.unwrap(), event);
        assert_eq!(*b.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn test_session_scoped_delivery() {
        let hub = Hub::default();
        let mut s1 = hub
            .subscribe(Topic::SessionTask, identity("S1", None))
            .unwrap();
        let mut s2 = hub
            .subscribe(Topic::SessionTask, identity("S2", None))
            .unwrap();

        let event = task_event("T1", "S1", true);
        assert_eq!(publish(&hub, &event).recipients, 1);

        assert_eq!(*s1.recv().await.unwrap(), event);
        assert!(s2.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_other_topics_are_not_delivered() {
        let hub = Hub::default();
        let mut config = hub
            .subscribe(Topic::ServerConfig, identity("S1", None))
            .unwrap();

        let event = task_event("T1", "S1", true);
        assert_eq!(publish(&hub, &event).recipients, 0);
        assert!(config.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_publish_order_is_preserved() {
        let hub = Hub::default();
        let mut sub = hub
            .subscribe(Topic::SessionTask, identity("S1", None))
            .unwrap();

        let events: Vec<Event> = (0..10)
            .map(|i| task_event(&format!("T{i}"), "S1", true))
            .collect();
        for event in &events {
            publish(&hub, event);
        }

        for expected in &events {
            assert_eq!(&*sub.recv().await.unwrap(), expected);
        }
    }

    #[tokio::test]
    async fn test_full_queue_drops_for_that_subscriber_only() {
        let hub = Hub::new(1);
        let _slow = hub
            .subscribe(Topic::ServerConfig, identity("S1", None))
            .unwrap();
        let mut fast = hub
            .subscribe(Topic::ServerConfig, identity("S2", None))
            .unwrap();

        let event: Event = ServerConfigurationChangedEvent::default().into();
        assert_eq!(publish(&hub, &event).recipients, 2);
        fast.recv().await.unwrap();

        assert_eq!(publish(&hub, &event).recipients, 1);
        assert_eq!(hub.subscriber_count(Topic::ServerConfig), 2);
    }

    #[tokio::test]
    async fn test_dropped_subscription_is_pruned() {
        let hub = Hub::default();
        let sub = hub
            .subscribe(Topic::ServerConfig, identity("S1", None))
            .unwrap();
        drop(sub);

        let event: Event = ServerConfigurationChangedEvent::default().into();
        assert_eq!(publish(&hub, &event).recipients, 0);
        assert_eq!(hub.subscriber_count(Topic::ServerConfig), 0);
    }

    #[tokio::test]
    async fn test_unsubscribe() {
        let hub = Hub::default();
        let sub = hub
            .subscribe(Topic::Session, identity("S1", None))
            .unwrap();
        assert!(hub.unsubscribe(Topic::Session, sub.id()));
        assert!(!hub.unsubscribe(Topic::Session, sub.id()));
        assert_eq!(hub.subscriber_count(Topic::Session), 0);
    }

    #[tokio::test]
    async fn test_closed_hub_rejects_and_ends_streams() {
        let hub = Hub::default();
        let mut sub = hub
            .subscribe(Topic::ServerConfig, identity("S1", None))
            .unwrap();
        hub.close();

        assert!(sub.recv().await.is_none());
        let event: Event = ServerConfigurationChangedEvent::default().into();
        assert_eq!(
            hub.publish(Topic::ServerConfig, &SessionFilter::default(), &event),
            Err(DeliveryError::Closed)
        );
        assert!(matches!(
            hub.subscribe(Topic::ServerConfig, SessionFilter::default()),
            Err(DeliveryError::Closed)
        ));
    }

    #[test]
    fn test_close_racing_subscribe_ends_every_stream() {
        use tokio::sync::mpsc::error::TryRecvError;

        for _ in 0..20 {
            let hub = Arc::new(Hub::new(4));
            let subscribers: Vec<_> = (0..4)
                .map(|i| {
                    let hub = Arc::clone(&hub);
                    std::thread::spawn(move || {
                        (0..50)
                            .filter_map(|_| {
                                hub.subscribe(Topic::SessionTask, identity(&format!("S{i}"), None))
                                    .ok()
                            })
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            hub.close();

            for handle in subscribers {
                for mut sub in handle.join().unwrap() {
                    assert!(matches!(sub.rx.try_recv(), Err(TryRecvError::Disconnected)));
                }
            }
            assert_eq!(hub.subscriber_count(Topic::SessionTask), 0);
        }
    }
}
