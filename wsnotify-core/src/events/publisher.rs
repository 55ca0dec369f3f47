//! The single path through which events reach a transport.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};
use wsnotify_sdk::objects::{Event, RoutedEvent, Topic};

use super::registry::TopicRegistry;
use super::transport::{Accepted, DeliveryError, SessionFilter, Transport};

/// Errors that can occur while publishing an event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PublishError {
    /// The event's topic is not enabled in the registry. The event is dropped.
    #[error("unknown topic: {0}")]
    UnknownTopic(Topic),

    /// The transport refused the event.
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

/// Validates events against the [`TopicRegistry`] and hands them to a
/// [`Transport`].
///
/// Each successful call results in exactly one `Transport::publish`. There
/// is no retry and no buffering here; both belong to the transport or the
/// caller.
pub struct Publisher<T> {
    registry: Arc<TopicRegistry>,
    transport: T,
}

impl<T: Transport> Publisher<T> {
    pub fn new(registry: Arc<TopicRegistry>, transport: T) -> Self {
        Self {
            registry,
            transport,
        }
    }

    pub fn registry(&self) -> &TopicRegistry {
        &self.registry
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Publish an event.
    ///
    /// Fails with [`PublishError::UnknownTopic`] without touching the
    /// transport if the event's topic is not enabled.
    pub fn publish(&self, event: impl Into<Event>) -> Result<Accepted, PublishError> {
        let event = event.into();
        let topic = event.topic();
        if !self.registry.contains(topic) {
            warn!(event = event.id(), %topic, "Refusing to publish to unknown topic");
            return Err(PublishError::UnknownTopic(topic));
        }

        let filter = SessionFilter::for_event(&event);
        match self.transport.publish(topic, &filter, &event) {
            Ok(accepted) => {
                debug!(
                    event = event.id(),
                    %topic,
                    session_id = ?filter.session_id,
                    user_id = ?filter.user_id,
                    recipients = accepted.recipients,
                    "Event published"
                );
                Ok(accepted)
            }
            Err(e) => {
                warn!(error = %e, event = event.id(), %topic, "Event delivery failed");
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;
    use wsnotify_sdk::objects::{
        ServerConfigurationChangedEvent, SessionTaskInfo, SessionTaskInfoEvent,
    };

    /// Transport that records every delegation.
    #[derive(Default)]
    pub(crate) struct RecordingTransport {
        pub calls: Mutex<Vec<(Topic, SessionFilter, Event)>>,
        pub fail_with: Mutex<Option<DeliveryError>>,
    }

    impl RecordingTransport {
        pub fn calls(&self) -> Vec<(Topic, SessionFilter, Event)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Transport for RecordingTransport {
        type Subscription = ();

        fn publish(
            &self,
            topic: Topic,
            filter: &SessionFilter,
            event: &Event,
        ) -> Result<Accepted, DeliveryError> {
            if let Some(err) = self.fail_with.lock().unwrap().clone() {
                return Err(err);
            }
            self.calls
                .lock()
                .unwrap()
                .push((topic, filter.clone(), event.clone()));
            Ok(Accepted { recipients: 1 })
        }

        fn subscribe(&self, _topic: Topic, _filter: SessionFilter) -> Result<(), DeliveryError> {
            Ok(())
        }
    }

    fn publisher(registry: TopicRegistry) -> Publisher<Arc<RecordingTransport>> {
        Publisher::new(Arc::new(registry), Arc::new(RecordingTransport::default()))
    }

    #[test]
    fn test_publish_delegates_once() {
        let publisher = publisher(TopicRegistry::all());
        let payload = SessionTaskInfo::new("T1", Some("queued".to_string()), true).unwrap();
        let event = SessionTaskInfoEvent::scoped(
            payload,
            Some("S1".to_string()),
            Some("alice".to_string()),
        );

        let accepted = publisher.publish(event.clone()).unwrap();
        assert_eq!(accepted.recipients, 1);

        let calls = publisher.transport().calls();
        assert_eq!(calls.len(), 1);
        let (topic, filter, published) = &calls[0];
        assert_eq!(*topic, Topic::SessionTask);
        assert_eq!(filter.session_id.as_deref(), Some("S1"));
        assert_eq!(filter.user_id.as_deref(), Some("alice"));
        assert_eq!(*published, Event::from(event));
    }

    #[test]
    fn test_broadcast_has_empty_filter() {
        let publisher = publisher(TopicRegistry::all());
        publisher
            .publish(ServerConfigurationChangedEvent::default())
            .unwrap();

        let calls = publisher.transport().calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, Topic::ServerConfig);
        assert_eq!(calls[0].1, SessionFilter::default());
    }

    #[test]
    fn test_unknown_topic_never_reaches_transport() {
        let publisher = publisher(TopicRegistry::new([Topic::SessionTask]));
        let err = publisher
            .publish(ServerConfigurationChangedEvent::default())
            .unwrap_err();
        assert_eq!(err, PublishError::UnknownTopic(Topic::ServerConfig));
        assert!(publisher.transport().calls().is_empty());
    }

    #[test]
    fn test_delivery_error_is_propagated() {
        let publisher = publisher(TopicRegistry::all());
        *publisher.transport().fail_with.lock().unwrap() = Some(DeliveryError::Closed);

        let err = publisher
            .publish(ServerConfigurationChangedEvent::default())
            .unwrap_err();
        assert_eq!(err, PublishError::Delivery(DeliveryError::Closed));
    }
}
