//! The contract between the publisher and whatever delivers events.

use std::sync::Arc;

use thiserror::Error;
use wsnotify_sdk::objects::{Event, RoutedEvent, Topic};

/// Errors raised by a transport.
///
/// The publisher propagates these unchanged; it never retries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// The transport has shut down and accepts no more events.
    #[error("transport is closed")]
    Closed,

    /// The transport refused the event.
    #[error("transport rejected the event: {0}")]
    Rejected(String),
}

/// Receipt for an event the transport accepted for delivery.
///
/// Acceptance does not mean any subscriber has received it yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Accepted {
    /// Subscriptions the event was queued for.
    pub recipients: usize,
}

/// Session/user identity used to match events with subscriptions.
///
/// On an event, each present field narrows delivery to subscriptions with
/// the same value. On a subscription, the fields identify who is listening.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SessionFilter {
    pub session_id: Option<String>,
    pub user_id: Option<String>,
}

impl SessionFilter {
    pub fn new(session_id: Option<String>, user_id: Option<String>) -> Self {
        Self {
            session_id,
            user_id,
        }
    }

    /// The filter derived from an event's scope.
    pub fn for_event(event: &dyn RoutedEvent) -> Self {
        Self {
            session_id: event.session_id().map(str::to_owned),
            user_id: event.user_id().map(str::to_owned),
        }
    }

    /// Whether an event filtered by `self` may reach `subscriber`.
    pub fn admits(&self, subscriber: &SessionFilter) -> bool {
        let session_ok = self
            .session_id
            .as_ref()
            .is_none_or(|id| subscriber.session_id.as_ref() == Some(id));
        let user_ok = self
            .user_id
            .as_ref()
            .is_none_or(|id| subscriber.user_id.as_ref() == Some(id));
        session_ok && user_ok
    }
}

/// Delivers events to subscribers.
///
/// `publish` is a blocking-call contract: it returns once the event has
/// been accepted (or refused) and must not wait for the actual delivery.
/// Implementations must deliver events for the same session and topic in
/// publish order.
pub trait Transport: Send + Sync {
    /// Handle returned by [`Transport::subscribe`].
    type Subscription;

    fn publish(
        &self,
        topic: Topic,
        filter: &SessionFilter,
        event: &Event,
    ) -> Result<Accepted, DeliveryError>;

    fn subscribe(
        &self,
        topic: Topic,
        filter: SessionFilter,
    ) -> Result<Self::Subscription, DeliveryError>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    type Subscription = T::Subscription;

    fn publish(
        &self,
        topic: Topic,
        filter: &SessionFilter,
        event: &Event,
    ) -> Result<Accepted, DeliveryError> {
        (**self).publish(topic, filter, event)
    }

    fn subscribe(
        &self,
        topic: Topic,
        filter: SessionFilter,
    ) -> Result<Self::Subscription, DeliveryError> {
        (**self).subscribe(topic, filter)
    }
}
