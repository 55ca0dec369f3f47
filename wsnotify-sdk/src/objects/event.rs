//! The event taxonomy.
//!
//! An event is an [`EventRecord`] over one of the payload types in
//! [`super::payload`]. The payload type fixes the event's [`EventKind`],
//! and the kind fixes the `id` and `topic`, so neither can be chosen (or
//! mistyped) at a call site. [`Event`] is the closed sum of all records and
//! is what the publisher and the transports pass around.
//!
//! # Wire format
//!
//! ```json
//! {"id":"cb_session_task_info_updated","topic":"cb_session_task","sessionId":"S1","taskId":"T42","statusName":"running","running":true}
//! ```
//!
//! `sessionId`, `userId` and `statusName` are omitted when absent.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::payload::{
    Payload, ServerConfigurationChanged, SessionExpired, SessionLogUpdated, SessionState,
    SessionTaskInfo,
};
use super::topic::{InvalidTopicError, Topic};

/// Errors produced while building or decoding events.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("task id must not be empty")]
    EmptyTaskId,

    #[error("unknown event id: {0}")]
    UnknownEventId(String),

    #[error("event {id} belongs to topic {expected}, got {actual}")]
    TopicMismatch {
        id: &'static str,
        expected: Topic,
        actual: Topic,
    },

    #[error(transparent)]
    InvalidTopic(#[from] InvalidTopicError),

    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Identity of an event variant.
///
/// Each kind owns one `id` string and one [`Topic`]. Ids are never reused:
/// a new kind of event gets a new variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ServerConfigurationChanged,
    SessionTaskInfoUpdated,
    SessionExpired,
    SessionState,
    SessionLogUpdated,
}

impl EventKind {
    pub const ALL: [EventKind; 5] = [
        EventKind::ServerConfigurationChanged,
        EventKind::SessionTaskInfoUpdated,
        EventKind::SessionExpired,
        EventKind::SessionState,
        EventKind::SessionLogUpdated,
    ];

    pub const fn id(self) -> &'static str {
        match self {
            EventKind::ServerConfigurationChanged => "cb_config_changed",
            EventKind::SessionTaskInfoUpdated => "cb_session_task_info_updated",
            EventKind::SessionExpired => "cb_session_expired",
            EventKind::SessionState => "cb_session_state",
            EventKind::SessionLogUpdated => "cb_session_log_updated",
        }
    }

    pub const fn topic(self) -> Topic {
        match self {
            EventKind::ServerConfigurationChanged => Topic::ServerConfig,
            EventKind::SessionTaskInfoUpdated => Topic::SessionTask,
            EventKind::SessionExpired | EventKind::SessionState => Topic::Session,
            EventKind::SessionLogUpdated => Topic::SessionLog,
        }
    }

    /// Look up a kind by its wire id.
    pub fn from_id(id: &str) -> Option<Self> {
        EventKind::ALL.into_iter().find(|kind| kind.id() == id)
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// Optional session/user scope of an event.
///
/// An empty scope means the event is broadcast to every subscriber of its
/// topic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventScope {
    #[serde(skip_serializing_if = "Option::is_none")]
    session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_id: Option<String>,
}

impl EventScope {
    /// Build a scope. Empty strings are treated as absent.
    pub fn new(session_id: Option<String>, user_id: Option<String>) -> Self {
        Self {
            session_id: session_id.filter(|s| !s.is_empty()),
            user_id: user_id.filter(|u| !u.is_empty()),
        }
    }

    /// The scope of a broadcast event.
    pub fn broadcast() -> Self {
        Self::default()
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn is_broadcast(&self) -> bool {
        self.session_id.is_none() && self.user_id.is_none()
    }
}

/// Routing view shared by every event.
///
/// Code that only decides *where* an event goes depends on this trait and
/// never on the concrete variant.
pub trait RoutedEvent {
    fn kind(&self) -> EventKind;

    fn scope(&self) -> &EventScope;

    fn id(&self) -> &'static str {
        self.kind().id()
    }

    fn topic(&self) -> Topic {
        self.kind().topic()
    }

    fn session_id(&self) -> Option<&str> {
        self.scope().session_id()
    }

    fn user_id(&self) -> Option<&str> {
        self.scope().user_id()
    }
}

/// An immutable event: a payload plus its scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord<P> {
    scope: EventScope,
    payload: P,
}

pub type ServerConfigurationChangedEvent = EventRecord<ServerConfigurationChanged>;
pub type SessionTaskInfoEvent = EventRecord<SessionTaskInfo>;
pub type SessionExpiredEvent = EventRecord<SessionExpired>;
pub type SessionStateEvent = EventRecord<SessionState>;
pub type SessionLogUpdatedEvent = EventRecord<SessionLogUpdated>;

impl<P: Payload> EventRecord<P> {
    /// An unscoped (broadcast) event.
    pub fn new(payload: P) -> Self {
        Self::with_scope(payload, EventScope::broadcast())
    }

    /// An event restricted to a session and/or user.
    pub fn scoped(payload: P, session_id: Option<String>, user_id: Option<String>) -> Self {
        Self::with_scope(payload, EventScope::new(session_id, user_id))
    }

    pub fn with_scope(payload: P, scope: EventScope) -> Self {
        Self { scope, payload }
    }

    pub fn payload(&self) -> &P {
        &self.payload
    }
}

impl<P: Payload + Default> Default for EventRecord<P> {
    fn default() -> Self {
        Self::new(P::default())
    }
}

impl<P: Payload> RoutedEvent for EventRecord<P> {
    fn kind(&self) -> EventKind {
        P::KIND
    }

    fn scope(&self) -> &EventScope {
        &self.scope
    }
}

#[derive(Serialize)]
struct Envelope<'a, P> {
    id: &'static str,
    topic: Topic,
    #[serde(flatten)]
    scope: &'a EventScope,
    #[serde(flatten)]
    payload: &'a P,
}

impl<P: Payload> Serialize for EventRecord<P> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Envelope {
            id: P::KIND.id(),
            topic: P::KIND.topic(),
            scope: &self.scope,
            payload: &self.payload,
        }
        .serialize(serializer)
    }
}

/// Any event of the taxonomy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    ServerConfigurationChanged(ServerConfigurationChangedEvent),
    SessionTaskInfoUpdated(SessionTaskInfoEvent),
    SessionExpired(SessionExpiredEvent),
    SessionState(SessionStateEvent),
    SessionLogUpdated(SessionLogUpdatedEvent),
}

impl Event {
    fn routed(&self) -> &dyn RoutedEvent {
        match self {
            Event::ServerConfigurationChanged(e) => e,
            Event::SessionTaskInfoUpdated(e) => e,
            Event::SessionExpired(e) => e,
            Event::SessionState(e) => e,
            Event::SessionLogUpdated(e) => e,
        }
    }

    /// Serialize to the wire JSON string.
    pub fn to_json(&self) -> Result<String, EventError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a wire JSON string.
    pub fn from_json(json: &str) -> Result<Self, EventError> {
        let raw: RawEvent = serde_json::from_str(json)?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawEvent) -> Result<Self, EventError> {
        let kind = EventKind::from_id(&raw.id).ok_or(EventError::UnknownEventId(raw.id))?;
        let topic: Topic = raw.topic.parse()?;
        if topic != kind.topic() {
            return Err(EventError::TopicMismatch {
                id: kind.id(),
                expected: kind.topic(),
                actual: topic,
            });
        }

        let payload = serde_json::Value::Object(raw.payload);
        let scope = EventScope::new(raw.scope.session_id, raw.scope.user_id);
        let event = match kind {
            EventKind::ServerConfigurationChanged => Event::ServerConfigurationChanged(
                EventRecord::with_scope(serde_json::from_value(payload)?, scope),
            ),
            EventKind::SessionTaskInfoUpdated => Event::SessionTaskInfoUpdated(
                EventRecord::with_scope(serde_json::from_value(payload)?, scope),
            ),
            EventKind::SessionExpired => Event::SessionExpired(EventRecord::with_scope(
                serde_json::from_value(payload)?,
                scope,
            )),
            EventKind::SessionState => Event::SessionState(EventRecord::with_scope(
                serde_json::from_value(payload)?,
                scope,
            )),
            EventKind::SessionLogUpdated => Event::SessionLogUpdated(EventRecord::with_scope(
                serde_json::from_value(payload)?,
                scope,
            )),
        };
        Ok(event)
    }
}

impl RoutedEvent for Event {
    fn kind(&self) -> EventKind {
        self.routed().kind()
    }

    fn scope(&self) -> &EventScope {
        self.routed().scope()
    }
}

impl From<ServerConfigurationChangedEvent> for Event {
    fn from(event: ServerConfigurationChangedEvent) -> Self {
        Event::ServerConfigurationChanged(event)
    }
}

impl From<SessionTaskInfoEvent> for Event {
    fn from(event: SessionTaskInfoEvent) -> Self {
        Event::SessionTaskInfoUpdated(event)
    }
}

impl From<SessionExpiredEvent> for Event {
    fn from(event: SessionExpiredEvent) -> Self {
        Event::SessionExpired(event)
    }
}

impl From<SessionStateEvent> for Event {
    fn from(event: SessionStateEvent) -> Self {
        Event::SessionState(event)
    }
}

impl From<SessionLogUpdatedEvent> for Event {
    fn from(event: SessionLogUpdatedEvent) -> Self {
        Event::SessionLogUpdated(event)
    }
}

impl Serialize for Event {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Event::ServerConfigurationChanged(e) => e.serialize(serializer),
            Event::SessionTaskInfoUpdated(e) => e.serialize(serializer),
            Event::SessionExpired(e) => e.serialize(serializer),
            Event::SessionState(e) => e.serialize(serializer),
            Event::SessionLogUpdated(e) => e.serialize(serializer),
        }
    }
}

/// Routing fields plus whatever is left over for the payload.
#[derive(Deserialize)]
struct RawEvent {
    id: String,
    topic: String,
    #[serde(flatten)]
    scope: EventScope,
    #[serde(flatten)]
    payload: serde_json::Map<String, serde_json::Value>,
}

impl<'de> Deserialize<'de> for Event {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawEvent::deserialize(deserializer)?;
        Event::from_raw(raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_config_changed_identity() {
        let event = ServerConfigurationChangedEvent::default();
        assert_eq!(event.id(), "cb_config_changed");
        assert_eq!(event.topic(), Topic::ServerConfig);
        assert_eq!(event.session_id(), None);
        assert_eq!(event.user_id(), None);
    }

    #[test]
    fn test_identity_is_constructor_independent() {
        let payload = SessionTaskInfo::new("T1", None, true).unwrap();
        let plain = SessionTaskInfoEvent::new(payload.clone());
        let scoped = SessionTaskInfoEvent::scoped(
            payload,
            Some("S1".to_string()),
            Some("alice".to_string()),
        );
        assert_eq!(plain.id(), scoped.id());
        assert_eq!(plain.topic(), scoped.topic());
        assert_eq!(scoped.topic(), Topic::SessionTask);

        let plain = ServerConfigurationChangedEvent::new(ServerConfigurationChanged::default());
        let scoped = ServerConfigurationChangedEvent::scoped(
            ServerConfigurationChanged::default(),
            Some("S1".to_string()),
            None,
        );
        assert_eq!(plain.id(), scoped.id());
        assert_eq!(plain.topic(), scoped.topic());
    }

    #[test]
    fn test_scope_accessors() {
        let event = SessionExpiredEvent::scoped(
            SessionExpired::default(),
            Some("S1".to_string()),
            Some("alice".to_string()),
        );
        assert_eq!(event.session_id(), Some("S1"));
        assert_eq!(event.user_id(), Some("alice"));

        let event = SessionExpiredEvent::default();
        assert_eq!(event.session_id(), None);
        assert_eq!(event.user_id(), None);
        assert!(event.scope().is_broadcast());
    }

    #[test]
    fn test_empty_scope_strings_are_absent() {
        let scope = EventScope::new(Some(String::new()), Some(String::new()));
        assert!(scope.is_broadcast());
    }

    #[test]
    fn test_task_info_serialization() {
        let payload = SessionTaskInfo::new("T42", Some("running".to_string()), true).unwrap();
        let event: Event = SessionTaskInfoEvent::new(payload).into();
        let value: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({
                "id": "cb_session_task_info_updated",
                "topic": "cb_session_task",
                "taskId": "T42",
                "statusName": "running",
                "running": true,
            })
        );
    }

    #[test]
    fn test_absent_fields_are_omitted() {
        let payload = SessionTaskInfo::new("T7", None, false).unwrap();
        let event = SessionTaskInfoEvent::scoped(payload, Some("S1".to_string()), None);
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""sessionId":"S1""#));
        assert!(!json.contains("userId"));
        assert!(!json.contains("statusName"));
        assert!(!json.contains("null"));
    }

    #[test]
    fn test_parse_wire_event() {
        let json = r#"{"id":"cb_session_state","topic":"cb_session","sessionId":"S9","lastAccessTime":100,"remainingTime":60,"isValid":true}"#;
        let event = Event::from_json(json).unwrap();
        assert_eq!(event.kind(), EventKind::SessionState);
        assert_eq!(event.session_id(), Some("S9"));
        let Event::SessionState(state) = &event else {
            panic!("expected session state, got {event:?}");
        };
        assert_eq!(state.payload().remaining_time, 60);
        assert_eq!(event.to_json().unwrap(), json);
    }

    #[test]
    fn test_parse_drops_empty_scope_strings() {
        let event =
            Event::from_json(r#"{"id":"cb_session_expired","topic":"cb_session","sessionId":""}"#)
                .unwrap();
        assert!(event.scope().is_broadcast());
    }

    #[test]
    fn test_parse_rejects_unknown_id() {
        let err = Event::from_json(r#"{"id":"cb_nope","topic":"cb_config"}"#).unwrap_err();
        assert!(matches!(err, EventError::UnknownEventId(id) if id == "cb_nope"));
    }

    #[test]
    fn test_parse_rejects_topic_mismatch() {
        let err =
            Event::from_json(r#"{"id":"cb_config_changed","topic":"cb_session"}"#).unwrap_err();
        assert!(matches!(
            err,
            EventError::TopicMismatch {
                expected: Topic::ServerConfig,
                actual: Topic::Session,
                ..
            }
        ));
    }

    #[test]
    fn test_every_kind_has_unique_id() {
        let mut ids: Vec<_> = EventKind::ALL.iter().map(|k| k.id()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), EventKind::ALL.len());
        for kind in EventKind::ALL {
            assert_eq!(EventKind::from_id(kind.id()), Some(kind));
        }
    }
}
