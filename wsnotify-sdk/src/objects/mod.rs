pub mod admin;
pub mod event;
pub mod payload;
pub mod topic;
pub mod ws;

pub use event::{
    Event, EventError, EventKind, EventRecord, EventScope, RoutedEvent,
    ServerConfigurationChangedEvent, SessionExpiredEvent, SessionLogUpdatedEvent,
    SessionStateEvent, SessionTaskInfoEvent,
};
pub use payload::{
    Payload, ServerConfigurationChanged, SessionExpired, SessionLogUpdated, SessionState,
    SessionTaskInfo,
};
pub use topic::{InvalidTopicError, Topic};
pub use ws::{WsClientMessage, WsServerFrame, WsServerNotice};
