//! WebSocket message types for the event stream.
//!
//! The `GET /ws` endpoint upgrades to a WebSocket connection. After the
//! upgrade:
//!
//! 1. The client sends [`WsClientMessage`] frames to subscribe to and
//!    unsubscribe from topics.
//! 2. The server pushes one JSON text frame per [`Event`] on the topics the
//!    connection is subscribed to, filtered by the connection's session and
//!    user.
//! 3. A client message the server cannot act on is answered with a
//!    [`WsServerNotice::Error`] frame; the connection stays open.

use serde::{Deserialize, Serialize};

use super::event::{Event, EventError};

/// Id of the server error frame.
pub const SERVER_ERROR_ID: &str = "cb_server_error";

/// Client-to-server WebSocket message.
///
/// ```json
/// {"id":"cb_client_topic_subscribe","topicId":"cb_session_task"}
/// {"id":"cb_client_topic_unsubscribe","topicId":"cb_session_task"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "id")]
pub enum WsClientMessage {
    #[serde(rename = "cb_client_topic_subscribe", rename_all = "camelCase")]
    TopicSubscribe { topic_id: String },

    #[serde(rename = "cb_client_topic_unsubscribe", rename_all = "camelCase")]
    TopicUnsubscribe { topic_id: String },
}

/// Server-to-client frame that is not an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "id")]
pub enum WsServerNotice {
    /// A client message was rejected. Does not close the connection.
    #[serde(rename = "cb_server_error")]
    Error { message: String },
}

/// Anything the server may send over the event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WsServerFrame {
    Event(Event),
    Notice(WsServerNotice),
}

impl WsServerFrame {
    /// Decode a text frame received from the server.
    pub fn parse(text: &str) -> Result<Self, EventError> {
        #[derive(Deserialize)]
        struct Peek<'a> {
            #[serde(borrow)]
            id: std::borrow::Cow<'a, str>,
        }

        let peek: Peek<'_> = serde_json::from_str(text)?;
        if peek.id == SERVER_ERROR_ID {
            Ok(WsServerFrame::Notice(serde_json::from_str(text)?))
        } else {
            Ok(WsServerFrame::Event(Event::from_json(text)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::event::{RoutedEvent, ServerConfigurationChangedEvent};

    #[test]
    fn test_client_message_format() {
        let msg = WsClientMessage::TopicSubscribe {
            topic_id: "cb_session_task".to_string(),
        };
        assert_eq!(
            serde_json::to_string(&msg).unwrap(),
            r#"{"id":"cb_client_topic_subscribe","topicId":"cb_session_task"}"#
        );

        let parsed: WsClientMessage =
            serde_json::from_str(r#"{"id":"cb_client_topic_unsubscribe","topicId":"cb_config"}"#)
                .unwrap();
        assert_eq!(
            parsed,
            WsClientMessage::TopicUnsubscribe {
                topic_id: "cb_config".to_string()
            }
        );
    }

    #[test]
    fn test_parse_server_frames() {
        let notice = WsServerFrame::parse(r#"{"id":"cb_server_error","message":"nope"}"#).unwrap();
        assert_eq!(
            notice,
            WsServerFrame::Notice(WsServerNotice::Error {
                message: "nope".to_string()
            })
        );

        let json = serde_json::to_string(&ServerConfigurationChangedEvent::default()).unwrap();
        let WsServerFrame::Event(event) = WsServerFrame::parse(&json).unwrap() else {
            panic!("expected an event frame");
        };
        assert_eq!(event.id(), "cb_config_changed");
    }
}
