//! WebSocket client for the event stream.
//!
//! Gated behind the `client` cargo feature so crates that only need the
//! event model do not pull in `tokio-tungstenite`.

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use url::Url;

use crate::objects::{Event, EventError, Topic, WsClientMessage, WsServerFrame, WsServerNotice};

/// Errors produced by [`EventClient`].
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport-level failure (DNS, TLS, connection reset, …).
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// A frame could not be encoded or decoded.
    #[error("event error: {0}")]
    Event(#[from] EventError),

    /// The server rejected a client message.
    #[error("server error: {0}")]
    Server(String),

    /// The base URL could not be joined with the endpoint path.
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}

/// Typed consumer of the `GET /ws` event stream.
pub struct EventClient {
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl EventClient {
    /// Connect to the event stream.
    ///
    /// * `base_url` – root `ws://` or `wss://` URL of the server.
    /// * `session_id` – session this connection belongs to. The server
    ///   assigns one if `None`.
    /// * `user_id` – authenticated user, if any.
    pub async fn connect(
        base_url: &Url,
        session_id: Option<&str>,
        user_id: Option<&str>,
    ) -> Result<Self, ClientError> {
        let mut url = base_url.join("/ws")?;
        {
            let mut query = url.query_pairs_mut();
            if let Some(session_id) = session_id {
                query.append_pair("sessionId", session_id);
            }
            if let Some(user_id) = user_id {
                query.append_pair("userId", user_id);
            }
        }

        let (socket, _response) = connect_async(url.as_str()).await?;
        tracing::debug!(%url, "connected to event stream");
        Ok(Self { socket })
    }

    pub async fn subscribe(&mut self, topic: Topic) -> Result<(), ClientError> {
        self.send(&WsClientMessage::TopicSubscribe {
            topic_id: topic.as_str().to_owned(),
        })
        .await
    }

    pub async fn unsubscribe(&mut self, topic: Topic) -> Result<(), ClientError> {
        self.send(&WsClientMessage::TopicUnsubscribe {
            topic_id: topic.as_str().to_owned(),
        })
        .await
    }

    async fn send(&mut self, message: &WsClientMessage) -> Result<(), ClientError> {
        let json = serde_json::to_string(message).map_err(EventError::from)?;
        self.socket.send(Message::Text(json)).await?;
        Ok(())
    }

    /// Wait for the next frame from the server.
    ///
    /// Returns `Ok(None)` once the server closes the connection.
    pub async fn next_frame(&mut self) -> Result<Option<WsServerFrame>, ClientError> {
        while let Some(message) = self.socket.next().await {
            match message? {
                Message::Text(text) => return Ok(Some(WsServerFrame::parse(&text)?)),
                Message::Close(_) => return Ok(None),
                _ => continue,
            }
        }
        Ok(None)
    }

    /// Wait for the next event, turning server notices into errors.
    pub async fn next_event(&mut self) -> Result<Option<Event>, ClientError> {
        match self.next_frame().await? {
            Some(WsServerFrame::Event(event)) => Ok(Some(event)),
            Some(WsServerFrame::Notice(WsServerNotice::Error { message })) => {
                Err(ClientError::Server(message))
            }
            None => Ok(None),
        }
    }

    /// Close the connection.
    pub async fn close(mut self) -> Result<(), ClientError> {
        self.socket.close(None).await?;
        Ok(())
    }
}
