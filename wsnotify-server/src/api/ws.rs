use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_stream::{StreamExt, StreamMap, wrappers::ReceiverStream};
use uuid::Uuid;
use wsnotify_core::events::{SessionFilter, Transport};
use wsnotify_sdk::objects::{Event, Topic, WsClientMessage, WsServerNotice};

use crate::state::AppState;

/// Identity a connection declares when it opens the event stream.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WsParams {
    session_id: Option<String>,
    user_id: Option<String>,
}

/// `GET /ws`: WebSocket event stream.
///
/// Upgrades the HTTP connection to a WebSocket. The connection belongs to
/// the `sessionId` query parameter (a fresh UUID when absent) and
/// optionally to `userId`; both decide which scoped events it receives.
pub(crate) async fn event_stream_ws(
    state: State<AppState>,
    Query(params): Query<WsParams>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let session_id = params
        .session_id
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let identity = SessionFilter::new(
        Some(session_id),
        params.user_id.filter(|u| !u.is_empty()),
    );
    let app_state = state.0.clone();
    ws.on_upgrade(move |socket| handle_event_ws(socket, app_state, identity))
}

/// Topic subscriptions held by one connection.
struct ConnectionSubscriptions {
    streams: StreamMap<Topic, ReceiverStream<Arc<Event>>>,
    ids: HashMap<Topic, Uuid>,
}

impl ConnectionSubscriptions {
    fn new() -> Self {
        Self {
            streams: StreamMap::new(),
            ids: HashMap::new(),
        }
    }

    /// Drop every subscription this connection still holds on the hub.
    fn release(self, state: &AppState) {
        for (topic, id) in self.ids {
            state.hub.unsubscribe(topic, id);
        }
    }
}

/// Background task that drives a single WebSocket connection.
///
/// Multiplexes the connection's topic subscriptions onto the socket and
/// applies subscribe/unsubscribe requests from the client until either side
/// goes away.
async fn handle_event_ws(mut socket: WebSocket, state: AppState, identity: SessionFilter) {
    tracing::debug!(
        session_id = ?identity.session_id,
        user_id = ?identity.user_id,
        "WS: event stream opened"
    );
    let mut subs = ConnectionSubscriptions::new();

    loop {
        tokio::select! {
            Some((_, event)) = subs.streams.next(), if !subs.streams.is_empty() => {
                if send_json(&mut socket, &*event).await.is_err() {
                    break;
                }
            }

            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let reply = handle_client_message(text.as_str(), &state, &identity, &mut subs);
                        if let Err(notice) = reply {
                            if send_json(&mut socket, &notice).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::debug!(error = %e, "WS: receive failed");
                        break;
                    }
                }
            }
        }
    }

    subs.release(&state);
    tracing::debug!(session_id = ?identity.session_id, "WS: event stream closed");
}

/// Apply one client message. A rejected message yields the notice to send back.
fn handle_client_message(
    text: &str,
    state: &AppState,
    identity: &SessionFilter,
    subs: &mut ConnectionSubscriptions,
) -> Result<(), WsServerNotice> {
    let message: WsClientMessage = serde_json::from_str(text)
        .map_err(|e| error_notice(format!("invalid client message: {e}")))?;

    match message {
        WsClientMessage::TopicSubscribe { topic_id } => {
            let topic = state
                .publisher
                .registry()
                .resolve(&topic_id)
                .map_err(|e| error_notice(e.to_string()))?;
            // A stream that ended is gone from `streams` but its id may linger.
            if subs.streams.contains_key(&topic) {
                return Ok(());
            }
            let subscription = state
                .hub
                .subscribe(topic, identity.clone())
                .map_err(|e| error_notice(e.to_string()))?;
            if let Some(stale) = subs.ids.insert(topic, subscription.id()) {
                state.hub.unsubscribe(topic, stale);
            }
            subs.streams.insert(topic, subscription.into_stream());
            tracing::debug!(%topic, session_id = ?identity.session_id, "WS: subscribed");
        }
        WsClientMessage::TopicUnsubscribe { topic_id } => {
            let topic = state
                .publisher
                .registry()
                .resolve(&topic_id)
                .map_err(|e| error_notice(e.to_string()))?;
            subs.streams.remove(&topic);
            if let Some(id) = subs.ids.remove(&topic) {
                state.hub.unsubscribe(topic, id);
                tracing::debug!(%topic, session_id = ?identity.session_id, "WS: unsubscribed");
            }
        }
    }
    Ok(())
}

fn error_notice(message: String) -> WsServerNotice {
    WsServerNotice::Error { message }
}

/// Serialize `value` as JSON and send it as a text WebSocket frame.
///
/// Returns `Err(())` if the send fails (client disconnected).
async fn send_json<T: serde::Serialize + ?Sized>(
    socket: &mut WebSocket,
    value: &T,
) -> Result<(), ()> {
    let json = serde_json::to_string(value).map_err(|_| ())?;
    socket
        .send(Message::Text(json.into()))
        .await
        .map_err(|_| ())
}
