/// Live board updates over WebSocket
///
/// # Endpoint
///
/// `GET /ws/boards/:board_id?token=<access token>`
///
/// The upgrade is always accepted. The token and membership are then
/// checked; a rejected client gets a close frame and is never registered:
///
/// | Close code | Meaning |
/// |---|---|
/// | 4001 | missing, invalid or expired token |
/// | 4003 | not a member of the board |
/// | 1011 | membership lookup failed |
///
/// An admitted client receives every board event as a JSON text frame:
///
/// ```text
/// {"type":"card_moved","data":{"card_id":"…","from_column":"…","to_column":"…","position":0}}
/// ```
///
/// The server pings on an interval. Inbound frames other than close are
/// ignored.

use crate::app::AppState;
use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use std::borrow::Cow;
use std::time::Duration;
use taskboard_shared::{
    events::BoardEvent,
    live::{admit, LiveSubscription},
};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Sent when the server drops the connection (shutdown or slow client)
pub const CLOSE_GOING_AWAY: u16 = 1001;

/// Handshake query parameters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LiveQuery {
    /// Access token; browsers cannot set headers on WebSocket requests
    pub token: Option<String>,
}

/// Upgrade handler for `GET /ws/boards/:board_id`
pub async fn board_socket(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(board_id): Path<Uuid>,
    Query(query): Query<LiveQuery>,
) -> Response {
    ws.on_upgrade(move |socket| session(socket, state, board_id, query.token))
}

/// Close frame with a static reason
pub fn close_message(code: u16, reason: &'static str) -> Message {
    Message::Close(Some(CloseFrame {
        code,
        reason: Cow::Borrowed(reason),
    }))
}

/// Text frame for one event, `None` if it cannot be serialized
pub fn event_frame(event: &BoardEvent) -> Option<Message> {
    match event.to_json() {
        Ok(json) => Some(Message::Text(json)),
        Err(e) => {
            warn!(kind = event.kind(), error = %e, "Failed to serialize board event");
            None
        }
    }
}

async fn session(mut socket: WebSocket, state: AppState, board_id: Uuid, token: Option<String>) {
    let admission = match admit(state.store.as_ref(), state.jwt_secret(), board_id, token.as_deref()).await {
        Ok(admission) => admission,
        Err(rejection) => {
            info!(
                board_id = %board_id,
                code = rejection.close_code(),
                reason = rejection.reason(),
                "Live connection rejected"
            );
            if let Err(e) = socket
                .send(close_message(rejection.close_code(), rejection.reason()))
                .await
            {
                debug!(board_id = %board_id, error = %e, "Failed to send close frame");
            }
            return;
        }
    };

    let subscription = state.broadcaster.register(board_id).await;
    let connection = subscription.id;
    info!(
        board_id = %board_id,
        user_id = %admission.auth.user_id,
        role = %admission.membership.role,
        connection = %connection,
        "Live connection opened"
    );

    let heartbeat = Duration::from_secs(state.config.live.heartbeat_secs.max(1));
    pump(socket, subscription, heartbeat).await;

    state.broadcaster.unregister(board_id, connection).await;
    info!(board_id = %board_id, connection = %connection, "Live connection closed");
}

/// Forwards events to the client until either side goes away
async fn pump(socket: WebSocket, mut subscription: LiveSubscription, heartbeat: Duration) {
    let (mut sink, mut inbound) = socket.split();

    let mut ticker = tokio::time::interval(heartbeat);
    // First tick completes immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            event = subscription.receiver.recv() => {
                let Some(event) = event else {
                    // Dropped from the registry
                    if let Err(e) = sink.send(close_message(CLOSE_GOING_AWAY, "server closing connection")).await {
                        debug!(connection = %subscription.id, error = %e, "Failed to send close frame");
                    }
                    break;
                };

                let Some(frame) = event_frame(&event) else {
                    continue;
                };

                if sink.send(frame).await.is_err() {
                    break;
                }
            }

            _ = ticker.tick() => {
                if sink.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }

            frame = inbound.next() => {
                match frame {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!(connection = %subscription.id, error = %e, "Live connection read failed");
                        break;
                    }
                }
            }
        }
    }
}
