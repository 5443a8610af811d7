//! Websocket endpoint for live activity feeds
//!
//! Clients authenticate during the HTTP handshake (Authorization header, or
//! `?token=` for browser clients that cannot set headers on websocket
//! upgrades), then drive room membership with subscribe/unsubscribe frames.
//! Membership in the target organization is re-verified on every join, and
//! join failures are answered with one generic error frame so the socket
//! cannot be used to probe which organizations exist.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::domain::Principal;
use crate::middleware::auth::{classify_verification_error, extract_bearer_token, AuthError};
use crate::realtime::hub::ConnectionId;
use crate::repository::{MembershipRepository, OrganizationRepository};
use crate::server::AppState;

/// Frames accepted from clients.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientMessage {
    Subscribe { room: String },
    Unsubscribe { room: String },
}

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    token: Option<String>,
}

fn error_frame() -> String {
    serde_json::json!({ "event": "error", "message": "cannot join room" }).to_string()
}

fn ack_frame(event: &str, room: &str) -> String {
    serde_json::json!({ "event": event, "room": room }).to_string()
}

/// GET /api/v1/ws
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
    headers: HeaderMap,
) -> Response {
    let token = match extract_bearer_token(&headers) {
        Ok(token) => token.to_string(),
        Err(_) => match query.token {
            Some(token) => token,
            None => return AuthError::MissingToken.into_response(),
        },
    };

    let principal = match state
        .jwt_manager
        .verify_access_token(&token)
        .map_err(classify_verification_error)
        .and_then(|claims| claims.principal().map_err(|_| AuthError::InvalidToken))
    {
        Ok(principal) => principal,
        Err(e) => return e.into_response(),
    };

    ws.on_upgrade(move |socket| handle_socket(socket, state, principal))
}

async fn handle_socket(socket: WebSocket, state: AppState, principal: Principal) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    let conn_id = state.hub.register(tx.clone()).await;
    tracing::debug!(connection_id = %conn_id, user_id = %principal.user_id, "websocket connected");

    // Writer task: everything the hub (or this loop) enqueues goes out in
    // order. It ends when all senders are gone or the peer stops reading.
    let writer = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if sink.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(msg) = stream.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                handle_client_frame(&state, conn_id, &principal, &tx, &text).await;
            }
            Ok(Message::Close(_)) | Err(_) => break,
            _ => {}
        }
    }

    state.hub.disconnect(conn_id).await;
    drop(tx);
    let _ = writer.await;
    tracing::debug!(connection_id = %conn_id, "websocket disconnected");
}

async fn handle_client_frame(
    state: &AppState,
    conn_id: ConnectionId,
    principal: &Principal,
    tx: &mpsc::UnboundedSender<String>,
    text: &str,
) {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage::Subscribe { room }) => {
            let allowed = member_of_room(state, principal.user_id, &room).await;
            if allowed && state.hub.subscribe(conn_id, &room).await.is_ok() {
                let _ = tx.send(ack_frame("subscribed", &room));
            } else {
                let _ = tx.send(error_frame());
            }
        }
        Ok(ClientMessage::Unsubscribe { room }) => {
            state.hub.unsubscribe(conn_id).await;
            let _ = tx.send(ack_frame("unsubscribed", &room));
        }
        Err(_) => {
            let _ = tx.send(
                serde_json::json!({ "event": "error", "message": "unsupported message" })
                    .to_string(),
            );
        }
    }
}

/// Join check: the room key is the organization slug, and the caller must
/// currently be a member. Unknown slug and non-membership are deliberately
/// indistinguishable to the client.
async fn member_of_room(state: &AppState, user_id: Uuid, room: &str) -> bool {
    let org = match state.organizations.find_by_slug(room).await {
        Ok(Some(org)) => org,
        Ok(None) => return false,
        Err(e) => {
            tracing::warn!(error = %e, room = %room, "room lookup failed");
            return false;
        }
    };

    match state.memberships.find_role(user_id, org.id).await {
        Ok(Some(_)) => true,
        Ok(None) => false,
        Err(e) => {
            tracing::warn!(error = %e, room = %room, "membership check failed");
            false
        }
    }
}
