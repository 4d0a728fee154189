//! WebSocket transport.
//!
//! Each socket gets a writer half fed by its bounded outbound queue and a
//! reader half that hands text frames to the gateway. Binary frames holding
//! UTF-8 are routed like text. The upgrade always succeeds; an invalid token
//! is answered with a policy close and no application frames.

use std::sync::Arc;

use axum::{
    extract::{
        Query, State, WebSocketUpgrade,
        ws::{CloseFrame, Message, WebSocket, close_code},
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::{AppState, gateway::Outbound};

/// Query string presented on `/ws`.
#[derive(Debug, Deserialize)]
pub(crate) struct ConnectParams {
    token: Option<String>,
}

pub(crate) async fn ws_upgrade_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<ConnectParams>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.max_message_size(state.max_frame_bytes)
        .on_upgrade(move |socket| handle_socket(socket, state, params.token))
}

async fn handle_socket(mut socket: WebSocket, state: AppState, token: Option<String>) {
    let (tx, mut rx) = mpsc::channel::<Outbound>(state.outbound_queue);

    let session = state.gateway.lock().await.connect(token.as_deref(), tx);
    let (conn_id, code) = match session {
        Ok(session) => session,
        Err(e) => {
            tracing::debug!("handshake refused: {}", e);
            let close = CloseFrame { code: close_code::POLICY, reason: "unauthorized".into() };
            let _ = socket.send(Message::Close(Some(close))).await;
            return;
        },
    };

    let (mut ws_sender, mut ws_receiver) = socket.split();

    let writer = async move {
        while let Some(item) = rx.recv().await {
            match item {
                Outbound::Text(text) => {
                    if ws_sender.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                },
                Outbound::Close(reason) => {
                    let close = CloseFrame { code: close_code::NORMAL, reason: reason.into() };
                    let _ = ws_sender.send(Message::Close(Some(close))).await;
                    break;
                },
            }
        }
    };

    let gateway = Arc::clone(&state.gateway);
    let reader_code = code.clone();
    let reader = async move {
        while let Some(msg) = ws_receiver.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    gateway.lock().await.handle_text(conn_id, &reader_code, text.as_str());
                },
                Ok(Message::Binary(bytes)) => match std::str::from_utf8(&bytes) {
                    Ok(text) => gateway.lock().await.handle_text(conn_id, &reader_code, text),
                    Err(_) => tracing::debug!(conn_id = %conn_id, "non-utf8 binary dropped"),
                },
                Ok(Message::Close(_)) => break,
                Ok(_) => {},
                Err(e) => {
                    tracing::debug!(conn_id = %conn_id, "websocket error: {}", e);
                    break;
                },
            }
        }
    };

    tokio::select! {
        () = writer => tracing::debug!(conn_id = %conn_id, "writer ended"),
        () = reader => tracing::debug!(conn_id = %conn_id, "reader ended"),
    }

    state.gateway.lock().await.disconnect(conn_id, &code);
}
