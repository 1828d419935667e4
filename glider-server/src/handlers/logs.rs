use std::sync::Arc;

use axum::{
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use glider_core::LogChannel;
use glider_model::BuildId;
use tracing::{debug, warn};

use super::parse_build_id;
use crate::infra::{app_state::AppState, errors::AppResult};

/// Producer side: every frame received becomes one log chunk.
pub async fn log_input(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let id = parse_build_id(&id)?;
    let log = state.coordinator().log_channel(&id)?;
    Ok(ws.on_upgrade(move |socket| handle_log_input(socket, id, log)))
}

async fn handle_log_input(
    mut socket: WebSocket,
    id: BuildId,
    log: Arc<LogChannel>,
) {
    while let Some(msg) = socket.recv().await {
        let chunk = match msg {
            Ok(Message::Binary(bytes)) => bytes,
            Ok(Message::Text(text)) => {
                Bytes::copy_from_slice(text.as_str().as_bytes())
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(err) => {
                warn!(build_id = %id, error = %err, "log input stream failed");
                break;
            }
        };

        if !log.append(chunk) {
            debug!(build_id = %id, "log closed; dropping producer");
            break;
        }
    }
}

/// Observer side: replays history, then follows the log until it closes.
pub async fn log_output(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let id = parse_build_id(&id)?;
    let log = state.coordinator().log_channel(&id)?;
    Ok(ws.on_upgrade(move |socket| handle_log_output(socket, id, log)))
}

async fn handle_log_output(
    socket: WebSocket,
    id: BuildId,
    log: Arc<LogChannel>,
) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let mut chunks = log.subscribe();

    loop {
        tokio::select! {
            chunk = chunks.next() => {
                let Some(chunk) = chunk else { break };
                if let Err(err) = ws_sender.send(Message::Binary(chunk)).await
                {
                    debug!(build_id = %id, error = %err, "log observer gone");
                    return;
                }
            }
            incoming = ws_receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | None => return,
                Some(Err(err)) => {
                    debug!(build_id = %id, error = %err, "log observer failed");
                    return;
                }
                Some(Ok(_)) => {}
            },
        }
    }

    // Log closed, or this observer fell too far behind: end the connection.
    let _ = ws_sender.send(Message::Close(None)).await;
    let _ = ws_sender.close().await;
}
