//! WebSocket sessions on the broadcast hub

use crate::api::AppState;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::{broadcast::error::RecvError, mpsc};
use tracing::{debug, warn};
use vigil_lib::broadcast::{encode, BroadcastHub, ServerMessage};

const DIRECT_QUEUE_DEPTH: usize = 256;

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let hub = state.pipeline.hub.clone();
    let limit = hub.max_frame_len();
    ws.max_message_size(limit)
        .max_frame_size(limit)
        .on_upgrade(move |socket| handle_socket(hub, socket))
}

async fn handle_socket(hub: Arc<BroadcastHub>, socket: WebSocket) {
    let client_id = uuid::Uuid::new_v4().to_string();
    let (mut sender, mut receiver) = socket.split();

    // Frames for this client only: the greeting and error replies
    let (tx, mut rx) = mpsc::channel::<Arc<str>>(DIRECT_QUEUE_DEPTH);

    let mut broadcast_rx = hub.subscribe();
    let greeting = hub.connect(&client_id);
    queue_direct(&tx, &client_id, &greeting).await;

    let send_client = client_id.clone();
    let mut send_task = tokio::spawn(async move {
        loop {
            let frame = tokio::select! {
                direct = rx.recv() => match direct {
                    Some(frame) => frame,
                    None => break,
                },
                outbound = broadcast_rx.recv() => match outbound {
                    Ok(out) if out.is_for(&send_client) => out.frame,
                    Ok(_) => continue,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(client_id = %send_client, skipped, "Client fell behind the broadcast queue");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                },
            };
            if sender.send(Message::Text(frame.to_string())).await.is_err() {
                break;
            }
        }
    });

    let recv_hub = hub.clone();
    let recv_client = client_id.clone();
    let mut receive_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(Message::Text(text)) => {
                    if let Some(reply) = recv_hub.handle_frame(&recv_client, &text) {
                        queue_direct(&tx, &recv_client, &reply).await;
                    }
                }
                Ok(Message::Close(_)) => return "client closed",
                Ok(_) => {}
                Err(e) => {
                    debug!(client_id = %recv_client, error = %e, "WebSocket receive error");
                    return "transport error";
                }
            }
        }
        "transport closed"
    });

    let reason = tokio::select! {
        _ = &mut send_task => "send failed",
        result = &mut receive_task => result.unwrap_or("receive task failed"),
    };
    send_task.abort();
    receive_task.abort();

    hub.disconnect(&client_id, reason);
}

async fn queue_direct(tx: &mpsc::Sender<Arc<str>>, client_id: &str, message: &ServerMessage) {
    match encode(message) {
        Ok(frame) => {
            if tx.send(frame).await.is_err() {
                debug!(client_id = %client_id, "Session closed before reply was queued");
            }
        }
        Err(e) => warn!(client_id = %client_id, error = %e, "Failed to encode reply"),
    }
}
