//! Push socket: one WebSocket per viewer, fed from the push hub.

use axum::{
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::Response,
};
use chat_session::PushEvent;
use futures::{sink::SinkExt, stream::StreamExt};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::AppState;
use crate::metrics::ServerMetrics;

pub async fn push_socket_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    let push_rx = state.push.subscribe();
    let metrics = state.metrics.clone();
    ws.on_upgrade(move |socket| handle_push_socket(socket, push_rx, metrics))
}

/// Forward every hub event to the socket until either side goes away.
/// Inbound frames carry nothing; only close and errors are acted on.
pub async fn handle_push_socket(
    socket: WebSocket,
    mut push_rx: broadcast::Receiver<PushEvent>,
    metrics: Arc<ServerMetrics>,
) {
    let connection_id = uuid::Uuid::new_v4().to_string();
    info!(conn_id = %connection_id, "Viewer connected");
    metrics.viewer_connected();

    let (mut ws_sender, mut ws_receiver) = socket.split();

    let metrics_send = metrics.clone();
    let sender_task = async move {
        loop {
            match push_rx.recv().await {
                Ok(event) => {
                    let json = match serde_json::to_string(&event) {
                        Ok(j) => j,
                        Err(e) => {
                            error!("Failed to serialize push event: {}", e);
                            continue;
                        }
                    };
                    if ws_sender.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                    metrics_send.frame_sent();
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    metrics_send.frames_dropped(n);
                    warn!("Viewer lagged behind push hub by {} events", n);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    };

    let metrics_recv = metrics.clone();
    let input_task = async move {
        while let Some(msg) = ws_receiver.next().await {
            match msg {
                Ok(Message::Close(_)) => break,
                Err(e) => {
                    metrics_recv.websocket_error();
                    error!("WebSocket error: {}", e);
                    break;
                }
                _ => {}
            }
        }
    };

    tokio::select! {
        _ = sender_task => debug!("Push sender task ended"),
        _ = input_task => debug!("Push input task ended"),
    }

    metrics.viewer_disconnected();
    info!(conn_id = %connection_id, "Viewer disconnected");
}
