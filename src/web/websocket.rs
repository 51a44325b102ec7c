//! WebSocket streaming of session events.

use crate::session::SessionEvent;
use crate::web::AppState;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// WebSocket upgrade handler. Refuses upgrades beyond the configured limit.
pub async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let Some(client_id) = state.reserve_client().await else {
        warn!(
            limit = state.config.max_websocket_connections,
            "Refusing WebSocket client, connection limit reached"
        );
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    };

    let failed_state = state.clone();
    ws.on_failed_upgrade(move |e| {
        warn!("WebSocket upgrade failed for client {}: {}", client_id, e);
        tokio::spawn(async move { failed_state.release_client(client_id).await });
    })
    .on_upgrade(move |socket| handle_websocket(socket, state, client_id))
}

/// Forward session events to one client until either side goes away.
async fn handle_websocket(socket: WebSocket, state: AppState, client_id: Uuid) {
    info!("WebSocket client connected: {}", client_id);

    let (mut sender, mut receiver) = socket.split();
    let mut rx = state.session.subscribe();

    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Close(_)) => {
                    debug!("WebSocket client {} sent close", client_id);
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("WebSocket error for client {}: {}", client_id, e);
                    break;
                }
            }
        }
    });

    let mut send_task = tokio::spawn(async move {
        loop {
            let event = match rx.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "WebSocket client {} lagging, events dropped", client_id);
                    continue;
                }
                Err(RecvError::Closed) => break,
            };
            let last = matches!(event, SessionEvent::Stopped { .. });

            match serde_json::to_string(&event) {
                Ok(json) => {
                    if let Err(e) = sender.send(Message::Text(json)).await {
                        warn!("Failed to send message to client {}: {}", client_id, e);
                        break;
                    }
                }
                Err(e) => error!("Failed to serialize event for client {}: {}", client_id, e),
            }

            if last {
                let _ = sender.send(Message::Close(None)).await;
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut recv_task => {
            debug!("Receive task completed for client {}", client_id);
            send_task.abort();
        }
        _ = &mut send_task => {
            debug!("Send task completed for client {}", client_id);
            recv_task.abort();
        }
    }

    state.release_client(client_id).await;
    info!("WebSocket client disconnected: {}", client_id);
}
