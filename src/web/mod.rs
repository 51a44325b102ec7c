//! Web dashboard for a monitoring session.
//!
//! REST endpoints expose the latest tick, the trend history and the safe
//! ranges; `/ws` streams every [`SessionEvent`](crate::session::SessionEvent)
//! as JSON. The dashboard only reads from the session.

pub mod config;
pub mod handlers;
pub mod router;
pub mod websocket;

// Re-export commonly used items
pub use config::WebConfig;
pub use router::create_app;

use crate::error::{MonitorError, Result};
use crate::session::SessionHandle;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

/// A connected WebSocket subscriber.
#[derive(Debug, Clone)]
pub struct Client {
    pub connected_at: SystemTime,
}

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<WebConfig>,
    pub session: SessionHandle,
    pub clients: Arc<RwLock<HashMap<Uuid, Client>>>,
}

impl AppState {
    pub fn new(config: WebConfig, session: SessionHandle) -> Self {
        Self {
            config: Arc::new(config),
            session,
            clients: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of connected WebSocket clients.
    pub async fn client_count(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Claim a connection slot, or `None` when the limit is reached.
    ///
    /// Check and insert happen under one write lock.
    pub async fn reserve_client(&self) -> Option<Uuid> {
        let mut clients = self.clients.write().await;
        if clients.len() >= self.config.max_websocket_connections {
            return None;
        }
        let id = Uuid::new_v4();
        clients.insert(
            id,
            Client {
                connected_at: SystemTime::now(),
            },
        );
        Some(id)
    }

    /// Free the slot held by a client.
    pub async fn release_client(&self, id: Uuid) {
        self.clients.write().await.remove(&id);
    }
}

/// Serve the dashboard until the session stops.
pub async fn start_web_server(config: WebConfig, session: SessionHandle) -> Result<()> {
    let addr = config
        .bind_address()
        .parse::<SocketAddr>()
        .map_err(|e| MonitorError::config_error(format!("Invalid bind address: {}", e)))?;

    let app = create_app(config, session.clone());

    info!("Dashboard available at http://{}/", addr);
    info!("API endpoint: http://{}/api/latest", addr);
    info!("WebSocket endpoint: ws://{}/ws", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| MonitorError::web_server_error(format!("Failed to bind to address: {}", e)))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { session.stopped().await })
        .await
        .map_err(|e| MonitorError::web_server_error(format!("Server error: {}", e)))?;

    info!("Dashboard server stopped");
    Ok(())
}
