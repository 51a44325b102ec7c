//! Dashboard server configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the dashboard server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    /// Host to bind the server to
    pub host: String,
    /// Port to bind the server to
    pub port: u16,
    /// Whether to send permissive CORS headers
    pub enable_cors: bool,
    /// Directory with a custom dashboard (`index.html` plus assets)
    pub static_path: Option<String>,
    /// Maximum number of concurrent WebSocket subscribers
    pub max_websocket_connections: usize,
    /// Most recent ticks returned by `/api/history` when no limit is given
    pub history_window: usize,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: crate::DEFAULT_WEB_PORT,
            enable_cors: true,
            static_path: None,
            max_websocket_connections: 100,
            history_window: 300,
        }
    }
}

impl WebConfig {
    /// Create a configuration bound to `host:port`, other settings default.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Set the address the dashboard listens on.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the dashboard port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Enable or disable permissive CORS headers.
    pub fn with_cors(mut self, enable_cors: bool) -> Self {
        self.enable_cors = enable_cors;
        self
    }

    /// Serve a custom dashboard from this directory instead of the built-in page.
    pub fn with_static_path(mut self, path: Option<String>) -> Self {
        self.static_path = path;
        self
    }

    /// Set how many WebSocket subscribers may be connected at once.
    pub fn with_max_websocket_connections(mut self, max: usize) -> Self {
        self.max_websocket_connections = max;
        self
    }

    /// Set how many recent ticks `/api/history` returns by default.
    pub fn with_history_window(mut self, window: usize) -> Self {
        self.history_window = window;
        self
    }

    /// `host:port` for binding.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
