//! Dashboard router and middleware setup.

use crate::session::SessionHandle;
use crate::web::config::WebConfig;
use crate::web::{handlers, websocket, AppState};
use axum::{routing::get, Router};
use std::path::PathBuf;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::{info, warn};

/// Build the dashboard application for a session.
pub fn create_app(config: WebConfig, session: SessionHandle) -> Router {
    let state = AppState::new(config.clone(), session);

    let mut app = Router::new()
        .route("/api/health", get(handlers::health_check))
        .route("/api/latest", get(handlers::get_latest))
        .route("/api/history", get(handlers::get_history))
        .route("/api/ranges", get(handlers::get_ranges))
        .route("/ws", get(websocket::websocket_handler));

    let custom_index = config.static_path.as_ref().and_then(|path| {
        let static_path = PathBuf::from(path);
        if static_path.is_dir() {
            Some(static_path)
        } else {
            warn!(
                "Static path {:?} does not exist, serving built-in dashboard",
                static_path
            );
            None
        }
    });

    match custom_index {
        Some(static_path) if static_path.join("index.html").exists() => {
            info!("Serving dashboard from {:?}", static_path);
            app = app
                .nest_service("/static", ServeDir::new(&static_path))
                .route("/", get(handlers::serve_index));
        }
        Some(static_path) => {
            info!("Serving static files from {:?}", static_path);
            app = app
                .nest_service("/static", ServeDir::new(&static_path))
                .route("/", get(handlers::default_index));
        }
        None => {
            app = app.route("/", get(handlers::default_index));
        }
    }

    if config.enable_cors {
        app = app.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    app.layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::narrative::{NarrativeReporter, OfflineGenerator};
    use crate::session::{MonitorConfig, Session};
    use std::sync::Arc;

    fn handle() -> SessionHandle {
        let reporter = NarrativeReporter::new(Arc::new(OfflineGenerator));
        Session::simulated(MonitorConfig::default(), reporter)
            .unwrap()
            .handle()
    }

    #[tokio::test]
    async fn test_create_app() {
        let _app = create_app(WebConfig::default(), handle());
    }

    #[tokio::test]
    async fn test_create_app_without_cors_and_missing_static_dir() {
        let config = WebConfig::default()
            .with_cors(false)
            .with_static_path(Some("/nonexistent/dashboard".to_string()));
        let _app = create_app(config, handle());
    }
}
