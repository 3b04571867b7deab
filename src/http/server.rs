//! HTTP server hosting the dashboard page and its API

use super::handler::{
    ask_handler, chat_handler, close_session, create_session, dashboard_handler, health_handler,
    upload_analysis, SharedCore,
};
use crate::errors::AppResult;
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::Router;
use rust_embed::RustEmbed;
use tower_http::trace::TraceLayer;
use tracing::info;

#[derive(RustEmbed)]
#[folder = "src/http/static/"]
struct Assets;

async fn index_handler() -> Response {
    match Assets::get("index.html") {
        Some(file) => Html(String::from_utf8_lossy(file.data.as_ref()).into_owned()).into_response(),
        None => (StatusCode::NOT_FOUND, "dashboard page missing").into_response(),
    }
}

pub fn router(core: SharedCore) -> Router {
    let upload_limit = core.settings().max_upload_bytes;
    Router::new()
        .route("/", get(index_handler))
        .route("/api/health", get(health_handler))
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/:id", delete(close_session))
        .route("/api/sessions/:id/analysis", post(upload_analysis))
        .route("/api/sessions/:id/dashboard", get(dashboard_handler))
        .route("/api/sessions/:id/ask", post(ask_handler))
        .route("/api/sessions/:id/chat", get(chat_handler))
        .layer(DefaultBodyLimit::max(upload_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(core)
}

pub struct HttpServer {
    core: SharedCore,
}

impl HttpServer {
    pub fn new(core: SharedCore) -> Self {
        Self { core }
    }

    /// Serves until Ctrl-C.
    pub async fn start(&self) -> AppResult<()> {
        let addr = self.core.settings().listen_addr();
        let app = router(self.core.clone());
        let listener = tokio::net::TcpListener::bind(&addr).await?;

        info!(addr = %addr, "RiskPilot dashboard available at http://{}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %error, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
