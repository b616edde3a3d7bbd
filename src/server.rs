//! Router assembly and the listening loop.

use anyhow::Result;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::handlers::{self, AppState};

const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024; // 10MB

/// Routes plus the middleware stack: permissive CORS and request tracing.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/beers", get(handlers::list_beers))
        .route(
            "/identify-beer",
            post(handlers::identify_beer).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(addr: &str, state: AppState) -> Result<()> {
    let app = build_router(state);
    info!(addr = %addr, "HTTP API listening");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
