// Router assembly and the serve loop shared by the binary and the tests.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::trace::TraceLayer;

use crate::server::{http, ws, AppState};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/health",
            get(|| async { Json(serde_json::json!({ "ok": true })) }),
        )
        .route("/lobby/ws/:lobby_id", get(ws::lobby_ws_handler))
        .route("/lobby/create", post(http::create_lobby))
        .route("/lobby/join", post(http::join_lobby))
        .route("/lobby/start", post(http::start_lobby))
        .route("/lobby/delete", post(http::delete_lobby))
        .route("/lobby/list", get(http::list_lobbies))
        .route("/lobby/get", get(http::get_lobby))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_server(addr: SocketAddr, state: AppState) -> Result<()> {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;
    tracing::info!(%addr, "parlor lobby server listening");
    axum::serve(listener, app)
        .await
        .context("server terminated")?;
    Ok(())
}
