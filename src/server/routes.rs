//! Route handlers for the structure synchronization server.

use axum::{
    Router,
    extract::{State, ws::WebSocketUpgrade},
    response::{Json, Response},
    routing::get,
};
use serde::Serialize;
use tokio::net::TcpListener;

use crate::error::ServerError;
use crate::relay::RelayHandle;
use crate::server::websocket::handle_websocket_connection;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
}

/// Shared application state
pub type AppState = RelayHandle;

/// Basic health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        message: "Server is running!".to_string(),
    })
}

/// WebSocket upgrade endpoint for participants
pub async fn ws_handler(ws: WebSocketUpgrade, State(relay): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_websocket_connection(socket, relay))
}

/// Creates and configures the main application router
pub fn create_router(relay: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ws", get(ws_handler))
        .with_state(relay)
}

/// Serves the application on an already bound listener until it fails
pub async fn serve(listener: TcpListener, relay: AppState) -> Result<(), ServerError> {
    axum::serve(listener, create_router(relay))
        .await
        .map_err(ServerError::Serve)
}
