//! DrawingBoard HTTP and WebSocket server
//!
//! Clients join a drawing over WebSocket and receive its history followed by
//! every shape anyone publishes to it. Non-realtime clients can read and
//! extend drawings over plain HTTP.
//!
//! ## Routes
//!
//! ```text
//! GET  /                          banner
//! GET  /health                    "ok"
//! GET  /api/drawings              [1, 2, 42]
//! GET  /api/drawings/{id}         { "id": 42, "shapes": [...] }
//! POST /api/drawings/{id}/shapes  { "type": "BIG_CIRCLE", "x": 10, "y": 20, "color": "BLUE" }
//! GET  /websockets/{id}           WebSocket upgrade
//! ```

pub mod config;
pub mod ws;

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use drawingboard_core::{BroadcastHub, Drawing, DrawingId, Shape};
use serde::{Deserialize, Serialize};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::ServerConfig;

/// Shared application state
pub struct AppState {
    pub hub: BroadcastHub,
    /// Outbound queue size for each WebSocket client.
    pub queue_capacity: usize,
}

impl AppState {
    pub fn new(hub: BroadcastHub, queue_capacity: usize) -> Self {
        Self {
            hub,
            queue_capacity,
        }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(BroadcastHub::new(config.hub_config()), config.queue_capacity)
    }
}

/// Response to a shape submitted over HTTP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddShapeResponse {
    pub accepted: bool,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/drawings", get(list_drawings))
        .route("/api/drawings/{id}", get(get_drawing))
        .route("/api/drawings/{id}/shapes", post(add_shape))
        .route("/websockets/{id}", get(ws::ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Index page
async fn index() -> &'static str {
    "DrawingBoard Server - Connect via WebSocket at /websockets/{id}"
}

/// Health check
async fn health() -> &'static str {
    "ok"
}

pub async fn list_drawings(State(state): State<Arc<AppState>>) -> Json<Vec<DrawingId>> {
    Json(state.hub.drawing_ids())
}

pub async fn get_drawing(
    State(state): State<Arc<AppState>>,
    Path(id): Path<DrawingId>,
) -> Json<Drawing> {
    Json(state.hub.get_drawing(id))
}

pub async fn add_shape(
    State(state): State<Arc<AppState>>,
    Path(id): Path<DrawingId>,
    Json(shape): Json<Shape>,
) -> (StatusCode, Json<AddShapeResponse>) {
    let accepted = state.hub.add_shape(id, shape);
    let status = if accepted {
        StatusCode::OK
    } else {
        StatusCode::NOT_FOUND
    };
    (status, Json(AddShapeResponse { accepted }))
}
