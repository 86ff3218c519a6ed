//! HTTP gateway (Axum) for ingestion, search, and derived-artifact reads.
//!
//! This module is primarily used by the `memoriad` server binary.

#![allow(missing_docs)]

pub mod handler;
pub mod payload;
pub mod state;

pub use state::HandlerState;

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header::HeaderValue},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::error::MEMORIA_STATUS_HEADER;

pub fn create_router_with_state(state: HandlerState) -> Router {
    Router::new()
        .route("/memory", post(handler::ingest_handler))
        .route("/memory-space/{userId}", get(handler::list_handler))
        .route("/memory-space/{userId}/search", post(handler::search_handler))
        .route("/memory-space/{userId}/clusters", get(handler::clusters_handler))
        .route(
            "/learning-path/{userId}/knowledge-graph",
            get(handler::graph_handler),
        )
        .route(
            "/learning-path/{userId}/trajectory",
            get(handler::trajectory_handler),
        )
        .route("/memory-space/{userId}/repair", post(handler::repair_handler))
        .route("/healthz", get(health_handler))
        .route("/ready", get(ready_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(serde::Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(serde::Serialize)]
pub struct ReadyResponse {
    pub status: &'static str,
    pub components: ComponentStatus,
}

#[derive(serde::Serialize)]
pub struct ComponentStatus {
    pub http: &'static str,
    pub store: &'static str,
}

#[tracing::instrument]
pub async fn health_handler() -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(MEMORIA_STATUS_HEADER, HeaderValue::from_static("healthy"));

    (StatusCode::OK, headers, Json(HealthResponse { status: "ok" })).into_response()
}

#[tracing::instrument(skip(state))]
pub async fn ready_handler(State(state): State<HandlerState>) -> Response {
    let store_ready = state.storage_path.exists() && state.storage_path.is_dir();

    let components = ComponentStatus {
        http: "ready",
        store: if store_ready { "ready" } else { "pending" },
    };

    let is_ready = components.store == "ready";
    let status_code = if is_ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let status_msg = if is_ready { "ok" } else { "pending" };

    let mut headers = HeaderMap::new();
    headers.insert(
        MEMORIA_STATUS_HEADER,
        HeaderValue::from_str(status_msg).unwrap_or(HeaderValue::from_static("error")),
    );

    (
        status_code,
        headers,
        Json(ReadyResponse {
            status: status_msg,
            components,
        }),
    )
        .into_response()
}
