use super::AppState;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::{debug, error};

/// GET /health
pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// GET /workers
pub async fn list_workers(State(state): State<AppState>) -> Response {
    match state.reconciler.list_workers().await {
        Ok(workers) => {
            debug!("Ready to write response with {} workers", workers.len());
            json_response(&workers)
        }
        Err(e) => {
            error!("Failed to reconcile workers: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// GET /sessions
pub async fn list_sessions(State(state): State<AppState>) -> Response {
    match state.reconciler.registry().list_sessions().await {
        Ok(sessions) => json_response(&sessions),
        Err(e) => {
            error!("Failed to list sessions: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// GET /metrics
pub async fn prometheus_metrics(State(state): State<AppState>) -> Response {
    match state.reconciler.metrics().render() {
        Ok(body) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!("Failed to render metrics: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn json_response<T: Serialize>(value: &T) -> Response {
    match serde_json::to_vec(value) {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!("Can't encode response: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("could not encode response: {}", e),
            )
                .into_response()
        }
    }
}
