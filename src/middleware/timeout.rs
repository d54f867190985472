// src/middleware/timeout.rs

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{common::error::AppError, config::AppState};

// Limita o tempo de cada requisição. Ao estourar, o futuro do handler é
// descartado (cancelamento).
pub async fn request_timeout(
    State(app_state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    match tokio::time::timeout(app_state.request_timeout, next.run(request)).await {
        Ok(response) => response,
        Err(_) => {
            tracing::warn!(
                timeout_secs = app_state.request_timeout.as_secs(),
                "⏱️ Requisição cancelada por tempo limite"
            );
            AppError::RequestTimeout.into_response()
        }
    }
}
