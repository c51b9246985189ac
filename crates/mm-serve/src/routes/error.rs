use axum::Json;
use axum::http::StatusCode;
use mm_core::MotomapError;
use mm_core::error::StoreError;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorEnvelope {
    pub code: &'static str,
    pub message: String,
    pub correlation_id: Option<String>,
}

pub fn map_error(
    err: &MotomapError,
    correlation_id: Option<String>,
) -> (StatusCode, Json<ErrorEnvelope>) {
    let (status, code, message) = match err {
        MotomapError::Store(store) => map_store_error(store),
        MotomapError::Validation(_) => (StatusCode::BAD_REQUEST, "invalid_input", err.to_string()),
        MotomapError::Config(_) | MotomapError::Internal { .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            err.to_string(),
        ),
    };

    envelope(status, code, message, correlation_id)
}

pub fn not_found(message: String, correlation_id: Option<String>) -> (StatusCode, Json<ErrorEnvelope>) {
    envelope(StatusCode::NOT_FOUND, "not_found", message, correlation_id)
}

fn envelope(
    status: StatusCode,
    code: &'static str,
    message: String,
    correlation_id: Option<String>,
) -> (StatusCode, Json<ErrorEnvelope>) {
    (
        status,
        Json(ErrorEnvelope {
            code,
            message,
            correlation_id,
        }),
    )
}

fn map_store_error(err: &StoreError) -> (StatusCode, &'static str, String) {
    match err {
        StoreError::Transient { .. } => (
            StatusCode::SERVICE_UNAVAILABLE,
            "storage_unavailable",
            err.to_string(),
        ),
        StoreError::Corrupt { .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "storage_corrupt",
            err.to_string(),
        ),
        StoreError::Consistency { .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "consistency_violation",
            err.to_string(),
        ),
    }
}
