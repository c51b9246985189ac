use crate::middleware::correlation::CorrelationId;
use crate::routes::error::{ErrorEnvelope, map_error};
use crate::{AppState, build_motomap};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use mm_core::MotomapError;
use mm_core::error::ValidationError;
use mm_core::config::MAX_RECENT_LIMIT;
use mm_core::types::{DetectRequest, DetectResponse, Detection};
use mm_core::validation::validate_detect_request;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

const PLATE_NOT_DETECTED: &str = "not detected";

#[derive(Debug, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DetectionsQuery {
    /// Defaults to the configured recent limit, capped at 1000.
    limit: Option<u32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub msg: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/detect", post(detect))
        .route("/detections", get(list_detections))
        .route("/clear", post(clear))
        .with_state(state)
}

#[utoipa::path(
    post,
    path = "/api/detect",
    request_body = DetectRequest,
    responses(
        (status = 201, body = DetectResponse),
        (status = 400, body = ErrorEnvelope),
        (status = 503, body = ErrorEnvelope)
    )
)]
pub(crate) async fn detect(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    payload: Result<Json<DetectRequest>, JsonRejection>,
) -> Response {
    let parsed = payload.map_err(|rejection| ValidationError::InvalidField {
        field: "body",
        message: rejection.body_text(),
    });
    let detection = match parsed.and_then(|Json(request)| validate_detect_request(request)) {
        Ok(detection) => detection,
        Err(err) => {
            return map_error(&MotomapError::from(err), Some(correlation.0)).into_response();
        }
    };
    let motomap = build_motomap(&state);
    match motomap.detections().ingest(detection) {
        Ok(stored) => (
            StatusCode::CREATED,
            Json(DetectResponse {
                msg: "saved".to_string(),
                id: stored.id,
                spot_id: stored.spot_id.to_string(),
                plate: stored
                    .plate
                    .unwrap_or_else(|| PLATE_NOT_DETECTED.to_string()),
            }),
        )
            .into_response(),
        Err(err) => map_error(&err, Some(correlation.0)).into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/api/detections",
    params(DetectionsQuery),
    responses((status = 200, body = Vec<Detection>))
)]
pub(crate) async fn list_detections(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Query(query): Query<DetectionsQuery>,
) -> Response {
    let limit = query.limit.unwrap_or(state.recent_limit).min(MAX_RECENT_LIMIT);
    let motomap = build_motomap(&state);
    match motomap.detections().recent(limit) {
        Ok(detections) => Json(detections).into_response(),
        Err(err) => map_error(&err, Some(correlation.0)).into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/api/clear",
    responses((status = 200, body = MessageResponse))
)]
pub(crate) async fn clear(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
) -> Response {
    let motomap = build_motomap(&state);
    match motomap.detections().clear_all() {
        Ok(()) => Json(MessageResponse {
            msg: "store cleared".to_string(),
        })
        .into_response(),
        Err(err) => map_error(&err, Some(correlation.0)).into_response(),
    }
}
