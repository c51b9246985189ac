use utoipa::OpenApi;

use crate::routes::detections::{DetectionsQuery, MessageResponse};
use crate::routes::error::ErrorEnvelope;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use mm_core::types::{
    DetectRequest, DetectResponse, Detection, OccupancyView, PlateReading, SpotId, SpotIdInput,
    SpotStatus, StatsView,
};

#[derive(OpenApi)]
#[openapi(
    info(title = "MotoMap", description = "Parking spot occupancy from vehicle detections"),
    paths(
        crate::routes::detections::detect,
        crate::routes::detections::list_detections,
        crate::routes::detections::clear,
        crate::routes::occupancy::list_spots,
        crate::routes::occupancy::get_spot,
        crate::routes::occupancy::status,
        crate::routes::occupancy::stats
    ),
    components(schemas(
        Detection,
        DetectRequest,
        SpotIdInput,
        DetectResponse,
        DetectionsQuery,
        OccupancyView,
        SpotStatus,
        StatsView,
        PlateReading,
        SpotId,
        MessageResponse,
        ErrorEnvelope
    ))
)]
struct ApiDoc;

pub fn generate_spec() -> String {
    ApiDoc::openapi()
        .to_pretty_json()
        .unwrap_or_else(|_| "{}".to_string())
}

pub fn router() -> Router {
    Router::new().route("/openapi.json", get(openapi_json))
}

async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}
