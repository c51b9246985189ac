use crate::middleware::correlation::CorrelationId;
use crate::routes::error::{ErrorEnvelope, map_error, not_found};
use crate::{AppState, build_motomap};
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Extension, Json, Router};
use mm_core::types::{OccupancyView, SpotId, SpotStatus, StatsView};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/spots", get(list_spots))
        // Path used by dashboards built against the first release.
        .route("/vagas", get(list_spots))
        .route("/spots/{spot_id}", get(get_spot))
        .route("/status", get(status))
        .route("/stats", get(stats))
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/api/spots",
    responses((status = 200, body = std::collections::BTreeMap<String, OccupancyView>))
)]
pub(crate) async fn list_spots(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
) -> Response {
    let motomap = build_motomap(&state);
    match motomap.occupancy().by_spot() {
        Ok(spots) => Json(spots).into_response(),
        Err(err) => map_error(&err, Some(correlation.0)).into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/api/spots/{spot_id}",
    params(("spot_id" = String, Path, description = "Spot identifier")),
    responses(
        (status = 200, body = OccupancyView),
        (status = 404, body = ErrorEnvelope)
    )
)]
pub(crate) async fn get_spot(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Path(spot_id): Path<String>,
) -> Response {
    let motomap = build_motomap(&state);
    let spot_id = SpotId::new(spot_id);
    match motomap.occupancy().spot(&spot_id) {
        Ok(Some(view)) => Json(view).into_response(),
        Ok(None) => not_found(
            format!("no detections for spot {spot_id}"),
            Some(correlation.0),
        )
        .into_response(),
        Err(err) => map_error(&err, Some(correlation.0)).into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/api/status",
    responses((status = 200, body = std::collections::BTreeMap<String, SpotStatus>))
)]
pub(crate) async fn status(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
) -> Response {
    let motomap = build_motomap(&state);
    match motomap.occupancy().status() {
        Ok(status) => Json(status).into_response(),
        Err(err) => map_error(&err, Some(correlation.0)).into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/api/stats",
    responses((status = 200, body = StatsView))
)]
pub(crate) async fn stats(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
) -> Response {
    let motomap = build_motomap(&state);
    match motomap.occupancy().stats() {
        Ok(stats) => Json(stats).into_response(),
        Err(err) => map_error(&err, Some(correlation.0)).into_response(),
    }
}
