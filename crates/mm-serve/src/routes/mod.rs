pub mod detections;
pub mod error;
pub mod occupancy;

use crate::middleware::correlation::correlation_middleware;
use crate::{AppState, openapi, static_files};
use axum::Router;
use axum::middleware;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Every JSON route answers both at the root and under `/api`; anything
/// else falls through to the embedded dashboard.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .merge(detections::router(state.clone()))
        .merge(occupancy::router(state))
        .merge(openapi::router());

    Router::new()
        .merge(api.clone())
        .nest("/api", api)
        .route_layer(middleware::from_fn(correlation_middleware))
        .fallback(static_files::serve)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
