pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod static_files;

use axum::Router;
use mm_core::Motomap;
use mm_core::config::{OccupancySettings, Settings};
use mm_db::DbStore;
use tokio::net::TcpListener;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub store: DbStore,
    pub occupancy: OccupancySettings,
    pub recent_limit: u32,
}

impl AppState {
    pub fn new(store: DbStore, settings: &Settings) -> Self {
        Self {
            store,
            occupancy: settings.occupancy(),
            recent_limit: settings.recent_limit,
        }
    }
}

pub fn build_motomap(state: &AppState) -> Motomap<DbStore> {
    Motomap::new(state.store.clone(), state.occupancy)
}

pub fn app(state: AppState) -> Router {
    routes::router(state)
}

pub async fn serve(state: AppState, host: &str, port: u16) -> Result<(), std::io::Error> {
    let listener = TcpListener::bind((host, port)).await?;
    info!(addr = %listener.local_addr()?, "listening");
    axum::serve(listener, app(state)).await
}
