use std::sync::Arc;

use axum::{extract::FromRef, routing::get, Router};
use tokio_util::sync::CancellationToken;

use crate::features::regions::handlers;
use crate::features::regions::services::RegionService;

/// Shared state of the regions routes. `shutdown` lets long searches stop
/// when the server is asked to exit.
#[derive(Clone, FromRef)]
pub struct RegionsState {
    pub service: Arc<RegionService>,
    pub shutdown: CancellationToken,
}

/// Create routes for the regions feature
pub fn routes(service: Arc<RegionService>, shutdown: CancellationToken) -> Router {
    Router::new()
        // Level listings
        .route("/api/provinces", get(handlers::list_provinces))
        .route("/api/regencies", get(handlers::list_regencies))
        .route("/api/districts", get(handlers::list_districts))
        .route("/api/villages", get(handlers::list_villages))
        // Generic listing and lookup
        .route("/api/regions", get(handlers::list_regions))
        .route("/api/regions/{kind}/{code}", get(handlers::get_region))
        .route("/api/search", get(handlers::search_regions))
        .route("/api/hierarchy/{code}", get(handlers::get_hierarchy))
        .route("/api/stats", get(handlers::get_stats))
        .route("/health", get(handlers::health_check))
        .with_state(RegionsState { service, shutdown })
}
