use axum::routing::{get, post};
use axum::Router;
use folio_catalog::ProjectCatalog;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handler;

/// Build the axum router with all Folio endpoints.
pub fn build_router(catalog: ProjectCatalog, permissive_cors: bool) -> Router {
    let router = Router::new()
        .route("/v1/health", get(handler::health_handler))
        .route("/v1/info", get(handler::info_handler))
        .route("/fast/projects", get(handler::list_projects))
        .route("/fast/current", get(handler::current_version))
        .route("/fast", post(handler::submit))
        .route("/projects/*path", get(handler::project_file))
        .with_state(catalog)
        .layer(TraceLayer::new_for_http());

    if permissive_cors {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}
