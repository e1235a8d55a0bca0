pub mod estimates;
pub mod health;
pub mod projects;

use axum::{routing::get, routing::post, Router};
use std::sync::Arc;

use crate::app::AppState;

/// Build the API router with all routes
pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health::health_check))
        // Projects
        .route("/projects", post(projects::create_project))
        .route("/projects", get(projects::list_projects))
        .route("/projects/:project_id", get(projects::get_project))
        // Estimate pipeline (nested under projects)
        .route(
            "/projects/:project_id/estimate",
            post(estimates::generate_estimate),
        )
        .route(
            "/projects/:project_id/cost-breakdown",
            get(estimates::cost_breakdown),
        )
        .route(
            "/projects/:project_id/estimates",
            get(estimates::list_estimates),
        )
}
