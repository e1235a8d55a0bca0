//! Estimate generation endpoints.
//!
//! These drive the whole pipeline: load the project, reconstruct its
//! requirements, run prompt -> model -> normalize -> aggregate, persist the
//! result append-only, and return it. Pipeline failures surface to clients as
//! a generic 500; the error kind and raw model text stay in server logs.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::{DataResponse, Paginated, PaginationParams};
use crate::app::AppState;
use crate::domain::{
    EstimateRequest, EstimateResponse, InlineImage, Project, StoredEstimate,
};
use crate::error::{ApiError, ApiResult};
use crate::estimator;

async fn load_project(state: &AppState, project_id: Uuid) -> ApiResult<Project> {
    state
        .projects
        .get(project_id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("Project {project_id} not found")))
}

/// Generate an estimate for a project.
///
/// POST /projects/:project_id/estimate
pub async fn generate_estimate(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<Uuid>,
    Json(req): Json<EstimateRequest>,
) -> ApiResult<DataResponse<EstimateResponse>> {
    let project = load_project(&state, project_id).await?;

    // Malformed uploads are a caller error, caught before the pipeline runs
    let images: Vec<InlineImage> = req
        .files
        .iter()
        .map(|f| f.to_inline())
        .collect::<Result<_, _>>()
        .map_err(ApiError::BadRequest)?;

    tracing::info!(
        project_id = %project_id,
        images = images.len(),
        role = %project.requirements.user_role,
        "Generating estimate"
    );

    let requirements = project.effective_requirements();
    let estimate =
        estimator::generate_estimate(&state.model_client, &requirements, &images).await?;

    // Persisted only after the whole pipeline succeeded; every run appends a
    // new record.
    let stored = state.estimates.create(project_id, estimate).await;

    tracing::info!(
        project_id = %project_id,
        estimate_id = %stored.id,
        total = stored.estimate.breakdown.total_cost,
        "Estimate persisted"
    );

    Ok(DataResponse::new(stored.into()))
}

/// Re-run estimate generation without images, for debugging. Nothing is
/// persisted on failure; a successful run appends a record like any other.
///
/// GET /projects/:project_id/cost-breakdown
pub async fn cost_breakdown(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<DataResponse<EstimateResponse>> {
    let project = load_project(&state, project_id).await?;

    tracing::info!(project_id = %project_id, "Re-running cost breakdown");

    let requirements = project.effective_requirements();
    let estimate = estimator::generate_estimate(&state.model_client, &requirements, &[]).await?;
    let stored = state.estimates.create(project_id, estimate).await;

    Ok(DataResponse::new(stored.into()))
}

/// List persisted estimates for a project, latest-first.
///
/// GET /projects/:project_id/estimates
pub async fn list_estimates(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<Uuid>,
    Query(pagination): Query<PaginationParams>,
) -> ApiResult<Paginated<StoredEstimate>> {
    // 404 for unknown projects rather than an empty list
    load_project(&state, project_id).await?;

    let all = state.estimates.list_for_project(project_id).await;
    let total = all.len() as u64;
    let page: Vec<StoredEstimate> = all
        .into_iter()
        .skip(pagination.offset())
        .take(pagination.per_page() as usize)
        .collect();

    Ok(Paginated::new(page, &pagination, total))
}
