use axum::{
    extract::{Path, Query, State},
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::{Created, DataResponse, Paginated, PaginationParams};
use crate::app::AppState;
use crate::domain::{CreateProjectRequest, Project};
use crate::error::{ApiError, ApiResult};

/// Create a new project
pub async fn create_project(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateProjectRequest>,
) -> ApiResult<Created<DataResponse<Project>>> {
    if req.requirements.area <= 0.0 {
        return Err(ApiError::BadRequest("area must be positive".to_string()));
    }

    tracing::info!(
        project_name = %req.name,
        role = %req.requirements.user_role,
        "Creating project"
    );

    let project = state.projects.create(req).await;
    Ok(Created(DataResponse::new(project)))
}

/// List projects, newest first
pub async fn list_projects(
    State(state): State<Arc<AppState>>,
    Query(pagination): Query<PaginationParams>,
) -> Paginated<Project> {
    let all = state.projects.list().await;
    let total = all.len() as u64;
    let page: Vec<Project> = all
        .into_iter()
        .skip(pagination.offset())
        .take(pagination.per_page() as usize)
        .collect();

    Paginated::new(page, &pagination, total)
}

/// Get a specific project by ID
pub async fn get_project(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<DataResponse<Project>> {
    let project = state
        .projects
        .get(project_id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("Project {project_id} not found")))?;

    Ok(DataResponse::new(project))
}
