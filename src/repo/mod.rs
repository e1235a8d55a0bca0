//! Persistence seam for projects and estimates.
//!
//! The pipeline only ever needs create/read. Estimates are append-only: every
//! generation run creates a new record, prior records are never mutated, and
//! reads return latest-first by creation time.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

use crate::domain::{CreateProjectRequest, GeneratedEstimate, Project, StoredEstimate};

#[async_trait]
pub trait ProjectRepository: Send + Sync {
    async fn create(&self, req: CreateProjectRequest) -> Project;
    async fn get(&self, id: Uuid) -> Option<Project>;
    /// All projects, newest first.
    async fn list(&self) -> Vec<Project>;
}

#[async_trait]
pub trait EstimateRepository: Send + Sync {
    /// Append a new estimate record. Intentionally not idempotent: two
    /// concurrent runs for the same project both get persisted, and "latest"
    /// is decided by creation timestamp at read time.
    async fn create(&self, project_id: Uuid, estimate: GeneratedEstimate) -> StoredEstimate;
    /// Estimates for a project, latest-first.
    async fn list_for_project(&self, project_id: Uuid) -> Vec<StoredEstimate>;
}

/// In-memory project store.
#[derive(Default)]
pub struct InMemoryProjectRepository {
    projects: RwLock<HashMap<Uuid, Project>>,
}

impl InMemoryProjectRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProjectRepository for InMemoryProjectRepository {
    async fn create(&self, req: CreateProjectRequest) -> Project {
        let now = Utc::now();
        let project = Project {
            id: Uuid::new_v4(),
            name: req.name,
            requirements: req.requirements,
            form_payload: req.form_payload,
            created_at: now,
            updated_at: now,
        };
        self.projects.write().insert(project.id, project.clone());
        project
    }

    async fn get(&self, id: Uuid) -> Option<Project> {
        self.projects.read().get(&id).cloned()
    }

    async fn list(&self) -> Vec<Project> {
        let mut projects: Vec<Project> = self.projects.read().values().cloned().collect();
        projects.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        projects
    }
}

/// In-memory append-only estimate store.
#[derive(Default)]
pub struct InMemoryEstimateRepository {
    estimates: RwLock<Vec<StoredEstimate>>,
}

impl InMemoryEstimateRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EstimateRepository for InMemoryEstimateRepository {
    async fn create(&self, project_id: Uuid, estimate: GeneratedEstimate) -> StoredEstimate {
        let stored = StoredEstimate {
            id: Uuid::new_v4(),
            project_id,
            estimate,
            created_at: Utc::now(),
        };
        self.estimates.write().push(stored.clone());
        stored
    }

    async fn list_for_project(&self, project_id: Uuid) -> Vec<StoredEstimate> {
        let mut matching: Vec<StoredEstimate> = self
            .estimates
            .read()
            .iter()
            .filter(|e| e.project_id == project_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matching
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        CostBreakdown, MaterialTier, ProjectRequirements, ProjectType, TimelinePreference,
    };

    fn sample_request() -> CreateProjectRequest {
        CreateProjectRequest {
            name: "Shingle replacement".to_string(),
            requirements: ProjectRequirements {
                project_type: ProjectType::Residential,
                area: 1500.0,
                location: "Austin, TX".to_string(),
                material_tier: MaterialTier::Standard,
                timeline_preference: TimelinePreference::Standard,
                user_role: "homeowner".to_string(),
                details: None,
            },
            form_payload: None,
        }
    }

    fn sample_estimate(total: f64) -> GeneratedEstimate {
        GeneratedEstimate {
            breakdown: CostBreakdown {
                materials_cost: total,
                labor_cost: 0.0,
                permits_cost: 0.0,
                equipment_cost: 0.0,
                contingency_cost: 0.0,
                total_cost: total,
                degraded_fields: Vec::new(),
            },
            region_multiplier: 1.0,
            data_source: "test-model".to_string(),
            timeline: String::new(),
            contingency_suggestions: String::new(),
            report: serde_json::json!({}),
            image_analysis: None,
        }
    }

    #[tokio::test]
    async fn created_projects_are_retrievable() {
        let repo = InMemoryProjectRepository::new();
        let project = repo.create(sample_request()).await;
        let fetched = repo.get(project.id).await.unwrap();
        assert_eq!(fetched.name, "Shingle replacement");
    }

    #[tokio::test]
    async fn estimates_are_append_only_and_latest_first() {
        let repo = InMemoryEstimateRepository::new();
        let project_id = Uuid::new_v4();

        let first = repo.create(project_id, sample_estimate(100.0)).await;
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        let second = repo.create(project_id, sample_estimate(200.0)).await;

        let listed = repo.list_for_project(project_id).await;
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, second.id);
        assert_eq!(listed[1].id, first.id);
    }

    #[tokio::test]
    async fn estimates_are_scoped_to_their_project() {
        let repo = InMemoryEstimateRepository::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        repo.create(a, sample_estimate(100.0)).await;
        repo.create(b, sample_estimate(200.0)).await;

        assert_eq!(repo.list_for_project(a).await.len(), 1);
        assert_eq!(repo.list_for_project(b).await.len(), 1);
    }
}
