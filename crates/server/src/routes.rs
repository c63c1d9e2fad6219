//! API route definitions

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use rollup::directory::{DirectoryCatalog, WorkItemDirectory};
use rollup::domain::{CreatedWorkItem, ProgressResult, ReleaseFilter, TaskTemplate, WorkItemRef};
use rollup::rollup::{EpicProgress, ProgressService};
use rollup::strategy::HIERARCHY_ONLY;
use rollup::{RollupConfig, RollupError};

/// Shared application state: the rollup service plus the loaded config.
pub struct AppContext<D> {
    pub service: ProgressService<D>,
    pub config: RollupConfig,
}

pub type AppState<D> = Arc<AppContext<D>>;

/// Create API routes
pub fn create_routes<D>(state: AppState<D>) -> Router
where
    D: WorkItemDirectory + DirectoryCatalog + Send + Sync + 'static,
{
    Router::new()
        .route("/health", get(health_check))
        .route("/api/config", get(get_config))
        .route("/api/epics", get(list_epics))
        .route("/api/epics/:id/progress", get(get_epic_progress))
        .route("/api/workitems/:id/children", get(get_work_item_children))
        .route("/api/templates", get(list_templates))
        .route("/api/create-tasks", post(create_tasks))
        .with_state(state)
}

/// Error payload: validation failures map to 400, everything else to 500.
type ApiError = (StatusCode, Json<serde_json::Value>);

fn api_error(err: RollupError) -> ApiError {
    let status = if err.is_validation() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    tracing::error!("Request failed: {}", err);
    (status, Json(serde_json::json!({ "error": err.to_string() })))
}

/// Health check endpoint
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "rollup-api",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// Config subset safe to hand to a frontend
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    pub org_url: Option<String>,
    pub project: Option<String>,
    pub default_release: Option<String>,
    pub default_area_path: Option<String>,
    pub default_relationship_strategy: String,
}

async fn get_config<D>(State(state): State<AppState<D>>) -> Json<ClientConfig>
where
    D: WorkItemDirectory + DirectoryCatalog + Send + Sync + 'static,
{
    Json(ClientConfig {
        org_url: state.config.org_url.clone(),
        project: state.config.project.clone(),
        default_release: state.config.default_release.clone(),
        default_area_path: state.config.default_area_path.clone(),
        default_relationship_strategy: state.config.default_strategy(),
    })
}

/// Query parameters for the epic listing
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpicsQuery {
    release: Option<String>,
    area_path: Option<String>,
}

/// List top-level epics for a release and area path
async fn list_epics<D>(
    Query(query): Query<EpicsQuery>,
    State(state): State<AppState<D>>,
) -> Result<Json<Vec<WorkItemRef>>, ApiError>
where
    D: WorkItemDirectory + DirectoryCatalog + Send + Sync + 'static,
{
    state
        .service
        .directory()
        .fetch_epics(
            query.release.as_deref().unwrap_or_default(),
            query.area_path.as_deref().unwrap_or_default(),
        )
        .await
        .map(Json)
        .map_err(api_error)
}

/// Query parameters for the progress endpoints
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressQuery {
    release: Option<String>,
    #[serde(default)]
    include_all_releases: bool,
    relationship_strategy: Option<String>,
    #[serde(default)]
    is_nested_expansion: bool,
}

impl ProgressQuery {
    fn release_filter(&self) -> ReleaseFilter {
        ReleaseFilter {
            release: self.release.clone().filter(|r| !r.is_empty()),
            include_all_releases: self.include_all_releases,
        }
    }

    /// Resolve the strategy name to apply: nested UI expansions are forced
    /// to hierarchy-only so a drill-down never re-widens the edge set, and
    /// an absent or empty query value falls back to the configured default.
    fn effective_strategy(&self, config: &RollupConfig) -> String {
        if self.is_nested_expansion {
            return HIERARCHY_ONLY.to_string();
        }
        self.relationship_strategy
            .clone()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| config.default_strategy())
    }
}

/// Epic progress summary: rolled-up children plus their average
async fn get_epic_progress<D>(
    Path(id): Path<String>,
    Query(query): Query<ProgressQuery>,
    State(state): State<AppState<D>>,
) -> Result<Json<EpicProgress>, ApiError>
where
    D: WorkItemDirectory + DirectoryCatalog + Send + Sync + 'static,
{
    let strategy = query.effective_strategy(&state.config);
    state
        .service
        .epic_progress(&id, &query.release_filter(), Some(&strategy))
        .await
        .map(Json)
        .map_err(api_error)
}

/// Direct children of a work item with bottom-up progress
async fn get_work_item_children<D>(
    Path(id): Path<String>,
    Query(query): Query<ProgressQuery>,
    State(state): State<AppState<D>>,
) -> Result<Json<Vec<ProgressResult>>, ApiError>
where
    D: WorkItemDirectory + DirectoryCatalog + Send + Sync + 'static,
{
    let strategy = query.effective_strategy(&state.config);
    state
        .service
        .children_with_progress_using_strategy(&id, &query.release_filter(), Some(&strategy))
        .await
        .map(Json)
        .map_err(api_error)
}

/// List the team's task templates
async fn list_templates<D>(
    State(state): State<AppState<D>>,
) -> Result<Json<Vec<TaskTemplate>>, ApiError>
where
    D: WorkItemDirectory + DirectoryCatalog + Send + Sync + 'static,
{
    state
        .service
        .directory()
        .fetch_templates()
        .await
        .map(Json)
        .map_err(api_error)
}

/// Create-tasks request body
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTasksRequest {
    pub pbi_id: String,
    pub template_ids: Vec<String>,
}

/// Create-tasks response body
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTasksResponse {
    pub created_tasks: Vec<CreatedWorkItem>,
}

/// Instantiate task templates under a backlog item
async fn create_tasks<D>(
    State(state): State<AppState<D>>,
    Json(request): Json<CreateTasksRequest>,
) -> Result<Json<CreateTasksResponse>, ApiError>
where
    D: WorkItemDirectory + DirectoryCatalog + Send + Sync + 'static,
{
    state
        .service
        .directory()
        .create_tasks_from_templates(&request.pbi_id, &request.template_ids)
        .await
        .map(|created_tasks| Json(CreateTasksResponse { created_tasks }))
        .map_err(api_error)
}
