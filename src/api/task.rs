//! Task API handlers

use crate::api::{
    default_limit, default_page, deserialize_limit, deserialize_page, MessageResponse,
    PaginatedResponse, SuccessResponse,
};
use crate::domain::{
    AssignTaskInput, CreateTaskInput, TaskStatus, UpdateTaskInput, UpdateTaskStatusInput,
};
use crate::error::Result;
use crate::middleware::AuthUser;
use crate::server::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

/// Query parameters for listing tasks.
/// Pagination fields are inlined because serde_urlencoded (used by axum's
/// Query) does not support #[serde(flatten)].
#[derive(Debug, Deserialize)]
pub struct TaskListQuery {
    #[serde(default = "default_page", deserialize_with = "deserialize_page")]
    pub page: i64,
    #[serde(
        default = "default_limit",
        deserialize_with = "deserialize_limit",
        alias = "per_page"
    )]
    pub limit: i64,
    /// Filter tasks by workflow status
    pub status: Option<TaskStatus>,
}

/// List tasks in a project
pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((org_id, project_id)): Path<(Uuid, Uuid)>,
    Query(query): Query<TaskListQuery>,
) -> Result<impl IntoResponse> {
    let (tasks, total) = state
        .task_service
        .list(
            &auth.principal,
            org_id,
            project_id,
            query.status,
            query.page,
            query.limit,
        )
        .await?;

    Ok(Json(PaginatedResponse::new(
        tasks,
        query.page,
        query.limit,
        total,
    )))
}

/// Create a task
pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((org_id, project_id)): Path<(Uuid, Uuid)>,
    Json(input): Json<CreateTaskInput>,
) -> Result<impl IntoResponse> {
    let task = state
        .task_service
        .create(&auth.principal, org_id, project_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(SuccessResponse::new(task))))
}

/// Get a task
pub async fn get(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((org_id, project_id, task_id)): Path<(Uuid, Uuid, Uuid)>,
) -> Result<impl IntoResponse> {
    let task = state
        .task_service
        .get(&auth.principal, org_id, project_id, task_id)
        .await?;
    Ok(Json(SuccessResponse::new(task)))
}

/// Edit task title or description
pub async fn update(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((org_id, project_id, task_id)): Path<(Uuid, Uuid, Uuid)>,
    Json(input): Json<UpdateTaskInput>,
) -> Result<impl IntoResponse> {
    let task = state
        .task_service
        .update(&auth.principal, org_id, project_id, task_id, input)
        .await?;
    Ok(Json(SuccessResponse::new(task)))
}

/// Move a task through its workflow
pub async fn set_status(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((org_id, project_id, task_id)): Path<(Uuid, Uuid, Uuid)>,
    Json(input): Json<UpdateTaskStatusInput>,
) -> Result<impl IntoResponse> {
    let task = state
        .task_service
        .set_status(&auth.principal, org_id, project_id, task_id, input)
        .await?;
    Ok(Json(SuccessResponse::new(task)))
}

/// Assign a task to a member, or clear the assignee
pub async fn assign(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((org_id, project_id, task_id)): Path<(Uuid, Uuid, Uuid)>,
    Json(input): Json<AssignTaskInput>,
) -> Result<impl IntoResponse> {
    let task = state
        .task_service
        .assign(&auth.principal, org_id, project_id, task_id, input)
        .await?;
    Ok(Json(SuccessResponse::new(task)))
}

/// Delete a task
pub async fn delete(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((org_id, project_id, task_id)): Path<(Uuid, Uuid, Uuid)>,
) -> Result<impl IntoResponse> {
    state
        .task_service
        .delete(&auth.principal, org_id, project_id, task_id)
        .await?;
    Ok(Json(MessageResponse::new("Task deleted successfully")))
}
