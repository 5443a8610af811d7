//! Project API handlers

use crate::api::{MessageResponse, PaginatedResponse, PaginationQuery, SuccessResponse};
use crate::domain::{CreateProjectInput, UpdateProjectInput, UpsertProjectMemberInput};
use crate::error::Result;
use crate::middleware::AuthUser;
use crate::server::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

/// List projects in the organization
pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(org_id): Path<Uuid>,
    Query(pagination): Query<PaginationQuery>,
) -> Result<impl IntoResponse> {
    let (projects, total) = state
        .project_service
        .list(&auth.principal, org_id, pagination.page, pagination.limit)
        .await?;

    Ok(Json(PaginatedResponse::new(
        projects,
        pagination.page,
        pagination.limit,
        total,
    )))
}

/// Create a project
pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(org_id): Path<Uuid>,
    Json(input): Json<CreateProjectInput>,
) -> Result<impl IntoResponse> {
    let project = state
        .project_service
        .create(&auth.principal, org_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(SuccessResponse::new(project))))
}

/// Get a project
pub async fn get(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((org_id, project_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse> {
    let project = state
        .project_service
        .get(&auth.principal, org_id, project_id)
        .await?;
    Ok(Json(SuccessResponse::new(project)))
}

/// Update project fields
pub async fn update(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((org_id, project_id)): Path<(Uuid, Uuid)>,
    Json(input): Json<UpdateProjectInput>,
) -> Result<impl IntoResponse> {
    let project = state
        .project_service
        .update(&auth.principal, org_id, project_id, input)
        .await?;
    Ok(Json(SuccessResponse::new(project)))
}

/// Delete a project with its tasks and grants
pub async fn delete(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((org_id, project_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse> {
    state
        .project_service
        .delete(&auth.principal, org_id, project_id)
        .await?;
    Ok(Json(MessageResponse::new("Project deleted successfully")))
}

/// List project members with their grants
pub async fn list_members(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((org_id, project_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse> {
    let members = state
        .project_service
        .members(&auth.principal, org_id, project_id)
        .await?;
    Ok(Json(SuccessResponse::new(members)))
}

/// Grant or change a member's project role
pub async fn upsert_member(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((org_id, project_id)): Path<(Uuid, Uuid)>,
    Json(input): Json<UpsertProjectMemberInput>,
) -> Result<impl IntoResponse> {
    let member = state
        .project_service
        .upsert_member(&auth.principal, org_id, project_id, input)
        .await?;
    Ok(Json(SuccessResponse::new(member)))
}

/// Revoke a member's project role
pub async fn remove_member(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((org_id, project_id, user_id)): Path<(Uuid, Uuid, Uuid)>,
) -> Result<impl IntoResponse> {
    state
        .project_service
        .remove_member(&auth.principal, org_id, project_id, user_id)
        .await?;
    Ok(Json(MessageResponse::new(
        "Project access revoked successfully",
    )))
}
