//! Organization membership API handlers

use crate::api::{MessageResponse, SuccessResponse};
use crate::domain::{AddMemberInput, UpdateMemberRoleInput};
use crate::error::Result;
use crate::middleware::AuthUser;
use crate::server::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

/// List organization members with their user identities
pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(org_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let members = state
        .organization_service
        .members(&auth.principal, org_id)
        .await?;
    Ok(Json(SuccessResponse::new(members)))
}

/// Add an existing user to the organization
pub async fn add(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(org_id): Path<Uuid>,
    Json(input): Json<AddMemberInput>,
) -> Result<impl IntoResponse> {
    let membership = state
        .organization_service
        .add_member(&auth.principal, org_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(SuccessResponse::new(membership))))
}

/// Change a member's organization role
pub async fn change_role(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((org_id, user_id)): Path<(Uuid, Uuid)>,
    Json(input): Json<UpdateMemberRoleInput>,
) -> Result<impl IntoResponse> {
    let membership = state
        .organization_service
        .change_member_role(&auth.principal, org_id, user_id, input)
        .await?;
    Ok(Json(SuccessResponse::new(membership)))
}

/// Remove a member from the organization
pub async fn remove(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((org_id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse> {
    state
        .organization_service
        .remove_member(&auth.principal, org_id, user_id)
        .await?;
    Ok(Json(MessageResponse::new("Member removed successfully")))
}
