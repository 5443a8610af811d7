//! Organization API handlers

use crate::api::{MessageResponse, PaginatedResponse, PaginationQuery, SuccessResponse};
use crate::domain::{CreateOrganizationInput, TransferOwnershipInput, UpdateOrganizationInput};
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

/// List organizations the caller belongs to
pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(pagination): Query<PaginationQuery>,
) -> Result<impl IntoResponse> {
    let (organizations, total) = state
        .organization_service
        .list(&auth.principal, pagination.page, pagination.limit)
        .await?;

    Ok(Json(PaginatedResponse::new(
        organizations,
        pagination.page,
        pagination.limit,
        total,
    )))
}

/// Create an organization owned by the caller
pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(input): Json<CreateOrganizationInput>,
) -> Result<impl IntoResponse> {
    let organization = state
        .organization_service
        .create(&auth.principal, input)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(SuccessResponse::new(organization)),
    ))
}

/// Get an organization
pub async fn get(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(org_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let organization = state
        .organization_service
        .get(&auth.principal, org_id)
        .await?;
    Ok(Json(SuccessResponse::new(organization)))
}

/// Rename an organization
pub async fn update(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(org_id): Path<Uuid>,
    Json(input): Json<UpdateOrganizationInput>,
) -> Result<impl IntoResponse> {
    let organization = state
        .organization_service
        .update(&auth.principal, org_id, input)
        .await?;
    Ok(Json(SuccessResponse::new(organization)))
}

/// Delete an organization and everything in it
pub async fn delete(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(org_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state
        .organization_service
        .delete(&auth.principal, org_id)
        .await?;
    Ok(Json(MessageResponse::new(
        "Organization deleted successfully",
    )))
}

/// Transfer ownership to another member
pub async fn transfer_ownership(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(org_id): Path<Uuid>,
    Json(input): Json<TransferOwnershipInput>,
) -> Result<impl IntoResponse> {
    state
        .organization_service
        .transfer_ownership(&auth.principal, org_id, input)
        .await?;
    Ok(Json(MessageResponse::new(
        "Ownership transferred successfully",
    )))
}
