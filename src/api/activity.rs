//! Activity feed API handlers

use crate::api::{
    default_limit, default_page, deserialize_limit, deserialize_page, PaginatedResponse,
    SuccessResponse,
};
use crate::domain::{ActivityFilter, ActivityKind, AnnounceInput};
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

/// Query parameters for the paginated history endpoint.
/// Pagination fields are inlined because serde_urlencoded (used by axum's
/// Query) does not support #[serde(flatten)].
#[derive(Debug, Deserialize)]
pub struct ActivityListQuery {
    #[serde(default = "default_page", deserialize_with = "deserialize_page")]
    pub page: i64,
    #[serde(
        default = "default_limit",
        deserialize_with = "deserialize_limit",
        alias = "per_page"
    )]
    pub limit: i64,
    /// Filter activities by kind
    pub kind: Option<ActivityKind>,
}

/// Paginated activity history, newest first
pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(org_id): Path<Uuid>,
    Query(query): Query<ActivityListQuery>,
) -> Result<impl IntoResponse> {
    let filter = ActivityFilter { kind: query.kind };
    let (records, total) = state
        .activity_service
        .history(&auth.principal, org_id, filter, query.page, query.limit)
        .await?;

    Ok(Json(PaginatedResponse::new(
        records,
        query.page,
        query.limit,
        total,
    )))
}

/// The live window of most recent activities
pub async fn recent(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(org_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let records = state.activity_service.recent(&auth.principal, org_id).await?;
    Ok(Json(SuccessResponse::new(records)))
}

/// Post an organization-wide announcement
pub async fn announce(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(org_id): Path<Uuid>,
    Json(input): Json<AnnounceInput>,
) -> Result<impl IntoResponse> {
    let record = state
        .activity_service
        .announce(&auth.principal, org_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(SuccessResponse::new(record))))
}
