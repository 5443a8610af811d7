//! Organization membership domain model

use super::role::OrgRole;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Membership of a user in an organization. Unique per (user, org) pair;
/// exactly one row per organization carries `OrgRole::Owner`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Membership {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub user_id: Uuid,
    pub role: OrgRole,
    pub created_at: DateTime<Utc>,
}

/// Membership joined with user identity, for listings
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MemberWithUser {
    pub user_id: Uuid,
    pub email: String,
    pub display_name: String,
    pub role: OrgRole,
    pub joined_at: DateTime<Utc>,
}

/// Input for adding a member to an organization
#[derive(Debug, Clone, Deserialize)]
pub struct AddMemberInput {
    pub user_id: Uuid,
    pub role: OrgRole,
}

/// Input for changing an existing member's role
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateMemberRoleInput {
    pub role: OrgRole,
}

/// Input for transferring organization ownership
#[derive(Debug, Clone, Deserialize)]
pub struct TransferOwnershipInput {
    pub new_owner_id: Uuid,
}
