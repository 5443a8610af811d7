//! Membership repository
//!
//! `MembershipRepository` is the pre-context surface: context binding and
//! websocket join checks call it with a bare pool. Member administration
//! happens inside bound transactions through the module functions.

use crate::domain::{MemberWithUser, Membership, OrgRole};
use crate::error::Result;
use crate::tenancy::TenantTx;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MembershipRepository: Send + Sync {
    /// Role of the user in the organization, if any membership exists.
    async fn find_role(&self, user_id: Uuid, organization_id: Uuid) -> Result<Option<OrgRole>>;
}

pub struct MembershipRepositoryImpl {
    pool: PgPool,
}

impl MembershipRepositoryImpl {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MembershipRepository for MembershipRepositoryImpl {
    async fn find_role(&self, user_id: Uuid, organization_id: Uuid) -> Result<Option<OrgRole>> {
        let role = sqlx::query_scalar::<_, OrgRole>(
            r#"
            SELECT role FROM memberships
            WHERE user_id = $1 AND organization_id = $2
            "#,
        )
        .bind(user_id)
        .bind(organization_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(role)
    }
}

/// Role of a user within the transaction's organization.
pub async fn role_of(tx: &mut TenantTx, user_id: Uuid) -> Result<Option<OrgRole>> {
    let org_id = tx.organization_id();
    let role = sqlx::query_scalar::<_, OrgRole>(
        r#"
        SELECT role FROM memberships
        WHERE user_id = $1 AND organization_id = $2
        "#,
    )
    .bind(user_id)
    .bind(org_id)
    .fetch_optional(tx.conn())
    .await?;

    Ok(role)
}

pub async fn find(tx: &mut TenantTx, user_id: Uuid) -> Result<Option<Membership>> {
    let org_id = tx.organization_id();
    let membership = sqlx::query_as::<_, Membership>(
        r#"
        SELECT id, organization_id, user_id, role, created_at
        FROM memberships
        WHERE user_id = $1 AND organization_id = $2
        "#,
    )
    .bind(user_id)
    .bind(org_id)
    .fetch_optional(tx.conn())
    .await?;

    Ok(membership)
}

pub async fn insert(tx: &mut TenantTx, user_id: Uuid, role: OrgRole) -> Result<Membership> {
    let org_id = tx.organization_id();
    let membership = sqlx::query_as::<_, Membership>(
        r#"
        INSERT INTO memberships (id, organization_id, user_id, role, created_at)
        VALUES ($1, $2, $3, $4, NOW())
        RETURNING id, organization_id, user_id, role, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(org_id)
    .bind(user_id)
    .bind(role)
    .fetch_one(tx.conn())
    .await?;

    Ok(membership)
}

/// Change a member's role. Returns the number of rows touched.
pub async fn set_role(tx: &mut TenantTx, user_id: Uuid, role: OrgRole) -> Result<u64> {
    let org_id = tx.organization_id();
    let result = sqlx::query(
        r#"
        UPDATE memberships SET role = $3
        WHERE user_id = $1 AND organization_id = $2
        "#,
    )
    .bind(user_id)
    .bind(org_id)
    .bind(role)
    .execute(tx.conn())
    .await?;

    Ok(result.rows_affected())
}

/// Remove a member. Project grants cascade away with the membership row.
pub async fn remove(tx: &mut TenantTx, user_id: Uuid) -> Result<u64> {
    let org_id = tx.organization_id();
    let result = sqlx::query(
        r#"
        DELETE FROM memberships
        WHERE user_id = $1 AND organization_id = $2
        "#,
    )
    .bind(user_id)
    .bind(org_id)
    .execute(tx.conn())
    .await?;

    Ok(result.rows_affected())
}

pub async fn list_with_users(tx: &mut TenantTx) -> Result<Vec<MemberWithUser>> {
    let org_id = tx.organization_id();
    let members = sqlx::query_as::<_, MemberWithUser>(
        r#"
        SELECT m.user_id, u.email, u.display_name, m.role, m.created_at AS joined_at
        FROM memberships m
        JOIN users u ON u.id = m.user_id
        WHERE m.organization_id = $1
        ORDER BY m.created_at ASC, m.id ASC
        "#,
    )
    .bind(org_id)
    .fetch_all(tx.conn())
    .await?;

    Ok(members)
}

pub async fn count(tx: &mut TenantTx) -> Result<i64> {
    let org_id = tx.organization_id();
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM memberships WHERE organization_id = $1
        "#,
    )
    .bind(org_id)
    .fetch_one(tx.conn())
    .await?;

    Ok(count)
}

/// Checks that a user account exists before granting it a membership.
pub async fn user_exists(tx: &mut TenantTx, user_id: Uuid) -> Result<bool> {
    let exists = sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)
        "#,
    )
    .bind(user_id)
    .fetch_one(tx.conn())
    .await?;

    Ok(exists)
}
