//! Organization repository
//!
//! Creation and listing run on the bare pool because no security context can
//! exist before the caller belongs to the organization. Rename and delete are
//! tenant-scoped and require a bound transaction.

use crate::domain::{CreateOrganizationInput, OrgRole, Organization};
use crate::error::{AppError, Result};
use crate::tenancy::TenantTx;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrganizationRepository: Send + Sync {
    /// Create the organization and its owner membership in one transaction.
    async fn create_with_owner(
        &self,
        input: &CreateOrganizationInput,
        owner_id: Uuid,
    ) -> Result<Organization>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Organization>>;
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Organization>>;
    async fn list_for_user(
        &self,
        user_id: Uuid,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Organization>>;
    async fn count_for_user(&self, user_id: Uuid) -> Result<i64>;
}

pub struct OrganizationRepositoryImpl {
    pool: PgPool,
}

impl OrganizationRepositoryImpl {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrganizationRepository for OrganizationRepositoryImpl {
    async fn create_with_owner(
        &self,
        input: &CreateOrganizationInput,
        owner_id: Uuid,
    ) -> Result<Organization> {
        let mut tx = self.pool.begin().await?;

        let organization = sqlx::query_as::<_, Organization>(
            r#"
            INSERT INTO organizations (id, name, slug, created_at, updated_at)
            VALUES ($1, $2, $3, NOW(), NOW())
            RETURNING id, name, slug, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&input.name)
        .bind(&input.slug)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO memberships (id, organization_id, user_id, role, created_at)
            VALUES ($1, $2, $3, $4, NOW())
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(organization.id)
        .bind(owner_id)
        .bind(OrgRole::Owner)
        .execute(&mut *tx)
        .await?;

        tx.commit().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to commit organization creation");
            AppError::Database(e)
        })?;

        Ok(organization)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Organization>> {
        let organization = sqlx::query_as::<_, Organization>(
            r#"
            SELECT id, name, slug, created_at, updated_at
            FROM organizations
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(organization)
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Organization>> {
        let organization = sqlx::query_as::<_, Organization>(
            r#"
            SELECT id, name, slug, created_at, updated_at
            FROM organizations
            WHERE slug = $1
            "#,
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        Ok(organization)
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Organization>> {
        let organizations = sqlx::query_as::<_, Organization>(
            r#"
            SELECT o.id, o.name, o.slug, o.created_at, o.updated_at
            FROM organizations o
            JOIN memberships m ON m.organization_id = o.id
            WHERE m.user_id = $1
            ORDER BY o.created_at DESC, o.id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(organizations)
    }

    async fn count_for_user(&self, user_id: Uuid) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM memberships
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}

/// The organization this transaction is bound to.
pub async fn current(tx: &mut TenantTx) -> Result<Organization> {
    let org_id = tx.organization_id();
    let organization = sqlx::query_as::<_, Organization>(
        r#"
        SELECT id, name, slug, created_at, updated_at
        FROM organizations
        WHERE id = $1
        "#,
    )
    .bind(org_id)
    .fetch_optional(tx.conn())
    .await?
    .ok_or(AppError::NotFound)?;

    Ok(organization)
}

pub async fn rename(tx: &mut TenantTx, name: &str) -> Result<Organization> {
    let org_id = tx.organization_id();
    let organization = sqlx::query_as::<_, Organization>(
        r#"
        UPDATE organizations
        SET name = $2, updated_at = NOW()
        WHERE id = $1
        RETURNING id, name, slug, created_at, updated_at
        "#,
    )
    .bind(org_id)
    .bind(name)
    .fetch_optional(tx.conn())
    .await?
    .ok_or(AppError::NotFound)?;

    Ok(organization)
}

/// Delete the bound organization. Memberships, projects, tasks, project
/// grants, and activities cascade away in the same statement.
pub async fn delete(tx: &mut TenantTx) -> Result<()> {
    let org_id = tx.organization_id();
    sqlx::query(
        r#"
        DELETE FROM organizations WHERE id = $1
        "#,
    )
    .bind(org_id)
    .execute(tx.conn())
    .await?;

    Ok(())
}
