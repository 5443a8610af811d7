//! Project store functions, all scoped to a bound tenant transaction.
//!
//! Every statement filters on the transaction's organization in addition to
//! the row-level security policies, so a scoping bug in either layer is
//! caught by the other.

use crate::domain::{
    CreateProjectInput, Project, ProjectMember, ProjectMemberWithUser, ProjectRole,
    UpdateProjectInput,
};
use crate::error::Result;
use crate::tenancy::TenantTx;
use uuid::Uuid;

pub async fn insert(
    tx: &mut TenantTx,
    input: &CreateProjectInput,
    created_by: Uuid,
) -> Result<Project> {
    let org_id = tx.organization_id();
    let project = sqlx::query_as::<_, Project>(
        r#"
        INSERT INTO projects (id, organization_id, name, description, created_by, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, NOW(), NOW())
        RETURNING id, organization_id, name, description, created_by, created_at, updated_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(org_id)
    .bind(&input.name)
    .bind(&input.description)
    .bind(created_by)
    .fetch_one(tx.conn())
    .await?;

    Ok(project)
}

pub async fn find(tx: &mut TenantTx, project_id: Uuid) -> Result<Option<Project>> {
    let org_id = tx.organization_id();
    let project = sqlx::query_as::<_, Project>(
        r#"
        SELECT id, organization_id, name, description, created_by, created_at, updated_at
        FROM projects
        WHERE id = $1 AND organization_id = $2
        "#,
    )
    .bind(project_id)
    .bind(org_id)
    .fetch_optional(tx.conn())
    .await?;

    Ok(project)
}

pub async fn list(tx: &mut TenantTx, offset: i64, limit: i64) -> Result<Vec<Project>> {
    let org_id = tx.organization_id();
    let projects = sqlx::query_as::<_, Project>(
        r#"
        SELECT id, organization_id, name, description, created_by, created_at, updated_at
        FROM projects
        WHERE organization_id = $1
        ORDER BY created_at DESC, id DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(org_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(tx.conn())
    .await?;

    Ok(projects)
}

pub async fn count(tx: &mut TenantTx) -> Result<i64> {
    let org_id = tx.organization_id();
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM projects WHERE organization_id = $1
        "#,
    )
    .bind(org_id)
    .fetch_one(tx.conn())
    .await?;

    Ok(count)
}

/// Update name/description. Absent fields keep their current value.
pub async fn update(
    tx: &mut TenantTx,
    project_id: Uuid,
    input: &UpdateProjectInput,
) -> Result<Option<Project>> {
    let org_id = tx.organization_id();
    let project = sqlx::query_as::<_, Project>(
        r#"
        UPDATE projects
        SET name = COALESCE($3, name),
            description = COALESCE($4, description),
            updated_at = NOW()
        WHERE id = $1 AND organization_id = $2
        RETURNING id, organization_id, name, description, created_by, created_at, updated_at
        "#,
    )
    .bind(project_id)
    .bind(org_id)
    .bind(&input.name)
    .bind(&input.description)
    .fetch_optional(tx.conn())
    .await?;

    Ok(project)
}

pub async fn delete(tx: &mut TenantTx, project_id: Uuid) -> Result<u64> {
    let org_id = tx.organization_id();
    let result = sqlx::query(
        r#"
        DELETE FROM projects WHERE id = $1 AND organization_id = $2
        "#,
    )
    .bind(project_id)
    .bind(org_id)
    .execute(tx.conn())
    .await?;

    Ok(result.rows_affected())
}

/// Grant or change a project role. Idempotent per (project, user).
pub async fn upsert_member(
    tx: &mut TenantTx,
    project_id: Uuid,
    user_id: Uuid,
    role: ProjectRole,
) -> Result<ProjectMember> {
    let org_id = tx.organization_id();
    let member = sqlx::query_as::<_, ProjectMember>(
        r#"
        INSERT INTO project_memberships (project_id, organization_id, user_id, role, created_at)
        VALUES ($1, $2, $3, $4, NOW())
        ON CONFLICT (project_id, user_id) DO UPDATE SET role = EXCLUDED.role
        RETURNING project_id, user_id, role, created_at
        "#,
    )
    .bind(project_id)
    .bind(org_id)
    .bind(user_id)
    .bind(role)
    .fetch_one(tx.conn())
    .await?;

    Ok(member)
}

pub async fn remove_member(tx: &mut TenantTx, project_id: Uuid, user_id: Uuid) -> Result<u64> {
    let org_id = tx.organization_id();
    let result = sqlx::query(
        r#"
        DELETE FROM project_memberships
        WHERE project_id = $1 AND user_id = $2 AND organization_id = $3
        "#,
    )
    .bind(project_id)
    .bind(user_id)
    .bind(org_id)
    .execute(tx.conn())
    .await?;

    Ok(result.rows_affected())
}

pub async fn list_members(
    tx: &mut TenantTx,
    project_id: Uuid,
) -> Result<Vec<ProjectMemberWithUser>> {
    let org_id = tx.organization_id();
    let members = sqlx::query_as::<_, ProjectMemberWithUser>(
        r#"
        SELECT pm.user_id, u.email, u.display_name, pm.role
        FROM project_memberships pm
        JOIN users u ON u.id = pm.user_id
        WHERE pm.project_id = $1 AND pm.organization_id = $2
        ORDER BY pm.created_at ASC, pm.user_id ASC
        "#,
    )
    .bind(project_id)
    .bind(org_id)
    .fetch_all(tx.conn())
    .await?;

    Ok(members)
}

pub async fn member_role(
    tx: &mut TenantTx,
    project_id: Uuid,
    user_id: Uuid,
) -> Result<Option<ProjectRole>> {
    let org_id = tx.organization_id();
    let role = sqlx::query_scalar::<_, ProjectRole>(
        r#"
        SELECT role FROM project_memberships
        WHERE project_id = $1 AND user_id = $2 AND organization_id = $3
        "#,
    )
    .bind(project_id)
    .bind(user_id)
    .bind(org_id)
    .fetch_optional(tx.conn())
    .await?;

    Ok(role)
}
