//! Task store functions, all scoped to a bound tenant transaction.

use crate::domain::{CreateTaskInput, Task, TaskStatus, UpdateTaskInput};
use crate::error::Result;
use crate::tenancy::TenantTx;
use uuid::Uuid;

const TASK_COLUMNS: &str = "id, organization_id, project_id, title, description, status, \
                            assigned_to, created_by, created_at, updated_at";

pub async fn insert(
    tx: &mut TenantTx,
    project_id: Uuid,
    input: &CreateTaskInput,
    created_by: Uuid,
) -> Result<Task> {
    let org_id = tx.organization_id();
    let task = sqlx::query_as::<_, Task>(&format!(
        r#"
        INSERT INTO tasks (id, organization_id, project_id, title, description, status, created_by, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, NOW(), NOW())
        RETURNING {TASK_COLUMNS}
        "#,
    ))
    .bind(Uuid::new_v4())
    .bind(org_id)
    .bind(project_id)
    .bind(&input.title)
    .bind(&input.description)
    .bind(TaskStatus::default())
    .bind(created_by)
    .fetch_one(tx.conn())
    .await?;

    Ok(task)
}

pub async fn find(tx: &mut TenantTx, task_id: Uuid) -> Result<Option<Task>> {
    let org_id = tx.organization_id();
    let task = sqlx::query_as::<_, Task>(&format!(
        r#"
        SELECT {TASK_COLUMNS}
        FROM tasks
        WHERE id = $1 AND organization_id = $2
        "#,
    ))
    .bind(task_id)
    .bind(org_id)
    .fetch_optional(tx.conn())
    .await?;

    Ok(task)
}

pub async fn list(
    tx: &mut TenantTx,
    project_id: Uuid,
    status: Option<TaskStatus>,
    offset: i64,
    limit: i64,
) -> Result<Vec<Task>> {
    let org_id = tx.organization_id();

    let mut sql = format!(
        "SELECT {TASK_COLUMNS} FROM tasks WHERE organization_id = $1 AND project_id = $2"
    );
    if status.is_some() {
        sql.push_str(" AND status = $3 ORDER BY created_at DESC, id DESC LIMIT $4 OFFSET $5");
    } else {
        sql.push_str(" ORDER BY created_at DESC, id DESC LIMIT $3 OFFSET $4");
    }

    let mut query = sqlx::query_as::<_, Task>(&sql).bind(org_id).bind(project_id);
    if let Some(status) = status {
        query = query.bind(status);
    }
    let tasks = query.bind(limit).bind(offset).fetch_all(tx.conn()).await?;

    Ok(tasks)
}

pub async fn count(
    tx: &mut TenantTx,
    project_id: Uuid,
    status: Option<TaskStatus>,
) -> Result<i64> {
    let org_id = tx.organization_id();

    let mut sql =
        String::from("SELECT COUNT(*) FROM tasks WHERE organization_id = $1 AND project_id = $2");
    if status.is_some() {
        sql.push_str(" AND status = $3");
    }

    let mut query = sqlx::query_scalar::<_, i64>(&sql).bind(org_id).bind(project_id);
    if let Some(status) = status {
        query = query.bind(status);
    }
    let count = query.fetch_one(tx.conn()).await?;

    Ok(count)
}

/// Update title/description. Absent fields keep their current value.
pub async fn update_fields(
    tx: &mut TenantTx,
    task_id: Uuid,
    input: &UpdateTaskInput,
) -> Result<Option<Task>> {
    let org_id = tx.organization_id();
    let task = sqlx::query_as::<_, Task>(&format!(
        r#"
        UPDATE tasks
        SET title = COALESCE($3, title),
            description = COALESCE($4, description),
            updated_at = NOW()
        WHERE id = $1 AND organization_id = $2
        RETURNING {TASK_COLUMNS}
        "#,
    ))
    .bind(task_id)
    .bind(org_id)
    .bind(&input.title)
    .bind(&input.description)
    .fetch_optional(tx.conn())
    .await?;

    Ok(task)
}

pub async fn set_status(
    tx: &mut TenantTx,
    task_id: Uuid,
    status: TaskStatus,
) -> Result<Option<Task>> {
    let org_id = tx.organization_id();
    let task = sqlx::query_as::<_, Task>(&format!(
        r#"
        UPDATE tasks
        SET status = $3, updated_at = NOW()
        WHERE id = $1 AND organization_id = $2
        RETURNING {TASK_COLUMNS}
        "#,
    ))
    .bind(task_id)
    .bind(org_id)
    .bind(status)
    .fetch_optional(tx.conn())
    .await?;

    Ok(task)
}

/// Set or clear the assignee.
pub async fn assign(
    tx: &mut TenantTx,
    task_id: Uuid,
    assignee: Option<Uuid>,
) -> Result<Option<Task>> {
    let org_id = tx.organization_id();
    let task = sqlx::query_as::<_, Task>(&format!(
        r#"
        UPDATE tasks
        SET assigned_to = $3, updated_at = NOW()
        WHERE id = $1 AND organization_id = $2
        RETURNING {TASK_COLUMNS}
        "#,
    ))
    .bind(task_id)
    .bind(org_id)
    .bind(assignee)
    .fetch_optional(tx.conn())
    .await?;

    Ok(task)
}

pub async fn delete(tx: &mut TenantTx, task_id: Uuid) -> Result<u64> {
    let org_id = tx.organization_id();
    let result = sqlx::query(
        r#"
        DELETE FROM tasks WHERE id = $1 AND organization_id = $2
        "#,
    )
    .bind(task_id)
    .bind(org_id)
    .execute(tx.conn())
    .await?;

    Ok(result.rows_affected())
}
