//! Activity store functions, all scoped to a bound tenant transaction.
//!
//! The durable rows written here are the source of truth for the feed; the
//! live cache and websocket fan-out are projections fed after commit.

use crate::domain::{ActivityKind, ActivityRecord, NewActivity};
use crate::error::Result;
use crate::tenancy::TenantTx;
use uuid::Uuid;

const ACTIVITY_COLUMNS: &str =
    "id, organization_id, actor_id, kind, message, object_type, object_id, metadata, created_at";

/// Append an activity. The organization always comes from the transaction,
/// never from the caller-supplied value.
pub async fn insert(tx: &mut TenantTx, activity: &NewActivity) -> Result<ActivityRecord> {
    let org_id = tx.organization_id();
    let record = sqlx::query_as::<_, ActivityRecord>(&format!(
        r#"
        INSERT INTO activities (id, organization_id, actor_id, kind, message, object_type, object_id, metadata, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW())
        RETURNING {ACTIVITY_COLUMNS}
        "#,
    ))
    .bind(Uuid::new_v4())
    .bind(org_id)
    .bind(activity.actor_id)
    .bind(activity.kind)
    .bind(&activity.message)
    .bind(&activity.object_type)
    .bind(activity.object_id)
    .bind(&activity.metadata)
    .fetch_one(tx.conn())
    .await?;

    Ok(record)
}

/// Paginated history, newest first. Ties on `created_at` are broken by id so
/// pages never skip or repeat rows.
pub async fn list(
    tx: &mut TenantTx,
    kind: Option<ActivityKind>,
    offset: i64,
    limit: i64,
) -> Result<Vec<ActivityRecord>> {
    let org_id = tx.organization_id();

    let mut sql = format!("SELECT {ACTIVITY_COLUMNS} FROM activities WHERE organization_id = $1");
    if kind.is_some() {
        sql.push_str(" AND kind = $2 ORDER BY created_at DESC, id DESC LIMIT $3 OFFSET $4");
    } else {
        sql.push_str(" ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3");
    }

    let mut query = sqlx::query_as::<_, ActivityRecord>(&sql).bind(org_id);
    if let Some(kind) = kind {
        query = query.bind(kind);
    }
    let records = query.bind(limit).bind(offset).fetch_all(tx.conn()).await?;

    Ok(records)
}

pub async fn count(tx: &mut TenantTx, kind: Option<ActivityKind>) -> Result<i64> {
    let org_id = tx.organization_id();

    let mut sql = String::from("SELECT COUNT(*) FROM activities WHERE organization_id = $1");
    if kind.is_some() {
        sql.push_str(" AND kind = $2");
    }

    let mut query = sqlx::query_scalar::<_, i64>(&sql).bind(org_id);
    if let Some(kind) = kind {
        query = query.bind(kind);
    }
    let count = query.fetch_one(tx.conn()).await?;

    Ok(count)
}

/// The newest `limit` activities, used to rebuild the live window after a
/// cache miss.
pub async fn recent_window(tx: &mut TenantTx, limit: i64) -> Result<Vec<ActivityRecord>> {
    let org_id = tx.organization_id();
    let records = sqlx::query_as::<_, ActivityRecord>(&format!(
        r#"
        SELECT {ACTIVITY_COLUMNS}
        FROM activities
        WHERE organization_id = $1
        ORDER BY created_at DESC, id DESC
        LIMIT $2
        "#,
    ))
    .bind(org_id)
    .bind(limit)
    .fetch_all(tx.conn())
    .await?;

    Ok(records)
}
