//! Activity domain model
//!
//! Activities are the append-only, per-organization event log behind the
//! live feed. Durable rows are the source of truth; the bounded live
//! cache and the realtime fan-out are projections of them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Activity classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "activity_kind", rename_all = "lowercase")]
#[serde(rename_all = "UPPERCASE")]
pub enum ActivityKind {
    /// Destructive events: deletions, member removals
    Warn,
    /// Privilege events: role changes, ownership transfer
    Alert,
    /// Routine events: creates and edits
    Notify,
    /// Organization-wide announcements
    Announce,
    /// Presentation events: task completion
    Show,
}

impl std::fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActivityKind::Warn => write!(f, "WARN"),
            ActivityKind::Alert => write!(f, "ALERT"),
            ActivityKind::Notify => write!(f, "NOTIFY"),
            ActivityKind::Announce => write!(f, "ANNOUNCE"),
            ActivityKind::Show => write!(f, "SHOW"),
        }
    }
}

impl std::str::FromStr for ActivityKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "WARN" => Ok(ActivityKind::Warn),
            "ALERT" => Ok(ActivityKind::Alert),
            "NOTIFY" => Ok(ActivityKind::Notify),
            "ANNOUNCE" => Ok(ActivityKind::Announce),
            "SHOW" => Ok(ActivityKind::Show),
            _ => Err(format!("Unknown activity kind: {}", s)),
        }
    }
}

/// A recorded activity. Ordered within an organization by `created_at`
/// (ties broken by id for stable pagination).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ActivityRecord {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub actor_id: Uuid,
    pub kind: ActivityKind,
    pub message: String,
    pub object_type: Option<String>,
    pub object_id: Option<Uuid>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// Input for appending an activity
#[derive(Debug, Clone)]
pub struct NewActivity {
    pub organization_id: Uuid,
    pub actor_id: Uuid,
    pub kind: ActivityKind,
    pub message: String,
    pub object_type: Option<String>,
    pub object_id: Option<Uuid>,
    pub metadata: Option<serde_json::Value>,
}

impl NewActivity {
    pub fn new(
        organization_id: Uuid,
        actor_id: Uuid,
        kind: ActivityKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            organization_id,
            actor_id,
            kind,
            message: message.into(),
            object_type: None,
            object_id: None,
            metadata: None,
        }
    }

    pub fn about(mut self, object_type: impl Into<String>, object_id: Uuid) -> Self {
        self.object_type = Some(object_type.into());
        self.object_id = Some(object_id);
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Filter for the paginated activity history
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActivityFilter {
    pub kind: Option<ActivityKind>,
}

/// Input for an explicit organization-wide announcement
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AnnounceInput {
    #[validate(length(min = 1, max = 1000))]
    pub message: String,
}
