//! Activity recording and feed logic
//!
//! Every mutation in the system flows through [`ActivityRecorder`]: the
//! durable row is appended inside the caller's tenant transaction, and the
//! live projections (bounded cache window, websocket rooms) are updated
//! after commit. The projections are best-effort; the row is not.

use crate::authz;
use crate::cache::ActivityCache;
use crate::domain::{
    ActivityFilter, ActivityKind, ActivityRecord, AnnounceInput, NewActivity, Principal,
};
use crate::error::Result;
use crate::realtime::{ActivityEvent, RealtimeHub};
use crate::repository::{self, MembershipRepository};
use crate::tenancy::{TenantContextManager, TenantTx};
use metrics::counter;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;
use validator::Validate;

/// Shared activity pipeline: durable append plus post-commit fan-out.
pub struct ActivityRecorder {
    cache: Arc<dyn ActivityCache>,
    hub: Arc<RealtimeHub>,
}

impl ActivityRecorder {
    pub fn new(cache: Arc<dyn ActivityCache>, hub: Arc<RealtimeHub>) -> Self {
        Self { cache, hub }
    }

    /// Append an activity row inside the caller's transaction so it commits
    /// or rolls back together with the change it describes.
    pub async fn record(
        &self,
        tx: &mut TenantTx,
        activity: NewActivity,
    ) -> Result<ActivityRecord> {
        let record = repository::activity::insert(tx, &activity).await?;
        counter!(
            "syncboard_activities_recorded_total",
            "kind" => record.kind.to_string()
        )
        .increment(1);
        Ok(record)
    }

    /// Fan a committed activity out to the live window and the
    /// organization's websocket room. Either layer may fail independently;
    /// failures are logged and swallowed because the durable row already
    /// exists and readers recover through the history endpoint.
    pub async fn publish(&self, room: &str, record: ActivityRecord) {
        if let Err(e) = self.cache.push(record.organization_id, &record).await {
            warn!(
                error = %e,
                organization_id = %record.organization_id,
                "live cache push failed"
            );
        }

        let event = ActivityEvent::new(record);
        let delivered = self.hub.broadcast(room, &event).await;
        debug!(room = %room, delivered, "activity published");
    }

    /// Drop an organization's live window, used when the organization itself
    /// goes away.
    pub async fn forget(&self, organization_id: Uuid) {
        if let Err(e) = self.cache.invalidate(organization_id).await {
            warn!(
                error = %e,
                organization_id = %organization_id,
                "live cache invalidation failed"
            );
        }
    }
}

/// Read side of the activity log: paginated history, the cached recent
/// window, and explicit announcements.
pub struct ActivityService<M: MembershipRepository> {
    tenancy: Arc<TenantContextManager<M>>,
    recorder: Arc<ActivityRecorder>,
    cache: Arc<dyn ActivityCache>,
    live_capacity: usize,
}

impl<M: MembershipRepository> ActivityService<M> {
    pub fn new(
        tenancy: Arc<TenantContextManager<M>>,
        recorder: Arc<ActivityRecorder>,
        cache: Arc<dyn ActivityCache>,
        live_capacity: usize,
    ) -> Self {
        Self {
            tenancy,
            recorder,
            cache,
            live_capacity,
        }
    }

    /// Paginated history, newest first, optionally filtered by kind.
    pub async fn history(
        &self,
        principal: &Principal,
        organization_id: Uuid,
        filter: ActivityFilter,
        page: i64,
        limit: i64,
    ) -> Result<(Vec<ActivityRecord>, i64)> {
        let ctx = self.tenancy.bind(principal, organization_id).await?;
        let offset = (page - 1) * limit;
        let kind = filter.kind;

        self.tenancy
            .with_context(ctx, move |tx| {
                Box::pin(async move {
                    authz::snapshot(tx, None).await?;
                    let records = repository::activity::list(tx, kind, offset, limit).await?;
                    let total = repository::activity::count(tx, kind).await?;
                    Ok((records, total))
                })
            })
            .await
    }

    /// The most recent activities, served from the live cache when the
    /// window is present and rebuilt from the store when it is not.
    pub async fn recent(
        &self,
        principal: &Principal,
        organization_id: Uuid,
    ) -> Result<Vec<ActivityRecord>> {
        let ctx = self.tenancy.bind(principal, organization_id).await?;

        match self.cache.recent(organization_id).await {
            Ok(Some(records)) => return Ok(records),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "live cache read failed, falling back to store"),
        }

        let window = self.live_capacity as i64;
        let records = self
            .tenancy
            .with_context(ctx, move |tx| {
                Box::pin(async move {
                    authz::snapshot(tx, None).await?;
                    repository::activity::recent_window(tx, window).await
                })
            })
            .await?;

        if let Err(e) = self.cache.warm(organization_id, &records).await {
            warn!(error = %e, "failed to warm live cache");
        }

        Ok(records)
    }

    /// Record an organization-wide announcement. Owners and admins only.
    pub async fn announce(
        &self,
        principal: &Principal,
        organization_id: Uuid,
        input: AnnounceInput,
    ) -> Result<ActivityRecord> {
        input.validate()?;

        let ctx = self.tenancy.bind(principal, organization_id).await?;
        let recorder = self.recorder.clone();
        let actor = principal.user_id;

        let (record, slug) = self
            .tenancy
            .with_context(ctx, move |tx| {
                Box::pin(async move {
                    let snapshot = authz::snapshot(tx, None).await?;
                    authz::require(authz::can_manage_org(snapshot.org_role))?;

                    let organization = repository::organization::current(tx).await?;
                    let activity = NewActivity::new(
                        tx.organization_id(),
                        actor,
                        ActivityKind::Announce,
                        input.message,
                    );
                    let record = recorder.record(tx, activity).await?;
                    Ok((record, organization.slug))
                })
            })
            .await?;

        self.recorder.publish(&slug, record.clone()).await;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryActivityCache;
    use crate::domain::OrgRole;
    use crate::error::AppError;
    use crate::repository::MockMembershipRepository;
    use chrono::{Duration, Utc};
    use pretty_assertions::assert_eq;
    use sqlx::postgres::PgPoolOptions;
    use sqlx::PgPool;

    fn lazy_pool() -> PgPool {
        PgPoolOptions::new()
            .connect_lazy("postgres://localhost:5999/never_connected")
            .unwrap()
    }

    fn sample_record(organization_id: Uuid) -> ActivityRecord {
        ActivityRecord {
            id: Uuid::new_v4(),
            organization_id,
            actor_id: Uuid::new_v4(),
            kind: ActivityKind::Notify,
            message: "created project \"Apollo\"".to_string(),
            object_type: Some("project".to_string()),
            object_id: Some(Uuid::new_v4()),
            metadata: None,
            created_at: Utc::now(),
        }
    }

    fn create_test_service(
        memberships: MockMembershipRepository,
        cache: Arc<MemoryActivityCache>,
    ) -> ActivityService<MockMembershipRepository> {
        let tenancy = Arc::new(TenantContextManager::new(
            lazy_pool(),
            Arc::new(memberships),
        ));
        let hub = Arc::new(RealtimeHub::default());
        let recorder = Arc::new(ActivityRecorder::new(cache.clone(), hub));
        ActivityService::new(tenancy, recorder, cache, 20)
    }

    #[tokio::test]
    async fn test_recent_served_from_cache_without_touching_store() {
        let organization_id = Uuid::new_v4();
        let record = sample_record(organization_id);

        let cache = Arc::new(MemoryActivityCache::new(20, Duration::days(7)));
        cache
            .warm(organization_id, std::slice::from_ref(&record))
            .await
            .unwrap();

        // The pool never connects, so a cache hit is the only way this
        // returns Ok.
        let mut memberships = MockMembershipRepository::new();
        memberships
            .expect_find_role()
            .returning(|_, _| Ok(Some(OrgRole::Member)));

        let service = create_test_service(memberships, cache);
        let principal = Principal {
            user_id: Uuid::new_v4(),
            display_name: "Dana".to_string(),
        };

        let result = service.recent(&principal, organization_id).await;
        assert_eq!(result.unwrap(), vec![record]);
    }

    #[tokio::test]
    async fn test_recent_rejects_non_member() {
        let mut memberships = MockMembershipRepository::new();
        memberships.expect_find_role().returning(|_, _| Ok(None));

        let cache = Arc::new(MemoryActivityCache::new(20, Duration::days(7)));
        let service = create_test_service(memberships, cache);
        let principal = Principal {
            user_id: Uuid::new_v4(),
            display_name: "Mallory".to_string(),
        };

        let result = service.recent(&principal, Uuid::new_v4()).await;
        assert!(matches!(result, Err(AppError::NotMember)));
    }

    #[tokio::test]
    async fn test_announce_rejects_empty_message() {
        let memberships = MockMembershipRepository::new();
        let cache = Arc::new(MemoryActivityCache::new(20, Duration::days(7)));
        let service = create_test_service(memberships, cache);
        let principal = Principal {
            user_id: Uuid::new_v4(),
            display_name: "Olive".to_string(),
        };

        let input = AnnounceInput {
            message: String::new(),
        };
        let result = service.announce(&principal, Uuid::new_v4(), input).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_announce_rejects_non_member_before_any_store_work() {
        let mut memberships = MockMembershipRepository::new();
        memberships.expect_find_role().returning(|_, _| Ok(None));

        let cache = Arc::new(MemoryActivityCache::new(20, Duration::days(7)));
        let service = create_test_service(memberships, cache);
        let principal = Principal {
            user_id: Uuid::new_v4(),
            display_name: "Mallory".to_string(),
        };

        let input = AnnounceInput {
            message: "release tonight".to_string(),
        };
        let result = service.announce(&principal, Uuid::new_v4(), input).await;
        assert!(matches!(result, Err(AppError::NotMember)));
    }
}
