//! Live activity cache
//!
//! A bounded, per-organization window over the newest activities. The cache
//! is a lossy projection of the durable rows: losing it costs a re-warm from
//! the store, never data. Redis backs it in production; the in-memory
//! implementation serves single-node deployments and tests.

use crate::config::{ActivityConfig, RedisConfig};
use crate::domain::ActivityRecord;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use redis::aio::ConnectionManager;
use std::collections::{HashMap, VecDeque};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Cache key prefixes
mod keys {
    pub const ACTIVITY_LIVE: &str = "syncboard:activity:live";
}

/// Bounded live window over an organization's recent activities.
#[async_trait]
pub trait ActivityCache: Send + Sync {
    /// Prepend a freshly committed activity, evicting past capacity and
    /// refreshing the rolling expiry.
    async fn push(&self, organization_id: Uuid, record: &ActivityRecord) -> Result<()>;

    /// The cached window, newest first. `None` means a miss (absent or
    /// expired); callers fall back to the store and re-warm.
    async fn recent(&self, organization_id: Uuid) -> Result<Option<Vec<ActivityRecord>>>;

    /// Replace the window with rows read from the store (newest first).
    async fn warm(&self, organization_id: Uuid, records: &[ActivityRecord]) -> Result<()>;

    /// Drop the organization's window entirely.
    async fn invalidate(&self, organization_id: Uuid) -> Result<()>;

    /// Liveness probe against the backing store.
    async fn ping(&self) -> Result<()>;
}

/// Redis-backed live window: a capped list per organization.
#[derive(Clone)]
pub struct RedisActivityCache {
    conn: ConnectionManager,
    capacity: usize,
    ttl_secs: i64,
}

impl RedisActivityCache {
    pub async fn new(config: &RedisConfig, activity: &ActivityConfig) -> Result<Self> {
        let client = redis::Client::open(config.url.as_str()).map_err(|e| {
            AppError::Internal(anyhow::anyhow!("Failed to create Redis client: {}", e))
        })?;

        let conn = ConnectionManager::new(client).await.map_err(|e| {
            AppError::Internal(anyhow::anyhow!("Failed to connect to Redis: {}", e))
        })?;

        Ok(Self {
            conn,
            capacity: activity.live_capacity,
            ttl_secs: activity.live_ttl_days * 24 * 60 * 60,
        })
    }

    fn key_for(organization_id: Uuid) -> String {
        format!("{}:{}", keys::ACTIVITY_LIVE, organization_id)
    }
}

#[async_trait]
impl ActivityCache for RedisActivityCache {
    async fn push(&self, organization_id: Uuid, record: &ActivityRecord) -> Result<()> {
        let key = Self::key_for(organization_id);
        let payload = serde_json::to_string(record)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Cache serialize error: {}", e)))?;

        let mut conn = self.conn.clone();
        let _: () = redis::pipe()
            .lpush(&key, payload)
            .ignore()
            .ltrim(&key, 0, self.capacity as isize - 1)
            .ignore()
            .expire(&key, self.ttl_secs)
            .ignore()
            .query_async(&mut conn)
            .await?;

        Ok(())
    }

    async fn recent(&self, organization_id: Uuid) -> Result<Option<Vec<ActivityRecord>>> {
        let key = Self::key_for(organization_id);
        let mut conn = self.conn.clone();

        let raw: Vec<String> = redis::cmd("LRANGE")
            .arg(&key)
            .arg(0)
            .arg(self.capacity as isize - 1)
            .query_async(&mut conn)
            .await?;

        if raw.is_empty() {
            return Ok(None);
        }

        let mut records = Vec::with_capacity(raw.len());
        for item in raw {
            match serde_json::from_str::<ActivityRecord>(&item) {
                Ok(record) => records.push(record),
                Err(e) => {
                    // Treat a corrupt window as a miss; the re-warm replaces it.
                    tracing::warn!(error = %e, organization_id = %organization_id,
                        "Discarding undecodable live activity window");
                    return Ok(None);
                }
            }
        }

        Ok(Some(records))
    }

    async fn warm(&self, organization_id: Uuid, records: &[ActivityRecord]) -> Result<()> {
        let key = Self::key_for(organization_id);
        let mut conn = self.conn.clone();

        let mut pipe = redis::pipe();
        pipe.del(&key).ignore();
        for record in records.iter().take(self.capacity) {
            let payload = serde_json::to_string(record).map_err(|e| {
                AppError::Internal(anyhow::anyhow!("Cache serialize error: {}", e))
            })?;
            pipe.rpush(&key, payload).ignore();
        }
        if !records.is_empty() {
            pipe.expire(&key, self.ttl_secs).ignore();
        }
        let _: () = pipe.query_async(&mut conn).await?;

        Ok(())
    }

    async fn invalidate(&self, organization_id: Uuid) -> Result<()> {
        let key = Self::key_for(organization_id);
        let mut conn = self.conn.clone();
        let _: () = redis::cmd("DEL").arg(&key).query_async(&mut conn).await?;
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

struct OrgWindow {
    records: VecDeque<ActivityRecord>,
    expires_at: DateTime<Utc>,
}

/// In-process live window with the same bounded/rolling-expiry semantics as
/// the Redis cache.
pub struct MemoryActivityCache {
    inner: RwLock<HashMap<Uuid, OrgWindow>>,
    capacity: usize,
    ttl: Duration,
}

impl MemoryActivityCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
            capacity,
            ttl,
        }
    }

    pub fn from_config(activity: &ActivityConfig) -> Self {
        Self::new(activity.live_capacity, Duration::days(activity.live_ttl_days))
    }
}

#[async_trait]
impl ActivityCache for MemoryActivityCache {
    async fn push(&self, organization_id: Uuid, record: &ActivityRecord) -> Result<()> {
        let mut inner = self.inner.write().await;
        let window = inner.entry(organization_id).or_insert_with(|| OrgWindow {
            records: VecDeque::with_capacity(self.capacity),
            expires_at: Utc::now() + self.ttl,
        });

        window.records.push_front(record.clone());
        window.records.truncate(self.capacity);
        window.expires_at = Utc::now() + self.ttl;

        Ok(())
    }

    async fn recent(&self, organization_id: Uuid) -> Result<Option<Vec<ActivityRecord>>> {
        let mut inner = self.inner.write().await;

        match inner.get(&organization_id) {
            Some(window) if window.expires_at > Utc::now() => {
                Ok(Some(window.records.iter().cloned().collect()))
            }
            Some(_) => {
                inner.remove(&organization_id);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn warm(&self, organization_id: Uuid, records: &[ActivityRecord]) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.insert(
            organization_id,
            OrgWindow {
                records: records.iter().take(self.capacity).cloned().collect(),
                expires_at: Utc::now() + self.ttl,
            },
        );
        Ok(())
    }

    async fn invalidate(&self, organization_id: Uuid) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.remove(&organization_id);
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ActivityKind;
    use pretty_assertions::assert_eq;

    fn record(message: &str) -> ActivityRecord {
        ActivityRecord {
            id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            actor_id: Uuid::new_v4(),
            kind: ActivityKind::Notify,
            message: message.to_string(),
            object_type: None,
            object_id: None,
            metadata: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_redis_key_format() {
        let org = Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap();
        assert_eq!(
            RedisActivityCache::key_for(org),
            "syncboard:activity:live:550e8400-e29b-41d4-a716-446655440000"
        );
    }

    #[tokio::test]
    async fn test_memory_cache_miss_when_empty() {
        let cache = MemoryActivityCache::new(20, Duration::days(7));
        assert_eq!(cache.recent(Uuid::new_v4()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_memory_cache_push_and_recent_newest_first() {
        let cache = MemoryActivityCache::new(20, Duration::days(7));
        let org = Uuid::new_v4();

        cache.push(org, &record("first")).await.unwrap();
        cache.push(org, &record("second")).await.unwrap();

        let window = cache.recent(org).await.unwrap().unwrap();
        assert_eq!(window.len(), 2);
        assert_eq!(window[0].message, "second");
        assert_eq!(window[1].message, "first");
    }

    #[tokio::test]
    async fn test_memory_cache_capacity_evicts_oldest() {
        let cache = MemoryActivityCache::new(3, Duration::days(7));
        let org = Uuid::new_v4();

        for i in 0..5 {
            cache.push(org, &record(&format!("msg-{i}"))).await.unwrap();
        }

        let window = cache.recent(org).await.unwrap().unwrap();
        assert_eq!(window.len(), 3);
        assert_eq!(window[0].message, "msg-4");
        assert_eq!(window[2].message, "msg-2");
    }

    #[tokio::test]
    async fn test_memory_cache_isolated_per_organization() {
        let cache = MemoryActivityCache::new(20, Duration::days(7));
        let org_a = Uuid::new_v4();
        let org_b = Uuid::new_v4();

        cache.push(org_a, &record("a-only")).await.unwrap();

        assert!(cache.recent(org_a).await.unwrap().is_some());
        assert_eq!(cache.recent(org_b).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_memory_cache_expiry_is_a_miss() {
        let cache = MemoryActivityCache::new(20, Duration::seconds(-1));
        let org = Uuid::new_v4();

        cache.push(org, &record("stale")).await.unwrap();
        assert_eq!(cache.recent(org).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_memory_cache_warm_replaces_window() {
        let cache = MemoryActivityCache::new(3, Duration::days(7));
        let org = Uuid::new_v4();

        cache.push(org, &record("old")).await.unwrap();

        let fresh = vec![record("n3"), record("n2"), record("n1"), record("n0")];
        cache.warm(org, &fresh).await.unwrap();

        let window = cache.recent(org).await.unwrap().unwrap();
        assert_eq!(window.len(), 3);
        assert_eq!(window[0].message, "n3");
    }

    #[tokio::test]
    async fn test_memory_cache_invalidate() {
        let cache = MemoryActivityCache::new(20, Duration::days(7));
        let org = Uuid::new_v4();

        cache.push(org, &record("gone")).await.unwrap();
        cache.invalidate(org).await.unwrap();

        assert_eq!(cache.recent(org).await.unwrap(), None);
    }
}
