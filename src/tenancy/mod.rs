//! Tenant security contexts and context-bound transactions
//!
//! Every tenant-scoped read or write in the system flows through a
//! [`TenantTx`], which can only be obtained by binding a [`SecurityContext`]
//! to a database transaction. Binding verifies membership first, and the
//! transaction carries the caller identity into Postgres via transaction-local
//! settings so row-level security re-enforces isolation underneath the
//! application checks.

use crate::domain::Principal;
use crate::error::{AppError, Result};
use crate::repository::MembershipRepository;
use metrics::counter;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use uuid::Uuid;

/// Boxed future returned by scoped operation closures.
pub type ScopedFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Proof that a caller's membership in an organization has been verified.
///
/// Deliberately neither `Clone` nor `Copy`: a context is consumed when it is
/// bound to a transaction, so it cannot outlive the operation it authorized
/// or leak across organizations.
#[derive(Debug)]
pub struct SecurityContext {
    user_id: Uuid,
    organization_id: Uuid,
}

impl SecurityContext {
    pub(crate) fn new(user_id: Uuid, organization_id: Uuid) -> Self {
        Self {
            user_id,
            organization_id,
        }
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn organization_id(&self) -> Uuid {
        self.organization_id
    }
}

/// A database transaction bound to one security context.
///
/// This is the only handle tenant-scoped queries accept, which makes
/// "query without a tenant context" unrepresentable in the type system.
pub struct TenantTx {
    tx: Transaction<'static, Postgres>,
    user_id: Uuid,
    organization_id: Uuid,
}

impl TenantTx {
    /// Identity of the caller this transaction acts for.
    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    /// Organization this transaction is scoped to.
    pub fn organization_id(&self) -> Uuid {
        self.organization_id
    }

    /// Raw connection for executing queries. Still context-bound: the
    /// underlying transaction carries the tenant settings until it ends.
    pub fn conn(&mut self) -> &mut PgConnection {
        &mut self.tx
    }
}

/// Binds principals to organizations and runs scoped operations.
pub struct TenantContextManager<M: MembershipRepository> {
    pool: PgPool,
    memberships: Arc<M>,
}

impl<M: MembershipRepository> TenantContextManager<M> {
    pub fn new(pool: PgPool, memberships: Arc<M>) -> Self {
        Self { pool, memberships }
    }

    /// Verify the principal's membership and mint a security context.
    ///
    /// Principals with no membership in the organization are rejected with
    /// `NotMember` before any tenant data is touched. A nonexistent
    /// organization takes the same path, so callers cannot probe for
    /// organizations they do not belong to.
    pub async fn bind(
        &self,
        principal: &Principal,
        organization_id: Uuid,
    ) -> Result<SecurityContext> {
        match self
            .memberships
            .find_role(principal.user_id, organization_id)
            .await?
        {
            Some(_) => {
                tracing::debug!(
                    user_id = %principal.user_id,
                    organization_id = %organization_id,
                    "bound tenant security context"
                );
                Ok(SecurityContext::new(principal.user_id, organization_id))
            }
            None => {
                counter!("syncboard_authz_denied_total", "reason" => "not_member").increment(1);
                Err(AppError::NotMember)
            }
        }
    }

    /// Execute a closure within a context-bound transaction.
    ///
    /// Begins a transaction, installs the caller identity as
    /// transaction-local Postgres settings (consumed by the row-level
    /// security policies), runs the closure, and commits on success or rolls
    /// back on error. The context is consumed; dropping the returned future
    /// mid-flight rolls the transaction back.
    pub async fn with_context<T, F>(&self, ctx: SecurityContext, f: F) -> Result<T>
    where
        F: for<'a> FnOnce(&'a mut TenantTx) -> ScopedFuture<'a, T>,
    {
        let tx = self.pool.begin().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to begin tenant transaction");
            AppError::Database(e)
        })?;

        let mut tenant_tx = TenantTx {
            tx,
            user_id: ctx.user_id,
            organization_id: ctx.organization_id,
        };

        sqlx::query(
            "SELECT set_config('app.current_user_id', $1, true), \
                    set_config('app.current_org_id', $2, true)",
        )
        .bind(ctx.user_id.to_string())
        .bind(ctx.organization_id.to_string())
        .execute(tenant_tx.conn())
        .await?;

        match f(&mut tenant_tx).await {
            Ok(result) => {
                tenant_tx.tx.commit().await.map_err(|e| {
                    tracing::error!(error = %e, "Failed to commit tenant transaction");
                    AppError::Database(e)
                })?;
                Ok(result)
            }
            Err(e) => {
                if let Err(rollback_err) = tenant_tx.tx.rollback().await {
                    tracing::error!(
                        error = %rollback_err,
                        original_error = %e,
                        "Failed to rollback tenant transaction"
                    );
                }
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::OrgRole;
    use crate::repository::MockMembershipRepository;
    use sqlx::postgres::PgPoolOptions;

    fn lazy_pool() -> PgPool {
        // Never connected; bind() only touches the membership repository.
        PgPoolOptions::new()
            .connect_lazy("postgres://localhost/unreachable")
            .unwrap()
    }

    fn principal() -> Principal {
        Principal {
            user_id: Uuid::new_v4(),
            display_name: "Test User".to_string(),
        }
    }

    #[tokio::test]
    async fn test_bind_rejects_non_member() {
        let mut repo = MockMembershipRepository::new();
        repo.expect_find_role().returning(|_, _| Ok(None));

        let manager = TenantContextManager::new(lazy_pool(), Arc::new(repo));
        let err = manager
            .bind(&principal(), Uuid::new_v4())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NotMember));
    }

    #[tokio::test]
    async fn test_bind_rejects_unknown_organization() {
        // A nonexistent organization has no memberships, so the signal is
        // identical to the non-member case.
        let mut repo = MockMembershipRepository::new();
        repo.expect_find_role().returning(|_, _| Ok(None));

        let manager = TenantContextManager::new(lazy_pool(), Arc::new(repo));
        let err = manager
            .bind(&principal(), Uuid::new_v4())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NotMember));
    }

    #[tokio::test]
    async fn test_bind_mints_context_for_member() {
        let caller = principal();
        let org_id = Uuid::new_v4();

        let mut repo = MockMembershipRepository::new();
        let expected_user = caller.user_id;
        repo.expect_find_role()
            .withf(move |user, org| *user == expected_user && *org == org_id)
            .returning(|_, _| Ok(Some(OrgRole::Member)));

        let manager = TenantContextManager::new(lazy_pool(), Arc::new(repo));
        let ctx = manager.bind(&caller, org_id).await.unwrap();

        assert_eq!(ctx.user_id(), caller.user_id);
        assert_eq!(ctx.organization_id(), org_id);
    }

    #[tokio::test]
    async fn test_bind_propagates_store_errors() {
        let mut repo = MockMembershipRepository::new();
        repo.expect_find_role()
            .returning(|_, _| Err(AppError::Database(sqlx::Error::PoolTimedOut)));

        let manager = TenantContextManager::new(lazy_pool(), Arc::new(repo));
        let err = manager
            .bind(&principal(), Uuid::new_v4())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Database(_)));
    }
}
