//! Project business logic

use crate::authz;
use crate::domain::{
    ActivityKind, CreateProjectInput, NewActivity, Principal, Project, ProjectMember,
    ProjectMemberWithUser, UpdateProjectInput, UpsertProjectMemberInput,
};
use crate::error::{AppError, Result};
use crate::repository::{self, MembershipRepository};
use crate::service::ActivityRecorder;
use crate::tenancy::TenantContextManager;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

pub struct ProjectService<M: MembershipRepository> {
    tenancy: Arc<TenantContextManager<M>>,
    recorder: Arc<ActivityRecorder>,
}

impl<M: MembershipRepository> ProjectService<M> {
    pub fn new(tenancy: Arc<TenantContextManager<M>>, recorder: Arc<ActivityRecorder>) -> Self {
        Self { tenancy, recorder }
    }

    /// Create a project. Owners and admins only.
    pub async fn create(
        &self,
        principal: &Principal,
        organization_id: Uuid,
        input: CreateProjectInput,
    ) -> Result<Project> {
        input.validate()?;

        let ctx = self.tenancy.bind(principal, organization_id).await?;
        let recorder = self.recorder.clone();
        let actor = principal.user_id;

        let (project, record, slug) = self
            .tenancy
            .with_context(ctx, move |tx| {
                Box::pin(async move {
                    let snapshot = authz::snapshot(tx, None).await?;
                    authz::require(authz::can_manage_org(snapshot.org_role))?;

                    let project = repository::project::insert(tx, &input, actor).await?;
                    let organization = repository::organization::current(tx).await?;
                    let activity = NewActivity::new(
                        project.organization_id,
                        actor,
                        ActivityKind::Notify,
                        format!("created project \"{}\"", project.name),
                    )
                    .about("project", project.id);
                    let record = recorder.record(tx, activity).await?;
                    Ok((project, record, organization.slug))
                })
            })
            .await?;

        self.recorder.publish(&slug, record).await;
        Ok(project)
    }

    /// Projects in the organization, newest first. Visible to every member.
    pub async fn list(
        &self,
        principal: &Principal,
        organization_id: Uuid,
        page: i64,
        limit: i64,
    ) -> Result<(Vec<Project>, i64)> {
        let ctx = self.tenancy.bind(principal, organization_id).await?;
        let offset = (page - 1) * limit;

        self.tenancy
            .with_context(ctx, move |tx| {
                Box::pin(async move {
                    authz::snapshot(tx, None).await?;
                    let projects = repository::project::list(tx, offset, limit).await?;
                    let total = repository::project::count(tx).await?;
                    Ok((projects, total))
                })
            })
            .await
    }

    pub async fn get(
        &self,
        principal: &Principal,
        organization_id: Uuid,
        project_id: Uuid,
    ) -> Result<Project> {
        let ctx = self.tenancy.bind(principal, organization_id).await?;

        self.tenancy
            .with_context(ctx, move |tx| {
                Box::pin(async move {
                    authz::snapshot(tx, None).await?;
                    repository::project::find(tx, project_id)
                        .await?
                        .ok_or(AppError::NotFound)
                })
            })
            .await
    }

    /// Update project fields. Requires org-admin rights or an EDITOR grant.
    pub async fn update(
        &self,
        principal: &Principal,
        organization_id: Uuid,
        project_id: Uuid,
        input: UpdateProjectInput,
    ) -> Result<Project> {
        input.validate()?;

        let ctx = self.tenancy.bind(principal, organization_id).await?;
        let recorder = self.recorder.clone();
        let actor = principal.user_id;

        let (project, record, slug) = self
            .tenancy
            .with_context(ctx, move |tx| {
                Box::pin(async move {
                    let snapshot = authz::snapshot(tx, Some(project_id)).await?;
                    repository::project::find(tx, project_id)
                        .await?
                        .ok_or(AppError::NotFound)?;
                    authz::require(authz::can_edit_project(
                        snapshot.org_role,
                        snapshot.project_role,
                    ))?;

                    let project = repository::project::update(tx, project_id, &input)
                        .await?
                        .ok_or(AppError::NotFound)?;
                    let organization = repository::organization::current(tx).await?;
                    let activity = NewActivity::new(
                        project.organization_id,
                        actor,
                        ActivityKind::Notify,
                        format!("updated project \"{}\"", project.name),
                    )
                    .about("project", project.id);
                    let record = recorder.record(tx, activity).await?;
                    Ok((project, record, organization.slug))
                })
            })
            .await?;

        self.recorder.publish(&slug, record).await;
        Ok(project)
    }

    /// Delete a project and its tasks and grants. Owners and admins only.
    pub async fn delete(
        &self,
        principal: &Principal,
        organization_id: Uuid,
        project_id: Uuid,
    ) -> Result<()> {
        let ctx = self.tenancy.bind(principal, organization_id).await?;
        let recorder = self.recorder.clone();
        let actor = principal.user_id;

        let (record, slug) = self
            .tenancy
            .with_context(ctx, move |tx| {
                Box::pin(async move {
                    let snapshot = authz::snapshot(tx, None).await?;
                    authz::require(authz::can_manage_org(snapshot.org_role))?;

                    let project = repository::project::find(tx, project_id)
                        .await?
                        .ok_or(AppError::NotFound)?;
                    repository::project::delete(tx, project_id).await?;

                    let organization = repository::organization::current(tx).await?;
                    let activity = NewActivity::new(
                        tx.organization_id(),
                        actor,
                        ActivityKind::Warn,
                        format!("deleted project \"{}\"", project.name),
                    )
                    .about("project", project_id);
                    let record = recorder.record(tx, activity).await?;
                    Ok((record, organization.slug))
                })
            })
            .await?;

        self.recorder.publish(&slug, record).await;
        Ok(())
    }

    /// Grant or change a member's project role. Owners and admins only, and
    /// the grantee must already belong to the organization.
    pub async fn upsert_member(
        &self,
        principal: &Principal,
        organization_id: Uuid,
        project_id: Uuid,
        input: UpsertProjectMemberInput,
    ) -> Result<ProjectMember> {
        let ctx = self.tenancy.bind(principal, organization_id).await?;
        let recorder = self.recorder.clone();
        let actor = principal.user_id;

        let (member, record, slug) = self
            .tenancy
            .with_context(ctx, move |tx| {
                Box::pin(async move {
                    let snapshot = authz::snapshot(tx, None).await?;
                    authz::require(authz::can_manage_org(snapshot.org_role))?;

                    let project = repository::project::find(tx, project_id)
                        .await?
                        .ok_or(AppError::NotFound)?;
                    if repository::membership::find(tx, input.user_id).await?.is_none() {
                        return Err(AppError::BadRequest(
                            "User is not a member of this organization".to_string(),
                        ));
                    }

                    let member =
                        repository::project::upsert_member(tx, project_id, input.user_id, input.role)
                            .await?;
                    let organization = repository::organization::current(tx).await?;
                    let activity = NewActivity::new(
                        tx.organization_id(),
                        actor,
                        ActivityKind::Alert,
                        format!("granted {} access on project \"{}\"", input.role, project.name),
                    )
                    .about("project", project_id)
                    .with_metadata(json!({ "user_id": input.user_id, "role": input.role }));
                    let record = recorder.record(tx, activity).await?;
                    Ok((member, record, organization.slug))
                })
            })
            .await?;

        self.recorder.publish(&slug, record).await;
        Ok(member)
    }

    /// Revoke a member's project role. Owners and admins only.
    pub async fn remove_member(
        &self,
        principal: &Principal,
        organization_id: Uuid,
        project_id: Uuid,
        member_user_id: Uuid,
    ) -> Result<()> {
        let ctx = self.tenancy.bind(principal, organization_id).await?;
        let recorder = self.recorder.clone();
        let actor = principal.user_id;

        let (record, slug) = self
            .tenancy
            .with_context(ctx, move |tx| {
                Box::pin(async move {
                    let snapshot = authz::snapshot(tx, None).await?;
                    authz::require(authz::can_manage_org(snapshot.org_role))?;

                    let project = repository::project::find(tx, project_id)
                        .await?
                        .ok_or(AppError::NotFound)?;
                    let removed =
                        repository::project::remove_member(tx, project_id, member_user_id).await?;
                    if removed == 0 {
                        return Err(AppError::NotFound);
                    }

                    let organization = repository::organization::current(tx).await?;
                    let activity = NewActivity::new(
                        tx.organization_id(),
                        actor,
                        ActivityKind::Warn,
                        format!("revoked access on project \"{}\"", project.name),
                    )
                    .about("project", project_id)
                    .with_metadata(json!({ "user_id": member_user_id }));
                    let record = recorder.record(tx, activity).await?;
                    Ok((record, organization.slug))
                })
            })
            .await?;

        self.recorder.publish(&slug, record).await;
        Ok(())
    }

    pub async fn members(
        &self,
        principal: &Principal,
        organization_id: Uuid,
        project_id: Uuid,
    ) -> Result<Vec<ProjectMemberWithUser>> {
        let ctx = self.tenancy.bind(principal, organization_id).await?;

        self.tenancy
            .with_context(ctx, move |tx| {
                Box::pin(async move {
                    authz::snapshot(tx, None).await?;
                    repository::project::find(tx, project_id)
                        .await?
                        .ok_or(AppError::NotFound)?;
                    repository::project::list_members(tx, project_id).await
                })
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryActivityCache;
    use crate::realtime::RealtimeHub;
    use crate::repository::MockMembershipRepository;
    use chrono::Duration;
    use sqlx::postgres::PgPoolOptions;
    use sqlx::PgPool;

    fn lazy_pool() -> PgPool {
        PgPoolOptions::new()
            .connect_lazy("postgres://localhost:5999/never_connected")
            .unwrap()
    }

    fn create_test_service(
        memberships: MockMembershipRepository,
    ) -> ProjectService<MockMembershipRepository> {
        let tenancy = Arc::new(TenantContextManager::new(
            lazy_pool(),
            Arc::new(memberships),
        ));
        let cache = Arc::new(MemoryActivityCache::new(20, Duration::days(7)));
        let recorder = Arc::new(ActivityRecorder::new(
            cache,
            Arc::new(RealtimeHub::default()),
        ));
        ProjectService::new(tenancy, recorder)
    }

    fn principal() -> Principal {
        Principal {
            user_id: Uuid::new_v4(),
            display_name: "Olive".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_rejects_empty_name() {
        let service = create_test_service(MockMembershipRepository::new());

        let input = CreateProjectInput {
            name: String::new(),
            description: None,
        };
        let result = service.create(&principal(), Uuid::new_v4(), input).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_rejects_non_member() {
        let mut memberships = MockMembershipRepository::new();
        memberships.expect_find_role().returning(|_, _| Ok(None));

        let service = create_test_service(memberships);

        let input = CreateProjectInput {
            name: "Apollo".to_string(),
            description: None,
        };
        let result = service.create(&principal(), Uuid::new_v4(), input).await;
        assert!(matches!(result, Err(AppError::NotMember)));
    }

    #[tokio::test]
    async fn test_update_rejects_oversized_description() {
        let service = create_test_service(MockMembershipRepository::new());

        let input = UpdateProjectInput {
            name: None,
            description: Some("x".repeat(2001)),
        };
        let result = service
            .update(&principal(), Uuid::new_v4(), Uuid::new_v4(), input)
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
