//! Task business logic

use crate::authz;
use crate::domain::{
    ActivityKind, AssignTaskInput, CreateTaskInput, NewActivity, Principal, Task, TaskStatus,
    UpdateTaskInput, UpdateTaskStatusInput,
};
use crate::error::{AppError, Result};
use crate::repository::{self, MembershipRepository};
use crate::service::ActivityRecorder;
use crate::tenancy::{TenantContextManager, TenantTx};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

pub struct TaskService<M: MembershipRepository> {
    tenancy: Arc<TenantContextManager<M>>,
    recorder: Arc<ActivityRecorder>,
}

/// Fetch a task and check it sits under the project named in the path.
async fn find_in_project(tx: &mut TenantTx, project_id: Uuid, task_id: Uuid) -> Result<Task> {
    let task = repository::task::find(tx, task_id)
        .await?
        .ok_or(AppError::NotFound)?;
    if task.project_id != project_id {
        return Err(AppError::NotFound);
    }
    Ok(task)
}

impl<M: MembershipRepository> TaskService<M> {
    pub fn new(tenancy: Arc<TenantContextManager<M>>, recorder: Arc<ActivityRecorder>) -> Self {
        Self { tenancy, recorder }
    }

    /// Create a task. Any organization member may create tasks in any of the
    /// organization's projects.
    pub async fn create(
        &self,
        principal: &Principal,
        organization_id: Uuid,
        project_id: Uuid,
        input: CreateTaskInput,
    ) -> Result<Task> {
        input.validate()?;

        let ctx = self.tenancy.bind(principal, organization_id).await?;
        let recorder = self.recorder.clone();
        let actor = principal.user_id;

        let (task, record, slug) = self
            .tenancy
            .with_context(ctx, move |tx| {
                Box::pin(async move {
                    authz::snapshot(tx, None).await?;
                    repository::project::find(tx, project_id)
                        .await?
                        .ok_or(AppError::NotFound)?;

                    let task = repository::task::insert(tx, project_id, &input, actor).await?;
                    let organization = repository::organization::current(tx).await?;
                    let activity = NewActivity::new(
                        task.organization_id,
                        actor,
                        ActivityKind::Notify,
                        format!("created task \"{}\"", task.title),
                    )
                    .about("task", task.id);
                    let record = recorder.record(tx, activity).await?;
                    Ok((task, record, organization.slug))
                })
            })
            .await?;

        self.recorder.publish(&slug, record).await;
        Ok(task)
    }

    /// Tasks in a project, newest first, optionally filtered by status.
    pub async fn list(
        &self,
        principal: &Principal,
        organization_id: Uuid,
        project_id: Uuid,
        status: Option<TaskStatus>,
        page: i64,
        limit: i64,
    ) -> Result<(Vec<Task>, i64)> {
        let ctx = self.tenancy.bind(principal, organization_id).await?;
        let offset = (page - 1) * limit;

        self.tenancy
            .with_context(ctx, move |tx| {
                Box::pin(async move {
                    authz::snapshot(tx, None).await?;
                    repository::project::find(tx, project_id)
                        .await?
                        .ok_or(AppError::NotFound)?;
                    let tasks =
                        repository::task::list(tx, project_id, status, offset, limit).await?;
                    let total = repository::task::count(tx, project_id, status).await?;
                    Ok((tasks, total))
                })
            })
            .await
    }

    pub async fn get(
        &self,
        principal: &Principal,
        organization_id: Uuid,
        project_id: Uuid,
        task_id: Uuid,
    ) -> Result<Task> {
        let ctx = self.tenancy.bind(principal, organization_id).await?;

        self.tenancy
            .with_context(ctx, move |tx| {
                Box::pin(async move {
                    authz::snapshot(tx, None).await?;
                    find_in_project(tx, project_id, task_id).await
                })
            })
            .await
    }

    /// Edit title or description. Requires org-admin rights or an EDITOR
    /// grant on the project.
    pub async fn update(
        &self,
        principal: &Principal,
        organization_id: Uuid,
        project_id: Uuid,
        task_id: Uuid,
        input: UpdateTaskInput,
    ) -> Result<Task> {
        input.validate()?;

        let ctx = self.tenancy.bind(principal, organization_id).await?;
        let recorder = self.recorder.clone();
        let actor = principal.user_id;

        let (task, record, slug) = self
            .tenancy
            .with_context(ctx, move |tx| {
                Box::pin(async move {
                    let snapshot = authz::snapshot(tx, Some(project_id)).await?;
                    find_in_project(tx, project_id, task_id).await?;
                    authz::require(authz::can_edit_task_fields(
                        snapshot.org_role,
                        snapshot.project_role,
                    ))?;

                    let task = repository::task::update_fields(tx, task_id, &input)
                        .await?
                        .ok_or(AppError::NotFound)?;
                    let organization = repository::organization::current(tx).await?;
                    let activity = NewActivity::new(
                        task.organization_id,
                        actor,
                        ActivityKind::Notify,
                        format!("updated task \"{}\"", task.title),
                    )
                    .about("task", task.id);
                    let record = recorder.record(tx, activity).await?;
                    Ok((task, record, organization.slug))
                })
            })
            .await?;

        self.recorder.publish(&slug, record).await;
        Ok(task)
    }

    /// Move a task through its workflow. The assignee may always do this;
    /// otherwise project edit rights are required. Completion is surfaced
    /// more prominently in the feed than other moves.
    pub async fn set_status(
        &self,
        principal: &Principal,
        organization_id: Uuid,
        project_id: Uuid,
        task_id: Uuid,
        input: UpdateTaskStatusInput,
    ) -> Result<Task> {
        let ctx = self.tenancy.bind(principal, organization_id).await?;
        let recorder = self.recorder.clone();
        let actor = principal.user_id;

        let (task, record, slug) = self
            .tenancy
            .with_context(ctx, move |tx| {
                Box::pin(async move {
                    let snapshot = authz::snapshot(tx, Some(project_id)).await?;
                    let current = find_in_project(tx, project_id, task_id).await?;
                    let is_assignee = current.assigned_to == Some(actor);
                    authz::require(authz::can_change_task_status(
                        snapshot.org_role,
                        snapshot.project_role,
                        is_assignee,
                    ))?;

                    let task = repository::task::set_status(tx, task_id, input.status)
                        .await?
                        .ok_or(AppError::NotFound)?;
                    let organization = repository::organization::current(tx).await?;

                    let (kind, message) = match task.status {
                        TaskStatus::Done => (
                            ActivityKind::Show,
                            format!("completed task \"{}\"", task.title),
                        ),
                        status => (
                            ActivityKind::Notify,
                            format!("moved task \"{}\" to {}", task.title, status),
                        ),
                    };
                    let activity = NewActivity::new(task.organization_id, actor, kind, message)
                        .about("task", task.id);
                    let record = recorder.record(tx, activity).await?;
                    Ok((task, record, organization.slug))
                })
            })
            .await?;

        self.recorder.publish(&slug, record).await;
        Ok(task)
    }

    /// Assign the task to an organization member, or clear the assignee.
    pub async fn assign(
        &self,
        principal: &Principal,
        organization_id: Uuid,
        project_id: Uuid,
        task_id: Uuid,
        input: AssignTaskInput,
    ) -> Result<Task> {
        let ctx = self.tenancy.bind(principal, organization_id).await?;
        let recorder = self.recorder.clone();
        let actor = principal.user_id;

        let (task, record, slug) = self
            .tenancy
            .with_context(ctx, move |tx| {
                Box::pin(async move {
                    let snapshot = authz::snapshot(tx, Some(project_id)).await?;
                    find_in_project(tx, project_id, task_id).await?;
                    authz::require(authz::can_edit_task_fields(
                        snapshot.org_role,
                        snapshot.project_role,
                    ))?;

                    if let Some(assignee) = input.assignee {
                        if repository::membership::find(tx, assignee).await?.is_none() {
                            return Err(AppError::BadRequest(
                                "Assignee is not a member of this organization".to_string(),
                            ));
                        }
                    }

                    let task = repository::task::assign(tx, task_id, input.assignee)
                        .await?
                        .ok_or(AppError::NotFound)?;
                    let organization = repository::organization::current(tx).await?;

                    let message = match task.assigned_to {
                        Some(_) => format!("assigned task \"{}\"", task.title),
                        None => format!("cleared the assignee on task \"{}\"", task.title),
                    };
                    let activity =
                        NewActivity::new(task.organization_id, actor, ActivityKind::Notify, message)
                            .about("task", task.id)
                            .with_metadata(json!({ "assignee": task.assigned_to }));
                    let record = recorder.record(tx, activity).await?;
                    Ok((task, record, organization.slug))
                })
            })
            .await?;

        self.recorder.publish(&slug, record).await;
        Ok(task)
    }

    /// Delete a task. Requires org-admin rights or an EDITOR grant.
    pub async fn delete(
        &self,
        principal: &Principal,
        organization_id: Uuid,
        project_id: Uuid,
        task_id: Uuid,
    ) -> Result<()> {
        let ctx = self.tenancy.bind(principal, organization_id).await?;
        let recorder = self.recorder.clone();
        let actor = principal.user_id;

        let (record, slug) = self
            .tenancy
            .with_context(ctx, move |tx| {
                Box::pin(async move {
                    let snapshot = authz::snapshot(tx, Some(project_id)).await?;
                    let task = find_in_project(tx, project_id, task_id).await?;
                    authz::require(authz::can_edit_task_fields(
                        snapshot.org_role,
                        snapshot.project_role,
                    ))?;

                    repository::task::delete(tx, task_id).await?;
                    let organization = repository::organization::current(tx).await?;
                    let activity = NewActivity::new(
                        tx.organization_id(),
                        actor,
                        ActivityKind::Warn,
                        format!("deleted task \"{}\"", task.title),
                    )
                    .about("task", task_id);
                    let record = recorder.record(tx, activity).await?;
                    Ok((record, organization.slug))
                })
            })
            .await?;

        self.recorder.publish(&slug, record).await;
        Ok(())
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
    ) -> TaskService<MockMembershipRepository> {
        let tenancy = Arc::new(TenantContextManager::new(
            lazy_pool(),
            Arc::new(memberships),
        ));
        let cache = Arc::new(MemoryActivityCache::new(20, Duration::days(7)));
        let recorder = Arc::new(ActivityRecorder::new(
            cache,
            Arc::new(RealtimeHub::default()),
        ));
        TaskService::new(tenancy, recorder)
    }

    fn principal() -> Principal {
        Principal {
            user_id: Uuid::new_v4(),
            display_name: "Olive".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_rejects_empty_title() {
        let service = create_test_service(MockMembershipRepository::new());

        let input = CreateTaskInput {
            title: String::new(),
            description: None,
        };
        let result = service
            .create(&principal(), Uuid::new_v4(), Uuid::new_v4(), input)
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_rejects_non_member() {
        let mut memberships = MockMembershipRepository::new();
        memberships.expect_find_role().returning(|_, _| Ok(None));

        let service = create_test_service(memberships);

        let input = CreateTaskInput {
            title: "Ship it".to_string(),
            description: None,
        };
        let result = service
            .create(&principal(), Uuid::new_v4(), Uuid::new_v4(), input)
            .await;
        assert!(matches!(result, Err(AppError::NotMember)));
    }

    #[tokio::test]
    async fn test_update_rejects_oversized_description() {
        let service = create_test_service(MockMembershipRepository::new());

        let input = UpdateTaskInput {
            title: None,
            description: Some("x".repeat(4001)),
        };
        let result = service
            .update(
                &principal(),
                Uuid::new_v4(),
                Uuid::new_v4(),
                Uuid::new_v4(),
                input,
            )
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
