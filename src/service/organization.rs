//! Organization business logic

use crate::authz::{self, MemberAction};
use crate::domain::{
    ActivityKind, AddMemberInput, CreateOrganizationInput, MemberWithUser, Membership,
    NewActivity, OrgRole, Organization, Principal, TransferOwnershipInput, UpdateMemberRoleInput,
    UpdateOrganizationInput,
};
use crate::error::{AppError, Result};
use crate::repository::{self, MembershipRepository, OrganizationRepository};
use crate::service::ActivityRecorder;
use crate::tenancy::TenantContextManager;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

pub struct OrganizationService<M: MembershipRepository, O: OrganizationRepository> {
    organizations: Arc<O>,
    tenancy: Arc<TenantContextManager<M>>,
    recorder: Arc<ActivityRecorder>,
}

impl<M: MembershipRepository, O: OrganizationRepository> OrganizationService<M, O> {
    pub fn new(
        organizations: Arc<O>,
        tenancy: Arc<TenantContextManager<M>>,
        recorder: Arc<ActivityRecorder>,
    ) -> Self {
        Self {
            organizations,
            tenancy,
            recorder,
        }
    }

    /// Create an organization with the caller as its sole owner.
    ///
    /// This is the one mutation that runs before any context exists: there
    /// is no organization to bind to until the row and the owner membership
    /// are committed together.
    pub async fn create(
        &self,
        principal: &Principal,
        input: CreateOrganizationInput,
    ) -> Result<Organization> {
        input.validate()?;

        if self.organizations.find_by_slug(&input.slug).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "Organization with slug '{}' already exists",
                input.slug
            )));
        }

        self.organizations
            .create_with_owner(&input, principal.user_id)
            .await
    }

    pub async fn get(&self, principal: &Principal, organization_id: Uuid) -> Result<Organization> {
        // Binding proves membership; the read itself needs no transaction.
        let _ctx = self.tenancy.bind(principal, organization_id).await?;
        self.organizations
            .find_by_id(organization_id)
            .await?
            .ok_or(AppError::NotFound)
    }

    /// Organizations the caller belongs to, newest first.
    pub async fn list(
        &self,
        principal: &Principal,
        page: i64,
        limit: i64,
    ) -> Result<(Vec<Organization>, i64)> {
        let offset = (page - 1) * limit;
        let organizations = self
            .organizations
            .list_for_user(principal.user_id, offset, limit)
            .await?;
        let total = self.organizations.count_for_user(principal.user_id).await?;
        Ok((organizations, total))
    }

    pub async fn update(
        &self,
        principal: &Principal,
        organization_id: Uuid,
        input: UpdateOrganizationInput,
    ) -> Result<Organization> {
        input.validate()?;

        let ctx = self.tenancy.bind(principal, organization_id).await?;
        let recorder = self.recorder.clone();
        let actor = principal.user_id;

        let (organization, record) = self
            .tenancy
            .with_context(ctx, move |tx| {
                Box::pin(async move {
                    let snapshot = authz::snapshot(tx, None).await?;
                    authz::require(authz::can_manage_org(snapshot.org_role))?;

                    let organization = repository::organization::rename(tx, &input.name).await?;
                    let activity = NewActivity::new(
                        organization.id,
                        actor,
                        ActivityKind::Notify,
                        format!("renamed the organization to \"{}\"", organization.name),
                    )
                    .about("organization", organization.id);
                    let record = recorder.record(tx, activity).await?;
                    Ok((organization, record))
                })
            })
            .await?;

        self.recorder.publish(&organization.slug, record).await;
        Ok(organization)
    }

    /// Delete the organization and everything scoped to it. Owner only.
    pub async fn delete(&self, principal: &Principal, organization_id: Uuid) -> Result<()> {
        let ctx = self.tenancy.bind(principal, organization_id).await?;

        self.tenancy
            .with_context(ctx, move |tx| {
                Box::pin(async move {
                    let snapshot = authz::snapshot(tx, None).await?;
                    authz::require(authz::can_delete_org(snapshot.org_role))?;
                    repository::organization::delete(tx).await
                })
            })
            .await?;

        self.recorder.forget(organization_id).await;
        Ok(())
    }

    pub async fn members(
        &self,
        principal: &Principal,
        organization_id: Uuid,
    ) -> Result<Vec<MemberWithUser>> {
        let ctx = self.tenancy.bind(principal, organization_id).await?;

        self.tenancy
            .with_context(ctx, move |tx| {
                Box::pin(async move {
                    authz::snapshot(tx, None).await?;
                    repository::membership::list_with_users(tx).await
                })
            })
            .await
    }

    /// Add an existing user to the organization. Owners and admins only;
    /// nobody is granted OWNER this way.
    pub async fn add_member(
        &self,
        principal: &Principal,
        organization_id: Uuid,
        input: AddMemberInput,
    ) -> Result<Membership> {
        let ctx = self.tenancy.bind(principal, organization_id).await?;
        let recorder = self.recorder.clone();
        let actor = principal.user_id;

        let (membership, record, slug) = self
            .tenancy
            .with_context(ctx, move |tx| {
                Box::pin(async move {
                    let snapshot = authz::snapshot(tx, None).await?;
                    authz::require(authz::can_add_member(snapshot.org_role, input.role))?;

                    if !repository::membership::user_exists(tx, input.user_id).await? {
                        return Err(AppError::NotFound);
                    }
                    if repository::membership::find(tx, input.user_id).await?.is_some() {
                        return Err(AppError::Conflict(
                            "User is already a member of this organization".to_string(),
                        ));
                    }

                    let membership =
                        repository::membership::insert(tx, input.user_id, input.role).await?;
                    let organization = repository::organization::current(tx).await?;
                    let activity = NewActivity::new(
                        membership.organization_id,
                        actor,
                        ActivityKind::Notify,
                        format!("added a new {} to the organization", input.role),
                    )
                    .about("user", membership.user_id)
                    .with_metadata(json!({ "role": input.role }));
                    let record = recorder.record(tx, activity).await?;
                    Ok((membership, record, organization.slug))
                })
            })
            .await?;

        self.recorder.publish(&slug, record).await;
        Ok(membership)
    }

    pub async fn change_member_role(
        &self,
        principal: &Principal,
        organization_id: Uuid,
        member_user_id: Uuid,
        input: UpdateMemberRoleInput,
    ) -> Result<Membership> {
        let ctx = self.tenancy.bind(principal, organization_id).await?;
        let recorder = self.recorder.clone();
        let actor = principal.user_id;

        let (membership, record, slug) = self
            .tenancy
            .with_context(ctx, move |tx| {
                Box::pin(async move {
                    let snapshot = authz::snapshot(tx, None).await?;
                    let target = repository::membership::find(tx, member_user_id)
                        .await?
                        .ok_or(AppError::NotFound)?;
                    authz::require(authz::can_manage_member(
                        snapshot.org_role,
                        target.role,
                        MemberAction::ChangeRole(input.role),
                        member_user_id == actor,
                    ))?;

                    repository::membership::set_role(tx, member_user_id, input.role).await?;
                    let membership = Membership {
                        role: input.role,
                        ..target
                    };

                    let organization = repository::organization::current(tx).await?;
                    let activity = NewActivity::new(
                        membership.organization_id,
                        actor,
                        ActivityKind::Alert,
                        format!("changed a member's role to {}", input.role),
                    )
                    .about("user", member_user_id)
                    .with_metadata(json!({ "role": input.role }));
                    let record = recorder.record(tx, activity).await?;
                    Ok((membership, record, organization.slug))
                })
            })
            .await?;

        self.recorder.publish(&slug, record).await;
        Ok(membership)
    }

    pub async fn remove_member(
        &self,
        principal: &Principal,
        organization_id: Uuid,
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
                    let target = repository::membership::find(tx, member_user_id)
                        .await?
                        .ok_or(AppError::NotFound)?;
                    authz::require(authz::can_manage_member(
                        snapshot.org_role,
                        target.role,
                        MemberAction::Remove,
                        member_user_id == actor,
                    ))?;

                    repository::membership::remove(tx, member_user_id).await?;
                    let organization = repository::organization::current(tx).await?;
                    let activity = NewActivity::new(
                        tx.organization_id(),
                        actor,
                        ActivityKind::Warn,
                        "removed a member from the organization",
                    )
                    .about("user", member_user_id);
                    let record = recorder.record(tx, activity).await?;
                    Ok((record, organization.slug))
                })
            })
            .await?;

        self.recorder.publish(&slug, record).await;
        Ok(())
    }

    /// Hand ownership to another member in one transaction: the current
    /// owner is demoted to ADMIN before the target is promoted, so the
    /// single-owner rule holds at every intermediate statement.
    pub async fn transfer_ownership(
        &self,
        principal: &Principal,
        organization_id: Uuid,
        input: TransferOwnershipInput,
    ) -> Result<()> {
        let ctx = self.tenancy.bind(principal, organization_id).await?;
        let recorder = self.recorder.clone();
        let actor = principal.user_id;
        let new_owner_id = input.new_owner_id;

        let (record, slug) = self
            .tenancy
            .with_context(ctx, move |tx| {
                Box::pin(async move {
                    let snapshot = authz::snapshot(tx, None).await?;
                    authz::require(authz::can_transfer_ownership(snapshot.org_role))?;

                    let target = repository::membership::find(tx, new_owner_id)
                        .await?
                        .ok_or(AppError::NotFound)?;
                    if target.user_id == actor {
                        return Err(AppError::BadRequest(
                            "Organization is already owned by this user".to_string(),
                        ));
                    }

                    repository::membership::set_role(tx, actor, OrgRole::Admin).await?;
                    repository::membership::set_role(tx, new_owner_id, OrgRole::Owner).await?;

                    let organization = repository::organization::current(tx).await?;
                    let activity = NewActivity::new(
                        tx.organization_id(),
                        actor,
                        ActivityKind::Alert,
                        "transferred organization ownership",
                    )
                    .about("user", new_owner_id);
                    let record = recorder.record(tx, activity).await?;
                    Ok((record, organization.slug))
                })
            })
            .await?;

        self.recorder.publish(&slug, record).await;
        Ok(())
    }
}
