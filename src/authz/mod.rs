//! Authorization decisions
//!
//! All permission checks are pure functions over the closed role enums, so
//! every rule is testable without a database and exhaustive matches keep the
//! compiler honest when a role is added. Each function is a disjunction of
//! independent grants; holding any qualifying role is sufficient, so the most
//! permissive applicable role always wins.
//!
//! Roles are re-read inside the caller's context-bound transaction
//! ([`snapshot`]), never trusted from an earlier request phase, which closes
//! the bind-then-demoted race.

use crate::domain::{OrgRole, ProjectRole};
use crate::error::{AppError, Result};
use crate::repository;
use crate::tenancy::TenantTx;
use metrics::counter;
use uuid::Uuid;

/// Action one member attempts on another member's record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberAction {
    ChangeRole(OrgRole),
    Remove,
}

/// The caller's roles as they exist inside the current transaction.
#[derive(Debug, Clone, Copy)]
pub struct RoleSnapshot {
    pub org_role: OrgRole,
    pub project_role: Option<ProjectRole>,
}

/// Resolve the caller's organization role, and project role when the
/// operation targets a project, from within the bound transaction.
///
/// Returns `NotMember` when the membership row has vanished since the
/// context was bound (the member was removed concurrently).
pub async fn snapshot(tx: &mut TenantTx, project_id: Option<Uuid>) -> Result<RoleSnapshot> {
    let user_id = tx.user_id();
    let org_role = repository::membership::role_of(tx, user_id)
        .await?
        .ok_or(AppError::NotMember)?;

    let project_role = match project_id {
        Some(project_id) => repository::project::member_role(tx, project_id, user_id).await?,
        None => None,
    };

    Ok(RoleSnapshot {
        org_role,
        project_role,
    })
}

/// Turn a decision into a `Forbidden` error when it denies.
pub fn require(allowed: bool) -> Result<()> {
    if allowed {
        Ok(())
    } else {
        counter!("syncboard_authz_denied_total", "reason" => "forbidden").increment(1);
        Err(AppError::Forbidden)
    }
}

/// Organization settings (rename, membership administration).
pub fn can_manage_org(role: OrgRole) -> bool {
    match role {
        OrgRole::Owner | OrgRole::Admin => true,
        OrgRole::Member => false,
    }
}

/// Deleting the organization is reserved for the owner.
pub fn can_delete_org(role: OrgRole) -> bool {
    match role {
        OrgRole::Owner => true,
        OrgRole::Admin | OrgRole::Member => false,
    }
}

/// Adding a new member with the given role. Nobody adds a second owner;
/// ownership moves only through the transfer operation.
pub fn can_add_member(actor: OrgRole, granted: OrgRole) -> bool {
    can_manage_org(actor) && granted != OrgRole::Owner
}

/// Acting on an existing member (role change or removal).
///
/// The owner may act on anyone but may not remove themself (ownership must
/// be transferred first). Admins may act on admins and members, never on the
/// owner. Nobody changes their own role, and nobody is promoted to owner
/// through a role change; ownership moves only through the transfer
/// operation.
pub fn can_manage_member(
    actor: OrgRole,
    target: OrgRole,
    action: MemberAction,
    is_self: bool,
) -> bool {
    if matches!(action, MemberAction::ChangeRole(OrgRole::Owner)) {
        return false;
    }

    if is_self {
        match action {
            MemberAction::ChangeRole(_) => return false,
            MemberAction::Remove if actor == OrgRole::Owner => return false,
            MemberAction::Remove => {}
        }
    }

    match actor {
        OrgRole::Owner => true,
        OrgRole::Admin => target != OrgRole::Owner,
        OrgRole::Member => false,
    }
}

/// Only the current owner may hand ownership to another member.
pub fn can_transfer_ownership(role: OrgRole) -> bool {
    match role {
        OrgRole::Owner => true,
        OrgRole::Admin | OrgRole::Member => false,
    }
}

/// Editing project settings and content. Org admins edit everything;
/// otherwise an explicit EDITOR grant on the project is required.
pub fn can_edit_project(org_role: OrgRole, project_role: Option<ProjectRole>) -> bool {
    can_manage_org(org_role) || project_role == Some(ProjectRole::Editor)
}

/// Editing a task's descriptive fields follows project edit rights.
pub fn can_edit_task_fields(org_role: OrgRole, project_role: Option<ProjectRole>) -> bool {
    can_edit_project(org_role, project_role)
}

/// Moving a task through its workflow. The assignee may always move their
/// own task, even without any project grant.
pub fn can_change_task_status(
    org_role: OrgRole,
    project_role: Option<ProjectRole>,
    is_assignee: bool,
) -> bool {
    is_assignee || can_edit_project(org_role, project_role)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(OrgRole::Owner, true)]
    #[case(OrgRole::Admin, true)]
    #[case(OrgRole::Member, false)]
    fn test_can_manage_org(#[case] role: OrgRole, #[case] expected: bool) {
        assert_eq!(can_manage_org(role), expected);
    }

    #[rstest]
    #[case(OrgRole::Owner, true)]
    #[case(OrgRole::Admin, false)]
    #[case(OrgRole::Member, false)]
    fn test_can_delete_org(#[case] role: OrgRole, #[case] expected: bool) {
        assert_eq!(can_delete_org(role), expected);
    }

    #[rstest]
    #[case(OrgRole::Owner, OrgRole::Admin, true)]
    #[case(OrgRole::Owner, OrgRole::Member, true)]
    #[case(OrgRole::Owner, OrgRole::Owner, false)]
    #[case(OrgRole::Admin, OrgRole::Member, true)]
    #[case(OrgRole::Admin, OrgRole::Owner, false)]
    #[case(OrgRole::Member, OrgRole::Member, false)]
    fn test_can_add_member(
        #[case] actor: OrgRole,
        #[case] granted: OrgRole,
        #[case] expected: bool,
    ) {
        assert_eq!(can_add_member(actor, granted), expected);
    }

    #[rstest]
    // Owner acts on anyone.
    #[case(OrgRole::Owner, OrgRole::Admin, MemberAction::ChangeRole(OrgRole::Member), false, true)]
    #[case(OrgRole::Owner, OrgRole::Member, MemberAction::ChangeRole(OrgRole::Admin), false, true)]
    #[case(OrgRole::Owner, OrgRole::Admin, MemberAction::Remove, false, true)]
    // Owner may not remove themself or change their own role.
    #[case(OrgRole::Owner, OrgRole::Owner, MemberAction::Remove, true, false)]
    #[case(OrgRole::Owner, OrgRole::Owner, MemberAction::ChangeRole(OrgRole::Admin), true, false)]
    // Nobody promotes to owner through a role change, the owner included.
    #[case(OrgRole::Owner, OrgRole::Member, MemberAction::ChangeRole(OrgRole::Owner), false, false)]
    #[case(OrgRole::Admin, OrgRole::Member, MemberAction::ChangeRole(OrgRole::Owner), false, false)]
    // Admin never touches the owner.
    #[case(OrgRole::Admin, OrgRole::Owner, MemberAction::Remove, false, false)]
    #[case(OrgRole::Admin, OrgRole::Owner, MemberAction::ChangeRole(OrgRole::Member), false, false)]
    // Admin manages admins and members.
    #[case(OrgRole::Admin, OrgRole::Admin, MemberAction::ChangeRole(OrgRole::Member), false, true)]
    #[case(OrgRole::Admin, OrgRole::Member, MemberAction::ChangeRole(OrgRole::Admin), false, true)]
    #[case(OrgRole::Admin, OrgRole::Member, MemberAction::Remove, false, true)]
    // Admin may leave but not change their own role.
    #[case(OrgRole::Admin, OrgRole::Admin, MemberAction::Remove, true, true)]
    #[case(OrgRole::Admin, OrgRole::Admin, MemberAction::ChangeRole(OrgRole::Member), true, false)]
    // Members manage nobody.
    #[case(OrgRole::Member, OrgRole::Member, MemberAction::Remove, false, false)]
    #[case(OrgRole::Member, OrgRole::Member, MemberAction::ChangeRole(OrgRole::Admin), false, false)]
    fn test_can_manage_member(
        #[case] actor: OrgRole,
        #[case] target: OrgRole,
        #[case] action: MemberAction,
        #[case] is_self: bool,
        #[case] expected: bool,
    ) {
        assert_eq!(can_manage_member(actor, target, action, is_self), expected);
    }

    #[rstest]
    #[case(OrgRole::Owner, true)]
    #[case(OrgRole::Admin, false)]
    #[case(OrgRole::Member, false)]
    fn test_can_transfer_ownership(#[case] actor: OrgRole, #[case] expected: bool) {
        assert_eq!(can_transfer_ownership(actor), expected);
    }

    #[rstest]
    #[case(OrgRole::Owner, None, true)]
    #[case(OrgRole::Admin, None, true)]
    #[case(OrgRole::Member, None, false)]
    #[case(OrgRole::Member, Some(ProjectRole::Editor), true)]
    #[case(OrgRole::Member, Some(ProjectRole::Viewer), false)]
    // An explicit VIEWER grant never subtracts from org-level rights.
    #[case(OrgRole::Owner, Some(ProjectRole::Viewer), true)]
    #[case(OrgRole::Admin, Some(ProjectRole::Viewer), true)]
    fn test_can_edit_project(
        #[case] org_role: OrgRole,
        #[case] project_role: Option<ProjectRole>,
        #[case] expected: bool,
    ) {
        assert_eq!(can_edit_project(org_role, project_role), expected);
    }

    #[rstest]
    #[case(OrgRole::Member, None, true, true)]
    #[case(OrgRole::Member, None, false, false)]
    #[case(OrgRole::Member, Some(ProjectRole::Viewer), false, false)]
    #[case(OrgRole::Member, Some(ProjectRole::Viewer), true, true)]
    #[case(OrgRole::Member, Some(ProjectRole::Editor), false, true)]
    #[case(OrgRole::Owner, None, false, true)]
    fn test_can_change_task_status(
        #[case] org_role: OrgRole,
        #[case] project_role: Option<ProjectRole>,
        #[case] is_assignee: bool,
        #[case] expected: bool,
    ) {
        assert_eq!(
            can_change_task_status(org_role, project_role, is_assignee),
            expected
        );
    }

    #[test]
    fn test_require_maps_denial_to_forbidden() {
        assert!(require(true).is_ok());
        assert!(matches!(require(false), Err(AppError::Forbidden)));
    }

    #[test]
    fn test_task_field_edit_follows_project_edit() {
        for org_role in [OrgRole::Owner, OrgRole::Admin, OrgRole::Member] {
            for project_role in [None, Some(ProjectRole::Editor), Some(ProjectRole::Viewer)] {
                assert_eq!(
                    can_edit_task_fields(org_role, project_role),
                    can_edit_project(org_role, project_role)
                );
            }
        }
    }
}
