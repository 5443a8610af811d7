//! Permission rules strung together as one workspace's lifecycle, the way
//! requests would exercise them: onboarding, project grants, task workflow,
//! and the ownership handover. Complements the per-rule tables that live
//! next to the decision functions.

use syncboard_core::authz::{
    can_add_member, can_change_task_status, can_delete_org, can_edit_project,
    can_edit_task_fields, can_manage_member, can_manage_org, can_transfer_ownership,
    MemberAction,
};
use syncboard_core::domain::{OrgRole, ProjectRole};

#[test]
fn onboarding_grants_follow_the_role_ladder() {
    // The owner staffs the organization.
    assert!(can_add_member(OrgRole::Owner, OrgRole::Admin));
    assert!(can_add_member(OrgRole::Owner, OrgRole::Member));

    // Admins onboard too, but nobody mints a second owner.
    assert!(can_add_member(OrgRole::Admin, OrgRole::Member));
    assert!(!can_add_member(OrgRole::Owner, OrgRole::Owner));
    assert!(!can_add_member(OrgRole::Admin, OrgRole::Owner));

    // Plain members do not manage the roster at all.
    assert!(!can_add_member(OrgRole::Member, OrgRole::Member));
    assert!(!can_manage_org(OrgRole::Member));
}

#[test]
fn roster_management_respects_the_hierarchy() {
    // The owner demotes an admin and removes a member.
    assert!(can_manage_member(
        OrgRole::Owner,
        OrgRole::Admin,
        MemberAction::ChangeRole(OrgRole::Member),
        false,
    ));
    assert!(can_manage_member(
        OrgRole::Owner,
        OrgRole::Member,
        MemberAction::Remove,
        false,
    ));

    // An admin removes a member but cannot touch the owner.
    assert!(can_manage_member(
        OrgRole::Admin,
        OrgRole::Member,
        MemberAction::Remove,
        false,
    ));
    assert!(!can_manage_member(
        OrgRole::Admin,
        OrgRole::Owner,
        MemberAction::Remove,
        false,
    ));
    assert!(!can_manage_member(
        OrgRole::Admin,
        OrgRole::Owner,
        MemberAction::ChangeRole(OrgRole::Member),
        false,
    ));

    // Promotion to owner is never a role change, whoever asks.
    for actor in [OrgRole::Owner, OrgRole::Admin, OrgRole::Member] {
        assert!(!can_manage_member(
            actor,
            OrgRole::Member,
            MemberAction::ChangeRole(OrgRole::Owner),
            false,
        ));
    }

    // An admin may leave on their own, the owner may not; ownership has
    // to move first.
    assert!(can_manage_member(
        OrgRole::Admin,
        OrgRole::Admin,
        MemberAction::Remove,
        true,
    ));
    assert!(!can_manage_member(
        OrgRole::Owner,
        OrgRole::Owner,
        MemberAction::Remove,
        true,
    ));
}

#[test]
fn project_access_combines_org_role_and_grant() {
    // Admins and the owner edit any project without a grant.
    assert!(can_edit_project(OrgRole::Owner, None));
    assert!(can_edit_project(OrgRole::Admin, None));

    // A plain member needs an explicit EDITOR grant.
    assert!(!can_edit_project(OrgRole::Member, None));
    assert!(can_edit_project(OrgRole::Member, Some(ProjectRole::Editor)));
    assert!(!can_edit_project(OrgRole::Member, Some(ProjectRole::Viewer)));

    // A VIEWER grant on an admin never subtracts their org-level rights.
    assert!(can_edit_project(OrgRole::Admin, Some(ProjectRole::Viewer)));

    // Task field edits ride on the same decision.
    assert!(can_edit_task_fields(OrgRole::Member, Some(ProjectRole::Editor)));
    assert!(!can_edit_task_fields(OrgRole::Member, Some(ProjectRole::Viewer)));
}

#[test]
fn assignees_move_their_own_tasks() {
    // Before assignment a viewer-only member cannot move the task.
    assert!(!can_change_task_status(
        OrgRole::Member,
        Some(ProjectRole::Viewer),
        false,
    ));
    // Once assigned they can, grant or no grant.
    assert!(can_change_task_status(
        OrgRole::Member,
        Some(ProjectRole::Viewer),
        true,
    ));
    assert!(can_change_task_status(OrgRole::Member, None, true));

    // Editors move any task in their project.
    assert!(can_change_task_status(
        OrgRole::Member,
        Some(ProjectRole::Editor),
        false,
    ));
}

#[test]
fn destruction_and_handover_are_owner_only() {
    assert!(can_delete_org(OrgRole::Owner));
    assert!(!can_delete_org(OrgRole::Admin));
    assert!(!can_delete_org(OrgRole::Member));

    assert!(can_transfer_ownership(OrgRole::Owner));
    assert!(!can_transfer_ownership(OrgRole::Admin));
    assert!(!can_transfer_ownership(OrgRole::Member));
}
