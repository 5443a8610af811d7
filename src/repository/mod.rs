//! Data access layer (Repository pattern)
//!
//! Two surfaces live here. The pool-backed repository traits serve the
//! pre-context operations: binding a security context, creating and listing
//! organizations, and websocket join checks. Everything tenant-scoped is a
//! module-level function that only accepts a [`crate::tenancy::TenantTx`],
//! so those queries cannot run outside a bound context.

pub mod activity;
pub mod membership;
pub mod organization;
pub mod project;
pub mod task;

pub use membership::MembershipRepository;
pub use organization::OrganizationRepository;

#[cfg(test)]
pub use membership::MockMembershipRepository;
#[cfg(test)]
pub use organization::MockOrganizationRepository;
