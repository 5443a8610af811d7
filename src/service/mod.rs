//! Business logic layer

pub mod activity;
pub mod organization;
pub mod project;
pub mod task;

pub use activity::{ActivityRecorder, ActivityService};
pub use organization::OrganizationService;
pub use project::ProjectService;
pub use task::TaskService;
