//! Domain models for Syncboard Core

pub mod activity;
pub mod member;
pub mod organization;
pub mod project;
pub mod role;
pub mod task;
pub mod user;

pub use activity::*;
pub use member::*;
pub use organization::*;
pub use project::*;
pub use role::*;
pub use task::*;
pub use user::*;
