//! HTTP middleware for Syncboard Core
//!
//! This module provides middleware components for the REST API:
//! - JWT authentication extractor yielding the request principal
//! - HTTP observability (request IDs + metrics)
//! - Trace span maker with sensitive query parameter redaction

pub mod auth;
pub mod metrics;
pub mod trace;

pub use auth::{AuthError, AuthUser};
pub use metrics::ObservabilityLayer;
pub use trace::SanitizedMakeSpan;
