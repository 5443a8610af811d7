//! Syncboard Core - Collaboration Service Backend
//!
//! This crate provides the core functionality for the Syncboard collaboration
//! service: tenant-scoped organizations, projects and tasks, a pure
//! authorization engine, and a bounded real-time activity pipeline.

pub mod api;
pub mod authz;
pub mod cache;
pub mod config;
pub mod domain;
pub mod error;
pub mod jwt;
pub mod middleware;
pub mod migration;
pub mod realtime;
pub mod repository;
pub mod server;
pub mod service;
pub mod telemetry;
pub mod tenancy;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, Result};
