//! sprint-flow: sprint workstream orchestration on git worktrees
//!
//! Splits a sprint plan into workstreams, gives each its own branch and
//! worktree, and drives them through a persisted lifecycle from creation
//! to merge and cleanup.

pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod report;
pub mod services;

pub use app::{App, CleanupTarget};
pub use config::ProjectConfig;
pub use error::{AppError, Result};
