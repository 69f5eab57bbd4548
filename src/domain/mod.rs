//! Domain entities for sprint-flow.
//!
//! This module contains the core business entities:
//! - SprintPlan: The parsed sprint description
//! - SprintState: The persisted document and its workstream records
//! - Worktree: A git worktree instance
//! - Project: The overall repository context

mod project;
mod sprint;
mod workstream;
mod worktree;

pub use project::Project;
pub use sprint::{is_no_dependency, slugify, SprintPlan, WorkstreamDefinition, NO_DEPENDENCY};
pub use workstream::{
    branch_name, is_workstream_branch, ExecutionMode, SprintState, WorkstreamRecord,
    WorkstreamStatus, BRANCH_PREFIX, BRANCH_SUFFIX,
};
pub use worktree::{Worktree, WorktreeStatus};
