//! Infrastructure services for sprint-flow.
//!
//! This module contains:
//! - GitService: Git branch and worktree operations
//! - RemoteGateway: Push/fetch/pull, real or simulated
//! - SprintParser: Sprint plan text to workstream definitions
//! - DependencyAnalyzer: Parallel-safety and dependency validation
//! - StateStore: The persisted sprint state document
//! - QualityGate: Pass/fail checks before a local merge

mod analyzer;
mod gate;
mod git;
mod parser;
mod remote;
mod store;

pub use analyzer::{DependencyAnalyzer, DependencyIssue};
pub use gate::{CommandGate, GateCheck, GateOutcome, QualityGate};
pub use git::GitService;
pub use parser::SprintParser;
pub use remote::{GitRemote, RemoteGateway, SimulatedRemote};
pub use store::StateStore;

#[cfg(test)]
pub(crate) use git::tests as git_fixtures;
