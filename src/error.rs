//! Unified error types for the sprint-flow application.

use std::path::PathBuf;
use thiserror::Error;

use crate::services::GateCheck;

/// Main application error type
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Git error: {0}")]
    Git(#[from] GitError),

    #[error("Sprint error: {0}")]
    Sprint(#[from] SprintError),

    #[error("State error: {0}")]
    Store(#[from] StoreError),

    #[error("Quality gate error: {0}")]
    Gate(#[from] GateError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure category of an error, used to pick the process exit code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Usage,
    NotFound,
    PreconditionFailed,
    ExternalOperationFailed,
    Internal,
}

impl ErrorKind {
    /// Process exit code for this category
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Usage => 2,
            Self::NotFound => 3,
            Self::PreconditionFailed => 4,
            Self::ExternalOperationFailed => 5,
            Self::Internal => 1,
        }
    }
}

impl AppError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::ExternalOperationFailed,
            Self::Git(GitError::BranchNotFound(_)) | Self::Git(GitError::WorktreeNotFound(_)) => {
                ErrorKind::NotFound
            }
            Self::Git(GitError::NotARepository) => ErrorKind::PreconditionFailed,
            Self::Git(_) | Self::Gate(_) => ErrorKind::ExternalOperationFailed,
            Self::Store(StoreError::NotFound(_)) => ErrorKind::NotFound,
            Self::Store(StoreError::Conflict { .. }) => ErrorKind::PreconditionFailed,
            Self::Store(_) => ErrorKind::ExternalOperationFailed,
            Self::Sprint(e) => e.kind(),
            Self::Io(_) => ErrorKind::Internal,
        }
    }
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// Git/worktree operation errors
#[derive(Debug, Error)]
pub enum GitError {
    #[error("Not a git repository")]
    NotARepository,

    #[error("Branch not found: {0}")]
    BranchNotFound(String),

    #[error("Worktree already exists: {0}")]
    WorktreeExists(PathBuf),

    #[error("Worktree not found: {0}")]
    WorktreeNotFound(PathBuf),

    #[error("Merging {branch} into {target} produced conflicts; resolve them manually")]
    MergeConflict { branch: String, target: String },

    #[error("git {command} failed: {stderr}")]
    Command { command: String, stderr: String },

    #[error("Git operation failed: {0}")]
    Operation(String),
}

/// Sprint plan and workstream lifecycle errors
#[derive(Debug, Error)]
pub enum SprintError {
    #[error("Sprint plan not found: {0}")]
    PlanNotFound(PathBuf),

    #[error("Workstream '{0}' not found in sprint state")]
    WorkstreamNotFound(String),

    #[error("Workstream '{0}' is declared more than once in the sprint plan")]
    DuplicateWorkstream(String),

    #[error("Workstream '{0}' has no tasks")]
    EmptyTasks(String),

    #[error("Worktree for '{name}' not found at {path}; run create first")]
    WorktreeMissing { name: String, path: PathBuf },

    #[error("Uncommitted changes in '{name}' ({summary}); commit them first")]
    UncommittedChanges { name: String, summary: String },

    #[error("Operation requires local-simulation mode; run set-mode local-simulation")]
    NotLocalSimulation,
}

impl SprintError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::PlanNotFound(_) | Self::WorkstreamNotFound(_) | Self::WorktreeMissing { .. } => {
                ErrorKind::NotFound
            }
            Self::DuplicateWorkstream(_) | Self::EmptyTasks(_) => ErrorKind::Usage,
            Self::UncommittedChanges { .. } | Self::NotLocalSimulation => {
                ErrorKind::PreconditionFailed
            }
        }
    }
}

/// Persisted state document errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Sprint state not found at {0}; run analyze first")]
    NotFound(PathBuf),

    #[error("Sprint state changed on disk (expected revision {expected}, found {found}); retry")]
    Conflict { expected: u64, found: u64 },

    #[error("Failed to parse sprint state: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Quality gate errors
#[derive(Debug, Error)]
pub enum GateError {
    #[error("{0} check failed")]
    Failed(GateCheck),

    #[error("Gate setup `{command}` failed")]
    SetupFailed {
        command: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Failed to run {check} check: {source}")]
    Spawn {
        check: GateCheck,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, AppError>;

/// Result type alias for Git operations
pub type GitResult<T> = std::result::Result<T, GitError>;

/// Result type alias for state store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Result type alias for quality gate operations
pub type GateResult<T> = std::result::Result<T, GateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        let err = AppError::from(SprintError::WorkstreamNotFound("auth".to_string()));
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.kind().exit_code(), 3);

        let err = AppError::from(SprintError::NotLocalSimulation);
        assert_eq!(err.kind(), ErrorKind::PreconditionFailed);

        let err = AppError::from(SprintError::EmptyTasks("docs".to_string()));
        assert_eq!(err.kind(), ErrorKind::Usage);
        assert_eq!(err.kind().exit_code(), 2);

        let err = AppError::from(StoreError::NotFound(PathBuf::from("state.json")));
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = AppError::from(GateError::Failed(GateCheck::Lint));
        assert_eq!(err.kind(), ErrorKind::ExternalOperationFailed);
        assert_eq!(err.to_string(), "Quality gate error: lint check failed");
    }
}
