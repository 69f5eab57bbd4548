//! Workstream record, sprint state document and lifecycle status.

use super::{SprintPlan, WorkstreamDefinition};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Prefix shared by every workstream branch
pub const BRANCH_PREFIX: &str = "feature/";
/// Suffix shared by every workstream branch
pub const BRANCH_SUFFIX: &str = "-workstream";

/// Deterministic branch name for a workstream
pub fn branch_name(name: &str) -> String {
    format!("{BRANCH_PREFIX}{name}{BRANCH_SUFFIX}")
}

/// Whether a branch follows the workstream naming pattern
pub fn is_workstream_branch(branch: &str) -> bool {
    branch.starts_with(BRANCH_PREFIX)
        && branch.ends_with(BRANCH_SUFFIX)
        && branch.len() > BRANCH_PREFIX.len() + BRANCH_SUFFIX.len()
}

/// Lifecycle status of a workstream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkstreamStatus {
    /// Legacy spelling of `ReadyToStart` found in older documents
    Pending,
    ReadyToStart,
    InProgress,
    Completed,
    Pushed,
    Merged,
}

impl WorkstreamStatus {
    /// Whether `resume` should advance this status to `InProgress`
    pub fn is_startable(&self) -> bool {
        matches!(self, Self::Pending | Self::ReadyToStart)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::ReadyToStart => "ready_to_start",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Pushed => "pushed",
            Self::Merged => "merged",
        }
    }

    /// Status indicator for console output
    pub fn indicator(&self) -> &'static str {
        match self {
            Self::Pending | Self::ReadyToStart => "⏳",
            Self::InProgress => "🔄",
            Self::Completed => "✅",
            Self::Pushed => "📤",
            Self::Merged => "🔀",
        }
    }
}

impl std::fmt::Display for WorkstreamStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How merges are performed for this sprint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutionMode {
    /// Workstreams are pushed and merged through a remote review workflow
    #[default]
    Standard,
    /// Workstreams are merged into the local trunk; cleanup resets trunk
    LocalSimulation,
}

impl ExecutionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::LocalSimulation => "local-simulation",
        }
    }
}

impl std::fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ExecutionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" => Ok(Self::Standard),
            "local-simulation" | "local-ci" => Ok(Self::LocalSimulation),
            other => Err(format!(
                "unknown execution mode '{other}' (expected standard or local-simulation)"
            )),
        }
    }
}

/// A workstream tracked in the sprint state document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkstreamRecord {
    pub id: u32,
    pub name: String,
    pub status: WorkstreamStatus,
    pub tasks: Vec<String>,
    /// Worktree location relative to the project root
    pub worktree: PathBuf,
    pub branch: String,
    pub dependencies: Vec<String>,
    /// Informational only; never populated by analysis
    #[serde(default)]
    pub file_conflicts: Vec<String>,
    #[serde(default)]
    pub parallel_safe: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pushed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merged_at: Option<DateTime<Utc>>,
}

impl WorkstreamRecord {
    /// Build a fresh record for a plan definition
    pub fn from_definition(
        def: &WorkstreamDefinition,
        worktree_directory: &Path,
        parallel_safe: bool,
    ) -> Self {
        Self {
            id: def.id,
            name: def.name.clone(),
            status: WorkstreamStatus::ReadyToStart,
            tasks: def.tasks.clone(),
            worktree: worktree_directory.join(&def.name),
            branch: branch_name(&def.name),
            dependencies: def.dependencies.clone(),
            file_conflicts: Vec::new(),
            parallel_safe,
            completed_at: None,
            pushed_at: None,
            merged_at: None,
        }
    }

    /// Mark completed; the first completion time is kept
    pub fn mark_completed(&mut self, at: DateTime<Utc>) {
        self.status = WorkstreamStatus::Completed;
        self.completed_at.get_or_insert(at);
    }

    /// Mark pushed; the first push time is kept
    pub fn mark_pushed(&mut self, at: DateTime<Utc>) {
        self.status = WorkstreamStatus::Pushed;
        self.pushed_at.get_or_insert(at);
    }

    /// Mark merged; the first merge time is kept
    pub fn mark_merged(&mut self, at: DateTime<Utc>) {
        self.status = WorkstreamStatus::Merged;
        self.merged_at.get_or_insert(at);
    }
}

/// The whole persisted sprint document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SprintState {
    /// Sprint identity
    pub sprint: String,
    #[serde(default)]
    pub execution_mode: ExecutionMode,
    /// Trunk tip captured at creation in local-simulation mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starting_commit: Option<String>,
    /// Bumped on every save; guards against lost updates
    #[serde(default)]
    pub revision: u64,
    #[serde(default)]
    pub workstreams: Vec<WorkstreamRecord>,
}

impl SprintState {
    /// Build the initial state for a plan in standard mode
    pub fn from_plan(
        plan: &SprintPlan,
        worktree_directory: &Path,
        parallel_safe: impl Fn(&WorkstreamDefinition) -> bool,
    ) -> Self {
        Self {
            sprint: plan.name.clone(),
            execution_mode: ExecutionMode::Standard,
            starting_commit: None,
            revision: 0,
            workstreams: plan
                .workstreams
                .iter()
                .map(|def| WorkstreamRecord::from_definition(def, worktree_directory, parallel_safe(def)))
                .collect(),
        }
    }

    pub fn is_local_simulation(&self) -> bool {
        self.execution_mode == ExecutionMode::LocalSimulation
    }

    pub fn workstream(&self, name: &str) -> Option<&WorkstreamRecord> {
        self.workstreams.iter().find(|ws| ws.name == name)
    }

    pub fn workstream_mut(&mut self, name: &str) -> Option<&mut WorkstreamRecord> {
        self.workstreams.iter_mut().find(|ws| ws.name == name)
    }

    /// Whether a branch belongs to a workstream in this state
    pub fn owns_branch(&self, branch: &str) -> bool {
        self.workstreams.iter().any(|ws| ws.branch == branch)
    }
}
