//! Sprint commands and the workstream lifecycle.
//!
//! Each command is one synchronous transition: load the state document,
//! validate the workstream, perform the git side effects, then save.
//! A crash between the side effects and the save leaves the document
//! describing the state before the command.

use crate::config::ProjectConfig;
use crate::domain::{
    ExecutionMode, Project, SprintState, WorkstreamRecord, WorkstreamStatus, BRANCH_PREFIX,
    BRANCH_SUFFIX,
};
use crate::error::{AppError, GitError, Result, SprintError, StoreError};
use crate::services::{
    CommandGate, DependencyAnalyzer, DependencyIssue, GitRemote, GitService, QualityGate,
    RemoteGateway, SimulatedRemote, SprintParser, StateStore,
};
use chrono::Utc;
use std::path::{Path, PathBuf};

/// Result of `analyze`
#[derive(Debug, Clone)]
pub struct Analysis {
    pub state: SprintState,
    /// Advisory dependency problems (unknown names, cycles)
    pub issues: Vec<DependencyIssue>,
    /// Whether an existing document was replaced
    pub replaced_existing: bool,
}

/// Result of `push`
#[derive(Debug, Clone)]
pub struct PushOutcome {
    pub record: WorkstreamRecord,
    /// The remote branch did not exist and was created with upstream tracking
    pub new_branch: bool,
}

/// Per-workstream results of `sync_all`
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    pub synced: Vec<String>,
    /// Workstreams whose worktree does not exist
    pub missing: Vec<String>,
    /// Workstreams that failed, with the error message
    pub failed: Vec<(String, String)>,
}

/// What `cleanup` should remove
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupTarget {
    /// Every workstream, orphans included; resets trunk in local-simulation mode
    All,
    /// A single named workstream
    Workstream(String),
}

/// What `cleanup` did
#[derive(Debug, Clone, Default)]
pub struct CleanupReport {
    /// Commit trunk was hard-reset to
    pub reset_to: Option<String>,
    pub removed_worktrees: Vec<PathBuf>,
    pub deleted_branches: Vec<String>,
    /// Best-effort removals that failed
    pub warnings: Vec<String>,
    pub state_deleted: bool,
}

/// Sprint orchestration over one repository
pub struct App {
    /// Project context
    pub project: Project,
    git: GitService,
    store: StateStore,
    remote: Box<dyn RemoteGateway>,
    gate: Box<dyn QualityGate>,
}

impl App {
    /// Create an application instance with configured services
    pub fn new(project_root: PathBuf, simulate_remote: bool) -> Result<Self> {
        let config = ProjectConfig::load(Some(&project_root))?;
        let project = Project::new(project_root, config);

        let remote: Box<dyn RemoteGateway> = if simulate_remote || project.config.remote.simulate {
            Box::new(SimulatedRemote)
        } else {
            Box::new(GitRemote::new(project.config.git.remote.clone()))
        };
        let gate = Box::new(CommandGate::new(project.config.gates.clone()));

        Self::with_services(project, remote, gate)
    }

    /// Create an application instance with explicit remote and gate
    pub fn with_services(
        project: Project,
        remote: Box<dyn RemoteGateway>,
        gate: Box<dyn QualityGate>,
    ) -> Result<Self> {
        let git = GitService::new(project.root_path.clone())?;
        let store = StateStore::new(project.state_path.clone());
        tracing::debug!(
            root = %project.root_path.display(),
            remote = remote.label(),
            "Opened project"
        );

        Ok(Self {
            project,
            git,
            store,
            remote,
            gate,
        })
    }

    /// The persisted state store
    pub fn store(&self) -> &StateStore {
        &self.store
    }

    fn root(&self) -> &Path {
        &self.project.root_path
    }

    fn trunk(&self) -> &str {
        &self.project.trunk_branch
    }

    fn worktree_path(&self, record: &WorkstreamRecord) -> PathBuf {
        self.project.resolve(&record.worktree)
    }

    /// Parse a sprint plan and write the initial state document
    pub fn analyze(&self, plan_path: &Path) -> Result<Analysis> {
        let plan = SprintParser::parse_file(plan_path)?;

        let issues = DependencyAnalyzer::validate(&plan);
        for issue in &issues {
            tracing::warn!("{}", issue);
        }
        for ws in plan.workstreams.iter().filter(|ws| ws.tasks.is_empty()) {
            tracing::warn!("Workstream '{}' declares no tasks", ws.name);
        }

        let replaced_existing = self.store.exists();
        if replaced_existing {
            tracing::warn!(
                "Overwriting existing sprint state at {}",
                self.store.path().display()
            );
        }

        let state = self.store.initialize(
            &plan,
            &self.project.worktree_directory,
            DependencyAnalyzer::is_parallel_safe,
        )?;

        Ok(Analysis {
            state,
            issues,
            replaced_existing,
        })
    }

    /// Switch the sprint's execution mode
    pub fn set_mode(&self, mode: ExecutionMode) -> Result<SprintState> {
        let mut state = self.store.load()?;
        state.execution_mode = mode;
        self.store.save(&mut state)?;
        tracing::info!("Execution mode set to {}", mode);
        Ok(state)
    }

    /// Current sprint state
    pub fn status(&self) -> Result<SprintState> {
        Ok(self.store.load()?)
    }

    /// Create the branch and worktree of every workstream
    pub fn create_workstreams(&self, plan_path: &Path, local_simulation: bool) -> Result<SprintState> {
        if !plan_path.is_file() {
            return Err(SprintError::PlanNotFound(plan_path.to_path_buf()).into());
        }

        let mut state = self.store.load()?;
        for ws in &state.workstreams {
            require_tasks(ws)?;
        }
        if local_simulation {
            state.execution_mode = ExecutionMode::LocalSimulation;
        }

        let root = self.root();
        let trunk = self.trunk();
        self.git.checkout(root, trunk)?;
        if let Err(e) = self.remote.update_trunk(root, trunk) {
            tracing::warn!("Skipping update of {} from {}: {}", trunk, self.remote.label(), e);
        }

        if state.is_local_simulation() {
            match &state.starting_commit {
                Some(commit) => {
                    tracing::info!("Keeping recorded starting commit {}", short(commit));
                }
                None => {
                    let commit = self.git.rev_parse(root, trunk)?;
                    tracing::info!(
                        "Tracking starting commit {}; cleanup resets {} to it",
                        short(&commit),
                        trunk
                    );
                    state.starting_commit = Some(commit);
                }
            }
        }

        for ws in &state.workstreams {
            self.ensure_branch(&ws.branch)?;
            self.ensure_worktree(ws)?;
        }

        self.store.save(&mut state)?;
        Ok(state)
    }

    fn ensure_branch(&self, branch: &str) -> Result<()> {
        if self.git.branch_exists(branch)? {
            tracing::info!("Branch '{}' already exists", branch);
            return Ok(());
        }
        tracing::info!("Creating branch '{}' from {}", branch, self.trunk());
        self.git.create_branch(branch, Some(self.trunk()))?;
        Ok(())
    }

    fn ensure_worktree(&self, record: &WorkstreamRecord) -> Result<()> {
        let path = self.worktree_path(record);
        match self.git.add_worktree(&path, &record.branch) {
            Ok(()) => {
                tracing::info!("Created worktree for '{}' at {}", record.name, path.display());
                Ok(())
            }
            Err(GitError::WorktreeExists(_)) => {
                tracing::warn!(
                    "Worktree for '{}' already exists at {}; recreating",
                    record.name,
                    path.display()
                );
                self.git.remove_worktree(&path, false)?;
                self.git.add_worktree(&path, &record.branch)?;
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Start (or continue) work on a workstream
    pub fn resume(&self, name: &str) -> Result<WorkstreamRecord> {
        let mut state = self.store.load()?;
        let record = find(&state, name)?.clone();
        require_tasks(&record)?;
        let path = self.existing_worktree(&record)?;

        let current = self.git.current_branch(&path)?;
        if current != record.branch {
            tracing::warn!(
                "Worktree is on '{}', expected '{}'; switching",
                current,
                record.branch
            );
            self.git.checkout(&path, &record.branch)?;
        }

        if !record.status.is_startable() {
            tracing::info!("Workstream '{}' is already {}", name, record.status);
            return Ok(record);
        }

        let updated = self.transition(&mut state, name, |ws| {
            ws.status = WorkstreamStatus::InProgress;
        })?;
        tracing::info!("Workstream '{}' is now {}", name, updated.status);
        Ok(updated)
    }

    /// Record that a workstream's tasks are done. Not verified.
    pub fn complete(&self, name: &str) -> Result<WorkstreamRecord> {
        let mut state = self.store.load()?;
        let record = find(&state, name)?;
        require_tasks(record)?;
        warn_unexpected(record, &[WorkstreamStatus::InProgress], "complete");

        let updated = self.transition(&mut state, name, |ws| ws.mark_completed(Utc::now()))?;
        tracing::info!("Workstream '{}' completed", name);
        Ok(updated)
    }

    /// Push a workstream branch to the remote
    pub fn push(&self, name: &str) -> Result<PushOutcome> {
        let mut state = self.store.load()?;
        let record = find(&state, name)?.clone();
        require_tasks(&record)?;
        let path = self.existing_worktree(&record)?;
        self.require_clean(&record, &path)?;
        warn_unexpected(&record, &[WorkstreamStatus::Completed], "push");

        let exists = self.remote.branch_exists(&path, &record.branch)?;
        if exists {
            tracing::info!("Updating existing remote branch {}", record.branch);
        } else {
            tracing::info!("Creating new remote branch {}", record.branch);
        }
        self.remote.push(&path, &record.branch, !exists)?;

        let updated = self.transition(&mut state, name, |ws| ws.mark_pushed(Utc::now()))?;
        Ok(PushOutcome {
            record: updated,
            new_branch: !exists,
        })
    }

    /// Merge a workstream into trunk locally, gated by the quality checks.
    ///
    /// The merge and the checks happen in an ephemeral integration worktree;
    /// trunk is fast-forwarded only when every check passes, so a failure
    /// leaves both trunk and the record untouched.
    pub fn merge_local(&self, name: &str) -> Result<WorkstreamRecord> {
        let mut state = self.store.load()?;
        if !state.is_local_simulation() {
            return Err(SprintError::NotLocalSimulation.into());
        }
        let record = find(&state, name)?.clone();
        require_tasks(&record)?;
        let path = self.existing_worktree(&record)?;
        self.require_clean(&record, &path)?;
        warn_unexpected(
            &record,
            &[WorkstreamStatus::Completed, WorkstreamStatus::Pushed],
            "merge",
        );

        self.git.checkout(self.root(), self.trunk())?;
        if !self.git.branch_exists(&record.branch)? {
            return Err(GitError::BranchNotFound(record.branch.clone()).into());
        }

        let message = format!("chore: merge {} workstream (local CI)", record.name);
        self.integrate(&record, &message)?;

        let updated = self.transition(&mut state, name, |ws| ws.mark_merged(Utc::now()))?;
        tracing::info!("Merged {} into {}", record.branch, self.trunk());
        Ok(updated)
    }

    /// Apply `f` to the named record and save against the revision in `state`.
    ///
    /// `state` is the document loaded before the command's side effects, so
    /// a concurrent writer in between makes the save fail with a conflict.
    fn transition<F>(&self, state: &mut SprintState, name: &str, f: F) -> Result<WorkstreamRecord>
    where
        F: FnOnce(&mut WorkstreamRecord),
    {
        let ws = find_mut(state, name)?;
        f(ws);
        let updated = ws.clone();
        self.store.save(state)?;
        Ok(updated)
    }

    fn integrate(&self, record: &WorkstreamRecord, message: &str) -> Result<()> {
        let branch = integration_branch(&record.name);
        let dir = self.project.integration_worktree(&record.name);

        // Leftovers from an interrupted run
        self.discard_integration(&dir, &branch);

        self.git.create_branch(&branch, Some(self.trunk()))?;
        if let Err(e) = self.git.add_worktree(&dir, &branch) {
            self.discard_integration(&dir, &branch);
            return Err(e.into());
        }

        tracing::info!("Merging {} into {} for verification", record.branch, branch);
        let result = self
            .git
            .merge(&dir, &record.branch, message)
            .map_err(AppError::from)
            .and_then(|()| self.gate.run_all(&dir).map_err(AppError::from))
            .and_then(|()| {
                self.git
                    .fast_forward(self.root(), &branch)
                    .map_err(AppError::from)
            });

        self.discard_integration(&dir, &branch);
        result
    }

    fn discard_integration(&self, dir: &Path, branch: &str) {
        if dir.exists() {
            if let Err(e) = self.git.remove_worktree(dir, true) {
                tracing::warn!("Failed to remove integration worktree {}: {}", dir.display(), e);
            }
        }
        if let Err(e) = self.git.prune_worktrees() {
            tracing::warn!("Failed to prune worktrees: {}", e);
        }
        match self.git.delete_branch(branch) {
            Ok(()) | Err(GitError::BranchNotFound(_)) => {}
            Err(e) => tracing::warn!("Failed to delete integration branch {}: {}", branch, e),
        }
    }

    /// Update trunk, then merge it into every workstream that has a worktree.
    /// Per-workstream failures are reported, not fatal.
    pub fn sync_all(&self) -> Result<SyncReport> {
        let state = self.store.load()?;
        let root = self.root();
        let trunk = self.trunk();

        self.git.checkout(root, trunk)?;
        self.remote.update_trunk(root, trunk)?;
        let trunk_ref = self.remote.trunk_ref(trunk);
        let message = format!("chore: sync with {}", trunk);

        let mut report = SyncReport::default();
        for ws in &state.workstreams {
            let path = self.worktree_path(ws);
            if !path.exists() {
                tracing::warn!("Worktree not found for {}: {}", ws.name, path.display());
                report.missing.push(ws.name.clone());
                continue;
            }

            let synced = self
                .remote
                .fetch(&path)
                .and_then(|()| self.git.merge(&path, &trunk_ref, &message));
            match synced {
                Ok(()) => {
                    tracing::info!("{} synced with {}", ws.name, trunk_ref);
                    report.synced.push(ws.name.clone());
                }
                Err(e) => {
                    tracing::warn!("Failed to sync {}: {}", ws.name, e);
                    report.failed.push((ws.name.clone(), e.to_string()));
                }
            }
        }

        Ok(report)
    }

    /// Remove worktrees and branches, then the state document
    pub fn cleanup(&self, target: &CleanupTarget) -> Result<CleanupReport> {
        match target {
            CleanupTarget::All => self.cleanup_all(),
            CleanupTarget::Workstream(name) => self.cleanup_workstream(name),
        }
    }

    fn cleanup_workstream(&self, name: &str) -> Result<CleanupReport> {
        let mut state = self.store.load()?;
        let record = find(&state, name)?.clone();

        let mut report = CleanupReport::default();
        self.remove_workstream(&record.name, &self.worktree_path(&record), &record.branch, &mut report);

        state.workstreams.retain(|ws| ws.name != name);
        if state.workstreams.is_empty() {
            self.store.delete()?;
            report.state_deleted = true;
        } else {
            self.store.save(&mut state)?;
        }
        Ok(report)
    }

    fn cleanup_all(&self) -> Result<CleanupReport> {
        let state = match self.store.try_load() {
            Ok(state) => state,
            Err(StoreError::Parse(e)) => {
                tracing::warn!("Ignoring unreadable sprint state: {}", e);
                None
            }
            Err(e) => return Err(e.into()),
        };

        let mut report = CleanupReport::default();

        if let Some(state) = &state {
            if state.is_local_simulation() {
                match &state.starting_commit {
                    Some(commit) => {
                        tracing::info!("Resetting {} to {}", self.trunk(), short(commit));
                        self.git.checkout(self.root(), self.trunk())?;
                        self.git.reset_hard(self.root(), commit)?;
                        report.reset_to = Some(commit.clone());
                    }
                    None => tracing::warn!(
                        "No starting commit recorded; leaving {} as is",
                        self.trunk()
                    ),
                }
            }

            for ws in state.workstreams.iter().filter(|ws| {
                matches!(ws.status, WorkstreamStatus::InProgress) || ws.status.is_startable()
            }) {
                tracing::warn!("Workstream '{}' is {}; cleaning up anyway", ws.name, ws.status);
            }

            for ws in &state.workstreams {
                self.remove_workstream(&ws.name, &self.worktree_path(ws), &ws.branch, &mut report);
            }
        }

        let owned = |branch: &str| state.as_ref().is_some_and(|s| s.owns_branch(branch));
        self.remove_orphans(&owned, &mut report);

        if let Err(e) = self.git.prune_worktrees() {
            tracing::warn!("Failed to prune worktrees: {}", e);
        }

        self.store.delete()?;
        report.state_deleted = true;
        Ok(report)
    }

    fn remove_orphans(&self, owned: &dyn Fn(&str) -> bool, report: &mut CleanupReport) {
        match self.git.list_worktrees() {
            Ok(worktrees) => {
                for wt in worktrees.iter().filter(|wt| !wt.is_main) {
                    let (Some(name), Some(branch)) = (wt.workstream_name(), wt.branch.as_deref())
                    else {
                        continue;
                    };
                    if owned(branch) {
                        continue;
                    }
                    tracing::info!("Removing orphaned worktree {}", wt.path.display());
                    self.remove_worktree(name, &wt.path, report);
                }
            }
            Err(e) => report.warn(format!("Could not list worktrees: {}", e)),
        }

        let pattern = format!("{}*{}", BRANCH_PREFIX, BRANCH_SUFFIX);
        match self.git.list_branches(&pattern) {
            Ok(branches) => {
                for branch in branches.iter().filter(|b| !owned(b.as_str())) {
                    tracing::info!("Removing orphaned branch {}", branch);
                    self.remove_branch(branch, report);
                }
            }
            Err(e) => report.warn(format!("Could not list branches: {}", e)),
        }
    }

    fn remove_workstream(&self, name: &str, path: &Path, branch: &str, report: &mut CleanupReport) {
        self.remove_worktree(name, path, report);
        self.remove_branch(branch, report);
    }

    fn remove_worktree(&self, name: &str, path: &Path, report: &mut CleanupReport) {
        if !path.exists() {
            tracing::debug!("No worktree for '{}' at {}", name, path.display());
            return;
        }
        match self.git.remove_worktree(path, false) {
            Ok(()) => {
                tracing::info!("Removed worktree {}", path.display());
                report.removed_worktrees.push(path.to_path_buf());
            }
            Err(e) => report.warn(format!("Failed to remove worktree {}: {}", path.display(), e)),
        }
    }

    fn remove_branch(&self, branch: &str, report: &mut CleanupReport) {
        match self.git.delete_branch(branch) {
            Ok(()) => {
                tracing::info!("Deleted branch {}", branch);
                report.deleted_branches.push(branch.to_string());
            }
            Err(GitError::BranchNotFound(_)) => {
                tracing::info!("Branch {} already removed", branch);
            }
            Err(e) => report.warn(format!("Failed to delete branch {}: {}", branch, e)),
        }
    }

    fn existing_worktree(&self, record: &WorkstreamRecord) -> Result<PathBuf> {
        let path = self.worktree_path(record);
        if !path.exists() {
            return Err(SprintError::WorktreeMissing {
                name: record.name.clone(),
                path,
            }
            .into());
        }
        Ok(path)
    }

    fn require_clean(&self, record: &WorkstreamRecord, path: &Path) -> Result<()> {
        let status = self.git.worktree_status(path)?;
        if status.is_dirty() {
            return Err(SprintError::UncommittedChanges {
                name: record.name.clone(),
                summary: status.description(),
            }
            .into());
        }
        Ok(())
    }
}

impl CleanupReport {
    fn warn(&mut self, message: String) {
        tracing::warn!("{}", message);
        self.warnings.push(message);
    }
}

fn find<'a>(state: &'a SprintState, name: &str) -> Result<&'a WorkstreamRecord> {
    state
        .workstream(name)
        .ok_or_else(|| SprintError::WorkstreamNotFound(name.to_string()).into())
}

fn find_mut<'a>(state: &'a mut SprintState, name: &str) -> Result<&'a mut WorkstreamRecord> {
    state
        .workstream_mut(name)
        .ok_or_else(|| SprintError::WorkstreamNotFound(name.to_string()).into())
}

fn require_tasks(record: &WorkstreamRecord) -> std::result::Result<(), SprintError> {
    if record.tasks.is_empty() {
        return Err(SprintError::EmptyTasks(record.name.clone()));
    }
    Ok(())
}

fn warn_unexpected(record: &WorkstreamRecord, expected: &[WorkstreamStatus], action: &str) {
    if !expected.contains(&record.status) {
        tracing::warn!(
            "Workstream '{}' is {}; proceeding with {} anyway",
            record.name,
            record.status,
            action
        );
    }
}

fn integration_branch(name: &str) -> String {
    format!("integration/{}{}", name, BRANCH_SUFFIX)
}

/// Abbreviated commit id for messages
pub fn short(commit: &str) -> &str {
    commit.get(..7).unwrap_or(commit)
}
