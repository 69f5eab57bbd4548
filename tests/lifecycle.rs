//! Workstream lifecycle tests against real git repositories.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use sprint_flow::app::CleanupTarget;
use sprint_flow::domain::{ExecutionMode, Project, WorkstreamStatus};
use sprint_flow::error::{ErrorKind, GateResult};
use sprint_flow::services::{GateCheck, GateOutcome, GitRemote, QualityGate, SimulatedRemote};
use sprint_flow::{App, ProjectConfig};
use tempfile::TempDir;

const PLAN: &str = "\
# Sprint 7: Accounts

## Workstream 1: Auth Fixes
- **Tasks**: fix-login, fix-logout, add-rate-limit
- **Dependencies**: None

## Workstream 2: Profile Page (frontend)
- **Tasks**: avatar-upload
- **Dependencies**: none

## Workstream 3: Audit Log
- **Tasks**: record-logins
- **Dependencies**: auth-fixes
";

fn git(dir: &Path, args: &[&str]) -> String {
    let output = std::process::Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

fn configure(dir: &Path) {
    git(dir, &["config", "user.email", "test@test.com"]);
    git(dir, &["config", "user.name", "Test"]);
    git(dir, &["config", "commit.gpgsign", "false"]);
    git(dir, &["config", "pull.rebase", "false"]);
}

fn commit(dir: &Path, file: &str, content: &str, message: &str) {
    std::fs::write(dir.join(file), content).unwrap();
    git(dir, &["add", file]);
    git(dir, &["commit", "-m", message]);
}

/// Records every check it runs; fails the configured one
#[derive(Clone, Default)]
struct ScriptedGate {
    fail_on: Option<GateCheck>,
    runs: Rc<RefCell<Vec<GateCheck>>>,
}

impl QualityGate for ScriptedGate {
    fn run(&self, check: GateCheck, dir: &Path) -> GateResult<GateOutcome> {
        assert!(dir.exists(), "gate ran outside an existing worktree");
        self.runs.borrow_mut().push(check);
        if self.fail_on == Some(check) {
            Ok(GateOutcome::Failed)
        } else {
            Ok(GateOutcome::Passed)
        }
    }
}

struct Sandbox {
    temp: TempDir,
    root: PathBuf,
    plan: PathBuf,
}

impl Sandbox {
    fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("app");
        std::fs::create_dir_all(&root).unwrap();
        git(&root, &["init"]);
        configure(&root);
        commit(&root, "README.md", "# App", "Initial commit");
        git(&root, &["checkout", "-b", "develop"]);

        let plan = temp.path().join("sprint-7-accounts.md");
        std::fs::write(&plan, PLAN).unwrap();
        Self { temp, root, plan }
    }

    /// Add a bare `origin` holding develop
    fn with_origin(self) -> Self {
        let origin = self.temp.path().join("origin.git");
        std::fs::create_dir_all(&origin).unwrap();
        git(&origin, &["init", "--bare"]);
        git(&self.root, &["remote", "add", "origin", origin.to_str().unwrap()]);
        git(&self.root, &["push", "-u", "origin", "develop"]);
        self
    }

    fn origin(&self) -> PathBuf {
        self.temp.path().join("origin.git")
    }

    fn worktree(&self, name: &str) -> PathBuf {
        self.root.join("../worktrees").join(name)
    }

    fn simulated(&self, gate: ScriptedGate) -> App {
        let project = Project::new(self.root.clone(), ProjectConfig::default());
        App::with_services(project, Box::new(SimulatedRemote), Box::new(gate)).unwrap()
    }

    fn networked(&self) -> App {
        let project = Project::new(self.root.clone(), ProjectConfig::default());
        App::with_services(
            project,
            Box::new(GitRemote::new("origin")),
            Box::new(ScriptedGate::default()),
        )
        .unwrap()
    }

    fn rev(&self, rev: &str) -> String {
        git(&self.root, &["rev-parse", rev])
    }
}

#[test]
fn test_analyze_classifies_workstreams() {
    let sandbox = Sandbox::new();
    let app = sandbox.simulated(ScriptedGate::default());

    let analysis = app.analyze(&sandbox.plan).unwrap();
    let state = analysis.state;
    assert_eq!(state.sprint, "sprint-7-accounts");
    assert_eq!(state.workstreams.len(), 3);

    let names: Vec<_> = state.workstreams.iter().map(|ws| ws.name.as_str()).collect();
    assert_eq!(names, ["auth-fixes", "profile-page", "audit-log"]);

    let safe: Vec<_> = state.workstreams.iter().map(|ws| ws.parallel_safe).collect();
    assert_eq!(safe, [true, true, false]);
    assert_eq!(state.workstreams[0].tasks.len(), 3);
    assert!(analysis.issues.is_empty());
}

#[test]
fn test_local_simulation_end_to_end() {
    let sandbox = Sandbox::new();
    let gate = ScriptedGate::default();
    let app = sandbox.simulated(gate.clone());

    app.analyze(&sandbox.plan).unwrap();
    app.set_mode(ExecutionMode::LocalSimulation).unwrap();
    let state = app.create_workstreams(&sandbox.plan, false).unwrap();
    let starting = state.starting_commit.clone().unwrap();
    assert_eq!(starting, sandbox.rev("develop"));

    let auth = sandbox.worktree("auth-fixes");
    assert_eq!(
        git(&auth, &["rev-parse", "--abbrev-ref", "HEAD"]),
        "feature/auth-fixes-workstream"
    );

    let record = app.resume("auth-fixes").unwrap();
    assert_eq!(record.status, WorkstreamStatus::InProgress);
    commit(&auth, "login.ts", "export const login = () => {}", "fix: login");
    app.complete("auth-fixes").unwrap();

    let merged = app.merge_local("auth-fixes").unwrap();
    assert_eq!(merged.status, WorkstreamStatus::Merged);
    assert_eq!(*gate.runs.borrow(), GateCheck::ALL.to_vec());
    assert!(sandbox.root.join("login.ts").exists());

    let report = app.cleanup(&CleanupTarget::All).unwrap();
    assert_eq!(report.reset_to.as_deref(), Some(starting.as_str()));
    assert_eq!(sandbox.rev("develop"), starting);
    assert!(!sandbox.root.join("login.ts").exists());
    assert!(!app.store().exists());
    for name in ["auth-fixes", "profile-page", "audit-log"] {
        assert!(!sandbox.worktree(name).exists());
    }
    assert_eq!(git(&sandbox.root, &["branch", "--list", "feature/*"]), "");

    // Nothing left to remove
    let again = app.cleanup(&CleanupTarget::All).unwrap();
    assert!(again.removed_worktrees.is_empty());
    assert!(again.deleted_branches.is_empty());
    assert_eq!(
        app.status().unwrap_err().kind(),
        ErrorKind::NotFound
    );
}

#[test]
fn test_gate_failure_keeps_trunk_and_status() {
    let sandbox = Sandbox::new();
    let gate = ScriptedGate {
        fail_on: Some(GateCheck::TypeCheck),
        ..Default::default()
    };
    let app = sandbox.simulated(gate.clone());

    app.analyze(&sandbox.plan).unwrap();
    app.create_workstreams(&sandbox.plan, true).unwrap();
    commit(&sandbox.worktree("audit-log"), "audit.ts", "log()", "feat: audit");
    app.resume("audit-log").unwrap();
    app.complete("audit-log").unwrap();
    let trunk = sandbox.rev("develop");

    let err = app.merge_local("audit-log").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ExternalOperationFailed);
    assert_eq!(*gate.runs.borrow(), [GateCheck::Test, GateCheck::TypeCheck]);
    assert_eq!(sandbox.rev("develop"), trunk);

    let state = app.status().unwrap();
    let record = state.workstream("audit-log").unwrap();
    assert_eq!(record.status, WorkstreamStatus::Completed);
    assert!(record.merged_at.is_none());
}

#[test]
fn test_cleanup_reset_happens_before_removal() {
    let sandbox = Sandbox::new();
    let app = sandbox.simulated(ScriptedGate::default());

    app.analyze(&sandbox.plan).unwrap();
    app.create_workstreams(&sandbox.plan, true).unwrap();

    // Point the recorded baseline at a commit that does not exist
    let mut state = app.status().unwrap();
    state.starting_commit = Some("0000000000000000000000000000000000000000".to_string());
    app.store().save(&mut state).unwrap();

    let err = app.cleanup(&CleanupTarget::All).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ExternalOperationFailed);
    assert!(app.store().exists());
    assert!(sandbox.worktree("auth-fixes").exists());
}

#[test]
fn test_standard_mode_with_remote() {
    let sandbox = Sandbox::new().with_origin();
    let app = sandbox.networked();

    app.analyze(&sandbox.plan).unwrap();
    let state = app.create_workstreams(&sandbox.plan, false).unwrap();
    assert!(state.starting_commit.is_none());

    let profile = sandbox.worktree("profile-page");
    app.resume("profile-page").unwrap();
    commit(&profile, "avatar.ts", "upload()", "feat: avatar");
    app.complete("profile-page").unwrap();

    let first = app.push("profile-page").unwrap();
    assert!(first.new_branch);
    assert_eq!(first.record.status, WorkstreamStatus::Pushed);
    let pushed_at = first.record.pushed_at;
    assert_eq!(
        git(&sandbox.origin(), &["rev-parse", "feature/profile-page-workstream"]),
        git(&profile, &["rev-parse", "HEAD"])
    );

    commit(&profile, "avatar.ts", "upload(); resize()", "feat: resize");
    let second = app.push("profile-page").unwrap();
    assert!(!second.new_branch);
    assert_eq!(second.record.pushed_at, pushed_at);

    // Someone else lands work on develop
    let other = sandbox.temp.path().join("other");
    git(
        sandbox.temp.path(),
        &["clone", "-b", "develop", sandbox.origin().to_str().unwrap(), "other"],
    );
    configure(&other);
    commit(&other, "CHANGELOG.md", "v2", "docs: changelog");
    git(&other, &["push", "origin", "develop"]);

    let report = app.sync_all().unwrap();
    assert_eq!(report.synced.len(), 3);
    assert!(report.failed.is_empty());
    assert!(sandbox.root.join("CHANGELOG.md").exists());
    assert!(profile.join("CHANGELOG.md").exists());
    assert!(sandbox.worktree("audit-log").join("CHANGELOG.md").exists());
}

#[test]
fn test_sync_conflict_is_reported_per_workstream() {
    let sandbox = Sandbox::new();
    let app = sandbox.simulated(ScriptedGate::default());

    app.analyze(&sandbox.plan).unwrap();
    app.create_workstreams(&sandbox.plan, false).unwrap();
    commit(&sandbox.worktree("auth-fixes"), "README.md", "feature", "docs: feature");
    commit(&sandbox.root, "README.md", "trunk", "docs: trunk");

    let report = app.sync_all().unwrap();
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, "auth-fixes");
    assert_eq!(report.synced, ["profile-page", "audit-log"]);
}

#[test]
fn test_concurrent_writer_is_rejected() {
    let sandbox = Sandbox::new();
    let app = sandbox.simulated(ScriptedGate::default());
    app.analyze(&sandbox.plan).unwrap();

    let mut stale = app.status().unwrap();
    app.complete("profile-page").unwrap();

    stale.workstreams[0].status = WorkstreamStatus::Completed;
    assert!(app.store().save(&mut stale).is_err());
    let state = app.status().unwrap();
    assert_eq!(
        state.workstream("profile-page").unwrap().status,
        WorkstreamStatus::Completed
    );
    assert_eq!(
        state.workstream("auth-fixes").unwrap().status,
        WorkstreamStatus::ReadyToStart
    );
}
