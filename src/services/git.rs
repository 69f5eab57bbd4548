//! Git service for repository and worktree operations.
//!
//! Shells out to the git CLI. Every call takes the directory it runs in,
//! so the process working directory is never changed.

use crate::domain::{Worktree, WorktreeStatus};
use crate::error::{GitError, GitResult};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Run git in `dir` and return raw stdout, or the failure's stderr.
pub(crate) fn run_git(dir: &Path, args: &[&str]) -> GitResult<String> {
    tracing::debug!(dir = %dir.display(), "git {}", args.join(" "));

    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .map_err(|e| GitError::Operation(format!("Failed to run git {}: {}", args.join(" "), e)))?;

    if !output.status.success() {
        // git reports some failures (merge conflicts) on stdout
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        let detail = [stderr.trim(), stdout.trim()]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n");
        return Err(GitError::Command {
            command: args.join(" "),
            stderr: detail,
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// Run git in `dir`, only reporting whether it succeeded.
fn git_succeeds(dir: &Path, args: &[&str]) -> GitResult<bool> {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .map_err(|e| GitError::Operation(format!("Failed to run git {}: {}", args.join(" "), e)))?;
    Ok(output.status.success())
}

fn path_arg(path: &Path) -> GitResult<&str> {
    path.to_str()
        .ok_or_else(|| GitError::Operation(format!("Path is not valid UTF-8: {}", path.display())))
}

/// Git service for branch and worktree management
pub struct GitService {
    repo_path: PathBuf,
}

impl GitService {
    /// Create a new GitService for a repository
    pub fn new(repo_path: PathBuf) -> GitResult<Self> {
        // Verify it's a git repository (.git is a file inside linked worktrees)
        if !repo_path.join(".git").exists() {
            return Err(GitError::NotARepository);
        }

        Ok(Self { repo_path })
    }

    /// List all worktrees in the repository
    pub fn list_worktrees(&self) -> GitResult<Vec<Worktree>> {
        let output = run_git(&self.repo_path, &["worktree", "list", "--porcelain"])?;

        let mut worktrees = Vec::new();
        let mut current_path: Option<PathBuf> = None;
        let mut current_branch: Option<String> = None;
        let mut is_bare = false;

        for line in output.lines() {
            if let Some(path) = line.strip_prefix("worktree ") {
                // Save previous worktree if any
                if let Some(path) = current_path.take() {
                    if !is_bare {
                        let is_main = worktrees.is_empty(); // First worktree is main
                        worktrees.push(Worktree::new(path, current_branch.take(), is_main));
                    }
                }
                current_path = Some(PathBuf::from(path));
                current_branch = None;
                is_bare = false;
            } else if let Some(branch_ref) = line.strip_prefix("branch refs/heads/") {
                current_branch = Some(branch_ref.to_string());
            } else if line == "bare" {
                is_bare = true;
            }
        }

        // Don't forget the last worktree
        if let Some(path) = current_path {
            if !is_bare {
                let is_main = worktrees.is_empty();
                worktrees.push(Worktree::new(path, current_branch, is_main));
            }
        }

        Ok(worktrees)
    }

    /// Attach a worktree at `path` bound to an existing branch
    pub fn add_worktree(&self, path: &Path, branch: &str) -> GitResult<()> {
        match run_git(&self.repo_path, &["worktree", "add", path_arg(path)?, branch]) {
            Err(GitError::Command { stderr, .. }) if stderr.contains("already exists") => {
                Err(GitError::WorktreeExists(path.to_path_buf()))
            }
            other => other.map(|_| ()),
        }
    }

    /// Detach and delete a worktree
    pub fn remove_worktree(&self, path: &Path, force: bool) -> GitResult<()> {
        if !path.exists() {
            return Err(GitError::WorktreeNotFound(path.to_path_buf()));
        }

        let mut args = vec!["worktree", "remove"];
        if force {
            args.push("--force");
        }
        args.push(path_arg(path)?);

        run_git(&self.repo_path, &args).map(|_| ())
    }

    /// Forget worktrees whose directories no longer exist
    pub fn prune_worktrees(&self) -> GitResult<()> {
        run_git(&self.repo_path, &["worktree", "prune"]).map(|_| ())
    }

    /// Get the status of a worktree
    pub fn worktree_status(&self, path: &Path) -> GitResult<WorktreeStatus> {
        if !path.exists() {
            return Err(GitError::WorktreeNotFound(path.to_path_buf()));
        }

        let output = run_git(path, &["status", "--porcelain"])?;
        Ok(WorktreeStatus::from_porcelain(&output))
    }

    /// Check if a local branch exists
    pub fn branch_exists(&self, branch: &str) -> GitResult<bool> {
        git_succeeds(
            &self.repo_path,
            &["show-ref", "--verify", "--quiet", &format!("refs/heads/{}", branch)],
        )
    }

    /// Create a new branch without checking it out
    pub fn create_branch(&self, branch: &str, start_point: Option<&str>) -> GitResult<()> {
        let mut args = vec!["branch", branch];
        if let Some(start) = start_point {
            args.push(start);
        }

        run_git(&self.repo_path, &args).map(|_| ())
    }

    /// Force-delete a local branch
    pub fn delete_branch(&self, branch: &str) -> GitResult<()> {
        if !self.branch_exists(branch)? {
            return Err(GitError::BranchNotFound(branch.to_string()));
        }
        run_git(&self.repo_path, &["branch", "-D", branch]).map(|_| ())
    }

    /// Local branches matching a glob such as `feature/*-workstream`
    pub fn list_branches(&self, pattern: &str) -> GitResult<Vec<String>> {
        let output = run_git(
            &self.repo_path,
            &["branch", "--list", "--format=%(refname:short)", pattern],
        )?;
        Ok(output
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Get the current branch of a worktree
    pub fn current_branch(&self, path: &Path) -> GitResult<String> {
        Ok(run_git(path, &["rev-parse", "--abbrev-ref", "HEAD"])?
            .trim()
            .to_string())
    }

    /// Resolve a revision to its commit id
    pub fn rev_parse(&self, path: &Path, rev: &str) -> GitResult<String> {
        Ok(run_git(path, &["rev-parse", "--verify", rev])?.trim().to_string())
    }

    /// Switch the worktree at `path` to `branch`
    pub fn checkout(&self, path: &Path, branch: &str) -> GitResult<()> {
        run_git(path, &["checkout", branch]).map(|_| ())
    }

    /// Merge `rev` into the branch checked out at `path`
    pub fn merge(&self, path: &Path, rev: &str, message: &str) -> GitResult<()> {
        match run_git(path, &["merge", "--no-edit", "-m", message, rev]) {
            Err(GitError::Command { stderr, .. })
                if stderr.contains("CONFLICT") || stderr.contains("Automatic merge failed") =>
            {
                let target = self.current_branch(path).unwrap_or_else(|_| "HEAD".to_string());
                Err(GitError::MergeConflict {
                    branch: rev.to_string(),
                    target,
                })
            }
            other => other.map(|_| ()),
        }
    }

    /// Fast-forward the branch checked out at `path` to `rev`
    pub fn fast_forward(&self, path: &Path, rev: &str) -> GitResult<()> {
        run_git(path, &["merge", "--ff-only", rev]).map(|_| ())
    }

    /// Hard-reset the branch checked out at `path` to `commit`
    pub fn reset_hard(&self, path: &Path, commit: &str) -> GitResult<()> {
        run_git(path, &["reset", "--hard", commit]).map(|_| ())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tempfile::TempDir;

    fn git(path: &Path, args: &[&str]) {
        let status = std::process::Command::new("git")
            .args(args)
            .current_dir(path)
            .output()
            .unwrap()
            .status;
        assert!(status.success(), "git {:?} failed", args);
    }

    /// Repository at `<temp>/repo` with one commit on `develop`
    pub(crate) fn create_test_repo() -> (TempDir, PathBuf) {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("repo");
        std::fs::create_dir_all(&path).unwrap();

        git(&path, &["init"]);
        git(&path, &["config", "user.email", "test@test.com"]);
        git(&path, &["config", "user.name", "Test"]);
        git(&path, &["config", "commit.gpgsign", "false"]);

        std::fs::write(path.join("README.md"), "# Test").unwrap();

        git(&path, &["add", "."]);
        git(&path, &["commit", "-m", "Initial commit"]);
        git(&path, &["checkout", "-b", "develop"]);

        (temp, path)
    }

    pub(crate) fn commit_file(path: &Path, file: &str, content: &str) {
        std::fs::write(path.join(file), content).unwrap();
        git(path, &["add", file]);
        git(path, &["commit", "-m", &format!("Update {}", file)]);
    }

    pub(crate) fn checkout_new(path: &Path, branch: &str) {
        git(path, &["checkout", "-b", branch]);
    }

    #[test]
    fn test_list_worktrees() {
        let (_temp, path) = create_test_repo();
        let git = GitService::new(path.clone()).unwrap();

        let worktrees = git.list_worktrees().unwrap();
        assert_eq!(worktrees.len(), 1);
        assert!(worktrees[0].is_main);
        assert_eq!(worktrees[0].branch.as_deref(), Some("develop"));
    }

    #[test]
    fn test_not_a_repository() {
        let temp = TempDir::new().unwrap();
        assert!(matches!(
            GitService::new(temp.path().to_path_buf()),
            Err(GitError::NotARepository)
        ));
    }

    #[test]
    fn test_branch_lifecycle() {
        let (_temp, path) = create_test_repo();
        let git = GitService::new(path.clone()).unwrap();

        assert!(git.branch_exists("develop").unwrap());
        assert!(!git.branch_exists("feature/a-workstream").unwrap());

        git.create_branch("feature/a-workstream", Some("develop")).unwrap();
        git.create_branch("feature/b-workstream", Some("develop")).unwrap();
        assert_eq!(
            git.list_branches("feature/*-workstream").unwrap(),
            vec!["feature/a-workstream", "feature/b-workstream"]
        );
        // Creating a branch must not move the root checkout
        assert_eq!(git.current_branch(&path).unwrap(), "develop");

        git.delete_branch("feature/a-workstream").unwrap();
        assert!(!git.branch_exists("feature/a-workstream").unwrap());
        assert!(matches!(
            git.delete_branch("feature/a-workstream"),
            Err(GitError::BranchNotFound(_))
        ));
    }

    #[test]
    fn test_worktree_add_exists_and_remove() {
        let (temp, path) = create_test_repo();
        let git = GitService::new(path.clone()).unwrap();
        let wt_path = temp.path().join("worktrees/auth");

        git.create_branch("feature/auth-workstream", None).unwrap();
        git.add_worktree(&wt_path, "feature/auth-workstream").unwrap();
        assert_eq!(git.current_branch(&wt_path).unwrap(), "feature/auth-workstream");
        assert!(git.worktree_status(&wt_path).unwrap().is_clean());

        assert!(matches!(
            git.add_worktree(&wt_path, "feature/auth-workstream"),
            Err(GitError::WorktreeExists(_))
        ));

        std::fs::write(wt_path.join("dirty.txt"), "x").unwrap();
        assert!(git.worktree_status(&wt_path).unwrap().is_dirty());

        git.remove_worktree(&wt_path, true).unwrap();
        assert!(!wt_path.exists());
        assert_eq!(git.list_worktrees().unwrap().len(), 1);
    }

    #[test]
    fn test_merge_conflict_is_reported() {
        let (_temp, path) = create_test_repo();
        let git = GitService::new(path.clone()).unwrap();

        git.create_branch("topic", None).unwrap();
        commit_file(&path, "README.md", "develop side");
        git.checkout(&path, "topic").unwrap();
        commit_file(&path, "README.md", "topic side");
        git.checkout(&path, "develop").unwrap();

        let err = git.merge(&path, "topic", "merge topic").unwrap_err();
        assert!(matches!(err, GitError::MergeConflict { .. }), "{err}");
    }

    #[test]
    fn test_reset_hard() {
        let (_temp, path) = create_test_repo();
        let git = GitService::new(path.clone()).unwrap();

        let start = git.rev_parse(&path, "develop").unwrap();
        commit_file(&path, "CHANGELOG.md", "v2");
        assert_ne!(git.rev_parse(&path, "HEAD").unwrap(), start);

        git.reset_hard(&path, &start).unwrap();
        assert_eq!(git.rev_parse(&path, "develop").unwrap(), start);
    }
}
