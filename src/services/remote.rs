//! Remote interaction: real network git, or a simulation that never
//! leaves the machine.
//!
//! The lifecycle code talks to `RemoteGateway` only, so push and sync
//! behave the same regardless of which implementation is configured.

use super::git::run_git;
use crate::error::GitResult;
use std::path::Path;

/// Network-facing git operations
pub trait RemoteGateway {
    /// Short label for logs
    fn label(&self) -> &'static str;

    /// Bring the trunk checked out at `dir` up to date
    fn update_trunk(&self, dir: &Path, trunk: &str) -> GitResult<()>;

    /// Fetch remote refs into the repository containing `dir`
    fn fetch(&self, dir: &Path) -> GitResult<()>;

    /// Revision a workstream should merge to pick up the latest trunk
    fn trunk_ref(&self, trunk: &str) -> String;

    /// Whether `branch` already exists on the remote
    fn branch_exists(&self, dir: &Path, branch: &str) -> GitResult<bool>;

    /// Push `branch`, setting upstream tracking when it is new
    fn push(&self, dir: &Path, branch: &str, set_upstream: bool) -> GitResult<()>;
}

/// Talks to a real git remote
pub struct GitRemote {
    remote: String,
}

impl GitRemote {
    pub fn new(remote: impl Into<String>) -> Self {
        Self {
            remote: remote.into(),
        }
    }
}

impl RemoteGateway for GitRemote {
    fn label(&self) -> &'static str {
        "remote"
    }

    fn update_trunk(&self, dir: &Path, trunk: &str) -> GitResult<()> {
        run_git(dir, &["pull", &self.remote, trunk]).map(|_| ())
    }

    fn fetch(&self, dir: &Path) -> GitResult<()> {
        run_git(dir, &["fetch", &self.remote]).map(|_| ())
    }

    fn trunk_ref(&self, trunk: &str) -> String {
        format!("{}/{}", self.remote, trunk)
    }

    fn branch_exists(&self, dir: &Path, branch: &str) -> GitResult<bool> {
        let output = run_git(dir, &["ls-remote", "--heads", &self.remote, branch])?;
        Ok(!output.trim().is_empty())
    }

    fn push(&self, dir: &Path, branch: &str, set_upstream: bool) -> GitResult<()> {
        let mut args = vec!["push"];
        if set_upstream {
            args.push("-u");
        }
        args.push(&self.remote);
        args.push(branch);
        run_git(dir, &args).map(|_| ())
    }
}

/// Stands in for the remote: every operation succeeds without network access
#[derive(Debug, Default)]
pub struct SimulatedRemote;

impl RemoteGateway for SimulatedRemote {
    fn label(&self) -> &'static str {
        "simulated remote"
    }

    fn update_trunk(&self, dir: &Path, trunk: &str) -> GitResult<()> {
        tracing::info!(dir = %dir.display(), "[simulated] pull {trunk}: already up to date");
        Ok(())
    }

    fn fetch(&self, dir: &Path) -> GitResult<()> {
        tracing::info!(dir = %dir.display(), "[simulated] fetch: nothing new");
        Ok(())
    }

    // Without a remote the local trunk is the latest trunk
    fn trunk_ref(&self, trunk: &str) -> String {
        trunk.to_string()
    }

    fn branch_exists(&self, _dir: &Path, branch: &str) -> GitResult<bool> {
        tracing::info!("[simulated] ls-remote {branch}: treating as a new branch");
        Ok(false)
    }

    fn push(&self, _dir: &Path, branch: &str, set_upstream: bool) -> GitResult<()> {
        if set_upstream {
            tracing::info!("[simulated] push -u {branch}: * [new branch] {branch} -> {branch}");
        } else {
            tracing::info!("[simulated] push {branch}: {branch} -> {branch}");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::git_fixtures::{commit_file, create_test_repo};
    use tempfile::TempDir;

    #[test]
    fn test_simulated_remote_is_offline() {
        let remote = SimulatedRemote;
        let dir = Path::new("/nonexistent");
        assert!(remote.update_trunk(dir, "develop").is_ok());
        assert!(remote.fetch(dir).is_ok());
        assert!(!remote.branch_exists(dir, "feature/a-workstream").unwrap());
        assert!(remote.push(dir, "feature/a-workstream", true).is_ok());
        assert_eq!(remote.trunk_ref("develop"), "develop");
    }

    #[test]
    fn test_git_remote_against_bare_repository() {
        let (_temp, path) = create_test_repo();
        let bare = TempDir::new().unwrap();
        run_git(bare.path(), &["init", "--bare"]).unwrap();
        run_git(&path, &["remote", "add", "origin", bare.path().to_str().unwrap()]).unwrap();

        let remote = GitRemote::new("origin");
        assert_eq!(remote.trunk_ref("develop"), "origin/develop");
        assert!(!remote.branch_exists(&path, "develop").unwrap());

        remote.push(&path, "develop", true).unwrap();
        assert!(remote.branch_exists(&path, "develop").unwrap());

        commit_file(&path, "NOTES.md", "more");
        remote.push(&path, "develop", false).unwrap();
        remote.fetch(&path).unwrap();
        remote.update_trunk(&path, "develop").unwrap();
    }
}
