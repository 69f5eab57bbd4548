//! Project entity representing the overall repository context.

use crate::config::ProjectConfig;
use std::path::{Path, PathBuf};

/// Represents the overall git repository context
#[derive(Debug, Clone)]
pub struct Project {
    /// Repository root path
    pub root_path: PathBuf,
    /// Sprint state document (absolute path)
    pub state_path: PathBuf,
    /// Worktree directory as configured (relative to root)
    pub worktree_directory: PathBuf,
    /// Trunk branch name
    pub trunk_branch: String,
    /// Loaded configuration
    pub config: ProjectConfig,
}

impl Project {
    /// Create a new Project from a root path and configuration
    pub fn new(root_path: PathBuf, config: ProjectConfig) -> Self {
        let state_path = root_path.join(&config.state.path);

        Self {
            root_path,
            state_path,
            worktree_directory: config.worktree.directory.clone(),
            trunk_branch: config.git.trunk_branch.clone(),
            config,
        }
    }

    /// Discover the project root by walking up from current directory
    pub fn discover(start_path: Option<PathBuf>) -> Option<PathBuf> {
        let start = start_path
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

        let mut current = start.as_path();
        loop {
            // Check for .git directory or file (worktree)
            let git_path = current.join(".git");
            if git_path.exists() {
                return Some(current.to_path_buf());
            }

            // Move up to parent
            match current.parent() {
                Some(parent) => current = parent,
                None => return None,
            }
        }
    }

    /// Resolve a root-relative path (such as a record's worktree)
    pub fn resolve(&self, relative: &Path) -> PathBuf {
        self.root_path.join(relative)
    }

    /// Path of the ephemeral integration worktree used by local merges
    pub fn integration_worktree(&self, name: &str) -> PathBuf {
        self.resolve(&self.worktree_directory.join(format!(".integration-{name}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_new() {
        let config = ProjectConfig::default();
        let project = Project::new(PathBuf::from("/tmp/test-project"), config);

        assert_eq!(project.root_path, PathBuf::from("/tmp/test-project"));
        assert_eq!(
            project.state_path,
            PathBuf::from("/tmp/test-project/.claude/sprint-config.json")
        );
        assert_eq!(project.worktree_directory, PathBuf::from("../worktrees"));
        assert_eq!(project.trunk_branch, "develop");
    }

    #[test]
    fn test_resolve_paths() {
        let project = Project::new(PathBuf::from("/tmp/test-project"), ProjectConfig::default());

        assert_eq!(
            project.resolve(Path::new("../worktrees/auth-fixes")),
            PathBuf::from("/tmp/test-project/../worktrees/auth-fixes")
        );
        assert_eq!(
            project.integration_worktree("auth-fixes"),
            PathBuf::from("/tmp/test-project/../worktrees/.integration-auth-fixes")
        );
    }

    #[test]
    fn test_discover_walks_up() {
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join(".git")).unwrap();
        let nested = temp.path().join("a/b");
        std::fs::create_dir_all(&nested).unwrap();

        assert_eq!(Project::discover(Some(nested)), Some(temp.path().to_path_buf()));
    }
}
