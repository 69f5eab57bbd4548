//! Worktree entity and related types.

use super::workstream::{is_workstream_branch, BRANCH_PREFIX, BRANCH_SUFFIX};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Represents a git worktree instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Worktree {
    /// Full path to worktree directory
    pub path: PathBuf,
    /// Associated branch name (`None` when detached)
    pub branch: Option<String>,
    /// Is this the main worktree?
    pub is_main: bool,
}

impl Worktree {
    /// Create a new worktree instance
    pub fn new(path: PathBuf, branch: Option<String>, is_main: bool) -> Self {
        Self {
            path,
            branch,
            is_main,
        }
    }

    /// Workstream name if the branch follows the workstream pattern
    pub fn workstream_name(&self) -> Option<&str> {
        let branch = self.branch.as_deref()?;
        if !is_workstream_branch(branch) {
            return None;
        }
        Some(&branch[BRANCH_PREFIX.len()..branch.len() - BRANCH_SUFFIX.len()])
    }
}

/// Working tree status
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WorktreeStatus {
    /// No uncommitted changes
    Clean,
    /// Has uncommitted changes
    Dirty {
        modified: u32,
        staged: u32,
        untracked: u32,
    },
    /// Status cannot be determined
    #[default]
    Unknown,
}

impl WorktreeStatus {
    /// Parse `git status --porcelain` output
    pub fn from_porcelain(output: &str) -> Self {
        if output.trim().is_empty() {
            return Self::Clean;
        }

        let mut modified = 0u32;
        let mut staged = 0u32;
        let mut untracked = 0u32;

        for line in output.lines() {
            let mut chars = line.chars();
            let (Some(index), Some(worktree)) = (chars.next(), chars.next()) else {
                continue;
            };

            match (index, worktree) {
                ('?', '?') => untracked += 1,
                (i, w) if i != ' ' && w != ' ' => {
                    staged += 1;
                    modified += 1;
                }
                (i, _) if i != ' ' => staged += 1,
                (_, w) if w != ' ' => modified += 1,
                _ => {}
            }
        }

        Self::Dirty {
            modified,
            staged,
            untracked,
        }
    }

    /// Check if the worktree is clean
    pub fn is_clean(&self) -> bool {
        matches!(self, Self::Clean)
    }

    /// Check if the worktree is dirty
    pub fn is_dirty(&self) -> bool {
        matches!(self, Self::Dirty { .. })
    }

    /// Get status description
    pub fn description(&self) -> String {
        match self {
            Self::Clean => "Clean".to_string(),
            Self::Dirty {
                modified,
                staged,
                untracked,
            } => {
                let mut parts = Vec::new();
                if *modified > 0 {
                    parts.push(format!("{}M", modified));
                }
                if *staged > 0 {
                    parts.push(format!("{}S", staged));
                }
                if *untracked > 0 {
                    parts.push(format!("{}?", untracked));
                }
                parts.join(" ")
            }
            Self::Unknown => "Unknown".to_string(),
        }
    }
}

impl std::fmt::Display for WorktreeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}
