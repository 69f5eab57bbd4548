//! Configuration management for sprint-flow.
//!
//! Supports layered configuration: defaults → project → user → env

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub worktree: WorktreeConfig,
    #[serde(default)]
    pub git: GitConfig,
    #[serde(default)]
    pub state: StateConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub gates: GateConfig,
}

impl ProjectConfig {
    /// Load configuration with hierarchy: defaults → project → user → env
    pub fn load(project_root: Option<&PathBuf>) -> Result<Self, ConfigError> {
        use config::{Config, Environment, File};

        let mut builder = Config::builder();

        // 1. Start with defaults
        builder = builder.add_source(
            config::File::from_str(
                include_str!("../default_config.toml"),
                config::FileFormat::Toml,
            )
            .required(false),
        );

        // 2. Project-specific config (.sprint-flow.toml in project root)
        if let Some(root) = project_root {
            let project_config = root.join(".sprint-flow.toml");
            if project_config.exists() {
                builder = builder.add_source(File::from(project_config).required(false));
            }
        }

        // 3. User config (~/.config/sprint-flow/config.toml)
        if let Some(config_dir) = directories::ProjectDirs::from("com", "sprint-flow", "sprint-flow")
        {
            let user_config = config_dir.config_dir().join("config.toml");
            if user_config.exists() {
                builder = builder.add_source(File::from(user_config).required(false));
            }
        }

        // 4. Environment variables (SPRINT_FLOW__*)
        builder = builder.add_source(
            Environment::with_prefix("SPRINT_FLOW")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| ConfigError::Parse(e.to_string()))?;

        let config: Self = config
            .try_deserialize()
            .map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.git.trunk_branch.trim().is_empty() {
            return Err(ConfigError::Invalid("git.trunk_branch is empty".to_string()));
        }
        if self.state.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("state.path is empty".to_string()));
        }
        Ok(())
    }
}

/// Worktree-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorktreeConfig {
    /// Directory where worktrees are created (relative to project root)
    #[serde(default = "default_worktree_directory")]
    pub directory: PathBuf,
}

impl Default for WorktreeConfig {
    fn default() -> Self {
        Self {
            directory: default_worktree_directory(),
        }
    }
}

fn default_worktree_directory() -> PathBuf {
    PathBuf::from("../worktrees")
}

/// Git-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitConfig {
    /// Integration branch every workstream starts from and merges into
    #[serde(default = "default_trunk_branch")]
    pub trunk_branch: String,
    /// Remote used for pull, fetch and push
    #[serde(default = "default_remote")]
    pub remote: String,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            trunk_branch: default_trunk_branch(),
            remote: default_remote(),
        }
    }
}

fn default_trunk_branch() -> String {
    "develop".to_string()
}

fn default_remote() -> String {
    "origin".to_string()
}

/// Location of the persisted sprint state document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateConfig {
    /// Path of the state document (relative to project root)
    #[serde(default = "default_state_path")]
    pub path: PathBuf,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            path: default_state_path(),
        }
    }
}

fn default_state_path() -> PathBuf {
    PathBuf::from(".claude/sprint-config.json")
}

/// Remote interaction settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Replace network operations with logged no-ops
    #[serde(default)]
    pub simulate: bool,
}

/// Quality gate commands, run in order before a local merge is accepted.
///
/// Each entry is an argv vector; an empty vector skips that check. `setup`
/// runs first in the fresh integration worktree, which has none of the
/// root's ignored install state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    #[serde(default = "default_setup_command")]
    pub setup: Vec<String>,
    #[serde(default = "default_test_command")]
    pub test: Vec<String>,
    #[serde(default = "default_type_check_command")]
    pub type_check: Vec<String>,
    #[serde(default = "default_lint_command")]
    pub lint: Vec<String>,
    #[serde(default = "default_build_command")]
    pub build: Vec<String>,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            setup: default_setup_command(),
            test: default_test_command(),
            type_check: default_type_check_command(),
            lint: default_lint_command(),
            build: default_build_command(),
        }
    }
}

fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

fn default_setup_command() -> Vec<String> {
    argv(&["pnpm", "install", "--frozen-lockfile"])
}

fn default_test_command() -> Vec<String> {
    argv(&["pnpm", "test", "run"])
}

fn default_type_check_command() -> Vec<String> {
    argv(&["pnpm", "type-check"])
}

fn default_lint_command() -> Vec<String> {
    argv(&["pnpm", "lint"])
}

fn default_build_command() -> Vec<String> {
    argv(&["pnpm", "build"])
}
