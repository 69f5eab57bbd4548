//! Quality gate: external pass/fail checks run before a local merge is
//! accepted. An optional setup command prepares the working copy first.

use crate::config::GateConfig;
use crate::error::{GateError, GateResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Command;

/// A single quality check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateCheck {
    Test,
    TypeCheck,
    Lint,
    Build,
}

impl GateCheck {
    /// Checks in the order they must pass
    pub const ALL: [GateCheck; 4] = [Self::Test, Self::TypeCheck, Self::Lint, Self::Build];

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Test => "test",
            Self::TypeCheck => "type-check",
            Self::Lint => "lint",
            Self::Build => "build",
        }
    }
}

impl std::fmt::Display for GateCheck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Outcome of one check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    Passed,
    Failed,
    /// No command configured for the check
    Skipped,
}

/// Runs quality checks inside a working copy
pub trait QualityGate {
    /// Make a fresh working copy ready for the checks (install dependencies)
    fn prepare(&self, _dir: &Path) -> GateResult<()> {
        Ok(())
    }

    fn run(&self, check: GateCheck, dir: &Path) -> GateResult<GateOutcome>;

    /// Prepare, then run every check in order, stopping at the first failure
    fn run_all(&self, dir: &Path) -> GateResult<()> {
        self.prepare(dir)?;
        for check in GateCheck::ALL {
            tracing::info!("Running {} check in {}", check, dir.display());
            match self.run(check, dir)? {
                GateOutcome::Passed => tracing::info!("{} check passed", check),
                GateOutcome::Skipped => tracing::info!("{} check skipped (no command)", check),
                GateOutcome::Failed => return Err(GateError::Failed(check)),
            }
        }
        Ok(())
    }
}

/// Quality gate backed by configured shell commands
pub struct CommandGate {
    config: GateConfig,
}

impl CommandGate {
    pub fn new(config: GateConfig) -> Self {
        Self { config }
    }

    fn command_for(&self, check: GateCheck) -> &[String] {
        match check {
            GateCheck::Test => &self.config.test,
            GateCheck::TypeCheck => &self.config.type_check,
            GateCheck::Lint => &self.config.lint,
            GateCheck::Build => &self.config.build,
        }
    }
}

impl QualityGate for CommandGate {
    fn prepare(&self, dir: &Path) -> GateResult<()> {
        let Some((program, args)) = self.config.setup.split_first() else {
            return Ok(());
        };

        let command = self.config.setup.join(" ");
        tracing::info!("Running gate setup `{}` in {}", command, dir.display());
        match Command::new(program).args(args).current_dir(dir).status() {
            Ok(status) if status.success() => Ok(()),
            Ok(status) => {
                tracing::warn!("Gate setup exited with {}", status);
                Err(GateError::SetupFailed {
                    command,
                    source: None,
                })
            }
            Err(e) => Err(GateError::SetupFailed {
                command,
                source: Some(e),
            }),
        }
    }

    fn run(&self, check: GateCheck, dir: &Path) -> GateResult<GateOutcome> {
        let Some((program, args)) = self.command_for(check).split_first() else {
            return Ok(GateOutcome::Skipped);
        };

        // Output goes straight to the operator's terminal
        let status = Command::new(program)
            .args(args)
            .current_dir(dir)
            .status()
            .map_err(|source| GateError::Spawn { check, source })?;

        if status.success() {
            Ok(GateOutcome::Passed)
        } else {
            tracing::warn!("{} check exited with {}", check, status);
            Ok(GateOutcome::Failed)
        }
    }
}
