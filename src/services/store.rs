//! Sprint state store: the single persisted JSON document.
//!
//! Every write replaces the whole document. `save` refuses to overwrite a
//! document whose revision moved since the caller loaded it, so two
//! invocations racing on the same sprint fail loudly instead of losing
//! an update.

use crate::domain::{SprintPlan, SprintState};
use crate::error::{StoreError, StoreResult};
use std::io::Write;
use std::path::{Path, PathBuf};

/// File-backed store for the sprint state document
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Load the document; `NotFound` if it does not exist
    pub fn load(&self) -> StoreResult<SprintState> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(self.path.clone()));
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&content)?)
    }

    /// Load the document, or `None` if there is none
    pub fn try_load(&self) -> StoreResult<Option<SprintState>> {
        match self.load() {
            Ok(state) => Ok(Some(state)),
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Persist `state` if nobody else saved since it was loaded.
    /// Bumps `state.revision` on success.
    pub fn save(&self, state: &mut SprintState) -> StoreResult<()> {
        let found = match self.try_load()? {
            Some(current) => current.revision,
            None => 0,
        };
        if found != state.revision {
            return Err(StoreError::Conflict {
                expected: state.revision,
                found,
            });
        }

        state.revision += 1;
        if let Err(e) = self.write(state) {
            state.revision -= 1;
            return Err(e);
        }
        Ok(())
    }

    /// Build the initial document for a plan and persist it.
    ///
    /// Any existing document is overwritten without warning; the new
    /// revision continues from the old one so stale writers still conflict.
    pub fn initialize(
        &self,
        plan: &SprintPlan,
        worktree_directory: &Path,
        parallel_safe: impl Fn(&crate::domain::WorkstreamDefinition) -> bool,
    ) -> StoreResult<SprintState> {
        let previous = match self.try_load() {
            Ok(state) => state.map(|s| s.revision).unwrap_or(0),
            Err(StoreError::Parse(e)) => {
                tracing::warn!("Replacing unreadable sprint state: {}", e);
                0
            }
            Err(e) => return Err(e),
        };

        let mut state = SprintState::from_plan(plan, worktree_directory, parallel_safe);
        state.revision = previous + 1;
        self.write(&state)?;
        tracing::info!(
            sprint = %state.sprint,
            workstreams = state.workstreams.len(),
            "Initialized sprint state at {}",
            self.path.display()
        );
        Ok(state)
    }

    /// Remove the document; absence is success
    pub fn delete(&self) -> StoreResult<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, state: &SprintState) -> StoreResult<()> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let mut file = tempfile::NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut file, state)?;
        file.write_all(b"\n")?;
        file.persist(&self.path).map_err(|e| StoreError::Io(e.error))?;
        Ok(())
    }
}
