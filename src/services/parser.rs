//! Sprint plan parser.
//!
//! Recognizes `Workstream <N>: <title>` headers at the start of a line and,
//! within a section,
//! `Tasks:` and `Dependencies:` lines with comma-separated values. The
//! markdown decorations used in backlog files (`###`, `**Tasks**:`) are
//! accepted as well.

use crate::domain::{SprintPlan, WorkstreamDefinition};
use crate::error::SprintError;
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;

static HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:#+\s*)?\**Workstream\**\s+(\d+)\s*:\s*([^(\n]*)")
        .expect("valid header regex")
});

static FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:[-*]\s+)?\**(Tasks|Dependencies)\**\s*:\s*\**\s*(.*)$")
        .expect("valid field regex")
});

/// Parses sprint plan text into workstream definitions
pub struct SprintParser;

impl SprintParser {
    /// Parse plan text. `sprint` becomes the plan identity.
    pub fn parse(sprint: &str, content: &str) -> Result<SprintPlan, SprintError> {
        let mut workstreams: Vec<WorkstreamDefinition> = Vec::new();
        let mut in_section = false;

        for line in content.lines() {
            if let Some(caps) = HEADER.captures(line) {
                let title = caps[2].trim().trim_end_matches(['*', '#']).trim();
                let Ok(id) = caps[1].parse::<u32>() else {
                    tracing::warn!("Skipping workstream '{}': number {} is out of range", title, &caps[1]);
                    in_section = false;
                    continue;
                };
                let def = WorkstreamDefinition::new(id, title);
                if def.name.is_empty() {
                    tracing::warn!("Skipping workstream {} with an empty title", id);
                    in_section = false;
                    continue;
                }
                workstreams.push(def);
                in_section = true;
                continue;
            }

            if !in_section {
                continue;
            }
            let Some(current) = workstreams.last_mut() else {
                continue;
            };
            if let Some(caps) = FIELD.captures(line) {
                let values = split_list(&caps[2]);
                match &caps[1] {
                    "Tasks" => current.tasks = values,
                    _ if values.is_empty() => {}
                    _ => current.dependencies = values,
                }
            }
        }

        let mut seen = HashSet::new();
        for ws in &workstreams {
            if !seen.insert(ws.name.as_str()) {
                return Err(SprintError::DuplicateWorkstream(ws.name.clone()));
            }
        }

        Ok(SprintPlan {
            name: sprint.to_string(),
            workstreams,
        })
    }

    /// Read and parse a plan file; the sprint identity is the file stem
    pub fn parse_file(path: &Path) -> crate::error::Result<SprintPlan> {
        if !path.is_file() {
            return Err(SprintError::PlanNotFound(path.to_path_buf()).into());
        }
        let content = std::fs::read_to_string(path)?;
        let sprint = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("sprint");
        Ok(Self::parse(sprint, &content)?)
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|item| item.trim().trim_matches('*').trim())
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
