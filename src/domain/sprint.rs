//! Sprint plan entity and related types.

use serde::{Deserialize, Serialize};

/// Dependency entry meaning "no dependency"
pub const NO_DEPENDENCY: &str = "none";

/// A parsed sprint plan. Immutable once produced by the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SprintPlan {
    /// Sprint identity (the plan file's stem)
    pub name: String,
    /// Workstreams in plan order
    pub workstreams: Vec<WorkstreamDefinition>,
}

/// A workstream as declared in the sprint plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkstreamDefinition {
    /// Sequence number from the plan header
    pub id: u32,
    /// Slug derived from the header title
    pub name: String,
    /// Task descriptions in plan order
    pub tasks: Vec<String>,
    /// Declared dependencies, or the `none` sentinel
    pub dependencies: Vec<String>,
}

impl WorkstreamDefinition {
    /// Create a definition whose name is derived from `title`
    pub fn new(id: u32, title: &str) -> Self {
        Self {
            id,
            name: slugify(title),
            tasks: Vec::new(),
            dependencies: vec![NO_DEPENDENCY.to_string()],
        }
    }

    /// Declared dependencies that name another workstream
    pub fn blocking_dependencies(&self) -> impl Iterator<Item = &str> {
        self.dependencies
            .iter()
            .map(String::as_str)
            .filter(|d| !is_no_dependency(d))
    }
}

/// Whether a dependency entry is the `none` sentinel
pub fn is_no_dependency(entry: &str) -> bool {
    entry.trim().eq_ignore_ascii_case(NO_DEPENDENCY)
}

/// Derive a workstream name: trimmed, lowercased, whitespace runs become `-`.
pub fn slugify(title: &str) -> String {
    title
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Auth Fixes"), "auth-fixes");
        assert_eq!(slugify("  Data   Layer\tCleanup  "), "data-layer-cleanup");
        assert_eq!(slugify("API"), "api");
        assert_eq!(slugify("   "), "");
    }

    #[test]
    fn test_definition_defaults() {
        let ws = WorkstreamDefinition::new(3, "Search UI");
        assert_eq!(ws.name, "search-ui");
        assert!(ws.tasks.is_empty());
        assert_eq!(ws.dependencies, vec!["none"]);
        assert_eq!(ws.blocking_dependencies().count(), 0);
    }

    #[test]
    fn test_blocking_dependencies_skip_sentinel() {
        let mut ws = WorkstreamDefinition::new(2, "Profile");
        ws.dependencies = vec!["None".to_string(), "auth-fixes".to_string()];
        assert_eq!(ws.blocking_dependencies().collect::<Vec<_>>(), vec!["auth-fixes"]);
    }
}
