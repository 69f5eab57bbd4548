//! Dependency analysis for sprint workstreams.

use crate::domain::{is_no_dependency, SprintPlan, WorkstreamDefinition};
use std::collections::{HashMap, HashSet};

/// Problem found in the declared dependency graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyIssue {
    /// A dependency names a workstream that is not in the plan
    UnknownDependency {
        workstream: String,
        dependency: String,
    },
    /// Workstreams that depend on each other in a loop, in traversal order
    Cycle(Vec<String>),
}

impl std::fmt::Display for DependencyIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownDependency {
                workstream,
                dependency,
            } => write!(f, "{workstream} depends on unknown workstream '{dependency}'"),
            Self::Cycle(members) => {
                write!(f, "dependency cycle: {}", members.join(" -> "))?;
                if let Some(first) = members.first() {
                    write!(f, " -> {first}")?;
                }
                Ok(())
            }
        }
    }
}

/// Classifies workstreams and validates their declared dependencies
pub struct DependencyAnalyzer;

impl DependencyAnalyzer {
    /// A workstream is parallel-safe when it declares no dependency other
    /// than the `none` sentinel. Purely local: names are not checked.
    pub fn is_parallel_safe(def: &WorkstreamDefinition) -> bool {
        def.dependencies.iter().all(|d| is_no_dependency(d))
    }

    /// Unknown dependency names and cycles. Advisory only; classification
    /// does not depend on it.
    pub fn validate(plan: &SprintPlan) -> Vec<DependencyIssue> {
        let known: HashSet<&str> = plan.workstreams.iter().map(|ws| ws.name.as_str()).collect();
        let mut issues = Vec::new();
        let mut edges: HashMap<&str, Vec<&str>> = HashMap::new();

        for ws in &plan.workstreams {
            let targets = edges.entry(ws.name.as_str()).or_default();
            for dep in ws.blocking_dependencies() {
                let dep = dep.trim();
                if known.contains(dep) {
                    targets.push(dep);
                } else {
                    issues.push(DependencyIssue::UnknownDependency {
                        workstream: ws.name.clone(),
                        dependency: dep.to_string(),
                    });
                }
            }
        }

        let mut state: HashMap<&str, Visit> = HashMap::new();
        let mut stack: Vec<&str> = Vec::new();
        for ws in &plan.workstreams {
            find_cycles(ws.name.as_str(), &edges, &mut state, &mut stack, &mut issues);
        }

        issues
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    InProgress,
    Done,
}

fn find_cycles<'a>(
    node: &'a str,
    edges: &HashMap<&'a str, Vec<&'a str>>,
    state: &mut HashMap<&'a str, Visit>,
    stack: &mut Vec<&'a str>,
    issues: &mut Vec<DependencyIssue>,
) {
    match state.get(node) {
        Some(Visit::Done) => return,
        Some(Visit::InProgress) => {
            if let Some(start) = stack.iter().position(|n| *n == node) {
                let members = stack[start..].iter().map(|n| n.to_string()).collect();
                issues.push(DependencyIssue::Cycle(members));
            }
            return;
        }
        None => {}
    }

    state.insert(node, Visit::InProgress);
    stack.push(node);
    for next in edges.get(node).into_iter().flatten() {
        find_cycles(*next, edges, state, stack, issues);
    }
    stack.pop();
    state.insert(node, Visit::Done);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ws(name: &str, deps: &[&str]) -> WorkstreamDefinition {
        let mut def = WorkstreamDefinition::new(0, name);
        if !deps.is_empty() {
            def.dependencies = deps.iter().map(|d| d.to_string()).collect();
        }
        def
    }

    fn plan(workstreams: Vec<WorkstreamDefinition>) -> SprintPlan {
        SprintPlan {
            name: "sprint".to_string(),
            workstreams,
        }
    }

    #[test]
    fn test_parallel_safe_classification() {
        assert!(DependencyAnalyzer::is_parallel_safe(&ws("a", &[])));
        assert!(DependencyAnalyzer::is_parallel_safe(&ws("a", &["None"])));
        assert!(DependencyAnalyzer::is_parallel_safe(&ws("a", &["none", "NONE"])));
        assert!(!DependencyAnalyzer::is_parallel_safe(&ws("a", &["b"])));
        assert!(!DependencyAnalyzer::is_parallel_safe(&ws("a", &["none", "b"])));

        let mut empty = ws("a", &[]);
        empty.dependencies.clear();
        assert!(DependencyAnalyzer::is_parallel_safe(&empty));
    }

    #[test]
    fn test_validate_clean_plan() {
        let plan = plan(vec![ws("a", &[]), ws("b", &["a"]), ws("c", &["a", "b"])]);
        assert!(DependencyAnalyzer::validate(&plan).is_empty());
    }

    #[test]
    fn test_validate_unknown_dependency() {
        let plan = plan(vec![ws("a", &["ghost"])]);
        let issues = DependencyAnalyzer::validate(&plan);
        assert_eq!(
            issues,
            vec![DependencyIssue::UnknownDependency {
                workstream: "a".to_string(),
                dependency: "ghost".to_string()
            }]
        );
        assert_eq!(issues[0].to_string(), "a depends on unknown workstream 'ghost'");
    }

    #[test]
    fn test_validate_reports_each_cycle_once() {
        let plan = plan(vec![ws("a", &["b"]), ws("b", &["c"]), ws("c", &["a"]), ws("d", &["d"])]);
        let issues = DependencyAnalyzer::validate(&plan);
        assert_eq!(
            issues,
            vec![
                DependencyIssue::Cycle(vec!["a".into(), "b".into(), "c".into()]),
                DependencyIssue::Cycle(vec!["d".into()]),
            ]
        );
        assert_eq!(issues[0].to_string(), "dependency cycle: a -> b -> c -> a");
    }
}
