//! Console rendering of command results.

use crate::app::{short, Analysis, CleanupReport, PushOutcome, SyncReport};
use crate::domain::{is_no_dependency, SprintState, WorkstreamRecord};
use chrono::{DateTime, Utc};

fn timestamp(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M UTC").to_string()
}

fn dependencies(record: &WorkstreamRecord) -> String {
    let deps: Vec<&str> = record
        .dependencies
        .iter()
        .map(String::as_str)
        .filter(|d| !is_no_dependency(d))
        .collect();
    if deps.is_empty() {
        "none".to_string()
    } else {
        deps.join(", ")
    }
}

/// Summary printed after `analyze`
pub fn render_analysis(analysis: &Analysis) -> String {
    let state = &analysis.state;
    let mut lines = vec![
        format!("Sprint: {}", state.sprint),
        format!("Workstreams: {}", state.workstreams.len()),
    ];

    for ws in &state.workstreams {
        lines.push(String::new());
        lines.push(format!("{}. {}", ws.id, ws.name));
        lines.push(format!("   Tasks: {}", ws.tasks.len()));
        let mode = if ws.parallel_safe { "parallel-safe" } else { "sequential" };
        lines.push(format!("   Mode: {}", mode));
        lines.push(format!("   Dependencies: {}", dependencies(ws)));
        if !ws.file_conflicts.is_empty() {
            lines.push(format!("   File conflicts: {}", ws.file_conflicts.join(", ")));
        }
        lines.push(format!("   Worktree: {}", ws.worktree.display()));
    }

    if !analysis.issues.is_empty() {
        lines.push(String::new());
        lines.push("Dependency warnings:".to_string());
        lines.extend(analysis.issues.iter().map(|issue| format!("  - {}", issue)));
    }

    lines.join("\n")
}

/// Full sprint status
pub fn render_status(state: &SprintState) -> String {
    let mut lines = vec![
        format!("Sprint: {}", state.sprint),
        format!("Mode: {}", state.execution_mode),
    ];
    if let Some(commit) = &state.starting_commit {
        lines.push(format!("Starting commit: {}", short(commit)));
    }

    for ws in &state.workstreams {
        lines.push(String::new());
        lines.push(format!("{} {} ({})", ws.status.indicator(), ws.name, ws.status));
        lines.push(format!("   Branch: {}", ws.branch));
        lines.push(format!("   Worktree: {}", ws.worktree.display()));
        if ws.tasks.is_empty() {
            lines.push("   Tasks: none".to_string());
        } else {
            lines.push(format!("   Tasks: {}", ws.tasks.join(", ")));
        }
        for (label, at) in [
            ("Completed", &ws.completed_at),
            ("Pushed", &ws.pushed_at),
            ("Merged", &ws.merged_at),
        ] {
            if let Some(at) = at {
                lines.push(format!("   {}: {}", label, timestamp(at)));
            }
        }
    }

    lines.join("\n")
}

/// Tasks to work on after `resume`
pub fn render_resume(record: &WorkstreamRecord, worktree: &std::path::Path) -> String {
    let mut lines = vec![
        format!("Workstream: {} ({})", record.name, record.status),
        format!("Worktree: {}", worktree.display()),
        "Tasks:".to_string(),
    ];
    lines.extend(record.tasks.iter().map(|task| format!("  - {}", task)));
    lines.join("\n")
}

/// Completed tasks and the next step
pub fn render_completed(record: &WorkstreamRecord, local_simulation: bool) -> String {
    let mut lines = vec![format!("Completed {}:", record.name)];
    lines.extend(record.tasks.iter().map(|task| format!("  ✓ {}", task)));
    let command = if local_simulation { "merge-local" } else { "push" };
    lines.push(format!("Next: sprint-flow {} {}", command, record.name));
    lines.join("\n")
}

pub fn render_push(outcome: &PushOutcome) -> String {
    let verb = if outcome.new_branch { "Created" } else { "Updated" };
    format!(
        "{} remote branch {}; open a pull request to merge it",
        verb, outcome.record.branch
    )
}

pub fn render_sync(report: &SyncReport) -> String {
    let mut lines = vec![format!(
        "Synced {}, missing {}, failed {}",
        report.synced.len(),
        report.missing.len(),
        report.failed.len()
    )];
    lines.extend(report.missing.iter().map(|name| format!("  missing worktree: {}", name)));
    lines.extend(
        report
            .failed
            .iter()
            .map(|(name, error)| format!("  failed: {}: {}", name, error)),
    );
    lines.join("\n")
}

pub fn render_cleanup(report: &CleanupReport) -> String {
    let mut lines = Vec::new();
    if let Some(commit) = &report.reset_to {
        lines.push(format!("Trunk reset to {}", short(commit)));
    }
    lines.push(format!(
        "Removed {} worktree(s) and {} branch(es)",
        report.removed_worktrees.len(),
        report.deleted_branches.len()
    ));
    if !report.warnings.is_empty() {
        lines.push(format!("{} item(s) could not be removed:", report.warnings.len()));
        lines.extend(report.warnings.iter().map(|warning| format!("  - {}", warning)));
    }
    if report.state_deleted {
        lines.push("Sprint state removed".to_string());
    }
    lines.join("\n")
}
