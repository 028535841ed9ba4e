// Markdown merge reports under reports/

use super::{BranchOutcome, MergePlan, MergeResult};
use crate::file_storage::reports::write_report;
use crate::file_storage::FileResult;
use chrono::{DateTime, Utc};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

const REPORT_KIND: &str = "merge_report";

pub fn render_plan(plan: &MergePlan, out: &mut String) {
    let _ = writeln!(out, "## Merge Plan\n");
    let _ = writeln!(out, "Integration branch: `{}`\n", plan.integration_branch);
    let _ = writeln!(out, "| # | Branch | Agent | Anchor task | Changed files |");
    let _ = writeln!(out, "|---|--------|-------|-------------|---------------|");
    for (i, entry) in plan.entries.iter().enumerate() {
        let _ = writeln!(
            out,
            "| {} | `{}` | {} | {} | {} |",
            i + 1,
            entry.record.branch,
            entry.record.agent_id,
            entry.anchor_task.as_deref().unwrap_or("-"),
            entry.record.changed_files.len()
        );
    }

    let _ = writeln!(out, "\n## Predicted Conflicts\n");
    if plan.predicted_conflicts.is_empty() {
        let _ = writeln!(out, "None.");
        return;
    }
    for conflict in &plan.predicted_conflicts {
        let _ = writeln!(
            out,
            "- `{}` ({}, {}, severity {:?}): {}",
            conflict.path,
            conflict.category.as_str(),
            conflict.strategy.as_str(),
            conflict.severity,
            conflict.branches.join(", ")
        );
    }
}

pub fn render_result(result: &MergeResult, out: &mut String) {
    let _ = writeln!(out, "\n## Outcomes\n");
    for outcome in &result.outcomes {
        let detail = match &outcome.outcome {
            BranchOutcome::AppliedCleanly => "applied cleanly".to_string(),
            BranchOutcome::AutoResolved { resolutions } => format!(
                "auto-resolved {}",
                resolutions
                    .iter()
                    .map(|r| format!("`{}` ({})", r.path, r.strategy.as_str()))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            BranchOutcome::AlreadyMerged => "already merged".to_string(),
            BranchOutcome::Escalated { paths } => format!("escalated: {}", paths.join(", ")),
            BranchOutcome::Skipped { halted_by, paths } => {
                format!("skipped, overlaps `{}` on {}", halted_by, paths.join(", "))
            }
            BranchOutcome::Failed { message } => format!("failed: {}", message),
            BranchOutcome::Cancelled => "cancelled".to_string(),
        };
        let _ = writeln!(out, "- `{}` ({}): {}", outcome.branch, outcome.agent_id, detail);
    }

    if !result.conflicts.is_empty() {
        let _ = writeln!(out, "\n## Escalations\n");
        for escalation in &result.conflicts {
            let _ = writeln!(out, "### `{}` ({})\n", escalation.branch, escalation.agent_id);
            for path in &escalation.paths {
                let _ = writeln!(
                    out,
                    "- `{}` ({}): ours `{}`, theirs `{}`",
                    path.path,
                    path.category.as_str(),
                    path.ours_ref,
                    path.theirs_ref
                );
            }
            let _ = writeln!(out);
        }
    }

    let _ = writeln!(
        out,
        "\n**Result**: {} ({} merged, {} new, {} escalated, {} skipped{})",
        if result.success { "success" } else { "incomplete" },
        result.merged.len(),
        result.newly_merged.len(),
        result.conflicts.len(),
        result.skipped.len(),
        if result.cancelled { ", cancelled" } else { "" }
    );
}

/// Full report; a dry run passes `None` for the result
pub fn render_report(
    project: &str,
    plan: &MergePlan,
    result: Option<&MergeResult>,
    at: DateTime<Utc>,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Merge Report: {}\n", project);
    let _ = writeln!(out, "Generated: {}", at.format("%Y-%m-%d %H:%M:%S UTC"));
    let _ = writeln!(
        out,
        "Mode: {}\n",
        if result.is_some() { "execute" } else { "dry run" }
    );
    render_plan(plan, &mut out);
    if let Some(result) = result {
        render_result(result, &mut out);
    }
    out
}

pub fn write_merge_report(
    coordination_dir: &Path,
    project: &str,
    plan: &MergePlan,
    result: Option<&MergeResult>,
    at: DateTime<Utc>,
) -> FileResult<PathBuf> {
    let content = render_report(project, plan, result, at);
    let path = write_report(coordination_dir, REPORT_KIND, at, &content)?;
    log::info!("[MergeOrchestrator] Report written to {:?}", path);
    Ok(path)
}
