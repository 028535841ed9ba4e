//! Merge orchestration
//!
//! Orders finished branches producers-first, integrates them one at a time
//! through a [`MergeBackend`], auto-resolves non-source conflicts and
//! escalates source conflicts without halting independent branches.

pub mod backend;
pub mod classify;
pub mod report;

pub use backend::{
    ConflictSides, GitMergeBackend, MemoryMergeBackend, MergeAttempt, MergeBackend, Resolution,
    SideContent,
};
pub use classify::{ConflictCategory, ResolutionStrategy};

use crate::models::BranchRecord;
use crate::planner::TaskGraph;
use crate::shutdown::CancellationState;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Integration branch name for a merge run, e.g. `merge/shop-20261018-101500`
pub fn integration_branch_name(prefix: &str, project: &str, timestamp: &str) -> String {
    format!("{}/{}-{}", prefix.trim_end_matches('/'), project, timestamp)
}

fn timestamp_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{8}-\d{6}$").expect("timestamp pattern is valid"))
}

/// Whether `name` is an integration branch of exactly this project.
/// `merge/shop-admin-…` is not a branch of project `shop`.
pub fn is_integration_branch(name: &str, prefix: &str, project: &str) -> bool {
    name.strip_prefix(&integration_branch_name(prefix, project, ""))
        .map_or(false, |timestamp| timestamp_regex().is_match(timestamp))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergePlanEntry {
    pub record: BranchRecord,
    /// Earliest-in-topological-order task the branch claims
    pub anchor_task: Option<String>,
    pub anchor_position: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictSeverity {
    Medium,
    High,
}

/// A path touched by more than one branch
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictedConflict {
    pub path: String,
    pub branches: Vec<String>,
    pub category: ConflictCategory,
    pub strategy: ResolutionStrategy,
    pub severity: ConflictSeverity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergePlan {
    pub integration_branch: String,
    pub entries: Vec<MergePlanEntry>,
    pub predicted_conflicts: Vec<PredictedConflict>,
    /// When false every conflict escalates regardless of category
    pub auto_resolve: bool,
}

impl MergePlan {
    pub fn with_auto_resolve(mut self, auto_resolve: bool) -> Self {
        self.auto_resolve = auto_resolve;
        self
    }

    pub fn branches(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.record.branch.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoResolution {
    pub path: String,
    pub category: ConflictCategory,
    pub strategy: ResolutionStrategy,
}

/// An escalated path with references to both sides
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscalatedPath {
    pub path: String,
    pub category: ConflictCategory,
    /// `<integration branch>:<path>`
    pub ours_ref: String,
    /// `<agent branch>:<path>`
    pub theirs_ref: String,
    pub sides: ConflictSides,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Escalation {
    pub branch: String,
    pub agent_id: String,
    pub paths: Vec<EscalatedPath>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BranchOutcome {
    AppliedCleanly,
    AutoResolved { resolutions: Vec<AutoResolution> },
    AlreadyMerged,
    Escalated { paths: Vec<String> },
    /// Overlaps paths of a branch that did not merge
    Skipped { halted_by: String, paths: Vec<String> },
    Failed { message: String },
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchMergeOutcome {
    pub branch: String,
    pub agent_id: String,
    #[serde(flatten)]
    pub outcome: BranchOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeResult {
    pub integration_branch: String,
    /// Every branch integrated after this run, including earlier runs
    pub merged: Vec<String>,
    /// Branches integrated by this run only
    pub newly_merged: Vec<String>,
    pub conflicts: Vec<Escalation>,
    pub skipped: Vec<String>,
    pub outcomes: Vec<BranchMergeOutcome>,
    pub cancelled: bool,
    pub success: bool,
}

/// Order branch records producers-first: by the topological position of the
/// earliest task each claims, then creation order, then name.
pub fn plan_merge(
    records: &[BranchRecord],
    graph: &TaskGraph,
    integration_branch: &str,
) -> MergePlan {
    let positions = graph.topological_positions();

    let mut entries: Vec<MergePlanEntry> = records
        .iter()
        .map(|record| {
            let anchor = record
                .claimed_tasks
                .iter()
                .filter_map(|id| positions.get(id.as_str()).map(|pos| (*pos, id.clone())))
                .min();
            MergePlanEntry {
                record: record.clone(),
                anchor_position: anchor.as_ref().map(|(pos, _)| *pos),
                anchor_task: anchor.map(|(_, id)| id),
            }
        })
        .collect();

    entries.sort_by(|a, b| {
        let key_a = (a.anchor_position.unwrap_or(usize::MAX), a.record.creation_order);
        let key_b = (b.anchor_position.unwrap_or(usize::MAX), b.record.creation_order);
        key_a.cmp(&key_b).then_with(|| a.record.branch.cmp(&b.record.branch))
    });

    let predicted_conflicts = predict_conflicts(&entries);
    log::info!(
        "[MergeOrchestrator] Planned {} branch(es) into {}, {} predicted conflict(s)",
        entries.len(),
        integration_branch,
        predicted_conflicts.len()
    );

    MergePlan {
        integration_branch: integration_branch.to_string(),
        entries,
        predicted_conflicts,
        auto_resolve: true,
    }
}

fn predict_conflicts(entries: &[MergePlanEntry]) -> Vec<PredictedConflict> {
    let mut touched: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    for entry in entries {
        for path in &entry.record.changed_files {
            touched
                .entry(path.as_str())
                .or_default()
                .push(entry.record.branch.clone());
        }
    }

    touched
        .into_iter()
        .filter(|(_, branches)| branches.len() > 1)
        .map(|(path, branches)| {
            let category = ConflictCategory::classify(path);
            PredictedConflict {
                path: path.to_string(),
                severity: if branches.len() > 2 {
                    ConflictSeverity::High
                } else {
                    ConflictSeverity::Medium
                },
                branches,
                category,
                strategy: category.strategy(),
            }
        })
        .collect()
}

/// Integrate every branch of the plan in order.
///
/// Already-integrated heads are reported as `AlreadyMerged`, so re-running a
/// plan never reapplies a branch. A source conflict aborts that branch's step
/// and skips later branches that touch any of its paths; everything else
/// keeps going. Cancellation is checked before each branch. A plan built for
/// a different integration branch than the backend's is refused.
pub fn execute_merge<B: MergeBackend>(
    plan: &MergePlan,
    backend: &mut B,
    cancel: &CancellationState,
) -> MergeResult {
    let mut result = MergeResult {
        integration_branch: plan.integration_branch.clone(),
        merged: Vec::new(),
        newly_merged: Vec::new(),
        conflicts: Vec::new(),
        skipped: Vec::new(),
        outcomes: Vec::new(),
        cancelled: false,
        success: false,
    };
    let mut halted: BTreeMap<String, String> = BTreeMap::new();
    let target_mismatch = (backend.integration_branch() != plan.integration_branch).then(|| {
        format!(
            "plan targets {} but the backend integrates into {}",
            plan.integration_branch,
            backend.integration_branch()
        )
    });

    for entry in &plan.entries {
        let record = &entry.record;
        let outcome = if cancel.is_cancelled() {
            result.cancelled = true;
            BranchOutcome::Cancelled
        } else if let Some(message) = &target_mismatch {
            log::warn!("[MergeOrchestrator] Not merging {}: {}", record.branch, message);
            BranchOutcome::Failed {
                message: message.clone(),
            }
        } else {
            merge_one(plan, backend, record, &halted, &mut result)
        };

        match &outcome {
            BranchOutcome::AppliedCleanly | BranchOutcome::AutoResolved { .. } => {
                result.merged.push(record.branch.clone());
                result.newly_merged.push(record.branch.clone());
            }
            BranchOutcome::AlreadyMerged => result.merged.push(record.branch.clone()),
            BranchOutcome::Escalated { .. } | BranchOutcome::Failed { .. } => {
                halt_paths(&mut halted, record);
            }
            BranchOutcome::Skipped { .. } => {
                result.skipped.push(record.branch.clone());
                halt_paths(&mut halted, record);
            }
            BranchOutcome::Cancelled => {}
        }

        result.outcomes.push(BranchMergeOutcome {
            branch: record.branch.clone(),
            agent_id: record.agent_id.clone(),
            outcome,
        });
    }

    result.success = !result.cancelled
        && result.conflicts.is_empty()
        && result.skipped.is_empty()
        && result
            .outcomes
            .iter()
            .all(|o| !matches!(o.outcome, BranchOutcome::Failed { .. }));

    log::info!(
        "[MergeOrchestrator] Merge into {} finished: {} merged ({} new), {} escalated, {} skipped{}",
        result.integration_branch,
        result.merged.len(),
        result.newly_merged.len(),
        result.conflicts.len(),
        result.skipped.len(),
        if result.cancelled { ", cancelled" } else { "" }
    );
    result
}

fn halt_paths(halted: &mut BTreeMap<String, String>, record: &BranchRecord) {
    for path in &record.changed_files {
        halted
            .entry(path.clone())
            .or_insert_with(|| record.branch.clone());
    }
}

fn merge_one<B: MergeBackend>(
    plan: &MergePlan,
    backend: &mut B,
    record: &BranchRecord,
    halted: &BTreeMap<String, String>,
    result: &mut MergeResult,
) -> BranchOutcome {
    match backend.is_merged(record) {
        Ok(true) => {
            log::info!("[MergeOrchestrator] {} already integrated, skipping", record.branch);
            return BranchOutcome::AlreadyMerged;
        }
        Ok(false) => {}
        Err(e) => return BranchOutcome::Failed { message: e.to_string() },
    }

    let overlapping: Vec<String> = record
        .changed_files
        .iter()
        .filter(|p| halted.contains_key(p.as_str()))
        .cloned()
        .collect();
    if let Some(first) = overlapping.first() {
        let halted_by = halted.get(first).cloned().unwrap_or_default();
        log::warn!(
            "[MergeOrchestrator] Skipping {}: overlaps halted branch {} on {:?}",
            record.branch,
            halted_by,
            overlapping
        );
        return BranchOutcome::Skipped {
            halted_by,
            paths: overlapping,
        };
    }

    let conflicts = match backend.merge(record) {
        Ok(MergeAttempt::Clean) => Vec::new(),
        Ok(MergeAttempt::Conflicted(conflicts)) => conflicts,
        Err(e) => return fail(backend, record, e.to_string()),
    };

    let mut resolutions = Vec::new();
    let mut escalated = Vec::new();
    for sides in conflicts {
        let category = ConflictCategory::classify(&sides.path);
        let strategy = if plan.auto_resolve {
            category.strategy()
        } else {
            ResolutionStrategy::Escalate
        };

        match strategy.apply(&sides) {
            Some(resolution) => {
                if let Err(e) = backend.resolve(&sides.path, &resolution) {
                    return fail(backend, record, e.to_string());
                }
                log::info!(
                    "[MergeOrchestrator] Auto-resolved {} in {} ({})",
                    sides.path,
                    record.branch,
                    strategy.as_str()
                );
                resolutions.push(AutoResolution {
                    path: sides.path,
                    category,
                    strategy,
                });
            }
            None => escalated.push(EscalatedPath {
                ours_ref: format!("{}:{}", plan.integration_branch, sides.path),
                theirs_ref: format!("{}:{}", record.branch, sides.path),
                path: sides.path.clone(),
                category,
                sides,
            }),
        }
    }

    if !escalated.is_empty() {
        if let Err(e) = backend.abort() {
            log::warn!("[MergeOrchestrator] Abort after escalation failed: {}", e);
        }
        let paths: Vec<String> = escalated.iter().map(|p| p.path.clone()).collect();
        log::warn!(
            "[MergeOrchestrator] {}",
            crate::error::SwarmError::MergeConflict {
                branch: record.branch.clone(),
                paths: paths.clone(),
            }
        );
        result.conflicts.push(Escalation {
            branch: record.branch.clone(),
            agent_id: record.agent_id.clone(),
            paths: escalated,
        });
        return BranchOutcome::Escalated { paths };
    }

    if let Err(e) = backend.commit(record) {
        return fail(backend, record, e.to_string());
    }
    log::info!("[MergeOrchestrator] Merged {}", record.branch);

    if resolutions.is_empty() {
        BranchOutcome::AppliedCleanly
    } else {
        BranchOutcome::AutoResolved { resolutions }
    }
}

fn fail<B: MergeBackend>(backend: &mut B, record: &BranchRecord, message: String) -> BranchOutcome {
    log::warn!("[MergeOrchestrator] Merge of {} failed: {}", record.branch, message);
    if let Err(e) = backend.abort() {
        log::warn!("[MergeOrchestrator] Abort failed: {}", e);
    }
    BranchOutcome::Failed { message }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::graph::tests::task;

    fn graph() -> TaskGraph {
        TaskGraph::from_tasks(vec![task("A", &[]), task("B", &["A"]), task("C", &["A"])]).unwrap()
    }

    fn backend() -> MemoryMergeBackend {
        MemoryMergeBackend::new(
            "merge/shop-1",
            [("README.md", "# Shop\n"), ("src/lib.rs", "pub fn lib() {}\n")],
        )
    }

    #[test]
    fn test_plan_orders_producers_first() {
        let mut backend = backend();
        backend.add_branch("b-downstream", [("src/b.rs", "b")]);
        backend.add_branch("a-upstream", [("src/a.rs", "a")]);
        backend.add_branch("no-claims", [("src/x.rs", "x")]);
        let records = vec![
            backend.record("agent-1", "b-downstream", &["B"], 0),
            backend.record("agent-3", "no-claims", &[], 1),
            backend.record("agent-2", "a-upstream", &["C", "A"], 2),
        ];

        let plan = plan_merge(&records, &graph(), "merge/shop-1");
        assert_eq!(plan.branches(), vec!["a-upstream", "b-downstream", "no-claims"]);
        assert_eq!(plan.entries[0].anchor_task.as_deref(), Some("A"));
        assert_eq!(plan.entries[2].anchor_position, None);
    }

    #[test]
    fn test_plan_ties_break_on_creation_order() {
        let mut backend = backend();
        backend.add_branch("second", [("src/b.rs", "b")]);
        backend.add_branch("first", [("src/c.rs", "c")]);
        let records = vec![
            backend.record("agent-2", "second", &["A"], 1),
            backend.record("agent-1", "first", &["A"], 0),
        ];
        let plan = plan_merge(&records, &graph(), "merge/shop-1");
        assert_eq!(plan.branches(), vec!["first", "second"]);
    }

    #[test]
    fn test_predicted_conflict_severity() {
        let mut backend = backend();
        for name in ["x", "y", "z"] {
            backend.add_branch(name, [("README.md", name)]);
        }
        backend.add_branch("w", [("src/w.rs", "w"), ("README.md", "w")]);
        let records: Vec<BranchRecord> = ["x", "y"]
            .iter()
            .enumerate()
            .map(|(i, b)| backend.record("agent", b, &[], i))
            .collect();
        let plan = plan_merge(&records, &graph(), "merge/shop-1");
        assert_eq!(plan.predicted_conflicts.len(), 1);
        assert_eq!(plan.predicted_conflicts[0].severity, ConflictSeverity::Medium);
        assert_eq!(plan.predicted_conflicts[0].category, ConflictCategory::Documentation);

        let records: Vec<BranchRecord> = ["x", "y", "z", "w"]
            .iter()
            .enumerate()
            .map(|(i, b)| backend.record("agent", b, &[], i))
            .collect();
        let plan = plan_merge(&records, &graph(), "merge/shop-1");
        assert_eq!(plan.predicted_conflicts[0].severity, ConflictSeverity::High);
    }

    #[test]
    fn test_documentation_conflict_auto_resolves() {
        let mut backend = backend();
        backend.add_branch("agent-1", [("README.md", "# Shop\n## Auth\n")]);
        backend.add_branch("agent-2", [("README.md", "# Shop\n## Cart\n")]);
        let records = vec![
            backend.record("agent-1", "agent-1", &["A"], 0),
            backend.record("agent-2", "agent-2", &["B"], 1),
        ];
        let plan = plan_merge(&records, &graph(), "merge/shop-1");
        let result = execute_merge(&plan, &mut backend, &CancellationState::new());

        assert!(result.success);
        assert_eq!(result.newly_merged, vec!["agent-1", "agent-2"]);
        assert!(matches!(
            result.outcomes[1].outcome,
            BranchOutcome::AutoResolved { .. }
        ));
        assert_eq!(backend.file("README.md"), Some("# Shop\n## Auth\n## Cart\n"));
    }

    #[test]
    fn test_auto_resolve_disabled_escalates_docs() {
        let mut backend = backend();
        backend.add_branch("agent-1", [("README.md", "one\n")]);
        backend.add_branch("agent-2", [("README.md", "two\n")]);
        let records = vec![
            backend.record("agent-1", "agent-1", &["A"], 0),
            backend.record("agent-2", "agent-2", &["B"], 1),
        ];
        let plan = plan_merge(&records, &graph(), "merge/shop-1").with_auto_resolve(false);
        let result = execute_merge(&plan, &mut backend, &CancellationState::new());
        assert!(!result.success);
        assert_eq!(result.conflicts.len(), 1);
    }

    #[test]
    fn test_source_conflict_escalates_and_independent_branch_merges() {
        let mut backend = backend();
        backend.add_branch("agent-1", [("src/lib.rs", "pub fn lib() { one() }\n")]);
        backend.add_branch("agent-2", [("src/lib.rs", "pub fn lib() { two() }\n")]);
        backend.add_branch("agent-3", [("src/other.rs", "pub fn other() {}\n")]);
        let records = vec![
            backend.record("agent-1", "agent-1", &["A"], 0),
            backend.record("agent-2", "agent-2", &["B"], 1),
            backend.record("agent-3", "agent-3", &["C"], 2),
        ];
        let plan = plan_merge(&records, &graph(), "merge/shop-1");
        let result = execute_merge(&plan, &mut backend, &CancellationState::new());

        assert!(!result.success);
        assert_eq!(result.merged, vec!["agent-1", "agent-3"]);
        assert_eq!(result.conflicts.len(), 1);
        let escalation = &result.conflicts[0];
        assert_eq!(escalation.branch, "agent-2");
        assert_eq!(escalation.paths[0].category, ConflictCategory::Source);
        assert_eq!(escalation.paths[0].ours_ref, "merge/shop-1:src/lib.rs");
        assert_eq!(escalation.paths[0].theirs_ref, "agent-2:src/lib.rs");
        assert_eq!(
            escalation.paths[0].sides.theirs_text(),
            Some("pub fn lib() { two() }\n")
        );
        // Integration keeps the first writer; the escalated step left no trace
        assert_eq!(backend.file("src/lib.rs"), Some("pub fn lib() { one() }\n"));
        assert!(backend.file("src/other.rs").is_some());
    }

    #[test]
    fn test_branch_overlapping_halted_paths_is_skipped() {
        let mut backend = backend();
        backend.add_branch("agent-1", [("src/lib.rs", "one\n")]);
        backend.add_branch("agent-2", [("src/lib.rs", "two\n")]);
        backend.add_branch("agent-3", [("src/lib.rs", "one\n"), ("src/c.rs", "c")]);
        let records = vec![
            backend.record("agent-1", "agent-1", &["A"], 0),
            backend.record("agent-2", "agent-2", &["B"], 1),
            backend.record("agent-3", "agent-3", &["C"], 2),
        ];
        let plan = plan_merge(&records, &graph(), "merge/shop-1");
        let result = execute_merge(&plan, &mut backend, &CancellationState::new());

        assert_eq!(result.skipped, vec!["agent-3"]);
        assert_eq!(
            result.outcomes[2].outcome,
            BranchOutcome::Skipped {
                halted_by: "agent-2".to_string(),
                paths: vec!["src/lib.rs".to_string()],
            }
        );
    }

    #[test]
    fn test_execute_merge_is_idempotent() {
        let mut backend = backend();
        backend.add_branch("agent-1", [("src/lib.rs", "one\n")]);
        backend.add_branch("agent-2", [("src/lib.rs", "two\n")]);
        backend.add_branch("agent-3", [("docs/c.md", "c\n")]);
        let records = vec![
            backend.record("agent-1", "agent-1", &["A"], 0),
            backend.record("agent-2", "agent-2", &["B"], 1),
            backend.record("agent-3", "agent-3", &["C"], 2),
        ];
        let plan = plan_merge(&records, &graph(), "merge/shop-1");
        let cancel = CancellationState::new();

        let first = execute_merge(&plan, &mut backend, &cancel);
        let second = execute_merge(&plan, &mut backend, &cancel);
        let third = execute_merge(&plan, &mut backend, &cancel);

        assert_eq!(first.newly_merged, vec!["agent-1", "agent-3"]);
        assert!(second.newly_merged.is_empty());
        assert_eq!(second.merged, first.merged);
        assert_eq!(second.conflicts, first.conflicts);
        assert_eq!(second, third);
        assert_eq!(backend.merged_heads().len(), 2);
    }

    #[test]
    fn test_cancellation_stops_before_next_branch() {
        let mut backend = backend();
        backend.add_branch("agent-1", [("src/a.rs", "a")]);
        let records = vec![backend.record("agent-1", "agent-1", &["A"], 0)];
        let plan = plan_merge(&records, &graph(), "merge/shop-1");

        let cancel = CancellationState::new();
        cancel.cancel();
        let result = execute_merge(&plan, &mut backend, &cancel);
        assert!(result.cancelled);
        assert!(!result.success);
        assert!(result.merged.is_empty());
        assert_eq!(result.outcomes[0].outcome, BranchOutcome::Cancelled);
    }

    #[test]
    fn test_unknown_branch_fails_without_stopping_others() {
        let mut backend = backend();
        backend.add_branch("agent-2", [("src/b.rs", "b")]);
        let mut ghost = backend.record("agent-1", "ghost", &["A"], 0);
        ghost.changed_files.insert("src/ghost.rs".to_string());
        let records = vec![ghost, backend.record("agent-2", "agent-2", &["B"], 1)];
        let plan = plan_merge(&records, &graph(), "merge/shop-1");
        let result = execute_merge(&plan, &mut backend, &CancellationState::new());

        assert!(matches!(result.outcomes[0].outcome, BranchOutcome::Failed { .. }));
        assert_eq!(result.merged, vec!["agent-2"]);
        assert!(!result.success);
    }

    #[test]
    fn test_plan_for_another_branch_is_refused() {
        let mut backend = backend();
        backend.add_branch("agent-1", [("src/a.rs", "a")]);
        let records = vec![backend.record("agent-1", "agent-1", &["A"], 0)];
        let plan = plan_merge(&records, &graph(), "merge/other-1");
        let result = execute_merge(&plan, &mut backend, &CancellationState::new());

        assert!(!result.success);
        assert!(result.merged.is_empty());
        assert!(matches!(
            &result.outcomes[0].outcome,
            BranchOutcome::Failed { message } if message.contains("merge/other-1")
        ));
        assert!(backend.file("src/a.rs").is_none());
    }

    #[test]
    fn test_integration_branch_name() {
        assert_eq!(
            integration_branch_name("merge/", "shop", "20261018-101500"),
            "merge/shop-20261018-101500"
        );
    }

    #[test]
    fn test_integration_branch_ignores_sibling_projects() {
        assert!(is_integration_branch("merge/shop-20261018-101500", "merge", "shop"));
        assert!(is_integration_branch("merge/shop-20261018-101500", "merge/", "shop"));
        assert!(!is_integration_branch("merge/shop-admin-20261018-101500", "merge", "shop"));
        assert!(!is_integration_branch("merge/shop-20261018", "merge", "shop"));
        assert!(!is_integration_branch("release/shop-20261018-101500", "merge", "shop"));
    }
}
