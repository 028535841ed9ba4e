//! Task Graph & Planner
//!
//! Turns a normalized requirement set into a validated DAG of tasks with
//! complexity and duration estimates. The planner performs no I/O; plan
//! persistence lives in `file_storage::plan`.

pub mod estimate;
pub mod graph;
pub mod inference;

pub use graph::{GraphStats, PlanSummary, TaskGraph};

use crate::config::PlannerConfig;
use crate::error::{SwarmError, SwarmResult};
use crate::models::{Task, TaskStatus};
use crate::parsers::RequirementSet;
use estimate::Estimator;
use inference::{infer_dependencies, DraftTask};

pub struct TaskPlanner {
    policy: PlannerConfig,
}

impl TaskPlanner {
    pub fn new(policy: PlannerConfig) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &PlannerConfig {
        &self.policy
    }

    /// Build the task graph. Fails with `Parse` when the input has no usable
    /// items and with `Cycle` when the dependency edges are cyclic.
    pub fn analyze(&self, requirements: &RequirementSet) -> SwarmResult<TaskGraph> {
        if requirements.items.is_empty() {
            return Err(SwarmError::parse(
                requirements.title.clone(),
                "no requirement items found",
            ));
        }

        let estimator = Estimator::new(&self.policy);
        let mut drafts = Vec::with_capacity(requirements.items.len());

        for (idx, item) in requirements.items.iter().enumerate() {
            if item.description.trim().is_empty() {
                return Err(SwarmError::parse(
                    item.location(idx),
                    "requirement has an empty description",
                ));
            }
            let id = item
                .id
                .clone()
                .unwrap_or_else(|| format!("TASK-{:04}", idx + 1));
            drafts.push(DraftTask {
                id,
                description: item.description.trim().to_string(),
                category: item.category.trim().to_lowercase(),
                declared: item.dependencies.clone(),
            });
        }

        let edges = infer_dependencies(&drafts, self.policy.infer_dependencies)?;

        let tasks: Vec<Task> = drafts
            .into_iter()
            .zip(edges)
            .zip(&requirements.items)
            .map(|((draft, dependencies), item)| {
                let complexity = item
                    .complexity
                    .unwrap_or_else(|| estimator.complexity(&draft.description));
                Task {
                    estimated_minutes: item
                        .estimated_minutes
                        .unwrap_or_else(|| estimator.duration(complexity)),
                    required_skills: estimator.required_skills(&draft.description),
                    id: draft.id,
                    description: draft.description,
                    category: draft.category,
                    complexity,
                    dependencies,
                    status: TaskStatus::Pending,
                    priority: item.priority,
                }
            })
            .collect();

        for task in &tasks {
            for dep in task.dependencies.iter().filter(|d| d.reason.is_heuristic()) {
                log::debug!(
                    "[Planner] {} depends on {} ({})",
                    task.id,
                    dep.task_id,
                    dep.reason.describe()
                );
            }
        }

        let mut graph = TaskGraph::from_tasks(tasks).map_err(|e| {
            log::warn!("[Planner] Rejected plan: {}", e);
            e
        })?;
        graph.refresh_readiness();

        let summary = graph.get_summary();
        log::info!(
            "[Planner] Planned {} tasks, {} dependencies ({} inferred), {} min estimated",
            summary.total_tasks,
            summary.dependency_count,
            summary.inferred_dependency_count,
            summary.total_estimated_minutes
        );

        Ok(graph)
    }
}

impl Default for TaskPlanner {
    fn default() -> Self {
        Self::new(PlannerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Complexity, InferenceReason};
    use crate::parsers::RequirementItem;

    fn requirements(items: Vec<RequirementItem>) -> RequirementSet {
        RequirementSet::new("Test").with_items(items)
    }

    #[test]
    fn test_analyze_assigns_ids_and_estimates() {
        let planner = TaskPlanner::default();
        let graph = planner
            .analyze(&requirements(vec![
                RequirementItem::new("Fix login redirect", "backend"),
                RequirementItem::new("Refactor billing module", "backend"),
            ]))
            .unwrap();

        let first = graph.task("TASK-0001").unwrap();
        assert_eq!(first.complexity, Complexity::Low);
        assert_eq!(first.estimated_minutes, 30);
        assert_eq!(first.status, TaskStatus::Ready);

        let second = graph.task("TASK-0002").unwrap();
        assert_eq!(second.complexity, Complexity::High);
        assert_eq!(second.estimated_minutes, 180);
    }

    #[test]
    fn test_explicit_values_win() {
        let planner = TaskPlanner::default();
        let graph = planner
            .analyze(&requirements(vec![RequirementItem::new("Fix typo", "docs")
                .with_id("DOC-1")
                .with_complexity(Complexity::Critical)
                .with_estimated_minutes(5)]))
            .unwrap();
        let task = graph.task("DOC-1").unwrap();
        assert_eq!(task.complexity, Complexity::Critical);
        assert_eq!(task.estimated_minutes, 5);
    }

    #[test]
    fn test_empty_requirements_is_parse_error() {
        let planner = TaskPlanner::default();
        let result = planner.analyze(&requirements(vec![]));
        assert!(matches!(result, Err(SwarmError::Parse { .. })));
    }

    #[test]
    fn test_blank_item_reports_location() {
        let planner = TaskPlanner::default();
        let result = planner.analyze(&requirements(vec![
            RequirementItem::new("Build API", "backend"),
            RequirementItem::new("   ", "backend").at_line(7),
        ]));
        match result {
            Err(SwarmError::Parse { item, .. }) => assert_eq!(item, "line 7"),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_cycle_fails_analyze() {
        let planner = TaskPlanner::default();
        let result = planner.analyze(&requirements(vec![
            RequirementItem::new("First", "general")
                .with_id("A")
                .with_dependencies(vec!["B".into()]),
            RequirementItem::new("Second", "general")
                .with_id("B")
                .with_dependencies(vec!["A".into()]),
        ]));
        match result {
            Err(SwarmError::Cycle { path }) => assert_eq!(path, vec!["A", "B", "A"]),
            other => panic!("expected cycle error, got {:?}", other),
        }
    }

    #[test]
    fn test_planning_is_reproducible() {
        let planner = TaskPlanner::default();
        let input = requirements(vec![
            RequirementItem::new("Create order model", "backend"),
            RequirementItem::new("Build order API", "backend"),
            RequirementItem::new("Integration tests", "testing"),
        ]);
        let a = planner.analyze(&input).unwrap();
        let b = planner.analyze(&input).unwrap();
        assert_eq!(a.tasks(), b.tasks());

        let api = a.task("TASK-0002").unwrap();
        assert!(matches!(
            api.dependencies[0].reason,
            InferenceReason::SubjectMatch { .. }
        ));
    }
}
