//! Task graph stored as an arena of tasks indexed by position.
//!
//! Edges are kept as index sets in both directions (`deps` and
//! `dependents`). Structure is fixed once built; only task status changes.

use crate::error::{SwarmError, SwarmResult};
use crate::models::{Task, TaskStatus};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

#[derive(Debug, Clone)]
pub struct TaskGraph {
    tasks: Vec<Task>,
    index: HashMap<String, usize>,
    deps: Vec<BTreeSet<usize>>,
    dependents: Vec<BTreeSet<usize>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// Pure projection of the graph for reporting
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlanSummary {
    pub total_tasks: usize,
    pub total_estimated_minutes: u64,
    pub by_status: BTreeMap<String, usize>,
    pub by_category: BTreeMap<String, usize>,
    pub by_complexity: BTreeMap<String, usize>,
    pub dependency_count: usize,
    pub inferred_dependency_count: usize,
    pub layer_count: usize,
}

/// Structural statistics
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GraphStats {
    pub root_tasks: Vec<String>,
    pub leaf_tasks: Vec<String>,
    pub max_depth: usize,
    pub total_dependencies: usize,
}

impl TaskGraph {
    /// Build the arena and validate it: unknown ids are a parse error,
    /// self-references and cycles are a cycle error.
    pub fn from_tasks(tasks: Vec<Task>) -> SwarmResult<Self> {
        let mut index = HashMap::with_capacity(tasks.len());
        for (i, task) in tasks.iter().enumerate() {
            if index.insert(task.id.clone(), i).is_some() {
                return Err(SwarmError::parse(
                    task.id.clone(),
                    "duplicate task id".to_string(),
                ));
            }
        }

        let mut deps = vec![BTreeSet::new(); tasks.len()];
        let mut dependents = vec![BTreeSet::new(); tasks.len()];

        for (i, task) in tasks.iter().enumerate() {
            for dep_id in task.dependency_ids() {
                let Some(&j) = index.get(dep_id) else {
                    return Err(SwarmError::parse(
                        task.id.clone(),
                        format!("depends on unknown task '{}'", dep_id),
                    ));
                };
                if i == j {
                    return Err(SwarmError::Cycle {
                        path: vec![task.id.clone(), task.id.clone()],
                    });
                }
                deps[i].insert(j);
                dependents[j].insert(i);
            }
        }

        let graph = Self {
            tasks,
            index,
            deps,
            dependents,
        };

        if let Some(path) = graph.find_cycle() {
            return Err(SwarmError::Cycle { path });
        }

        Ok(graph)
    }

    /// Three-color DFS; returns the first back-edge as a closed path
    fn find_cycle(&self) -> Option<Vec<String>> {
        let mut color = vec![Color::White; self.tasks.len()];
        let mut stack = Vec::new();

        for start in 0..self.tasks.len() {
            if color[start] == Color::White {
                if let Some(cycle) = self.visit(start, &mut color, &mut stack) {
                    return Some(cycle.into_iter().map(|i| self.tasks[i].id.clone()).collect());
                }
            }
        }
        None
    }

    fn visit(
        &self,
        node: usize,
        color: &mut [Color],
        stack: &mut Vec<usize>,
    ) -> Option<Vec<usize>> {
        color[node] = Color::Gray;
        stack.push(node);

        for &next in &self.deps[node] {
            match color[next] {
                Color::Gray => {
                    let start = stack.iter().position(|&n| n == next).unwrap_or(0);
                    let mut cycle = stack[start..].to_vec();
                    cycle.push(next);
                    return Some(cycle);
                }
                Color::White => {
                    if let Some(cycle) = self.visit(next, color, stack) {
                        return Some(cycle);
                    }
                }
                Color::Black => {}
            }
        }

        stack.pop();
        color[node] = Color::Black;
        None
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.index.get(id).map(|&i| &self.tasks[i])
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn task_at(&self, idx: usize) -> &Task {
        &self.tasks[idx]
    }

    /// Kahn's algorithm; ties resolved by insertion order so the result is stable
    pub fn topological_order(&self) -> Vec<usize> {
        let mut in_degree: Vec<usize> = self.deps.iter().map(|d| d.len()).collect();
        let mut queue: BTreeSet<usize> = (0..self.tasks.len())
            .filter(|&i| in_degree[i] == 0)
            .collect();
        let mut order = Vec::with_capacity(self.tasks.len());

        while let Some(node) = queue.pop_first() {
            order.push(node);
            for &dependent in &self.dependents[node] {
                in_degree[dependent] -= 1;
                if in_degree[dependent] == 0 {
                    queue.insert(dependent);
                }
            }
        }

        order
    }

    /// Topological position of each task id (0 = first)
    pub fn topological_positions(&self) -> HashMap<&str, usize> {
        self.topological_order()
            .into_iter()
            .enumerate()
            .map(|(pos, idx)| (self.tasks[idx].id.as_str(), pos))
            .collect()
    }

    /// Layer 0 holds tasks without dependencies; layer k holds tasks whose
    /// dependencies all sit in layers below k.
    pub fn layers(&self) -> Vec<Vec<usize>> {
        self.layers_of(&(0..self.tasks.len()).collect())
    }

    /// Layering restricted to a subset; dependencies outside the subset
    /// count as satisfied.
    pub fn layers_of(&self, subset: &BTreeSet<usize>) -> Vec<Vec<usize>> {
        let mut depth: HashMap<usize, usize> = HashMap::new();
        let mut layers: Vec<Vec<usize>> = Vec::new();

        for idx in self.topological_order() {
            if !subset.contains(&idx) {
                continue;
            }
            let level = self.deps[idx]
                .iter()
                .filter_map(|d| depth.get(d))
                .map(|d| d + 1)
                .max()
                .unwrap_or(0);
            depth.insert(idx, level);
            if layers.len() <= level {
                layers.resize_with(level + 1, Vec::new);
            }
            layers[level].push(idx);
        }

        layers
    }

    /// A task is ready iff every dependency is done
    pub fn is_ready(&self, id: &str) -> bool {
        match self.index.get(id) {
            Some(&i) => self.deps[i]
                .iter()
                .all(|&d| self.tasks[d].status == TaskStatus::Done),
            None => false,
        }
    }

    /// Promote pending tasks whose dependencies are all done; returns promoted ids
    pub fn refresh_readiness(&mut self) -> Vec<String> {
        let mut promoted = Vec::new();
        for i in 0..self.tasks.len() {
            if self.tasks[i].status != TaskStatus::Pending {
                continue;
            }
            let ready = self.deps[i]
                .iter()
                .all(|&d| self.tasks[d].status == TaskStatus::Done);
            if ready {
                self.tasks[i].status = TaskStatus::Ready;
                promoted.push(self.tasks[i].id.clone());
            }
        }
        promoted
    }

    pub fn set_status(&mut self, id: &str, status: TaskStatus) -> bool {
        match self.index.get(id) {
            Some(&i) => {
                self.tasks[i].status = status;
                true
            }
            None => false,
        }
    }

    /// Ids of tasks not yet done
    pub fn unfinished(&self) -> Vec<String> {
        self.tasks
            .iter()
            .filter(|t| t.status != TaskStatus::Done)
            .map(|t| t.id.clone())
            .collect()
    }

    pub fn get_summary(&self) -> PlanSummary {
        let mut by_status = BTreeMap::new();
        let mut by_category = BTreeMap::new();
        let mut by_complexity = BTreeMap::new();

        for task in &self.tasks {
            *by_status.entry(task.status.as_str().to_string()).or_insert(0) += 1;
            *by_category.entry(task.category.clone()).or_insert(0) += 1;
            *by_complexity
                .entry(task.complexity.as_str().to_string())
                .or_insert(0) += 1;
        }

        PlanSummary {
            total_tasks: self.tasks.len(),
            total_estimated_minutes: self
                .tasks
                .iter()
                .map(|t| t.estimated_minutes as u64)
                .sum(),
            by_status,
            by_category,
            by_complexity,
            dependency_count: self.deps.iter().map(|d| d.len()).sum(),
            inferred_dependency_count: self
                .tasks
                .iter()
                .flat_map(|t| &t.dependencies)
                .filter(|d| d.reason.is_heuristic())
                .count(),
            layer_count: self.layers().len(),
        }
    }

    pub fn stats(&self) -> GraphStats {
        let ids = |pred: &dyn Fn(usize) -> bool| -> Vec<String> {
            (0..self.tasks.len())
                .filter(|&i| pred(i))
                .map(|i| self.tasks[i].id.clone())
                .collect()
        };

        GraphStats {
            root_tasks: ids(&|i| self.deps[i].is_empty()),
            leaf_tasks: ids(&|i| self.dependents[i].is_empty()),
            max_depth: self.layers().len(),
            total_dependencies: self.deps.iter().map(|d| d.len()).sum(),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::{Complexity, Dependency, InferenceReason, Priority};

    pub(crate) fn task(id: &str, deps: &[&str]) -> Task {
        Task {
            id: id.to_string(),
            description: format!("Task {}", id),
            category: "general".to_string(),
            complexity: Complexity::Medium,
            estimated_minutes: 90,
            dependencies: deps
                .iter()
                .map(|d| Dependency {
                    task_id: d.to_string(),
                    reason: InferenceReason::Declared,
                })
                .collect(),
            status: TaskStatus::Pending,
            priority: Priority::Normal,
            required_skills: vec![],
        }
    }

    fn ids(graph: &TaskGraph, idxs: &[usize]) -> Vec<String> {
        idxs.iter().map(|&i| graph.task_at(i).id.clone()).collect()
    }

    #[test]
    fn test_topological_order() {
        let graph =
            TaskGraph::from_tasks(vec![task("C", &["B"]), task("B", &["A"]), task("A", &[])])
                .unwrap();
        let order = graph.topological_order();
        assert_eq!(ids(&graph, &order), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_cycle_reports_path() {
        let result = TaskGraph::from_tasks(vec![
            task("A", &["B"]),
            task("B", &["C"]),
            task("C", &["A"]),
        ]);
        match result {
            Err(SwarmError::Cycle { path }) => {
                assert_eq!(path, vec!["A", "B", "C", "A"]);
            }
            other => panic!("expected cycle error, got {:?}", other),
        }
    }

    #[test]
    fn test_self_dependency_is_cycle() {
        let result = TaskGraph::from_tasks(vec![task("A", &["A"])]);
        assert!(matches!(result, Err(SwarmError::Cycle { .. })));
    }

    #[test]
    fn test_unknown_dependency_is_parse_error() {
        let result = TaskGraph::from_tasks(vec![task("A", &["ghost"])]);
        assert!(matches!(result, Err(SwarmError::Parse { .. })));
    }

    #[test]
    fn test_duplicate_id_is_parse_error() {
        let result = TaskGraph::from_tasks(vec![task("A", &[]), task("A", &[])]);
        assert!(matches!(result, Err(SwarmError::Parse { .. })));
    }

    #[test]
    fn test_layers() {
        let graph = TaskGraph::from_tasks(vec![
            task("A", &[]),
            task("B", &["A"]),
            task("C", &["A"]),
            task("D", &["B", "C"]),
        ])
        .unwrap();
        let layers: Vec<Vec<String>> = graph.layers().iter().map(|l| ids(&graph, l)).collect();
        assert_eq!(layers, vec![vec!["A"], vec!["B", "C"], vec!["D"]]);
    }

    #[test]
    fn test_layers_of_subset_treats_outside_deps_as_satisfied() {
        let graph = TaskGraph::from_tasks(vec![
            task("A", &[]),
            task("B", &["A"]),
            task("C", &["B"]),
        ])
        .unwrap();
        let subset: BTreeSet<usize> = [1, 2].into_iter().collect();
        let layers: Vec<Vec<String>> = graph
            .layers_of(&subset)
            .iter()
            .map(|l| ids(&graph, l))
            .collect();
        assert_eq!(layers, vec![vec!["B"], vec!["C"]]);
    }

    #[test]
    fn test_readiness_follows_done() {
        let mut graph =
            TaskGraph::from_tasks(vec![task("A", &[]), task("B", &["A"])]).unwrap();
        assert!(graph.is_ready("A"));
        assert!(!graph.is_ready("B"));

        assert_eq!(graph.refresh_readiness(), vec!["A".to_string()]);
        assert_eq!(graph.task("B").unwrap().status, TaskStatus::Pending);

        graph.set_status("A", TaskStatus::Done);
        assert_eq!(graph.refresh_readiness(), vec!["B".to_string()]);
    }

    #[test]
    fn test_summary_is_pure() {
        let graph = TaskGraph::from_tasks(vec![task("A", &[]), task("B", &["A"])]).unwrap();
        let first = graph.get_summary();
        let second = graph.get_summary();
        assert_eq!(first, second);
        assert_eq!(first.total_tasks, 2);
        assert_eq!(first.total_estimated_minutes, 180);
        assert_eq!(first.by_category.get("general"), Some(&2));
        assert_eq!(first.dependency_count, 1);
        assert_eq!(first.layer_count, 2);
    }

    #[test]
    fn test_stats() {
        let graph = TaskGraph::from_tasks(vec![
            task("A", &[]),
            task("B", &["A"]),
            task("C", &["B"]),
        ])
        .unwrap();
        let stats = graph.stats();
        assert_eq!(stats.root_tasks, vec!["A"]);
        assert_eq!(stats.leaf_tasks, vec!["C"]);
        assert_eq!(stats.max_depth, 3);
    }
}
