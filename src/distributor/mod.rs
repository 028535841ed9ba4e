//! Task Distributor
//!
//! Assigns tasks to agent slots layer by layer. Inside a layer tasks are
//! ordered by complexity (descending), then category, then plan position,
//! and each goes to the agent with the least cumulative estimated minutes
//! (longest-processing-time-first list scheduling). The result is an
//! initial ordering only; runtime readiness comes from the protocol.

pub mod instructions;

use crate::error::{SwarmError, SwarmResult};
use crate::planner::TaskGraph;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};

pub fn agent_id(n: usize) -> String {
    format!("agent-{}", n)
}

/// One agent's ordered queue
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AgentQueue {
    pub agent_id: String,
    pub tasks: Vec<String>,
    pub total_minutes: u64,
    pub complexity_score: u32,
}

/// agent id -> ordered task ids, in agent order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub agents: Vec<AgentQueue>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DistributionSummary {
    pub total_tasks: usize,
    pub total_minutes: u64,
    /// Estimated makespan: the busiest agent's minutes
    pub max_agent_minutes: u64,
    pub agents: Vec<AgentQueue>,
}

impl Assignment {
    pub fn tasks_for(&self, agent_id: &str) -> Option<&[String]> {
        self.agents
            .iter()
            .find(|q| q.agent_id == agent_id)
            .map(|q| q.tasks.as_slice())
    }

    pub fn agent_for(&self, task_id: &str) -> Option<&str> {
        self.agents
            .iter()
            .find(|q| q.tasks.iter().any(|t| t == task_id))
            .map(|q| q.agent_id.as_str())
    }

    pub fn total_tasks(&self) -> usize {
        self.agents.iter().map(|q| q.tasks.len()).sum()
    }

    pub fn summary(&self) -> DistributionSummary {
        DistributionSummary {
            total_tasks: self.total_tasks(),
            total_minutes: self.agents.iter().map(|q| q.total_minutes).sum(),
            max_agent_minutes: self
                .agents
                .iter()
                .map(|q| q.total_minutes)
                .max()
                .unwrap_or(0),
            agents: self.agents.clone(),
        }
    }
}

struct Slot {
    queue: AgentQueue,
    /// Minutes already committed before this run plus minutes assigned now
    load: u64,
}

/// Initial distribution over `agent_count` fresh agents
pub fn distribute(graph: &TaskGraph, agent_count: usize) -> SwarmResult<Assignment> {
    if agent_count == 0 {
        return Err(SwarmError::Infeasible(
            "agent count must be at least 1".to_string(),
        ));
    }
    if graph.is_empty() {
        return Err(SwarmError::Infeasible("task graph is empty".to_string()));
    }

    let slots = (1..=agent_count)
        .map(|n| new_slot(agent_id(n), 0))
        .collect();
    let assignment = schedule(graph, graph.layers(), slots);

    log::info!(
        "[Distributor] Distributed {} tasks across {} agents",
        assignment.total_tasks(),
        agent_count
    );
    Ok(assignment)
}

/// Re-run the same procedure over freed tasks and surviving agents.
/// Dependencies outside `pool` count as satisfied; `existing_loads` seeds
/// each survivor's cumulative minutes.
pub fn redistribute(
    graph: &TaskGraph,
    pool: &[String],
    surviving_agents: &[String],
    existing_loads: &BTreeMap<String, u64>,
) -> SwarmResult<Assignment> {
    if surviving_agents.is_empty() {
        return Err(SwarmError::Infeasible(
            "no surviving agents to take freed tasks".to_string(),
        ));
    }

    let mut subset = BTreeSet::new();
    for id in pool {
        let idx = graph
            .position(id)
            .ok_or_else(|| SwarmError::Infeasible(format!("unknown task '{}' in pool", id)))?;
        subset.insert(idx);
    }

    let slots = surviving_agents
        .iter()
        .map(|a| new_slot(a.clone(), existing_loads.get(a).copied().unwrap_or(0)))
        .collect();
    let assignment = schedule(graph, graph.layers_of(&subset), slots);

    log::warn!(
        "[Distributor] Redistributed {} freed tasks across {} surviving agents",
        assignment.total_tasks(),
        surviving_agents.len()
    );
    Ok(assignment)
}

fn new_slot(agent_id: String, load: u64) -> Slot {
    Slot {
        queue: AgentQueue {
            agent_id,
            tasks: Vec::new(),
            total_minutes: 0,
            complexity_score: 0,
        },
        load,
    }
}

fn schedule(graph: &TaskGraph, layers: Vec<Vec<usize>>, mut slots: Vec<Slot>) -> Assignment {
    for mut layer in layers {
        layer.sort_by_key(|&idx| {
            let task = graph.task_at(idx);
            (Reverse(task.complexity), task.category.clone(), idx)
        });

        for idx in layer {
            let task = graph.task_at(idx);
            let Some(slot) = slots
                .iter_mut()
                .enumerate()
                .min_by_key(|(i, s)| (s.load, *i))
                .map(|(_, s)| s)
            else {
                continue;
            };
            let minutes = task.estimated_minutes as u64;
            slot.load += minutes;
            slot.queue.total_minutes += minutes;
            slot.queue.complexity_score += task.complexity.score();
            slot.queue.tasks.push(task.id.clone());
            log::debug!(
                "[Distributor] {} -> {} ({} min)",
                task.id,
                slot.queue.agent_id,
                minutes
            );
        }
    }

    Assignment {
        agents: slots.into_iter().map(|s| s.queue).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Complexity;
    use crate::planner::graph::tests::task;

    fn graph(tasks: Vec<crate::models::Task>) -> TaskGraph {
        TaskGraph::from_tasks(tasks).unwrap()
    }

    #[test]
    fn test_zero_agents_is_infeasible() {
        let g = graph(vec![task("A", &[])]);
        assert!(matches!(distribute(&g, 0), Err(SwarmError::Infeasible(_))));
    }

    #[test]
    fn test_empty_graph_is_infeasible() {
        let g = graph(vec![]);
        assert!(matches!(distribute(&g, 2), Err(SwarmError::Infeasible(_))));
    }

    #[test]
    fn test_min_load_assignment() {
        let mut big = task("BIG", &[]);
        big.complexity = Complexity::Critical;
        big.estimated_minutes = 360;
        let g = graph(vec![task("S1", &[]), task("S2", &[]), big, task("S3", &[])]);

        let assignment = distribute(&g, 2).unwrap();
        // Critical first to agent-1, then the three medium tasks fill agent-2
        assert_eq!(assignment.tasks_for("agent-1").unwrap(), ["BIG"]);
        assert_eq!(assignment.tasks_for("agent-2").unwrap(), ["S1", "S2", "S3"]);
        assert_eq!(assignment.summary().max_agent_minutes, 360);
    }

    #[test]
    fn test_every_task_assigned_once() {
        let g = graph(vec![
            task("A", &[]),
            task("B", &["A"]),
            task("C", &["A"]),
            task("D", &["B", "C"]),
            task("E", &[]),
        ]);
        let assignment = distribute(&g, 3).unwrap();
        let mut all: Vec<String> = assignment
            .agents
            .iter()
            .flat_map(|q| q.tasks.clone())
            .collect();
        all.sort();
        assert_eq!(all, vec!["A", "B", "C", "D", "E"]);
    }

    #[test]
    fn test_more_agents_than_tasks() {
        let g = graph(vec![task("A", &[])]);
        let assignment = distribute(&g, 3).unwrap();
        assert_eq!(assignment.agents.len(), 3);
        assert_eq!(assignment.agent_for("A"), Some("agent-1"));
        assert!(assignment.tasks_for("agent-3").unwrap().is_empty());
    }

    #[test]
    fn test_redistribute_respects_existing_load() {
        let g = graph(vec![task("A", &[]), task("B", &["A"]), task("C", &[])]);
        let loads = BTreeMap::from([("agent-1".to_string(), 500), ("agent-3".to_string(), 0)]);
        let assignment = redistribute(
            &g,
            &["B".to_string(), "C".to_string()],
            &["agent-1".to_string(), "agent-3".to_string()],
            &loads,
        )
        .unwrap();
        // B's dependency A is outside the pool, so both sit in layer 0
        assert_eq!(assignment.tasks_for("agent-3").unwrap(), ["B", "C"]);
        assert!(assignment.tasks_for("agent-1").unwrap().is_empty());
    }

    #[test]
    fn test_redistribute_without_survivors() {
        let g = graph(vec![task("A", &[])]);
        let result = redistribute(&g, &["A".into()], &[], &BTreeMap::new());
        assert!(matches!(result, Err(SwarmError::Infeasible(_))));
    }
}
