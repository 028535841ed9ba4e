// Read-only projection of the folded protocol state

use super::fold::{AgentState, BlockerState, FoldState, SharedResourceRef};
use crate::models::AgentStatus;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Snapshot returned by `poll()`. Contains no poll timestamp, so two polls
/// over the same events compare equal.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AgentStatusSnapshot {
    pub agents: BTreeMap<String, AgentState>,
    pub open_blockers: Vec<BlockerState>,
    pub shared_resources: Vec<SharedResourceRef>,
    pub dropped_events: usize,
}

impl AgentStatusSnapshot {
    pub fn from_state(state: &FoldState) -> Self {
        Self {
            agents: state.agents.clone(),
            open_blockers: state
                .blockers
                .values()
                .filter(|b| !b.resolved)
                .cloned()
                .collect(),
            shared_resources: state.shared_resources.clone(),
            dropped_events: state.dropped_events,
        }
    }

    pub fn status_of(&self, agent_id: &str) -> Option<AgentStatus> {
        self.agents.get(agent_id).map(|a| a.status)
    }

    pub fn counts_by_status(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for agent in self.agents.values() {
            *counts.entry(agent.status.as_str().to_string()).or_insert(0) += 1;
        }
        counts
    }

    /// Unfinished tasks of failed agents not yet handed to another agent
    pub fn freed_tasks(&self) -> BTreeMap<String, Vec<String>> {
        self.agents
            .values()
            .filter(|a| a.status == AgentStatus::Failed)
            .map(|a| {
                let freed: Vec<String> = a
                    .unfinished_tasks()
                    .into_iter()
                    .filter(|t| !a.released.contains(t))
                    .collect();
                (a.agent_id.clone(), freed)
            })
            .filter(|(_, tasks)| !tasks.is_empty())
            .collect()
    }

    /// Agents that can still take work
    pub fn surviving_agents(&self) -> Vec<String> {
        self.agents
            .values()
            .filter(|a| {
                matches!(
                    a.status,
                    AgentStatus::Init | AgentStatus::Working | AgentStatus::Blocked
                )
            })
            .map(|a| a.agent_id.clone())
            .collect()
    }

    /// Task ids reported complete by any agent
    pub fn completed_tasks(&self) -> Vec<String> {
        let mut done: Vec<String> = self
            .agents
            .values()
            .flat_map(|a| a.completed_tasks())
            .collect();
        done.sort();
        done.dedup();
        done
    }

    pub fn all_finished(&self) -> bool {
        !self.agents.is_empty()
            && self
                .agents
                .values()
                .all(|a| matches!(a.status, AgentStatus::Done | AgentStatus::Failed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Agent, TaskStatus};
    use chrono::Utc;

    #[test]
    fn test_freed_tasks_skip_released() {
        let mut state = FoldState::default();
        state.register(&Agent {
            id: "agent-1".into(),
            branch: "b1".into(),
            worktree_path: String::new(),
            assigned_tasks: vec!["A".into(), "B".into(), "C".into()],
            registered_at: Utc::now(),
        });
        let agent = state.agents.get_mut("agent-1").unwrap();
        agent.status = AgentStatus::Failed;
        agent.tasks.insert("A".into(), TaskStatus::Done);

        let snapshot = AgentStatusSnapshot::from_state(&state);
        assert_eq!(snapshot.freed_tasks()["agent-1"], vec!["B", "C"]);
        assert!(snapshot.surviving_agents().is_empty());

        state.release("agent-1", &["B".into()]);
        let snapshot = AgentStatusSnapshot::from_state(&state);
        assert_eq!(snapshot.freed_tasks()["agent-1"], vec!["C"]);
        assert_eq!(snapshot.completed_tasks(), vec!["A"]);
        assert_eq!(snapshot.counts_by_status()["failed"], 1);
    }
}
