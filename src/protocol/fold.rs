//! Folding event streams into derived agent and blocker state.
//!
//! The fold is the only place agent status changes. It is driven by the
//! coordinator's control loop, one event at a time, in stream order.

use super::events::{CoordinationEvent, EventPayload};
use crate::error::SwarmError;
use crate::models::state_machine::{is_live_state, is_terminal_state, transition_state};
use crate::models::{Agent, AgentStatus, TaskStatus};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Derived state of one agent
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AgentState {
    pub agent_id: String,
    pub status: AgentStatus,
    pub assigned_tasks: Vec<String>,
    pub tasks: BTreeMap<String, TaskStatus>,
    pub registered_at: DateTime<Utc>,
    pub last_event_at: Option<DateTime<Utc>>,
    pub progress: Option<u8>,
    pub last_message: Option<String>,
    pub failure_reason: Option<String>,
    pub open_blockers: BTreeSet<String>,
    /// Tasks of a failed agent that were handed to someone else
    #[serde(default)]
    pub released: BTreeSet<String>,
}

impl AgentState {
    pub fn from_agent(agent: &Agent) -> Self {
        Self {
            agent_id: agent.id.clone(),
            status: AgentStatus::Init,
            assigned_tasks: agent.assigned_tasks.clone(),
            tasks: agent
                .assigned_tasks
                .iter()
                .map(|t| (t.clone(), TaskStatus::Assigned))
                .collect(),
            registered_at: agent.registered_at,
            last_event_at: None,
            progress: None,
            last_message: None,
            failure_reason: None,
            open_blockers: BTreeSet::new(),
            released: BTreeSet::new(),
        }
    }

    pub fn completed_tasks(&self) -> Vec<String> {
        self.assigned_tasks
            .iter()
            .filter(|t| self.tasks.get(*t) == Some(&TaskStatus::Done))
            .cloned()
            .collect()
    }

    pub fn unfinished_tasks(&self) -> Vec<String> {
        self.assigned_tasks
            .iter()
            .filter(|t| self.tasks.get(*t) != Some(&TaskStatus::Done))
            .cloned()
            .collect()
    }

    fn all_done(&self) -> bool {
        !self.assigned_tasks.is_empty()
            && self
                .assigned_tasks
                .iter()
                .all(|t| self.tasks.get(t) == Some(&TaskStatus::Done))
    }

    fn move_to(&mut self, target: AgentStatus) {
        match transition_state(self.status, target) {
            Ok(next) => {
                if next != self.status {
                    log::debug!(
                        "[Protocol] {} {} -> {}",
                        self.agent_id,
                        self.status.as_str(),
                        next.as_str()
                    );
                }
                self.status = next;
            }
            Err(e) => log::debug!("[Protocol] {}: {}", self.agent_id, e),
        }
    }

    fn is_open_task(&self, task_id: &str) -> bool {
        matches!(self.tasks.get(task_id), Some(s) if *s != TaskStatus::Done)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BlockerState {
    pub id: String,
    pub agent_id: String,
    pub task_id: String,
    pub description: String,
    pub opened_at: DateTime<Utc>,
    pub resolved: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SharedResourceRef {
    pub name: String,
    pub agent_id: String,
    pub file_path: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FoldState {
    pub agents: BTreeMap<String, AgentState>,
    pub blockers: BTreeMap<String, BlockerState>,
    /// Resolutions seen before the blocker they close
    #[serde(default)]
    pub early_resolutions: BTreeSet<String>,
    pub shared_resources: Vec<SharedResourceRef>,
    pub dropped_events: usize,
}

impl FoldState {
    pub fn register(&mut self, agent: &Agent) {
        self.agents
            .entry(agent.id.clone())
            .or_insert_with(|| AgentState::from_agent(agent));
    }

    /// Extend an agent's queue with redistributed tasks
    pub fn assign(&mut self, agent_id: &str, tasks: &[String]) -> bool {
        let Some(state) = self.agents.get_mut(agent_id) else {
            return false;
        };
        for task in tasks {
            if !state.assigned_tasks.contains(task) {
                state.assigned_tasks.push(task.clone());
                state.tasks.insert(task.clone(), TaskStatus::Assigned);
            }
        }
        true
    }

    /// Mark tasks of a failed agent as handed off
    pub fn release(&mut self, agent_id: &str, tasks: &[String]) {
        if let Some(state) = self.agents.get_mut(agent_id) {
            state.released.extend(tasks.iter().cloned());
        }
    }

    pub fn record_dropped(&mut self) {
        self.dropped_events += 1;
    }

    /// Apply one event read from `stream`. Agent streams may only carry
    /// events for their own agent; the coordinator stream only resolutions.
    pub fn apply(&mut self, stream: &str, event: &CoordinationEvent, coordinator_stream: &str) {
        if stream == coordinator_stream {
            match &event.event {
                EventPayload::Resolution { blocker_id, .. } => self.resolve(blocker_id),
                other => log::warn!(
                    "[Protocol] Ignoring {} event on coordinator stream",
                    other.kind()
                ),
            }
            return;
        }

        if event.agent_id != stream {
            log::warn!(
                "[Protocol] Event {} on stream {} claims agent {}; ignored",
                event.id,
                stream,
                event.agent_id
            );
            self.dropped_events += 1;
            return;
        }

        // Resolutions close blockers regardless of the resolver's own state
        if let EventPayload::Resolution { blocker_id, .. } = &event.event {
            self.resolve(blocker_id);
        }

        let Some(agent) = self.agents.get_mut(stream) else {
            log::warn!("[Protocol] Event from unregistered agent {}", stream);
            self.dropped_events += 1;
            return;
        };

        if is_terminal_state(agent.status) {
            log::debug!(
                "[Protocol] {} is {}; ignoring {} event",
                agent.agent_id,
                agent.status.as_str(),
                event.event.kind()
            );
            return;
        }

        agent.last_event_at = Some(
            agent
                .last_event_at
                .map_or(event.timestamp, |t| t.max(event.timestamp)),
        );
        if agent.status == AgentStatus::Init {
            agent.move_to(AgentStatus::Working);
        }

        match &event.event {
            EventPayload::Progress {
                task_id,
                percent,
                message,
            } => {
                if agent.tasks.get(task_id) == Some(&TaskStatus::Assigned) {
                    agent.tasks.insert(task_id.clone(), TaskStatus::InProgress);
                }
                if percent.is_some() {
                    agent.progress = *percent;
                }
                if message.is_some() {
                    agent.last_message = message.clone();
                }
            }
            EventPayload::Heartbeat | EventPayload::Resolution { .. } => {}
            EventPayload::Blocker {
                task_id,
                description,
                ..
            } => {
                let resolved = self.early_resolutions.remove(&event.id);
                self.blockers.insert(
                    event.id.clone(),
                    BlockerState {
                        id: event.id.clone(),
                        agent_id: agent.agent_id.clone(),
                        task_id: task_id.clone(),
                        description: description.clone(),
                        opened_at: event.timestamp,
                        resolved,
                    },
                );
                if !resolved && agent.is_open_task(task_id) {
                    agent.tasks.insert(task_id.clone(), TaskStatus::Blocked);
                    agent.open_blockers.insert(event.id.clone());
                    agent.move_to(AgentStatus::Blocked);
                }
            }
            EventPayload::SharedResource {
                name, file_path, ..
            } => {
                self.shared_resources.push(SharedResourceRef {
                    name: name.clone(),
                    agent_id: agent.agent_id.clone(),
                    file_path: file_path.clone(),
                });
            }
            EventPayload::Completion { task_ids } => {
                for task_id in task_ids {
                    if agent.tasks.contains_key(task_id) {
                        agent.tasks.insert(task_id.clone(), TaskStatus::Done);
                    }
                }
                // Blockers on finished tasks no longer hold the agent
                let finished: Vec<String> = agent
                    .open_blockers
                    .iter()
                    .filter(|b| {
                        self.blockers
                            .get(*b)
                            .map_or(true, |s| !agent.is_open_task(&s.task_id))
                    })
                    .cloned()
                    .collect();
                for id in finished {
                    agent.open_blockers.remove(&id);
                }
                if agent.open_blockers.is_empty() && agent.status == AgentStatus::Blocked {
                    agent.move_to(AgentStatus::Working);
                }
                if agent.all_done() {
                    agent.move_to(AgentStatus::Done);
                }
            }
            EventPayload::Failure { reason } => {
                agent.failure_reason = Some(reason.clone());
                agent.move_to(AgentStatus::Failed);
            }
        }
    }

    fn resolve(&mut self, blocker_id: &str) {
        let Some(blocker) = self.blockers.get_mut(blocker_id) else {
            self.early_resolutions.insert(blocker_id.to_string());
            return;
        };
        if blocker.resolved {
            return;
        }
        blocker.resolved = true;
        let task_id = blocker.task_id.clone();
        let owner = blocker.agent_id.clone();

        let still_blocked = self
            .blockers
            .values()
            .any(|b| !b.resolved && b.agent_id == owner && b.task_id == task_id);

        let Some(agent) = self.agents.get_mut(&owner) else {
            return;
        };
        agent.open_blockers.remove(blocker_id);
        if is_terminal_state(agent.status) {
            return;
        }
        if !still_blocked && agent.tasks.get(&task_id) == Some(&TaskStatus::Blocked) {
            agent.tasks.insert(task_id, TaskStatus::InProgress);
        }
        if agent.open_blockers.is_empty() && agent.status == AgentStatus::Blocked {
            agent.move_to(AgentStatus::Working);
        }
    }

    /// Fail live agents that have been silent longer than `grace`.
    /// Returns the timeouts that fired.
    pub fn expire(&mut self, now: DateTime<Utc>, grace: Duration) -> Vec<SwarmError> {
        let mut expired = Vec::new();
        for agent in self.agents.values_mut() {
            if !is_live_state(agent.status) {
                continue;
            }
            let last = agent.last_event_at.unwrap_or(agent.registered_at);
            let silent = now - last;
            if silent > grace {
                let err = SwarmError::AgentTimeout {
                    agent_id: agent.agent_id.clone(),
                    silent_secs: silent.num_seconds(),
                };
                log::warn!("[Protocol] {}", err);
                agent.failure_reason = Some(err.to_string());
                agent.move_to(AgentStatus::Failed);
                expired.push(err);
            }
        }
        expired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const COORD: &str = "_coordinator";

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 0).unwrap()
    }

    fn state_with(agent_id: &str, tasks: &[&str]) -> FoldState {
        let mut state = FoldState::default();
        state.register(&Agent {
            id: agent_id.to_string(),
            branch: format!("swarm-agent-{}", agent_id),
            worktree_path: String::new(),
            assigned_tasks: tasks.iter().map(|t| t.to_string()).collect(),
            registered_at: t0(),
        });
        state
    }

    fn event(agent: &str, payload: EventPayload, minutes: i64) -> CoordinationEvent {
        CoordinationEvent::at(agent, payload, t0() + Duration::minutes(minutes))
    }

    fn status(state: &FoldState, agent: &str) -> AgentStatus {
        state.agents[agent].status
    }

    #[test]
    fn test_first_event_starts_work() {
        let mut state = state_with("agent-1", &["A"]);
        assert_eq!(status(&state, "agent-1"), AgentStatus::Init);
        state.apply("agent-1", &event("agent-1", EventPayload::Heartbeat, 1), COORD);
        assert_eq!(status(&state, "agent-1"), AgentStatus::Working);
    }

    #[test]
    fn test_blocker_then_resolution_returns_to_working() {
        let mut state = state_with("agent-1", &["A", "B"]);
        let blocker = event(
            "agent-1",
            EventPayload::Blocker {
                task_id: "A".into(),
                description: "Need schema".into(),
                impact: None,
            },
            1,
        );
        state.apply("agent-1", &blocker, COORD);
        assert_eq!(status(&state, "agent-1"), AgentStatus::Blocked);
        assert_eq!(state.agents["agent-1"].tasks["A"], TaskStatus::Blocked);

        let resolution = event(
            COORD,
            EventPayload::Resolution {
                blocker_id: blocker.id.clone(),
                resolution: None,
            },
            2,
        );
        state.apply(COORD, &resolution, COORD);
        assert_eq!(status(&state, "agent-1"), AgentStatus::Working);
        assert_eq!(state.agents["agent-1"].tasks["A"], TaskStatus::InProgress);
        assert!(state.blockers[&blocker.id].resolved);
    }

    #[test]
    fn test_resolution_before_blocker() {
        let mut state = state_with("agent-1", &["A"]);
        let blocker = event(
            "agent-1",
            EventPayload::Blocker {
                task_id: "A".into(),
                description: "Need schema".into(),
                impact: None,
            },
            1,
        );
        let resolution = event(
            COORD,
            EventPayload::Resolution {
                blocker_id: blocker.id.clone(),
                resolution: None,
            },
            2,
        );
        state.apply(COORD, &resolution, COORD);
        state.apply("agent-1", &blocker, COORD);
        assert_eq!(status(&state, "agent-1"), AgentStatus::Working);
        assert!(state.early_resolutions.is_empty());
    }

    #[test]
    fn test_blocker_on_unassigned_task_does_not_block() {
        let mut state = state_with("agent-1", &["A"]);
        state.apply(
            "agent-1",
            &event(
                "agent-1",
                EventPayload::Blocker {
                    task_id: "Z".into(),
                    description: "?".into(),
                    impact: None,
                },
                1,
            ),
            COORD,
        );
        assert_eq!(status(&state, "agent-1"), AgentStatus::Working);
    }

    #[test]
    fn test_completion_of_all_tasks_is_done() {
        let mut state = state_with("agent-1", &["A", "B"]);
        state.apply(
            "agent-1",
            &event(
                "agent-1",
                EventPayload::Completion {
                    task_ids: vec!["A".into()],
                },
                1,
            ),
            COORD,
        );
        assert_eq!(status(&state, "agent-1"), AgentStatus::Working);
        state.apply(
            "agent-1",
            &event(
                "agent-1",
                EventPayload::Completion {
                    task_ids: vec!["B".into()],
                },
                2,
            ),
            COORD,
        );
        assert_eq!(status(&state, "agent-1"), AgentStatus::Done);

        // Terminal: later events are ignored
        state.apply(
            "agent-1",
            &event(
                "agent-1",
                EventPayload::Failure {
                    reason: "late".into(),
                },
                3,
            ),
            COORD,
        );
        assert_eq!(status(&state, "agent-1"), AgentStatus::Done);
    }

    #[test]
    fn test_progress_never_marks_done() {
        let mut state = state_with("agent-1", &["A"]);
        state.apply(
            "agent-1",
            &event(
                "agent-1",
                EventPayload::Progress {
                    task_id: "A".into(),
                    percent: Some(100),
                    message: Some("finished?".into()),
                },
                1,
            ),
            COORD,
        );
        let agent = &state.agents["agent-1"];
        assert_eq!(agent.tasks["A"], TaskStatus::InProgress);
        assert_eq!(agent.progress, Some(100));
        assert_eq!(agent.status, AgentStatus::Working);
    }

    #[test]
    fn test_heartbeat_expiry() {
        let mut state = state_with("agent-1", &["A"]);
        state.apply("agent-1", &event("agent-1", EventPayload::Heartbeat, 0), COORD);

        let grace = Duration::seconds(600);
        assert!(state.expire(t0() + Duration::seconds(600), grace).is_empty());

        let fired = state.expire(t0() + Duration::seconds(601), grace);
        assert_eq!(fired.len(), 1);
        assert_eq!(status(&state, "agent-1"), AgentStatus::Failed);
        assert_eq!(state.agents["agent-1"].unfinished_tasks(), vec!["A"]);
    }

    #[test]
    fn test_init_agents_do_not_expire() {
        let mut state = state_with("agent-1", &["A"]);
        assert!(state
            .expire(t0() + Duration::days(1), Duration::seconds(600))
            .is_empty());
        assert_eq!(status(&state, "agent-1"), AgentStatus::Init);
    }

    #[test]
    fn test_foreign_agent_event_dropped() {
        let mut state = state_with("agent-1", &["A"]);
        state.apply("agent-1", &event("agent-2", EventPayload::Heartbeat, 1), COORD);
        assert_eq!(state.dropped_events, 1);
        assert_eq!(status(&state, "agent-1"), AgentStatus::Init);
    }
}
