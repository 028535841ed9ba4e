//! Coordination Protocol
//!
//! Agents append events to their own JSONL stream; the coordinator polls
//! every stream on a bounded worker pool and folds new lines into one
//! in-memory state, partitioned by agent id. Nothing else mutates agent
//! status.
//!
//! Folded state and per-stream read offsets are persisted together in
//! `events/checkpoints.json`, so a restarted coordinator resumes where it
//! stopped instead of refolding every stream.

pub mod events;
pub mod fold;
pub mod snapshot;

pub use events::{CoordinationEvent, EventPayload};
pub use fold::{AgentState, BlockerState, FoldState, SharedResourceRef};
pub use snapshot::AgentStatusSnapshot;

use crate::config::ProtocolConfig;
use crate::error::{SwarmError, SwarmResult};
use crate::file_storage::blockers::{self, BlockerRecord, BlockerStatus};
use crate::file_storage::events::{
    self as streams, StreamCheckpoint, StreamChunk, COORDINATOR_STREAM,
};
use crate::file_storage::messages::{self, MessageRecord, MessageStatus};
use crate::file_storage::registry;
use crate::file_storage::shared::{self, SharedResourceRecord};
use crate::models::Agent;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProtocolCheckpoint {
    streams: BTreeMap<String, StreamCheckpoint>,
    state: FoldState,
}

/// Counts for the status view and reports
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CoordinationSummary {
    pub open_blockers: usize,
    pub resolved_blockers: usize,
    pub shared_resources: usize,
    pub unread_messages: usize,
    pub agents_by_status: BTreeMap<String, usize>,
    pub dropped_events: usize,
}

/// Agent ids double as stream file names
pub fn validate_agent_id(agent_id: &str) -> SwarmResult<()> {
    let valid = !agent_id.is_empty()
        && !agent_id.starts_with('_')
        && agent_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(SwarmError::Config(format!("invalid agent id '{}'", agent_id)))
    }
}

/// Append an event to an agent's stream. This is the agent-side entry point
/// and touches nothing but that stream.
pub fn emit_event(
    coordination_dir: &Path,
    agent_id: &str,
    payload: EventPayload,
) -> SwarmResult<CoordinationEvent> {
    validate_agent_id(agent_id)?;
    let event = CoordinationEvent::new(agent_id, payload);
    streams::append_record(&streams::get_stream_path(coordination_dir, agent_id), &event)?;
    log::debug!(
        "[Protocol] {} emitted {} ({})",
        agent_id,
        event.event.kind(),
        event.id
    );
    Ok(event)
}

pub struct CoordinationProtocol {
    dir: PathBuf,
    settings: ProtocolConfig,
    checkpoint: ProtocolCheckpoint,
}

impl CoordinationProtocol {
    /// Open the protocol over a coordination directory, restoring the last
    /// checkpoint and registering any agents the registry lists.
    pub fn open(coordination_dir: &Path, settings: ProtocolConfig) -> SwarmResult<Self> {
        let checkpoint = streams::load_checkpoint::<ProtocolCheckpoint>(coordination_dir)?
            .unwrap_or_default();
        let mut protocol = Self {
            dir: coordination_dir.to_path_buf(),
            settings,
            checkpoint,
        };
        for agent in registry::load_agents(coordination_dir)? {
            protocol.checkpoint.state.register(&agent);
        }
        Ok(protocol)
    }

    pub fn coordination_dir(&self) -> &Path {
        &self.dir
    }

    /// Register agents at launch; writes the agent registry
    pub fn register_agents(&mut self, agents: &[Agent]) -> SwarmResult<()> {
        for agent in agents {
            validate_agent_id(&agent.id)?;
        }
        let mut all = registry::load_agents(&self.dir)?;
        for agent in agents {
            match all.iter_mut().find(|a| a.id == agent.id) {
                Some(existing) => *existing = agent.clone(),
                None => all.push(agent.clone()),
            }
            self.checkpoint.state.register(agent);
        }
        registry::save_agents(&self.dir, &all)?;
        self.save_checkpoint()?;
        log::info!("[Protocol] Registered {} agents", agents.len());
        Ok(())
    }

    pub fn agents(&self) -> SwarmResult<Vec<Agent>> {
        Ok(registry::load_agents(&self.dir)?)
    }

    pub fn emit(&self, agent_id: &str, payload: EventPayload) -> SwarmResult<CoordinationEvent> {
        emit_event(&self.dir, agent_id, payload)
    }

    /// Emit a blocker event and write its record; returns the blocker id
    pub fn report_blocker(
        &self,
        agent_id: &str,
        task_id: &str,
        description: &str,
        impact: Option<&str>,
    ) -> SwarmResult<String> {
        let event = self.emit(
            agent_id,
            EventPayload::Blocker {
                task_id: task_id.to_string(),
                description: description.to_string(),
                impact: impact.map(String::from),
            },
        )?;
        blockers::save_blocker(
            &self.dir,
            &BlockerRecord {
                id: event.id.clone(),
                agent_id: agent_id.to_string(),
                task_id: task_id.to_string(),
                description: description.to_string(),
                impact: impact.map(String::from),
                status: BlockerStatus::Open,
                resolution: None,
                created_at: event.timestamp,
                resolved_at: None,
            },
        )?;
        log::info!(
            "[Protocol] {} blocked on {}: {}",
            agent_id,
            task_id,
            description
        );
        Ok(event.id)
    }

    /// Append a resolution to the coordinator stream and close the record.
    /// The owning agent returns to working on the next poll.
    pub fn resolve_blocker(&self, blocker_id: &str, resolution: Option<&str>) -> SwarmResult<()> {
        let event = CoordinationEvent::new(
            COORDINATOR_STREAM,
            EventPayload::Resolution {
                blocker_id: blocker_id.to_string(),
                resolution: resolution.map(String::from),
            },
        );
        streams::append_record(
            &streams::get_stream_path(&self.dir, COORDINATOR_STREAM),
            &event,
        )?;
        if blockers::mark_resolved(&self.dir, blocker_id, resolution, event.timestamp)?.is_none() {
            log::warn!(
                "[Protocol] Resolved blocker {} has no record on disk",
                blocker_id
            );
        }
        log::info!("[Protocol] Resolved blocker {}", blocker_id);
        Ok(())
    }

    pub fn list_blockers(&self, status: Option<BlockerStatus>) -> SwarmResult<Vec<BlockerRecord>> {
        Ok(blockers::list_blockers(&self.dir, status)?)
    }

    /// Announce a shared artifact; recorded for reporting only
    pub fn share_resource(
        &self,
        agent_id: &str,
        name: &str,
        file_path: &str,
        description: &str,
        usage_example: Option<&str>,
    ) -> SwarmResult<CoordinationEvent> {
        let event = self.emit(
            agent_id,
            EventPayload::SharedResource {
                name: name.to_string(),
                file_path: file_path.to_string(),
                description: description.to_string(),
                usage_example: usage_example.map(String::from),
            },
        )?;
        shared::save_shared_resource(
            &self.dir,
            &SharedResourceRecord {
                name: name.to_string(),
                created_by: agent_id.to_string(),
                file_path: file_path.to_string(),
                description: description.to_string(),
                usage_example: usage_example.map(String::from),
                created_at: event.timestamp,
            },
        )?;
        Ok(event)
    }

    pub fn list_shared_resources(&self) -> SwarmResult<Vec<SharedResourceRecord>> {
        Ok(shared::list_shared_resources(&self.dir)?)
    }

    pub fn send_message(&self, from: &str, to: &str, body: &str) -> SwarmResult<MessageRecord> {
        validate_agent_id(from)?;
        validate_agent_id(to)?;
        let message = MessageRecord::new(from, to, body);
        messages::save_message(&self.dir, &message)?;
        Ok(message)
    }

    pub fn get_messages(
        &self,
        agent_id: &str,
        status: Option<MessageStatus>,
    ) -> SwarmResult<Vec<MessageRecord>> {
        Ok(messages::list_messages(&self.dir, agent_id, status)?)
    }

    pub fn mark_message_read(&self, message_id: &str) -> SwarmResult<bool> {
        Ok(messages::mark_message_read(&self.dir, message_id)?)
    }

    /// Snapshot of the state folded so far, without reading streams
    pub fn snapshot(&self) -> AgentStatusSnapshot {
        AgentStatusSnapshot::from_state(&self.checkpoint.state)
    }

    pub async fn poll(&mut self) -> SwarmResult<AgentStatusSnapshot> {
        self.poll_at(Utc::now()).await
    }

    /// Fold all events appended since the last checkpoint, then apply the
    /// heartbeat grace period as of `now`.
    pub async fn poll_at(&mut self, now: DateTime<Utc>) -> SwarmResult<AgentStatusSnapshot> {
        let mut names: Vec<String> = self.checkpoint.state.agents.keys().cloned().collect();
        names.push(COORDINATOR_STREAM.to_string());

        let chunks = self.read_streams(names).await;
        let mut folded = 0;
        for (stream, chunk) in chunks {
            folded += chunk.lines.len();
            self.fold_chunk(&stream, chunk);
        }

        // Out-of-range grace periods never expire anyone
        let grace = i64::try_from(self.settings.heartbeat_grace_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or(chrono::Duration::MAX);
        self.checkpoint.state.expire(now, grace);

        self.save_checkpoint()?;
        if folded > 0 {
            log::debug!("[Protocol] Folded {} new events", folded);
        }
        Ok(self.snapshot())
    }

    async fn read_streams(&self, names: Vec<String>) -> BTreeMap<String, StreamChunk> {
        let semaphore = Arc::new(Semaphore::new(self.settings.poll_workers.max(1)));
        let timeout = Duration::from_millis(self.settings.poll_timeout_ms);
        let mut set = JoinSet::new();

        for name in names {
            let path = streams::get_stream_path(&self.dir, &name);
            let from = self
                .checkpoint
                .streams
                .get(&name)
                .copied()
                .unwrap_or_default();
            let semaphore = Arc::clone(&semaphore);

            set.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return (name, Err("poll worker pool closed".to_string()));
                };
                let read = tokio::task::spawn_blocking(move || streams::read_from(&path, from));
                let result = match tokio::time::timeout(timeout, read).await {
                    Ok(Ok(chunk)) => chunk.map(Some),
                    Ok(Err(e)) => Err(format!("reader task failed: {}", e)),
                    Err(_) => Ok(None),
                };
                (name, result)
            });
        }

        let mut chunks = BTreeMap::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((name, Ok(Some(chunk)))) => {
                    chunks.insert(name, chunk);
                }
                Ok((name, Ok(None))) => {
                    log::warn!(
                        "[Protocol] Reading stream {} timed out; no new events this cycle",
                        name
                    );
                }
                Ok((name, Err(e))) => {
                    log::warn!("[Protocol] Skipping stream {} this cycle: {}", name, e);
                }
                Err(e) => log::warn!("[Protocol] Poll worker failed: {}", e),
            }
        }
        chunks
    }

    fn fold_chunk(&mut self, stream: &str, chunk: StreamChunk) {
        for (line, raw) in &chunk.lines {
            match CoordinationEvent::parse_line(raw) {
                Ok(event) => self
                    .checkpoint
                    .state
                    .apply(stream, &event, COORDINATOR_STREAM),
                Err(e) => {
                    let err = SwarmError::ProtocolCorruption {
                        agent_id: stream.to_string(),
                        line: *line,
                        message: e.to_string(),
                    };
                    log::warn!("[Protocol] {}", err);
                    self.checkpoint.state.record_dropped();
                }
            }
        }
        self.checkpoint.streams.insert(stream.to_string(), chunk.next);
    }

    /// Hand tasks to a surviving agent: updates the registry and the fold
    pub fn assign_tasks(&mut self, agent_id: &str, tasks: &[String]) -> SwarmResult<()> {
        if !self.checkpoint.state.assign(agent_id, tasks) {
            return Err(SwarmError::Config(format!(
                "agent {} is not registered",
                agent_id
            )));
        }
        registry::extend_assignment(&self.dir, agent_id, tasks)?;
        self.save_checkpoint()
    }

    /// Mark a failed agent's tasks as handed off so they are freed only once
    pub fn release_tasks(&mut self, agent_id: &str, tasks: &[String]) -> SwarmResult<()> {
        self.checkpoint.state.release(agent_id, tasks);
        self.save_checkpoint()
    }

    pub fn coordination_summary(&self) -> SwarmResult<CoordinationSummary> {
        let state = &self.checkpoint.state;
        let open = state.blockers.values().filter(|b| !b.resolved).count();
        Ok(CoordinationSummary {
            open_blockers: open,
            resolved_blockers: state.blockers.len() - open,
            shared_resources: shared::list_shared_resources(&self.dir)?.len(),
            unread_messages: messages::count_unread(&self.dir)?,
            agents_by_status: self.snapshot().counts_by_status(),
            dropped_events: state.dropped_events,
        })
    }

    fn save_checkpoint(&self) -> SwarmResult<()> {
        Ok(streams::save_checkpoint(&self.dir, &self.checkpoint)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_storage::events::append_line;
    use crate::models::AgentStatus;
    use tempfile::TempDir;

    fn agent(id: &str, tasks: &[&str]) -> Agent {
        Agent {
            id: id.to_string(),
            branch: format!("swarm-agent-{}", id),
            worktree_path: String::new(),
            assigned_tasks: tasks.iter().map(|t| t.to_string()).collect(),
            registered_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_huge_heartbeat_grace_does_not_panic() {
        let temp_dir = TempDir::new().unwrap();
        let settings = ProtocolConfig {
            heartbeat_grace_secs: u64::MAX,
            ..ProtocolConfig::default()
        };
        let mut protocol = CoordinationProtocol::open(temp_dir.path(), settings).unwrap();
        protocol.register_agents(&[agent("agent-1", &["A"])]).unwrap();
        emit_event(temp_dir.path(), "agent-1", EventPayload::Heartbeat).unwrap();

        let later = Utc::now() + chrono::Duration::days(365);
        let snapshot = protocol.poll_at(later).await.unwrap();
        assert_eq!(snapshot.status_of("agent-1"), Some(AgentStatus::Working));
    }

    fn protocol(dir: &Path) -> CoordinationProtocol {
        let mut protocol = CoordinationProtocol::open(dir, ProtocolConfig::default()).unwrap();
        protocol
            .register_agents(&[agent("agent-1", &["A"]), agent("agent-2", &["B"])])
            .unwrap();
        protocol
    }

    #[test]
    fn test_validate_agent_id() {
        assert!(validate_agent_id("agent-1").is_ok());
        assert!(validate_agent_id("_coordinator").is_err());
        assert!(validate_agent_id("../etc").is_err());
        assert!(validate_agent_id("").is_err());
    }

    #[tokio::test]
    async fn test_poll_folds_and_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let mut protocol = protocol(temp_dir.path());

        protocol
            .emit(
                "agent-1",
                EventPayload::Progress {
                    task_id: "A".into(),
                    percent: Some(50),
                    message: None,
                },
            )
            .unwrap();

        let first = protocol.poll().await.unwrap();
        assert_eq!(first.status_of("agent-1"), Some(AgentStatus::Working));
        assert_eq!(first.status_of("agent-2"), Some(AgentStatus::Init));

        let second = protocol.poll().await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_corrupt_line_does_not_block_others() {
        let temp_dir = TempDir::new().unwrap();
        let mut protocol = protocol(temp_dir.path());

        append_line(
            &streams::get_stream_path(temp_dir.path(), "agent-1"),
            "{ definitely not json",
        )
        .unwrap();
        protocol
            .emit(
                "agent-1",
                EventPayload::Completion {
                    task_ids: vec!["A".into()],
                },
            )
            .unwrap();
        protocol.emit("agent-2", EventPayload::Heartbeat).unwrap();

        let snapshot = protocol.poll().await.unwrap();
        assert_eq!(snapshot.dropped_events, 1);
        assert_eq!(snapshot.status_of("agent-1"), Some(AgentStatus::Done));
        assert_eq!(snapshot.status_of("agent-2"), Some(AgentStatus::Working));
    }

    #[tokio::test]
    async fn test_checkpoint_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let mut protocol = protocol(temp_dir.path());
        protocol.emit("agent-1", EventPayload::Heartbeat).unwrap();
        let before = protocol.poll().await.unwrap();

        let mut reopened =
            CoordinationProtocol::open(temp_dir.path(), ProtocolConfig::default()).unwrap();
        assert_eq!(reopened.snapshot(), before);
        assert_eq!(reopened.poll().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_blocker_lifecycle_with_records() {
        let temp_dir = TempDir::new().unwrap();
        let mut protocol = protocol(temp_dir.path());

        let blocker_id = protocol
            .report_blocker("agent-1", "A", "Waiting for schema", None)
            .unwrap();
        let snapshot = protocol.poll().await.unwrap();
        assert_eq!(snapshot.status_of("agent-1"), Some(AgentStatus::Blocked));
        assert_eq!(snapshot.open_blockers.len(), 1);
        assert_eq!(
            protocol.list_blockers(Some(BlockerStatus::Open)).unwrap().len(),
            1
        );

        protocol
            .resolve_blocker(&blocker_id, Some("schema merged"))
            .unwrap();
        let snapshot = protocol.poll().await.unwrap();
        assert_eq!(snapshot.status_of("agent-1"), Some(AgentStatus::Working));
        assert!(snapshot.open_blockers.is_empty());

        let summary = protocol.coordination_summary().unwrap();
        assert_eq!(summary.open_blockers, 0);
        assert_eq!(summary.resolved_blockers, 1);
    }

    #[tokio::test]
    async fn test_assign_tasks_extends_queue() {
        let temp_dir = TempDir::new().unwrap();
        let mut protocol = protocol(temp_dir.path());
        protocol.assign_tasks("agent-2", &["C".into()]).unwrap();

        let agents = protocol.agents().unwrap();
        let agent2 = agents.iter().find(|a| a.id == "agent-2").unwrap();
        assert_eq!(agent2.assigned_tasks, vec!["B", "C"]);
        assert!(protocol.assign_tasks("agent-9", &[]).is_err());
    }

    #[test]
    fn test_messages_and_shared_resources() {
        let temp_dir = TempDir::new().unwrap();
        let protocol = protocol(temp_dir.path());

        protocol
            .share_resource("agent-1", "user-model", "src/user.rs", "User type", None)
            .unwrap();
        let msg = protocol
            .send_message("agent-1", "agent-2", "user model shared")
            .unwrap();

        assert_eq!(protocol.list_shared_resources().unwrap().len(), 1);
        let summary = protocol.coordination_summary().unwrap();
        assert_eq!(summary.unread_messages, 1);
        assert_eq!(summary.shared_resources, 1);

        assert!(protocol.mark_message_read(&msg.id).unwrap());
        assert!(protocol
            .get_messages("agent-2", Some(MessageStatus::Unread))
            .unwrap()
            .is_empty());
    }
}
