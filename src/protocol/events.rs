// Coordination event records written to per-agent JSONL streams

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Immutable record appended by an agent (or by the coordinator for resolutions)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CoordinationEvent {
    pub id: String,
    pub agent_id: String,
    pub timestamp: DateTime<Utc>,
    pub event: EventPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum EventPayload {
    Progress {
        #[serde(rename = "taskId")]
        task_id: String,
        #[serde(default)]
        percent: Option<u8>,
        #[serde(default)]
        message: Option<String>,
    },
    Heartbeat,
    /// Opens a blocker keyed by this event's id
    Blocker {
        #[serde(rename = "taskId")]
        task_id: String,
        description: String,
        #[serde(default)]
        impact: Option<String>,
    },
    Resolution {
        #[serde(rename = "blockerId")]
        blocker_id: String,
        #[serde(default)]
        resolution: Option<String>,
    },
    SharedResource {
        name: String,
        #[serde(rename = "filePath")]
        file_path: String,
        description: String,
        #[serde(default, rename = "usageExample")]
        usage_example: Option<String>,
    },
    /// Names tasks the agent has finished
    Completion {
        #[serde(rename = "taskIds")]
        task_ids: Vec<String>,
    },
    Failure { reason: String },
}

impl EventPayload {
    pub fn kind(&self) -> &'static str {
        match self {
            EventPayload::Progress { .. } => "progress",
            EventPayload::Heartbeat => "heartbeat",
            EventPayload::Blocker { .. } => "blocker",
            EventPayload::Resolution { .. } => "resolution",
            EventPayload::SharedResource { .. } => "shared_resource",
            EventPayload::Completion { .. } => "completion",
            EventPayload::Failure { .. } => "failure",
        }
    }
}

impl CoordinationEvent {
    pub fn new(agent_id: impl Into<String>, event: EventPayload) -> Self {
        Self::at(agent_id, event, Utc::now())
    }

    pub fn at(agent_id: impl Into<String>, event: EventPayload, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            agent_id: agent_id.into(),
            timestamp,
            event,
        }
    }

    /// Decode one stream line; bytes that are not UTF-8 are rejected
    pub fn parse_line(line: impl AsRef<[u8]>) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(line.as_ref())
    }
}
