// Core data models shared by the planner, distributor, protocol and merge orchestrator

pub mod state_machine;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Ready,
    Assigned,
    InProgress,
    Blocked,
    Done,
    Failed,
}

impl Default for TaskStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Ready => "ready",
            TaskStatus::Assigned => "assigned",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Blocked => "blocked",
            TaskStatus::Done => "done",
            TaskStatus::Failed => "failed",
        }
    }
}

/// Ordered complexity scale (trivial < low < medium < high < critical)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Trivial,
    Low,
    Medium,
    High,
    Critical,
}

impl Default for Complexity {
    fn default() -> Self {
        Self::Medium
    }
}

impl Complexity {
    pub const ALL: [Complexity; 5] = [
        Complexity::Trivial,
        Complexity::Low,
        Complexity::Medium,
        Complexity::High,
        Complexity::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Complexity::Trivial => "trivial",
            Complexity::Low => "low",
            Complexity::Medium => "medium",
            Complexity::High => "high",
            Complexity::Critical => "critical",
        }
    }

    /// Parse a complexity name, accepting a few common synonyms
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "trivial" | "tiny" => Some(Self::Trivial),
            "low" | "easy" | "simple" => Some(Self::Low),
            "medium" | "normal" | "moderate" => Some(Self::Medium),
            "high" | "hard" | "complex" => Some(Self::High),
            "critical" | "very_high" | "epic" => Some(Self::Critical),
            _ => None,
        }
    }

    /// Load weight used in distribution summaries
    pub fn score(&self) -> u32 {
        match self {
            Complexity::Trivial => 0,
            Complexity::Low => 1,
            Complexity::Medium => 3,
            Complexity::High => 5,
            Complexity::Critical => 8,
        }
    }
}

impl fmt::Display for Complexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Normal,
    High,
}

impl Default for Priority {
    fn default() -> Self {
        Self::Normal
    }
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "low" => Some(Self::Low),
            "normal" | "medium" => Some(Self::Normal),
            "high" | "urgent" => Some(Self::High),
            _ => None,
        }
    }
}

/// Why a dependency edge exists
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InferenceReason {
    /// Declared in the requirements input
    Declared,
    /// Description says "after ..." or "depends on ..." another task
    TextReference { phrase: String },
    /// Category convention, e.g. testing waits on implementation
    CategoryConvention { rule: String },
    /// Same-subject producer, e.g. an API task waits on its model
    SubjectMatch { subject: String, keyword: String },
}

impl InferenceReason {
    pub fn is_heuristic(&self) -> bool {
        !matches!(self, InferenceReason::Declared)
    }

    pub fn describe(&self) -> String {
        match self {
            InferenceReason::Declared => "declared".to_string(),
            InferenceReason::TextReference { phrase } => format!("text reference '{}'", phrase),
            InferenceReason::CategoryConvention { rule } => format!("convention: {}", rule),
            InferenceReason::SubjectMatch { subject, keyword } => {
                format!("'{}' {} precedes its consumers", subject, keyword)
            }
        }
    }
}

/// A dependency edge: the owning task depends on `task_id`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Dependency {
    pub task_id: String,
    pub reason: InferenceReason,
}

/// Atomic unit of work
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub description: String,
    pub category: String,
    pub complexity: Complexity,
    pub estimated_minutes: u32,
    pub dependencies: Vec<Dependency>,
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub required_skills: Vec<String>,
}

impl Task {
    pub fn dependency_ids(&self) -> impl Iterator<Item = &str> {
        self.dependencies.iter().map(|d| d.task_id.as_str())
    }

    pub fn depends_on(&self, task_id: &str) -> bool {
        self.dependencies.iter().any(|d| d.task_id == task_id)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Init,
    Working,
    Blocked,
    Done,
    Failed,
}

impl Default for AgentStatus {
    fn default() -> Self {
        Self::Init
    }
}

impl AgentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentStatus::Init => "init",
            AgentStatus::Working => "working",
            AgentStatus::Blocked => "blocked",
            AgentStatus::Done => "done",
            AgentStatus::Failed => "failed",
        }
    }
}

/// Registered protocol participant bound to one workspace
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    pub id: String,
    pub branch: String,
    pub worktree_path: String,
    /// Ordered task queue
    pub assigned_tasks: Vec<String>,
    pub registered_at: DateTime<Utc>,
}

/// Per-agent final state consumed by the merge orchestrator
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BranchRecord {
    pub agent_id: String,
    pub branch: String,
    pub changed_files: BTreeSet<String>,
    pub claimed_tasks: Vec<String>,
    pub head_id: String,
    /// Creation order, used to break ordering ties
    pub creation_order: usize,
}

impl BranchRecord {
    pub fn overlaps(&self, paths: &BTreeSet<String>) -> bool {
        self.changed_files.iter().any(|p| paths.contains(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complexity_ordering() {
        assert!(Complexity::Trivial < Complexity::Low);
        assert!(Complexity::High < Complexity::Critical);
        let mut all = vec![Complexity::High, Complexity::Trivial, Complexity::Medium];
        all.sort();
        assert_eq!(
            all,
            vec![Complexity::Trivial, Complexity::Medium, Complexity::High]
        );
    }

    #[test]
    fn test_complexity_parse() {
        assert_eq!(Complexity::parse("HIGH"), Some(Complexity::High));
        assert_eq!(Complexity::parse("easy"), Some(Complexity::Low));
        assert_eq!(Complexity::parse("unknown"), None);
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&TaskStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
        let status: AgentStatus = serde_json::from_str("\"blocked\"").unwrap();
        assert_eq!(status, AgentStatus::Blocked);
    }

    #[test]
    fn test_inference_reason_roundtrip_keeps_tag() {
        let reason = InferenceReason::SubjectMatch {
            subject: "user".into(),
            keyword: "model".into(),
        };
        let json = serde_json::to_value(&reason).unwrap();
        assert_eq!(json["kind"], "subject_match");
        assert!(reason.is_heuristic());
        assert!(!InferenceReason::Declared.is_heuristic());
    }

    #[test]
    fn test_branch_record_overlap() {
        let record = BranchRecord {
            agent_id: "agent-1".into(),
            branch: "swarm-agent-demo-1".into(),
            changed_files: ["src/lib.rs".to_string()].into_iter().collect(),
            claimed_tasks: vec![],
            head_id: "abc".into(),
            creation_order: 0,
        };
        let other: BTreeSet<String> = ["src/lib.rs".to_string()].into_iter().collect();
        assert!(record.overlaps(&other));
        assert!(!record.overlaps(&BTreeSet::new()));
    }
}
