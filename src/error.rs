// Error taxonomy for planning, distribution, coordination and merging

use thiserror::Error;

/// Errors surfaced by the coordinator core
#[derive(Debug, Error)]
pub enum SwarmError {
    /// Requirements could not be decomposed into discrete items
    #[error("Failed to parse requirements at {item}: {message}")]
    Parse { item: String, message: String },

    /// Dependency cycle, reported with the full path (first node repeated at the end)
    #[error("Dependency cycle detected: {}", path.join(" -> "))]
    Cycle { path: Vec<String> },

    /// Zero agents or an empty graph
    #[error("Infeasible distribution: {0}")]
    Infeasible(String),

    /// An event line that could not be parsed
    #[error("Corrupt event from agent {agent_id} at line {line}: {message}")]
    ProtocolCorruption {
        agent_id: String,
        line: usize,
        message: String,
    },

    /// An agent missed its heartbeat grace period
    #[error("Agent {agent_id} silent for {silent_secs}s")]
    AgentTimeout { agent_id: String, silent_secs: i64 },

    /// Source-level conflict that requires manual resolution
    #[error("Merge of {branch} halted on source conflicts: {}", paths.join(", "))]
    MergeConflict { branch: String, paths: Vec<String> },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SwarmError {
    pub fn parse(item: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            item: item.into(),
            message: message.into(),
        }
    }

    /// Whether the error aborts the whole operation rather than degrading it
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            SwarmError::ProtocolCorruption { .. }
                | SwarmError::AgentTimeout { .. }
                | SwarmError::MergeConflict { .. }
        )
    }
}

impl From<String> for SwarmError {
    fn from(message: String) -> Self {
        SwarmError::Storage(message)
    }
}

pub type SwarmResult<T> = Result<T, SwarmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_error_includes_path() {
        let err = SwarmError::Cycle {
            path: vec!["A".into(), "B".into(), "A".into()],
        };
        assert_eq!(err.to_string(), "Dependency cycle detected: A -> B -> A");
    }

    #[test]
    fn test_partial_failures_are_not_fatal() {
        let timeout = SwarmError::AgentTimeout {
            agent_id: "agent-1".into(),
            silent_secs: 900,
        };
        assert!(!timeout.is_fatal());
        assert!(SwarmError::Infeasible("zero agents".into()).is_fatal());
        assert!(SwarmError::parse("line 3", "empty item").is_fatal());
    }

    #[test]
    fn test_storage_error_from_string() {
        let err: SwarmError = "Failed to read file".to_string().into();
        assert!(matches!(err, SwarmError::Storage(_)));
    }
}
