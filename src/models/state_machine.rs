// Agent status state machine with validation
//
// init -> working -> {blocked <-> working} -> {done | failed}

use super::AgentStatus;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AgentTransitionError {
    #[error("Invalid agent transition from {from:?} to {to:?}")]
    InvalidTransition { from: AgentStatus, to: AgentStatus },

    #[error("Agent already in terminal state: {0:?}")]
    AlreadyTerminal(AgentStatus),
}

/// Validates if an agent can move from one status to another
pub fn can_transition(from: AgentStatus, to: AgentStatus) -> bool {
    match (from, to) {
        (AgentStatus::Init, AgentStatus::Working) => true,

        (AgentStatus::Working, AgentStatus::Blocked) => true,
        (AgentStatus::Working, AgentStatus::Done) => true,
        (AgentStatus::Working, AgentStatus::Failed) => true,

        // Resolution returns to working, never to a saved sub-state
        (AgentStatus::Blocked, AgentStatus::Working) => true,
        (AgentStatus::Blocked, AgentStatus::Failed) => true,

        // Same state is a no-op, except out of terminal states
        (a, b) if a == b => !is_terminal_state(a),

        _ => false,
    }
}

/// Validates and performs a transition
pub fn transition_state(
    current: AgentStatus,
    target: AgentStatus,
) -> Result<AgentStatus, AgentTransitionError> {
    if is_terminal_state(current) {
        return Err(AgentTransitionError::AlreadyTerminal(current));
    }

    if !can_transition(current, target) {
        return Err(AgentTransitionError::InvalidTransition {
            from: current,
            to: target,
        });
    }

    Ok(target)
}

pub fn is_terminal_state(status: AgentStatus) -> bool {
    matches!(status, AgentStatus::Done | AgentStatus::Failed)
}

/// Statuses subject to the heartbeat grace period
pub fn is_live_state(status: AgentStatus) -> bool {
    matches!(status, AgentStatus::Working | AgentStatus::Blocked)
}

pub fn valid_next_states(current: AgentStatus) -> Vec<AgentStatus> {
    let all_states = vec![
        AgentStatus::Init,
        AgentStatus::Working,
        AgentStatus::Blocked,
        AgentStatus::Done,
        AgentStatus::Failed,
    ];

    all_states
        .into_iter()
        .filter(|&state| state != current && can_transition(current, state))
        .collect()
}
