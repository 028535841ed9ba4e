//! Git data types and structures
//!
//! Contains all shared types used across git operations

use serde::{Deserialize, Serialize};

/// Represents a git branch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchInfo {
    pub name: String,
    pub is_head: bool,
    pub commit_id: String,
}

/// Represents a git commit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitInfo {
    pub id: String,
    pub short_id: String,
    pub message: String,
    pub author: String,
    pub email: String,
    pub timestamp: i64,
    pub parent_ids: Vec<String>,
}

/// Represents a git worktree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorktreeInfo {
    pub name: String,
    pub path: String,
    pub branch: Option<String>,
    pub is_locked: bool,
}

/// Both sides of a single file in conflict. A side is `None` when that
/// branch deleted the file (or, for the ancestor, when both added it).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictInfo {
    pub path: String,
    /// Raw blob from the target branch (ours)
    pub our_content: Option<Vec<u8>>,
    /// Raw blob from the source branch (theirs)
    pub their_content: Option<Vec<u8>>,
    /// Raw blob from the common ancestor
    pub ancestor_content: Option<Vec<u8>>,
}
