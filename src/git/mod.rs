//! Git operations using git2-rs
//!
//! This module provides git functionality organized into focused submodules:
//! - `manager` - Core GitManager struct and commit identity
//! - `branches` - Branch operations (create, delete, list, archive)
//! - `worktrees` - Agent worktree management (add, remove, prune)
//! - `commits` - Changed files and index-built commits
//! - `merge` - In-memory merges and conflict resolution
//! - `types` - Shared data structures

mod branches;
mod commits;
mod manager;
mod merge;
mod types;
mod worktrees;

pub use manager::GitManager;
pub use merge::PendingMerge;
pub use types::{BranchInfo, CommitInfo, ConflictInfo, WorktreeInfo};
