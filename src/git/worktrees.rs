//! Worktree management for GitManager
//!
//! Contains methods for creating, listing, and removing agent worktrees

use git2::{
    BranchType, Error as GitError, Repository, Worktree, WorktreeAddOptions, WorktreePruneOptions,
};
use std::path::{Path, PathBuf};

use crate::git::types::WorktreeInfo;
use crate::git::GitManager;

impl GitManager {
    /// Create a worktree checked out on `branch`, creating the branch from HEAD if needed
    pub fn create_worktree(&self, branch: &str, path: &Path) -> Result<WorktreeInfo, GitError> {
        if !self.branch_exists(branch) {
            self.create_branch(branch, false)?;
        }

        let branch_ref = self.repo.find_branch(branch, BranchType::Local)?;
        let mut opts = WorktreeAddOptions::new();
        opts.reference(Some(branch_ref.get()));

        // Branch names like "swarm/agent-1" would nest inside .git/worktrees/
        let worktree_name = branch.replace('/', "-");

        let worktree = self.repo.worktree(&worktree_name, path, Some(&opts))?;
        log::info!("[GitManager] Created worktree {:?} on {}", path, branch);
        self.worktree_to_info(&worktree)
    }

    /// Remove a worktree by path, deleting its working directory
    pub fn remove_worktree(&self, path: &Path) -> Result<(), GitError> {
        let worktrees = self.repo.worktrees()?;
        let wanted = comparable_path(path);

        for name in worktrees.iter().flatten() {
            if let Ok(worktree) = self.repo.find_worktree(name) {
                if comparable_path(worktree.path()) == wanted {
                    let mut opts = WorktreePruneOptions::new();
                    opts.valid(true).working_tree(true);
                    worktree.prune(Some(&mut opts))?;
                    log::info!("[GitManager] Removed worktree {}", name);
                    return Ok(());
                }
            }
        }

        Err(GitError::from_str(&format!("Worktree not found: {}", path.display())))
    }

    /// Prune worktrees whose directory no longer exists
    pub fn prune_orphaned_worktrees(&self) -> Result<u32, GitError> {
        let worktrees = self.repo.worktrees()?;
        let mut pruned_count = 0;

        for name in worktrees.iter().flatten() {
            if let Ok(worktree) = self.repo.find_worktree(name) {
                if worktree.path().exists() {
                    continue;
                }
                log::info!(
                    "[GitManager] Pruning orphaned worktree '{}' (path {:?} no longer exists)",
                    name,
                    worktree.path()
                );
                match worktree.prune(None) {
                    Ok(()) => pruned_count += 1,
                    Err(e) => log::warn!("[GitManager] Failed to prune worktree '{}': {}", name, e),
                }
            }
        }

        Ok(pruned_count)
    }

    pub(crate) fn worktree_to_info(&self, worktree: &Worktree) -> Result<WorktreeInfo, GitError> {
        let name = worktree.name().unwrap_or("").to_string();
        let path = worktree.path().to_string_lossy().to_string();
        let is_locked = worktree
            .is_locked()
            .map(|status| !matches!(status, git2::WorktreeLockStatus::Unlocked))
            .unwrap_or(false);

        let branch = Repository::open(worktree.path())
            .ok()
            .and_then(|wt_repo| {
                let head = wt_repo.head().ok()?;
                if head.is_branch() {
                    head.shorthand().map(|s| s.to_string())
                } else {
                    None
                }
            });

        Ok(WorktreeInfo {
            name,
            path,
            branch,
            is_locked,
        })
    }
}

/// Canonical form when the path exists, so `repo/../wt` and `/tmp` symlinks
/// compare equal to what libgit2 recorded
fn comparable_path(path: &Path) -> PathBuf {
    path.canonicalize()
        .unwrap_or_else(|_| PathBuf::from(path.to_string_lossy().trim_end_matches('/')))
}
