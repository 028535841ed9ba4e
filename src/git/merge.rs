//! Merge and conflict handling for GitManager
//!
//! Merges are computed on in-memory indexes and committed straight onto the
//! target ref, so the user's checkout is never modified.

use git2::{BranchType, Error as GitError, Index, IndexEntry, MergeOptions};
use std::path::Path;

use crate::git::commits::FILE_MODE;
use crate::git::types::ConflictInfo;
use crate::git::GitManager;

/// Result of merging two branch tips in memory
pub struct PendingMerge {
    pub source_branch: String,
    pub target_branch: String,
    pub(crate) index: Index,
    pub conflicts: Vec<ConflictInfo>,
}

impl PendingMerge {
    pub fn has_conflicts(&self) -> bool {
        self.index.has_conflicts()
    }
}

impl GitManager {
    /// Merge the two tips in memory and collect both sides of every conflict
    pub fn start_merge(
        &self,
        source_branch: &str,
        target_branch: &str,
    ) -> Result<PendingMerge, GitError> {
        let ours = self
            .repo
            .find_branch(target_branch, BranchType::Local)?
            .get()
            .peel_to_commit()?;
        let theirs = self
            .repo
            .find_branch(source_branch, BranchType::Local)?
            .get()
            .peel_to_commit()?;

        let mut merge_opts = MergeOptions::new();
        let index = self.repo.merge_commits(&ours, &theirs, Some(&mut merge_opts))?;

        let mut conflicts = Vec::new();
        if index.has_conflicts() {
            for conflict in index.conflicts()? {
                let conflict = conflict?;
                let path = match conflict
                    .our
                    .as_ref()
                    .or(conflict.their.as_ref())
                    .or(conflict.ancestor.as_ref())
                {
                    Some(entry) => String::from_utf8_lossy(&entry.path).to_string(),
                    None => continue,
                };

                conflicts.push(ConflictInfo {
                    path,
                    our_content: self.get_blob_content(conflict.our.as_ref())?,
                    their_content: self.get_blob_content(conflict.their.as_ref())?,
                    ancestor_content: self.get_blob_content(conflict.ancestor.as_ref())?,
                });
            }
            log::info!("[GitManager] Found {} conflict(s)", conflicts.len());
        }

        Ok(PendingMerge {
            source_branch: source_branch.to_string(),
            target_branch: target_branch.to_string(),
            index,
            conflicts,
        })
    }

    /// Raw blob bytes behind an index entry; `None` for a missing side
    fn get_blob_content(&self, entry: Option<&IndexEntry>) -> Result<Option<Vec<u8>>, GitError> {
        match entry {
            Some(entry) => Ok(Some(self.repo.find_blob(entry.id)?.content().to_vec())),
            None => Ok(None),
        }
    }

    /// Replace a conflicted path with resolved content, or delete it when
    /// `resolved_content` is `None`
    pub fn resolve_conflict(
        &self,
        pending: &mut PendingMerge,
        path: &str,
        resolved_content: Option<&[u8]>,
    ) -> Result<(), GitError> {
        // Drops every stage of the path, conflict entries included
        pending.index.remove_path(Path::new(path))?;
        match resolved_content {
            Some(content) => {
                self.stage_content(&mut pending.index, path, content, FILE_MODE)?;
                log::info!("[GitManager] Resolved conflict for: {}", path);
            }
            None => log::info!("[GitManager] Resolved conflict for {} by deletion", path),
        }
        Ok(())
    }

    /// Commit a fully resolved merge onto the target branch. Returns the commit id.
    pub fn complete_merge(&self, mut pending: PendingMerge) -> Result<String, GitError> {
        if pending.index.has_conflicts() {
            return Err(GitError::from_str(
                "Cannot complete merge: unresolved conflicts remain",
            ));
        }

        let ours = self
            .repo
            .find_branch(&pending.target_branch, BranchType::Local)?
            .get()
            .peel_to_commit()?;
        let theirs = self
            .repo
            .find_branch(&pending.source_branch, BranchType::Local)?
            .get()
            .peel_to_commit()?;

        let tree_id = pending.index.write_tree_to(&self.repo)?;
        let tree = self.repo.find_tree(tree_id)?;
        let signature = self.signature()?;

        let commit_id = self.repo.commit(
            Some(&format!("refs/heads/{}", pending.target_branch)),
            &signature,
            &signature,
            &format!(
                "Merge branch '{}' into '{}'",
                pending.source_branch, pending.target_branch
            ),
            &tree,
            &[&ours, &theirs],
        )?;

        log::info!("[GitManager] Completed merge with commit: {}", commit_id);
        Ok(commit_id.to_string())
    }

    /// Read a file from a branch tip as text; `None` when the path does not exist there
    pub fn read_file_at(&self, branch: &str, path: &str) -> Result<Option<String>, GitError> {
        Ok(self
            .read_bytes_at(branch, path)?
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
    }

    /// Raw bytes of a file at a branch tip; `None` when the path does not exist there
    pub fn read_bytes_at(&self, branch: &str, path: &str) -> Result<Option<Vec<u8>>, GitError> {
        let tree = self
            .repo
            .find_branch(branch, BranchType::Local)?
            .get()
            .peel_to_commit()?
            .tree()?;
        match tree.get_path(Path::new(path)) {
            Ok(entry) => Ok(Some(self.repo.find_blob(entry.id())?.content().to_vec())),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}
