//! Commit operations for GitManager
//!
//! Changed-file diffs against a base branch, and commits built
//! from an in-memory index so no working tree is touched

use git2::{BranchType, DiffOptions, Error as GitError, Index, IndexEntry, IndexTime};
use std::collections::BTreeSet;

use crate::git::types::CommitInfo;
use crate::git::GitManager;

pub(crate) const FILE_MODE: u32 = 0o100644;

impl GitManager {
    /// Paths touched on `branch` since it diverged from `base`
    pub fn changed_files(&self, branch: &str, base: &str) -> Result<BTreeSet<String>, GitError> {
        let branch_commit = self
            .repo
            .find_branch(branch, BranchType::Local)?
            .get()
            .peel_to_commit()?;
        let base_commit = self
            .repo
            .find_branch(base, BranchType::Local)?
            .get()
            .peel_to_commit()?;

        let merge_base = self.repo.merge_base(branch_commit.id(), base_commit.id())?;
        let base_tree = self.repo.find_commit(merge_base)?.tree()?;
        let branch_tree = branch_commit.tree()?;

        let diff = self.repo.diff_tree_to_tree(
            Some(&base_tree),
            Some(&branch_tree),
            Some(&mut DiffOptions::new()),
        )?;

        let mut files = BTreeSet::new();
        for delta in diff.deltas() {
            for file in [delta.old_file(), delta.new_file()] {
                if let Some(path) = file.path() {
                    files.insert(path.to_string_lossy().replace('\\', "/"));
                }
            }
        }
        Ok(files)
    }

    /// Commit file contents directly onto a branch tip.
    /// Creates the branch from the default branch when it does not exist yet.
    pub fn commit_files(
        &self,
        branch: &str,
        files: &[(&str, &str)],
        message: &str,
    ) -> Result<CommitInfo, GitError> {
        if !self.branch_exists(branch) {
            let base = self.get_default_branch_name();
            self.create_branch_from(branch, &base, false)?;
        }

        let parent = self
            .repo
            .find_branch(branch, BranchType::Local)?
            .get()
            .peel_to_commit()?;

        let mut index = Index::new()?;
        index.read_tree(&parent.tree()?)?;
        for (path, content) in files {
            self.stage_content(&mut index, path, content.as_bytes(), FILE_MODE)?;
        }
        let tree_id = index.write_tree_to(&self.repo)?;
        let tree = self.repo.find_tree(tree_id)?;

        let signature = self.signature()?;
        let oid = self.repo.commit(
            Some(&format!("refs/heads/{}", branch)),
            &signature,
            &signature,
            message,
            &tree,
            &[&parent],
        )?;

        let commit = self.repo.find_commit(oid)?;
        self.commit_to_info(&commit)
    }

    /// Write `content` as a blob and place it at `path` in the index at stage 0
    pub(crate) fn stage_content(
        &self,
        index: &mut Index,
        path: &str,
        content: &[u8],
        mode: u32,
    ) -> Result<(), GitError> {
        let id = self.repo.blob(content)?;
        let entry = IndexEntry {
            ctime: IndexTime::new(0, 0),
            mtime: IndexTime::new(0, 0),
            dev: 0,
            ino: 0,
            mode,
            uid: 0,
            gid: 0,
            file_size: content.len() as u32,
            id,
            flags: 0,
            flags_extended: 0,
            path: path.as_bytes().to_vec(),
        };
        index.add(&entry)
    }
}
