//! Branch operations for GitManager
//!
//! Contains methods for creating, deleting, listing and archiving branches

use git2::{Branch, BranchType, Commit, Error as GitError, Oid};

use crate::git::types::{BranchInfo, CommitInfo};
use crate::git::GitManager;

impl GitManager {
    /// Create a new branch from the current HEAD
    pub fn create_branch(&self, name: &str, force: bool) -> Result<BranchInfo, GitError> {
        let head = match self.repo.head() {
            Ok(head) => head,
            Err(e) if e.code() == git2::ErrorCode::UnbornBranch => {
                log::info!("[GitManager] No commits found, creating initial commit");
                self.create_initial_commit()?;
                self.repo.head()?
            }
            Err(e) => return Err(e),
        };

        let head_commit = head.peel_to_commit()?;
        let branch = self.repo.branch(name, &head_commit, force)?;

        self.branch_to_info(&branch)
    }

    /// Create a branch pointing at another local branch's head
    pub fn create_branch_from(
        &self,
        name: &str,
        base: &str,
        force: bool,
    ) -> Result<BranchInfo, GitError> {
        let base_commit = self
            .repo
            .find_branch(base, BranchType::Local)?
            .get()
            .peel_to_commit()?;
        let branch = self.repo.branch(name, &base_commit, force)?;
        log::info!("[GitManager] Created branch {} from {}", name, base);
        self.branch_to_info(&branch)
    }

    /// Create an initial empty commit for a new repository
    pub(crate) fn create_initial_commit(&self) -> Result<(), GitError> {
        let tree_id = self.repo.index()?.write_tree()?;
        let tree = self.repo.find_tree(tree_id)?;
        let signature = self.signature()?;

        self.repo.commit(
            Some("HEAD"),
            &signature,
            &signature,
            "Initial commit",
            &tree,
            &[],
        )?;

        log::info!("[GitManager] Created initial commit");
        Ok(())
    }

    pub fn branch_exists(&self, name: &str) -> bool {
        self.repo.find_branch(name, BranchType::Local).is_ok()
    }

    /// Commit id at the tip of a local branch
    pub fn branch_head(&self, name: &str) -> Result<String, GitError> {
        let commit = self
            .repo
            .find_branch(name, BranchType::Local)?
            .get()
            .peel_to_commit()?;
        Ok(commit.id().to_string())
    }

    /// Delete a branch
    pub fn delete_branch(&self, name: &str) -> Result<(), GitError> {
        let mut branch = self.repo.find_branch(name, BranchType::Local)?;
        branch.delete()?;
        Ok(())
    }

    /// Get all local branches
    pub fn list_branches(&self) -> Result<Vec<BranchInfo>, GitError> {
        let branches = self.repo.branches(Some(BranchType::Local))?;

        let mut result = Vec::new();
        for branch in branches {
            let (branch, _) = branch?;
            result.push(self.branch_to_info(&branch)?);
        }

        Ok(result)
    }

    /// Preserve a branch tip as a lightweight `archive/<branch>` tag
    pub fn archive_branch(&self, name: &str) -> Result<String, GitError> {
        let commit = self
            .repo
            .find_branch(name, BranchType::Local)?
            .get()
            .peel_to_commit()?;
        let tag = format!("archive/{}", name);
        self.repo.tag_lightweight(&tag, commit.as_object(), true)?;
        log::info!("[GitManager] Archived {} as {}", name, tag);
        Ok(tag)
    }

    /// Whether `commit_id` is reachable from (or equal to) the tip of `branch`
    pub fn branch_contains(&self, branch: &str, commit_id: &str) -> Result<bool, GitError> {
        let tip = Oid::from_str(&self.branch_head(branch)?)?;
        let commit = Oid::from_str(commit_id)?;
        if tip == commit {
            return Ok(true);
        }
        self.repo.graph_descendant_of(tip, commit)
    }

    /// Convert a Branch to BranchInfo
    pub(crate) fn branch_to_info(&self, branch: &Branch) -> Result<BranchInfo, GitError> {
        let name = branch.name()?.unwrap_or("").to_string();
        let is_head = branch.is_head();
        let commit = branch.get().peel_to_commit()?;

        Ok(BranchInfo {
            name,
            is_head,
            commit_id: commit.id().to_string(),
        })
    }

    /// Convert a Commit to CommitInfo
    pub(crate) fn commit_to_info(&self, commit: &Commit) -> Result<CommitInfo, GitError> {
        let author = commit.author();
        let id = commit.id().to_string();

        Ok(CommitInfo {
            short_id: id[..7].to_string(),
            id,
            message: commit.message().unwrap_or("").to_string(),
            author: author.name().unwrap_or("").to_string(),
            email: author.email().unwrap_or("").to_string(),
            timestamp: commit.time().seconds(),
            parent_ids: commit.parent_ids().map(|oid| oid.to_string()).collect(),
        })
    }

    /// Get the default branch name for this repository.
    ///
    /// Resolution order:
    /// 1. Current HEAD branch (if HEAD points to a branch)
    /// 2. First existing common default branch ("main", "master")
    /// 3. Fallback to "main"
    pub fn get_default_branch_name(&self) -> String {
        if let Ok(head) = self.repo.head() {
            if head.is_branch() {
                if let Some(name) = head.shorthand() {
                    return name.to_string();
                }
            }
        }

        for name in &["main", "master"] {
            if self.repo.find_branch(name, BranchType::Local).is_ok() {
                return (*name).to_string();
            }
        }

        "main".to_string()
    }
}
