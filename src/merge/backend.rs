// Branch integration backends: git2 for real repositories, in-memory for tests

use crate::error::{SwarmError, SwarmResult};
use crate::git::{GitManager, PendingMerge};
use crate::models::BranchRecord;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Content of one side of a conflicted path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SideContent {
    Text(String),
    /// Not valid UTF-8; kept byte for byte
    Binary(Vec<u8>),
}

impl SideContent {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        match String::from_utf8(bytes) {
            Ok(text) => SideContent::Text(text),
            Err(e) => SideContent::Binary(e.into_bytes()),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            SideContent::Text(text) => Some(text),
            SideContent::Binary(_) => None,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            SideContent::Text(text) => text.as_bytes(),
            SideContent::Binary(bytes) => bytes,
        }
    }
}

/// Both sides of a conflicted path. A side is `None` when that branch
/// deleted the path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictSides {
    pub path: String,
    pub ours: Option<SideContent>,
    pub theirs: Option<SideContent>,
    pub base: Option<SideContent>,
}

impl ConflictSides {
    pub fn ours_text(&self) -> Option<&str> {
        self.ours.as_ref().and_then(SideContent::as_text)
    }

    pub fn theirs_text(&self) -> Option<&str> {
        self.theirs.as_ref().and_then(SideContent::as_text)
    }
}

/// What to stage for a conflicted path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Content(Vec<u8>),
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeAttempt {
    Clean,
    Conflicted(Vec<ConflictSides>),
}

/// One merge step at a time: `merge` stages a pending merge, then exactly one
/// of `commit` or `abort` finishes it.
pub trait MergeBackend {
    fn integration_branch(&self) -> &str;

    /// Whether the record's head is already reachable from the integration branch
    fn is_merged(&self, record: &BranchRecord) -> SwarmResult<bool>;

    fn merge(&mut self, record: &BranchRecord) -> SwarmResult<MergeAttempt>;

    /// Replace a conflicted path of the pending merge with resolved content
    fn resolve(&mut self, path: &str, resolution: &Resolution) -> SwarmResult<()>;

    fn commit(&mut self, record: &BranchRecord) -> SwarmResult<()>;

    fn abort(&mut self) -> SwarmResult<()>;
}

fn no_pending() -> SwarmError {
    SwarmError::Storage("No merge in progress".to_string())
}

pub struct GitMergeBackend {
    git: GitManager,
    integration_branch: String,
    pending: Option<PendingMerge>,
}

impl GitMergeBackend {
    /// Use `integration_branch`, creating it from `base_branch` when missing
    pub fn prepare(
        git: GitManager,
        integration_branch: &str,
        base_branch: &str,
    ) -> SwarmResult<Self> {
        if !git.branch_exists(integration_branch) {
            git.create_branch_from(integration_branch, base_branch, false)?;
            log::info!(
                "[MergeOrchestrator] Created integration branch {} from {}",
                integration_branch,
                base_branch
            );
        }
        Ok(Self {
            git,
            integration_branch: integration_branch.to_string(),
            pending: None,
        })
    }

    pub fn git(&self) -> &GitManager {
        &self.git
    }
}

impl MergeBackend for GitMergeBackend {
    fn integration_branch(&self) -> &str {
        &self.integration_branch
    }

    fn is_merged(&self, record: &BranchRecord) -> SwarmResult<bool> {
        Ok(self.git.branch_contains(&self.integration_branch, &record.head_id)?)
    }

    fn merge(&mut self, record: &BranchRecord) -> SwarmResult<MergeAttempt> {
        let pending = self.git.start_merge(&record.branch, &self.integration_branch)?;
        let attempt = if pending.has_conflicts() {
            MergeAttempt::Conflicted(
                pending
                    .conflicts
                    .iter()
                    .map(|c| ConflictSides {
                        path: c.path.clone(),
                        ours: c.our_content.clone().map(SideContent::from_bytes),
                        theirs: c.their_content.clone().map(SideContent::from_bytes),
                        base: c.ancestor_content.clone().map(SideContent::from_bytes),
                    })
                    .collect(),
            )
        } else {
            MergeAttempt::Clean
        };
        self.pending = Some(pending);
        Ok(attempt)
    }

    fn resolve(&mut self, path: &str, resolution: &Resolution) -> SwarmResult<()> {
        let pending = self.pending.as_mut().ok_or_else(no_pending)?;
        let content = match resolution {
            Resolution::Content(bytes) => Some(bytes.as_slice()),
            Resolution::Delete => None,
        };
        self.git.resolve_conflict(pending, path, content)?;
        Ok(())
    }

    fn commit(&mut self, record: &BranchRecord) -> SwarmResult<()> {
        let pending = self.pending.take().ok_or_else(no_pending)?;
        let commit_id = self.git.complete_merge(pending)?;
        log::debug!(
            "[MergeOrchestrator] {} integrated as {}",
            record.branch,
            commit_id
        );
        Ok(())
    }

    fn abort(&mut self) -> SwarmResult<()> {
        self.pending = None;
        Ok(())
    }
}

struct MemoryPending {
    /// `None` deletes the path on commit
    staged: BTreeMap<String, Option<String>>,
    conflicts: BTreeSet<String>,
}

/// File-map backend: each branch is the set of files it changed with their
/// final content; integration starts from `base`.
#[derive(Default)]
pub struct MemoryMergeBackend {
    integration_branch: String,
    base: BTreeMap<String, String>,
    integration: BTreeMap<String, String>,
    branches: HashMap<String, BTreeMap<String, String>>,
    merged_heads: BTreeSet<String>,
    pending: Option<MemoryPending>,
}

impl MemoryMergeBackend {
    pub fn new<I, P, C>(integration_branch: &str, base: I) -> Self
    where
        I: IntoIterator<Item = (P, C)>,
        P: Into<String>,
        C: Into<String>,
    {
        let base: BTreeMap<String, String> = base
            .into_iter()
            .map(|(p, c)| (p.into(), c.into()))
            .collect();
        Self {
            integration_branch: integration_branch.to_string(),
            integration: base.clone(),
            base,
            ..Default::default()
        }
    }

    pub fn add_branch<I, P, C>(&mut self, branch: &str, files: I)
    where
        I: IntoIterator<Item = (P, C)>,
        P: Into<String>,
        C: Into<String>,
    {
        self.branches.insert(
            branch.to_string(),
            files.into_iter().map(|(p, c)| (p.into(), c.into())).collect(),
        );
    }

    /// Changed-path record for a registered branch
    pub fn record(
        &self,
        agent_id: &str,
        branch: &str,
        claimed_tasks: &[&str],
        creation_order: usize,
    ) -> BranchRecord {
        BranchRecord {
            agent_id: agent_id.to_string(),
            branch: branch.to_string(),
            changed_files: self
                .branches
                .get(branch)
                .map(|files| files.keys().cloned().collect())
                .unwrap_or_default(),
            claimed_tasks: claimed_tasks.iter().map(|t| t.to_string()).collect(),
            head_id: format!("{}@head", branch),
            creation_order,
        }
    }

    pub fn file(&self, path: &str) -> Option<&str> {
        self.integration.get(path).map(String::as_str)
    }

    pub fn merged_heads(&self) -> &BTreeSet<String> {
        &self.merged_heads
    }
}

impl MergeBackend for MemoryMergeBackend {
    fn integration_branch(&self) -> &str {
        &self.integration_branch
    }

    fn is_merged(&self, record: &BranchRecord) -> SwarmResult<bool> {
        Ok(self.merged_heads.contains(&record.head_id))
    }

    fn merge(&mut self, record: &BranchRecord) -> SwarmResult<MergeAttempt> {
        let files = self
            .branches
            .get(&record.branch)
            .ok_or_else(|| SwarmError::Storage(format!("Unknown branch {}", record.branch)))?;

        let mut staged = BTreeMap::new();
        let mut conflicts = Vec::new();
        for (path, theirs) in files {
            let base = self.base.get(path);
            let ours = self.integration.get(path);
            if ours == base || ours == Some(theirs) {
                staged.insert(path.clone(), Some(theirs.clone()));
            } else {
                conflicts.push(ConflictSides {
                    path: path.clone(),
                    ours: ours.cloned().map(SideContent::Text),
                    theirs: Some(SideContent::Text(theirs.clone())),
                    base: base.cloned().map(SideContent::Text),
                });
            }
        }

        self.pending = Some(MemoryPending {
            staged,
            conflicts: conflicts.iter().map(|c| c.path.clone()).collect(),
        });
        Ok(if conflicts.is_empty() {
            MergeAttempt::Clean
        } else {
            MergeAttempt::Conflicted(conflicts)
        })
    }

    fn resolve(&mut self, path: &str, resolution: &Resolution) -> SwarmResult<()> {
        let pending = self.pending.as_mut().ok_or_else(no_pending)?;
        if !pending.conflicts.contains(path) {
            return Err(SwarmError::Storage(format!("{} is not in conflict", path)));
        }
        let content = match resolution {
            Resolution::Content(bytes) => Some(String::from_utf8(bytes.clone()).map_err(|_| {
                SwarmError::Storage(format!("{} resolved to non-UTF-8 content", path))
            })?),
            Resolution::Delete => None,
        };
        pending.conflicts.remove(path);
        pending.staged.insert(path.to_string(), content);
        Ok(())
    }

    fn commit(&mut self, record: &BranchRecord) -> SwarmResult<()> {
        let pending = self.pending.take().ok_or_else(no_pending)?;
        if !pending.conflicts.is_empty() {
            self.pending = Some(pending);
            return Err(SwarmError::Storage(
                "Cannot complete merge: unresolved conflicts remain".to_string(),
            ));
        }
        for (path, content) in pending.staged {
            match content {
                Some(content) => self.integration.insert(path, content),
                None => self.integration.remove(&path),
            };
        }
        self.merged_heads.insert(record.head_id.clone());
        Ok(())
    }

    fn abort(&mut self) -> SwarmResult<()> {
        self.pending = None;
        Ok(())
    }
}
