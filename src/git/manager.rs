//! Core GitManager implementation
//!
//! Contains the GitManager struct and its basic operations

use git2::{Error as GitError, Repository, Signature};
use std::path::{Path, PathBuf};

/// Git manager for repository operations
pub struct GitManager {
    pub(crate) repo: Repository,
    author_name: String,
    author_email: String,
}

impl GitManager {
    /// Create a new GitManager for the given repository path
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, GitError> {
        let repo = Repository::open(path)?;
        Ok(Self {
            repo,
            author_name: "Swarm Coordinator".to_string(),
            author_email: "swarm@localhost".to_string(),
        })
    }

    /// Identity used for commits the coordinator creates
    pub fn with_author(mut self, name: &str, email: &str) -> Self {
        self.author_name = name.to_string();
        self.author_email = email.to_string();
        self
    }

    /// Get the repository path (the `.git` directory)
    pub fn repo_path(&self) -> PathBuf {
        self.repo.path().to_path_buf()
    }

    /// Get the working directory
    pub fn workdir(&self) -> Result<&Path, GitError> {
        self.repo
            .workdir()
            .ok_or_else(|| GitError::from_str("Repository has no working directory"))
    }

    pub(crate) fn signature(&self) -> Result<Signature<'static>, GitError> {
        Signature::now(&self.author_name, &self.author_email)
    }
}
