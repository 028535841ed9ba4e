// Configuration file loading

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Directory holding project-local coordinator state and config
pub const PROJECT_DIR_NAME: &str = ".swarm";

/// Swarm coordinator configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct SwarmConfig {
    /// Project defaults (agent count, branch naming, worktrees)
    #[serde(default)]
    pub project: ProjectSettings,
    /// Planning heuristics
    #[serde(default)]
    pub planner: PlannerConfig,
    /// Coordination protocol timing
    #[serde(default)]
    pub protocol: ProtocolConfig,
    /// Merge orchestration
    #[serde(default)]
    pub merge: MergeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectSettings {
    /// Number of agents launched by default
    #[serde(rename = "numAgents", alias = "num_agents", default = "default_num_agents")]
    pub num_agents: usize,
    /// Prefix for agent branches: `{prefix}-{project}-{i}`
    #[serde(rename = "branchPrefix", alias = "branch_prefix", default = "default_branch_prefix")]
    pub branch_prefix: String,
    /// Worktree parent directory, relative to the repository root
    #[serde(rename = "worktreeDir", alias = "worktree_dir", default = "default_worktree_dir")]
    pub worktree_dir: String,
    /// Base branch for agent branches and the integration branch
    #[serde(rename = "baseBranch", alias = "base_branch", default)]
    pub base_branch: Option<String>,
    /// Optional instruction template overriding the built-in one
    #[serde(rename = "instructionTemplate", alias = "instruction_template", default)]
    pub instruction_template: Option<String>,
}

fn default_num_agents() -> usize {
    3
}
fn default_branch_prefix() -> String {
    "swarm-agent".to_string()
}
fn default_worktree_dir() -> String {
    "../swarm-worktrees".to_string()
}

impl Default for ProjectSettings {
    fn default() -> Self {
        Self {
            num_agents: default_num_agents(),
            branch_prefix: default_branch_prefix(),
            worktree_dir: default_worktree_dir(),
            base_branch: None,
            instruction_template: None,
        }
    }
}

/// Planner policy: keyword tables and the duration lookup
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlannerConfig {
    #[serde(rename = "highKeywords", alias = "high_keywords", default = "default_high_keywords")]
    pub high_keywords: Vec<String>,
    #[serde(rename = "lowKeywords", alias = "low_keywords", default = "default_low_keywords")]
    pub low_keywords: Vec<String>,
    #[serde(
        rename = "trivialKeywords",
        alias = "trivial_keywords",
        default = "default_trivial_keywords"
    )]
    pub trivial_keywords: Vec<String>,
    /// Descriptions longer than this (in words) bump complexity by one level
    #[serde(
        rename = "longDescriptionWords",
        alias = "long_description_words",
        default = "default_long_description_words"
    )]
    pub long_description_words: usize,
    /// High-keyword hits at or above this count mark a task critical
    #[serde(
        rename = "criticalKeywordHits",
        alias = "critical_keyword_hits",
        default = "default_critical_keyword_hits"
    )]
    pub critical_keyword_hits: usize,
    #[serde(default)]
    pub durations: DurationTable,
    /// Infer edges from categories and subjects in addition to declared ones
    #[serde(rename = "inferDependencies", alias = "infer_dependencies", default = "default_true")]
    pub infer_dependencies: bool,
}

fn default_true() -> bool {
    true
}
fn default_long_description_words() -> usize {
    40
}
fn default_critical_keyword_hits() -> usize {
    3
}

fn default_high_keywords() -> Vec<String> {
    [
        "refactor", "architect", "design", "optimize", "migration", "security",
        "performance", "scale", "distributed", "integration",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_low_keywords() -> Vec<String> {
    [
        "fix", "update", "add", "remove", "rename", "move", "document", "comment",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_trivial_keywords() -> Vec<String> {
    ["typo", "format", "bump version"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            high_keywords: default_high_keywords(),
            low_keywords: default_low_keywords(),
            trivial_keywords: default_trivial_keywords(),
            long_description_words: default_long_description_words(),
            critical_keyword_hits: default_critical_keyword_hits(),
            durations: DurationTable::default(),
            infer_dependencies: default_true(),
        }
    }
}

/// Estimated minutes per complexity level
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DurationTable {
    #[serde(default = "default_trivial_minutes")]
    pub trivial: u32,
    #[serde(default = "default_low_minutes")]
    pub low: u32,
    #[serde(default = "default_medium_minutes")]
    pub medium: u32,
    #[serde(default = "default_high_minutes")]
    pub high: u32,
    #[serde(default = "default_critical_minutes")]
    pub critical: u32,
}

fn default_trivial_minutes() -> u32 {
    15
}
fn default_low_minutes() -> u32 {
    30
}
fn default_medium_minutes() -> u32 {
    90
}
fn default_high_minutes() -> u32 {
    180
}
fn default_critical_minutes() -> u32 {
    360
}

impl Default for DurationTable {
    fn default() -> Self {
        Self {
            trivial: default_trivial_minutes(),
            low: default_low_minutes(),
            medium: default_medium_minutes(),
            high: default_high_minutes(),
            critical: default_critical_minutes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProtocolConfig {
    /// Seconds without any event before a working agent is failed
    #[serde(
        rename = "heartbeatGraceSecs",
        alias = "heartbeat_grace_secs",
        default = "default_heartbeat_grace"
    )]
    pub heartbeat_grace_secs: u64,
    /// Per-agent read timeout during a poll
    #[serde(rename = "pollTimeoutMs", alias = "poll_timeout_ms", default = "default_poll_timeout")]
    pub poll_timeout_ms: u64,
    /// Concurrent stream readers during a poll
    #[serde(rename = "pollWorkers", alias = "poll_workers", default = "default_poll_workers")]
    pub poll_workers: usize,
}

fn default_heartbeat_grace() -> u64 {
    600
}
fn default_poll_timeout() -> u64 {
    2000
}
fn default_poll_workers() -> usize {
    4
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            heartbeat_grace_secs: default_heartbeat_grace(),
            poll_timeout_ms: default_poll_timeout(),
            poll_workers: default_poll_workers(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MergeConfig {
    /// Integration branches are named `{prefix}/{project}-{timestamp}`
    #[serde(
        rename = "integrationPrefix",
        alias = "integration_prefix",
        default = "default_integration_prefix"
    )]
    pub integration_prefix: String,
    #[serde(rename = "authorName", alias = "author_name", default = "default_author_name")]
    pub author_name: String,
    #[serde(rename = "authorEmail", alias = "author_email", default = "default_author_email")]
    pub author_email: String,
    /// Disable to escalate every conflict regardless of category
    #[serde(rename = "autoResolve", alias = "auto_resolve", default = "default_true")]
    pub auto_resolve: bool,
}

fn default_integration_prefix() -> String {
    "merge".to_string()
}
fn default_author_name() -> String {
    "Swarm Coordinator".to_string()
}
fn default_author_email() -> String {
    "swarm@localhost".to_string()
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            integration_prefix: default_integration_prefix(),
            author_name: default_author_name(),
            author_email: default_author_email(),
            auto_resolve: default_true(),
        }
    }
}

/// Config loader
pub struct ConfigLoader {
    /// Global config path
    global_path: Option<PathBuf>,
    /// Project config path
    project_path: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            global_path: Self::get_global_config_path(),
            project_path: None,
        }
    }

    /// Set the repository root whose `.swarm/config.toml` is the project layer
    pub fn with_project_path(mut self, path: &Path) -> Self {
        self.project_path = Some(path.join(PROJECT_DIR_NAME).join("config.toml"));
        self
    }

    /// Replace the global config path (tests and `--config`)
    pub fn with_global_path(mut self, path: Option<PathBuf>) -> Self {
        self.global_path = path;
        self
    }

    fn get_global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("swarm-coordinator").join("config.toml"))
    }

    pub fn load_global(&self) -> Result<Option<SwarmConfig>> {
        match self.global_path {
            Some(ref path) => self.load_from_path(path),
            None => Ok(None),
        }
    }

    pub fn load_project(&self) -> Result<Option<SwarmConfig>> {
        match self.project_path {
            Some(ref path) => self.load_from_path(path),
            None => Ok(None),
        }
    }

    /// Load config from a specific path
    pub fn load_from_path(&self, path: &Path) -> Result<Option<SwarmConfig>> {
        if !path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| anyhow!("Failed to read config file '{}': {}", path.display(), e))?;

        let config: SwarmConfig = toml::from_str(&contents)
            .map_err(|e| anyhow!("Failed to parse config file '{}': {}", path.display(), e))?;

        validate_config(&config)?;

        Ok(Some(config))
    }

    pub fn global_config_path(&self) -> Option<&Path> {
        self.global_path.as_deref()
    }

    pub fn project_config_path(&self) -> Option<&Path> {
        self.project_path.as_deref()
    }

    /// Save config to the project path
    pub fn save_project(&self, config: &SwarmConfig) -> Result<()> {
        match self.project_path {
            Some(ref path) => self.save_to_path(path, config),
            None => Err(anyhow!("No project config path available")),
        }
    }

    pub fn save_to_path(&self, path: &Path, config: &SwarmConfig) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    anyhow!("Failed to create config directory '{}': {}", parent.display(), e)
                })?;
            }
        }

        validate_config(config)?;

        let contents = toml::to_string_pretty(config)
            .map_err(|e| anyhow!("Failed to serialize config: {}", e))?;

        fs::write(path, contents)
            .map_err(|e| anyhow!("Failed to write config file '{}': {}", path.display(), e))?;

        log::info!("Saved config to: {}", path.display());
        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Longest accepted heartbeat grace period (30 days)
pub const MAX_HEARTBEAT_GRACE_SECS: u64 = 30 * 24 * 60 * 60;

/// Validate config values
pub fn validate_config(config: &SwarmConfig) -> Result<()> {
    if config.project.num_agents == 0 {
        return Err(anyhow!("num_agents must be greater than 0"));
    }
    if config.project.branch_prefix.trim().is_empty() {
        return Err(anyhow!("branch_prefix cannot be empty"));
    }
    if config.protocol.heartbeat_grace_secs == 0 {
        return Err(anyhow!("heartbeat_grace_secs must be greater than 0"));
    }
    if config.protocol.heartbeat_grace_secs > MAX_HEARTBEAT_GRACE_SECS {
        return Err(anyhow!(
            "heartbeat_grace_secs must be at most {}",
            MAX_HEARTBEAT_GRACE_SECS
        ));
    }
    if config.protocol.poll_timeout_ms == 0 {
        return Err(anyhow!("poll_timeout_ms must be greater than 0"));
    }
    if config.protocol.poll_workers == 0 {
        return Err(anyhow!("poll_workers must be greater than 0"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_loads_project_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_dir = temp_dir.path().join(PROJECT_DIR_NAME);
        fs::create_dir_all(&config_dir).unwrap();

        let config_content = r#"
[project]
num_agents = 5
branch_prefix = "bee"

[protocol]
heartbeatGraceSecs = 120
"#;
        fs::write(config_dir.join("config.toml"), config_content).unwrap();

        let loader = ConfigLoader::new()
            .with_global_path(None)
            .with_project_path(temp_dir.path());

        let config = loader.load_project().unwrap().unwrap();
        assert_eq!(config.project.num_agents, 5);
        assert_eq!(config.project.branch_prefix, "bee");
        assert_eq!(config.protocol.heartbeat_grace_secs, 120);
        // Untouched sections keep defaults
        assert_eq!(config.protocol.poll_workers, 4);
        assert_eq!(config.planner.durations.high, 180);
    }

    #[test]
    fn test_handles_missing_config_files_gracefully() {
        let temp_dir = TempDir::new().unwrap();
        let loader = ConfigLoader::new()
            .with_global_path(Some(temp_dir.path().join("missing.toml")))
            .with_project_path(temp_dir.path());

        assert!(loader.load_global().unwrap().is_none());
        assert!(loader.load_project().unwrap().is_none());
    }

    #[test]
    fn test_rejects_zero_workers() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[protocol]\npoll_workers = 0\n").unwrap();

        let loader = ConfigLoader::new().with_global_path(None);
        let result = loader.load_from_path(&path);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("poll_workers"));
    }

    #[test]
    fn test_rejects_unbounded_heartbeat_grace() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[protocol]\nheartbeat_grace_secs = 9223372036854775807\n").unwrap();

        let loader = ConfigLoader::new().with_global_path(None);
        let result = loader.load_from_path(&path);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("heartbeat_grace_secs"));

        let mut config = SwarmConfig::default();
        config.protocol.heartbeat_grace_secs = MAX_HEARTBEAT_GRACE_SECS;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_planner_keywords_overridable() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(
            &path,
            "[planner]\nhigh_keywords = [\"rewrite\"]\n\n[planner.durations]\nmedium = 60\n",
        )
        .unwrap();

        let config = ConfigLoader::new()
            .with_global_path(None)
            .load_from_path(&path)
            .unwrap()
            .unwrap();
        assert_eq!(config.planner.high_keywords, vec!["rewrite".to_string()]);
        assert_eq!(config.planner.durations.medium, 60);
        assert_eq!(config.planner.durations.low, 30);
    }

    #[test]
    fn test_save_and_reload() {
        let temp_dir = TempDir::new().unwrap();
        let loader = ConfigLoader::new()
            .with_global_path(None)
            .with_project_path(temp_dir.path());

        let mut config = SwarmConfig::default();
        config.project.num_agents = 7;
        loader.save_project(&config).unwrap();

        let reloaded = loader.load_project().unwrap().unwrap();
        assert_eq!(reloaded, config);
    }
}
