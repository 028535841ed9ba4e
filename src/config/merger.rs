// Configuration merging with priority

use crate::config::loader::SwarmConfig;
use serde::{Deserialize, Serialize};

/// Partial configuration for CLI overrides
/// Uses Option<T> for all fields to support partial overrides
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PartialConfig {
    pub num_agents: Option<usize>,
    pub branch_prefix: Option<String>,
    pub worktree_dir: Option<String>,
    pub base_branch: Option<String>,
    pub heartbeat_grace_secs: Option<u64>,
    pub poll_timeout_ms: Option<u64>,
    pub poll_workers: Option<usize>,
    pub auto_resolve: Option<bool>,
}

/// Configuration merger
/// Priority order: CLI -> Project -> Global -> Defaults
pub struct ConfigMerger {
    defaults: SwarmConfig,
    global: Option<SwarmConfig>,
    project: Option<SwarmConfig>,
    cli: Option<PartialConfig>,
}

impl ConfigMerger {
    pub fn new() -> Self {
        Self {
            defaults: SwarmConfig::default(),
            global: None,
            project: None,
            cli: None,
        }
    }

    pub fn with_global(mut self, config: Option<SwarmConfig>) -> Self {
        self.global = config;
        self
    }

    pub fn with_project(mut self, config: Option<SwarmConfig>) -> Self {
        self.project = config;
        self
    }

    pub fn with_cli(mut self, config: Option<PartialConfig>) -> Self {
        self.cli = config;
        self
    }

    /// Merge all layers. File layers are complete configs (serde fills
    /// defaults), so the most specific file wins section by section.
    pub fn merge(&self) -> SwarmConfig {
        let mut result = self.defaults.clone();

        for layer in [&self.global, &self.project].into_iter().flatten() {
            result = self.merge_full(&result, layer);
        }

        if let Some(ref cli) = self.cli {
            self.apply_partial(&mut result, cli);
        }

        result
    }

    /// Sections equal to the defaults in the override keep the base value
    fn merge_full(&self, base: &SwarmConfig, over: &SwarmConfig) -> SwarmConfig {
        let defaults = &self.defaults;
        SwarmConfig {
            project: pick(&base.project, &over.project, &defaults.project),
            planner: pick(&base.planner, &over.planner, &defaults.planner),
            protocol: pick(&base.protocol, &over.protocol, &defaults.protocol),
            merge: pick(&base.merge, &over.merge, &defaults.merge),
        }
    }

    fn apply_partial(&self, result: &mut SwarmConfig, cli: &PartialConfig) {
        if let Some(n) = cli.num_agents {
            result.project.num_agents = n;
        }
        if let Some(ref prefix) = cli.branch_prefix {
            result.project.branch_prefix = prefix.clone();
        }
        if let Some(ref dir) = cli.worktree_dir {
            result.project.worktree_dir = dir.clone();
        }
        if let Some(ref base) = cli.base_branch {
            result.project.base_branch = Some(base.clone());
        }
        if let Some(grace) = cli.heartbeat_grace_secs {
            result.protocol.heartbeat_grace_secs = grace;
        }
        if let Some(timeout) = cli.poll_timeout_ms {
            result.protocol.poll_timeout_ms = timeout;
        }
        if let Some(workers) = cli.poll_workers {
            result.protocol.poll_workers = workers;
        }
        if let Some(auto) = cli.auto_resolve {
            result.merge.auto_resolve = auto;
        }
    }
}

impl Default for ConfigMerger {
    fn default() -> Self {
        Self::new()
    }
}

fn pick<T: Clone + PartialEq>(base: &T, over: &T, default: &T) -> T {
    if over == default {
        base.clone()
    } else {
        over.clone()
    }
}
