// Layered configuration system

pub mod loader;
pub mod merger;

pub use loader::{
    ConfigLoader, DurationTable, MergeConfig, PlannerConfig, ProjectSettings, ProtocolConfig,
    SwarmConfig, PROJECT_DIR_NAME,
};
pub use merger::{ConfigMerger, PartialConfig};

use anyhow::Result;
use std::path::Path;

/// Load and merge configuration from all sources
/// Priority: CLI -> Project -> Global -> Defaults
pub fn load_merged_config(
    project_path: Option<&Path>,
    cli_overrides: Option<PartialConfig>,
) -> Result<SwarmConfig> {
    let loader = match project_path {
        Some(path) => ConfigLoader::new().with_project_path(path),
        None => ConfigLoader::new(),
    };
    load_with(&loader, cli_overrides)
}

/// Merge using an explicit loader
pub fn load_with(
    loader: &ConfigLoader,
    cli_overrides: Option<PartialConfig>,
) -> Result<SwarmConfig> {
    log::debug!(
        "Loading config (global: {:?}, project: {:?})",
        loader.global_config_path(),
        loader.project_config_path()
    );
    let global = match loader.load_global() {
        Ok(config) => config,
        Err(e) => {
            log::warn!("Ignoring global config: {}", e);
            None
        }
    };
    // A broken project config is an error the user has to see
    let project = loader.load_project()?;

    let config = ConfigMerger::new()
        .with_global(global)
        .with_project(project)
        .with_cli(cli_overrides)
        .merge();

    loader::validate_config(&config)?;
    Ok(config)
}
