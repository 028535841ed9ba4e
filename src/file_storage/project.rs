//! Project descriptor (`project.json`) and the distribution summary

use super::{read_json_opt, write_json, FileResult};
use crate::distributor::DistributionSummary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectFile {
    pub name: String,
    pub repo_path: String,
    #[serde(default)]
    pub base_branch: Option<String>,
    pub created_at: DateTime<Utc>,
}

pub fn get_project_path(coordination_dir: &Path) -> PathBuf {
    coordination_dir.join("project.json")
}

pub fn get_distribution_path(coordination_dir: &Path) -> PathBuf {
    coordination_dir.join("distribution_summary.json")
}

pub fn save_project(coordination_dir: &Path, project: &ProjectFile) -> FileResult<()> {
    write_json(&get_project_path(coordination_dir), project)
}

pub fn load_project(coordination_dir: &Path) -> FileResult<Option<ProjectFile>> {
    read_json_opt(&get_project_path(coordination_dir))
}

pub fn save_distribution(
    coordination_dir: &Path,
    summary: &DistributionSummary,
) -> FileResult<PathBuf> {
    let path = get_distribution_path(coordination_dir);
    write_json(&path, summary)?;
    Ok(path)
}

pub fn load_distribution(coordination_dir: &Path) -> FileResult<Option<DistributionSummary>> {
    read_json_opt(&get_distribution_path(coordination_dir))
}
