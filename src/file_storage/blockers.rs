//! Blocker records in `blockers/{blocker_id}.json`
//!
//! These are a readable projection of blocker and resolution events; the
//! event streams remain the source of truth for agent status.

use super::{read_json_dir, read_json_opt, write_json, FileResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BlockerStatus {
    Open,
    Resolved,
}

impl Default for BlockerStatus {
    fn default() -> Self {
        Self::Open
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BlockerRecord {
    pub id: String,
    pub agent_id: String,
    pub task_id: String,
    pub description: String,
    #[serde(default)]
    pub impact: Option<String>,
    #[serde(default)]
    pub status: BlockerStatus,
    #[serde(default)]
    pub resolution: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub resolved_at: Option<DateTime<Utc>>,
}

pub fn get_blockers_dir(coordination_dir: &Path) -> PathBuf {
    coordination_dir.join("blockers")
}

pub fn get_blocker_path(coordination_dir: &Path, blocker_id: &str) -> PathBuf {
    get_blockers_dir(coordination_dir).join(format!("{}.json", blocker_id))
}

pub fn save_blocker(coordination_dir: &Path, record: &BlockerRecord) -> FileResult<PathBuf> {
    let path = get_blocker_path(coordination_dir, &record.id);
    write_json(&path, record)?;
    Ok(path)
}

pub fn load_blocker(
    coordination_dir: &Path,
    blocker_id: &str,
) -> FileResult<Option<BlockerRecord>> {
    read_json_opt(&get_blocker_path(coordination_dir, blocker_id))
}

/// Mark a blocker resolved; returns the updated record, or `None` if unknown
pub fn mark_resolved(
    coordination_dir: &Path,
    blocker_id: &str,
    resolution: Option<&str>,
    at: DateTime<Utc>,
) -> FileResult<Option<BlockerRecord>> {
    let Some(mut record) = load_blocker(coordination_dir, blocker_id)? else {
        return Ok(None);
    };
    record.status = BlockerStatus::Resolved;
    record.resolution = resolution.map(String::from);
    record.resolved_at = Some(at);
    save_blocker(coordination_dir, &record)?;
    Ok(Some(record))
}

/// List blockers, optionally filtered by status, oldest first
pub fn list_blockers(
    coordination_dir: &Path,
    status: Option<BlockerStatus>,
) -> FileResult<Vec<BlockerRecord>> {
    let mut records: Vec<BlockerRecord> = read_json_dir(&get_blockers_dir(coordination_dir), "")?;
    records.retain(|r| status.map_or(true, |s| r.status == s));
    records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
    Ok(records)
}
