//! File-based storage for the coordination directory
//!
//! All swarm state lives in plain files under the repository so it
//! survives coordinator restarts and can be inspected by agents.
//!
//! ## Layout
//!
//! Per-project coordination directory (`.swarm/<project>/`):
//! - `tasks/` - Task registry (`task_plan.json`, `task_plan.csv`) and rendered instructions
//! - `project.json` - Project descriptor
//! - `agents.json` - Agent registry
//! - `distribution_summary.json` - Per-agent load after distribution
//! - `events/` - Per-agent append-only JSONL event streams plus fold checkpoints
//! - `blockers/` - One record per open or resolved blocker
//! - `shared/` - Shared resource announcements
//! - `messages/` - Direct agent-to-agent messages
//! - `reports/` - Planning and merge reports

pub mod blockers;
pub mod events;
pub mod messages;
pub mod plan;
pub mod project;
pub mod registry;
pub mod reports;
pub mod shared;

use crate::config::PROJECT_DIR_NAME;
use std::fs;
use std::path::{Path, PathBuf};

/// Common file operations result type
pub type FileResult<T> = Result<T, String>;

const ACTIVE_PROJECT_FILE: &str = "active_project";

const SUBDIRS: &[&str] = &[
    "tasks", "events", "blockers", "shared", "messages", "reports",
];

/// Get the `.swarm` directory for a repository
pub fn get_swarm_dir(repo_path: &Path) -> PathBuf {
    repo_path.join(PROJECT_DIR_NAME)
}

/// Get the coordination directory for a project
pub fn get_coordination_dir(repo_path: &Path, project: &str) -> PathBuf {
    get_swarm_dir(repo_path).join(sanitize_name(project))
}

/// Lower-case, filesystem-safe form of a name
pub fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();
    let collapsed = cleaned
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    if collapsed.is_empty() {
        "project".to_string()
    } else {
        collapsed
    }
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir(path: &Path) -> FileResult<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .map_err(|e| format!("Failed to create directory {:?}: {}", path, e))?;
    }
    Ok(())
}

/// Write data to a file atomically (temp file + rename)
pub fn atomic_write(path: &Path, content: &str) -> FileResult<()> {
    let temp_path = path.with_extension("tmp");

    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }

    fs::write(&temp_path, content)
        .map_err(|e| format!("Failed to write temp file {:?}: {}", temp_path, e))?;

    fs::rename(&temp_path, path)
        .map_err(|e| format!("Failed to rename {:?} to {:?}: {}", temp_path, path, e))?;

    Ok(())
}

/// Read a JSON file and deserialize it
pub fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> FileResult<T> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read file {:?}: {}", path, e))?;

    serde_json::from_str(&content)
        .map_err(|e| format!("Failed to parse JSON from {:?}: {}", path, e))
}

/// Read a JSON file, returning `None` when it does not exist
pub fn read_json_opt<T: serde::de::DeserializeOwned>(path: &Path) -> FileResult<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    read_json(path).map(Some)
}

/// Write data as pretty-printed JSON atomically
pub fn write_json<T: serde::Serialize>(path: &Path, data: &T) -> FileResult<()> {
    let content = serde_json::to_string_pretty(data)
        .map_err(|e| format!("Failed to serialize to JSON: {}", e))?;

    atomic_write(path, &content)
}

/// Load every `*.json` record in a directory whose file name starts with `prefix`.
/// Unreadable records are skipped with a warning.
pub fn read_json_dir<T: serde::de::DeserializeOwned>(
    dir: &Path,
    prefix: &str,
) -> FileResult<Vec<T>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut paths: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(|e| format!("Failed to read directory {:?}: {}", dir, e))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.extension().map_or(false, |ext| ext == "json")
                && path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .map_or(false, |n| n.starts_with(prefix))
        })
        .collect();
    paths.sort();

    let mut records = Vec::with_capacity(paths.len());
    for path in paths {
        match read_json(&path) {
            Ok(record) => records.push(record),
            Err(e) => log::warn!("[FileStorage] Skipping unreadable record: {}", e),
        }
    }
    Ok(records)
}

/// Initialize the coordination directory for a project with `.gitignore` and README
pub fn init_coordination_dir(repo_path: &Path, project: &str) -> FileResult<PathBuf> {
    let dir = get_coordination_dir(repo_path, project);
    ensure_dir(&dir)?;

    for sub in SUBDIRS {
        ensure_dir(&dir.join(sub))?;
    }

    let gitignore_path = dir.join(".gitignore");
    if !gitignore_path.exists() {
        let gitignore_content = r#"# Runtime files (not for sharing)
*.lock
*.tmp
events/checkpoints.json
"#;
        fs::write(&gitignore_path, gitignore_content)
            .map_err(|e| format!("Failed to write .gitignore: {}", e))?;
    }

    let readme_path = dir.join("README.md");
    if !readme_path.exists() {
        let readme = format!(
            r#"# Swarm coordination: {project}

- `tasks/` task plan and per-agent instructions
- `agents.json` agent registry
- `events/<agent>.jsonl` append-only agent event streams
- `blockers/` blocker records
- `shared/` shared resource announcements
- `messages/` direct messages between agents
- `reports/` planning and merge reports

Agents report through `swarm-coordinator event <kind>`; never edit another agent's stream.
"#
        );
        fs::write(&readme_path, readme)
            .map_err(|e| format!("Failed to write README: {}", e))?;
    }

    Ok(dir)
}

/// Record which project is active for this repository
pub fn set_active_project(repo_path: &Path, project: &str) -> FileResult<()> {
    atomic_write(
        &get_swarm_dir(repo_path).join(ACTIVE_PROJECT_FILE),
        &sanitize_name(project),
    )
}

/// Name of the active project, if one was initialized
pub fn get_active_project(repo_path: &Path) -> FileResult<Option<String>> {
    let path = get_swarm_dir(repo_path).join(ACTIVE_PROJECT_FILE);
    if !path.exists() {
        return Ok(None);
    }
    let name = fs::read_to_string(&path)
        .map_err(|e| format!("Failed to read active project marker {:?}: {}", path, e))?;
    let name = name.trim();
    Ok((!name.is_empty()).then(|| name.to_string()))
}
