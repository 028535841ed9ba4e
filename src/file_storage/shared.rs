//! Shared resource announcements in `shared/SHARED-{name}.json`

use super::{read_json_dir, sanitize_name, write_json, FileResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const SHARED_PREFIX: &str = "SHARED-";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SharedResourceRecord {
    pub name: String,
    pub created_by: String,
    pub file_path: String,
    pub description: String,
    #[serde(default)]
    pub usage_example: Option<String>,
    pub created_at: DateTime<Utc>,
}

pub fn get_shared_dir(coordination_dir: &Path) -> PathBuf {
    coordination_dir.join("shared")
}

/// Write (or overwrite) an announcement; the latest publisher of a name wins
pub fn save_shared_resource(
    coordination_dir: &Path,
    record: &SharedResourceRecord,
) -> FileResult<PathBuf> {
    let path = get_shared_dir(coordination_dir)
        .join(format!("{}{}.json", SHARED_PREFIX, sanitize_name(&record.name)));
    write_json(&path, record)?;
    Ok(path)
}

pub fn list_shared_resources(coordination_dir: &Path) -> FileResult<Vec<SharedResourceRecord>> {
    read_json_dir(&get_shared_dir(coordination_dir), SHARED_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_list_shared() {
        let temp_dir = TempDir::new().unwrap();
        let record = SharedResourceRecord {
            name: "User Model".to_string(),
            created_by: "agent-1".to_string(),
            file_path: "src/models/user.rs".to_string(),
            description: "User entity".to_string(),
            usage_example: Some("use crate::models::User;".to_string()),
            created_at: Utc::now(),
        };

        let path = save_shared_resource(temp_dir.path(), &record).unwrap();
        assert!(path.ends_with("SHARED-user-model.json"));
        assert_eq!(list_shared_resources(temp_dir.path()).unwrap(), vec![record]);
    }
}
