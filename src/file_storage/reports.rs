//! Planning and merge reports in `reports/`

use super::{atomic_write, FileResult};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

pub fn get_reports_dir(coordination_dir: &Path) -> PathBuf {
    coordination_dir.join("reports")
}

/// Timestamp suffix used in report and branch names
pub fn report_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y%m%d-%H%M%S").to_string()
}

/// Write `reports/{kind}_{timestamp}.md`
pub fn write_report(
    coordination_dir: &Path,
    kind: &str,
    at: DateTime<Utc>,
    content: &str,
) -> FileResult<PathBuf> {
    let path = get_reports_dir(coordination_dir)
        .join(format!("{}_{}.md", kind, report_timestamp(at)));
    atomic_write(&path, content)?;
    Ok(path)
}

/// Report files, newest name last
pub fn list_reports(coordination_dir: &Path) -> FileResult<Vec<PathBuf>> {
    let dir = get_reports_dir(coordination_dir);
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut paths: Vec<PathBuf> = std::fs::read_dir(&dir)
        .map_err(|e| format!("Failed to read reports directory {:?}: {}", dir, e))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().map_or(false, |ext| ext == "md"))
        .collect();
    paths.sort();
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn test_write_report() {
        let temp_dir = TempDir::new().unwrap();
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 30, 5).unwrap();

        let path = write_report(temp_dir.path(), "merge_report", at, "# Report").unwrap();
        assert!(path.ends_with("reports/merge_report_20260301-123005.md"));
        assert_eq!(list_reports(temp_dir.path()).unwrap(), vec![path]);
    }
}
