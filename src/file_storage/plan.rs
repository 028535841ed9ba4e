//! Task registry: `tasks/task_plan.json` plus a CSV export for spreadsheets

use super::{atomic_write, read_json_opt, write_json, FileResult};
use crate::models::Task;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const PLAN_FILE_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPlanFile {
    pub version: u32,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub tasks: Vec<Task>,
}

pub fn get_tasks_dir(coordination_dir: &Path) -> PathBuf {
    coordination_dir.join("tasks")
}

pub fn get_plan_path(coordination_dir: &Path) -> PathBuf {
    get_tasks_dir(coordination_dir).join("task_plan.json")
}

pub fn get_plan_csv_path(coordination_dir: &Path) -> PathBuf {
    get_tasks_dir(coordination_dir).join("task_plan.csv")
}

/// Write the plan as JSON and CSV
pub fn save_task_plan(coordination_dir: &Path, title: &str, tasks: &[Task]) -> FileResult<PathBuf> {
    let file = TaskPlanFile {
        version: PLAN_FILE_VERSION,
        title: title.to_string(),
        created_at: Utc::now(),
        tasks: tasks.to_vec(),
    };
    let path = get_plan_path(coordination_dir);
    write_json(&path, &file)?;
    atomic_write(&get_plan_csv_path(coordination_dir), &to_csv(tasks))?;
    Ok(path)
}

pub fn load_task_plan(coordination_dir: &Path) -> FileResult<Option<TaskPlanFile>> {
    read_json_opt(&get_plan_path(coordination_dir))
}

fn to_csv(tasks: &[Task]) -> String {
    let mut out = String::from(
        "id,description,category,complexity,estimated_minutes,dependencies,status,priority,skills\n",
    );
    for task in tasks {
        let deps: Vec<&str> = task.dependency_ids().collect();
        let row = [
            task.id.as_str(),
            task.description.as_str(),
            task.category.as_str(),
            task.complexity.as_str(),
            &task.estimated_minutes.to_string(),
            &deps.join(";"),
            task.status.as_str(),
            task.priority.as_str(),
            &task.required_skills.join(";"),
        ]
        .iter()
        .map(|field| csv_field(field))
        .collect::<Vec<_>>()
        .join(",");
        out.push_str(&row);
        out.push('\n');
    }
    out
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
