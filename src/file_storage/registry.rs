//! Agent registry file storage (`agents.json`)

use super::{read_json_opt, write_json, FileResult};
use crate::models::Agent;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const REGISTRY_FILE_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRegistryFile {
    pub version: u32,
    pub updated_at: DateTime<Utc>,
    pub agents: Vec<Agent>,
}

pub fn get_registry_path(coordination_dir: &Path) -> PathBuf {
    coordination_dir.join("agents.json")
}

/// Replace the registry with the given agents
pub fn save_agents(coordination_dir: &Path, agents: &[Agent]) -> FileResult<()> {
    let file = AgentRegistryFile {
        version: REGISTRY_FILE_VERSION,
        updated_at: Utc::now(),
        agents: agents.to_vec(),
    };
    write_json(&get_registry_path(coordination_dir), &file)
}

/// Load registered agents; an absent registry means none
pub fn load_agents(coordination_dir: &Path) -> FileResult<Vec<Agent>> {
    Ok(read_json_opt::<AgentRegistryFile>(&get_registry_path(coordination_dir))?
        .map(|f| f.agents)
        .unwrap_or_default())
}

/// Append tasks to one agent's queue
pub fn extend_assignment(
    coordination_dir: &Path,
    agent_id: &str,
    tasks: &[String],
) -> FileResult<()> {
    let mut agents = load_agents(coordination_dir)?;
    let agent = agents
        .iter_mut()
        .find(|a| a.id == agent_id)
        .ok_or_else(|| format!("Agent {} is not registered", agent_id))?;

    for task in tasks {
        if !agent.assigned_tasks.contains(task) {
            agent.assigned_tasks.push(task.clone());
        }
    }
    save_agents(coordination_dir, &agents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn agent(id: &str, tasks: &[&str]) -> Agent {
        Agent {
            id: id.to_string(),
            branch: format!("swarm-agent-{}", id),
            worktree_path: format!("/tmp/{}", id),
            assigned_tasks: tasks.iter().map(|t| t.to_string()).collect(),
            registered_at: Utc::now(),
        }
    }

    #[test]
    fn test_save_and_load_agents() {
        let temp_dir = TempDir::new().unwrap();
        assert!(load_agents(temp_dir.path()).unwrap().is_empty());

        let agents = vec![agent("agent-1", &["A"]), agent("agent-2", &[])];
        save_agents(temp_dir.path(), &agents).unwrap();

        assert_eq!(load_agents(temp_dir.path()).unwrap(), agents);
    }

    #[test]
    fn test_extend_assignment() {
        let temp_dir = TempDir::new().unwrap();
        save_agents(temp_dir.path(), &[agent("agent-1", &["A"])]).unwrap();

        extend_assignment(temp_dir.path(), "agent-1", &["A".into(), "B".into()]).unwrap();
        let agents = load_agents(temp_dir.path()).unwrap();
        assert_eq!(agents[0].assigned_tasks, vec!["A", "B"]);

        assert!(extend_assignment(temp_dir.path(), "agent-9", &[]).is_err());
    }
}
