// Per-agent instruction documents rendered with Tera

use crate::file_storage::{atomic_write, ensure_dir};
use crate::file_storage::plan::get_tasks_dir;
use crate::models::Agent;
use crate::planner::TaskGraph;
use anyhow::{anyhow, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tera::{Context, Tera};

const TEMPLATE_NAME: &str = "agent_instructions";

pub const DEFAULT_TEMPLATE: &str = r#"# Swarm Agent Instructions

## Your Identity
You are **{{ agent_id | upper }}** working on the **{{ project_name }}** project.

## Your Workspace
- **Working Directory**: `{{ worktree_path }}`
- **Branch**: `{{ branch }}`
- **Coordination Directory**: `{{ coordination_dir }}`

## Your Assigned Tasks ({{ tasks | length }} tasks, ~{{ total_minutes }} minutes)
{% for task in tasks %}
### {{ task.id }}: {{ task.description }}
- **Category**: {{ task.category }}
- **Complexity**: {{ task.complexity }}
- **Priority**: {{ task.priority }}
- **Estimated time**: {{ task.estimated_minutes }} minutes
{%- if task.dependencies %}
- **Dependencies**: {{ task.dependencies | join(sep=", ") }}
{%- endif %}
{%- if task.required_skills %}
- **Required skills**: {{ task.required_skills | join(sep=", ") }}
{%- endif %}
{% endfor %}
## Rules
1. Work through your queue in order; a task whose dependencies belong to another agent waits for their completion event.
2. Commit after each finished task.
3. Report blockers as soon as they appear.

## Reporting
- Progress: `swarm-coordinator event --agent {{ agent_id }} progress <ID> --percent <N> -m "<note>"`
- Heartbeat: `swarm-coordinator event --agent {{ agent_id }} heartbeat`
- Blocker: `swarm-coordinator event --agent {{ agent_id }} blocker <ID> "<description>"`
- Shared resource: `swarm-coordinator event --agent {{ agent_id }} share <name> <path> "<description>"`
- Completion: `swarm-coordinator event --agent {{ agent_id }} complete <ID>...`
- Messages: `swarm-coordinator event --agent {{ agent_id }} inbox`
"#;

#[derive(Debug, Clone, Serialize)]
pub struct InstructionTask {
    pub id: String,
    pub description: String,
    pub category: String,
    pub complexity: String,
    pub priority: String,
    pub estimated_minutes: u32,
    pub dependencies: Vec<String>,
    pub required_skills: Vec<String>,
}

/// Data handed to the instruction template
#[derive(Debug, Clone, Serialize)]
pub struct AgentInstructions {
    pub agent_id: String,
    pub project_name: String,
    pub branch: String,
    pub worktree_path: String,
    pub coordination_dir: String,
    pub tasks: Vec<InstructionTask>,
    pub total_minutes: u64,
}

impl AgentInstructions {
    pub fn build(
        agent: &Agent,
        project_name: &str,
        coordination_dir: &Path,
        graph: &TaskGraph,
    ) -> Self {
        let tasks: Vec<InstructionTask> = agent
            .assigned_tasks
            .iter()
            .filter_map(|id| graph.task(id))
            .map(|task| InstructionTask {
                id: task.id.clone(),
                description: task.description.clone(),
                category: task.category.clone(),
                complexity: task.complexity.as_str().to_string(),
                priority: task.priority.as_str().to_string(),
                estimated_minutes: task.estimated_minutes,
                dependencies: task.dependency_ids().map(String::from).collect(),
                required_skills: task.required_skills.clone(),
            })
            .collect();

        Self {
            agent_id: agent.id.clone(),
            project_name: project_name.to_string(),
            branch: agent.branch.clone(),
            worktree_path: agent.worktree_path.clone(),
            coordination_dir: coordination_dir.display().to_string(),
            total_minutes: tasks.iter().map(|t| t.estimated_minutes as u64).sum(),
            tasks,
        }
    }
}

pub struct InstructionRenderer {
    tera: Tera,
}

impl InstructionRenderer {
    /// Use the project template file when given, otherwise the built-in one
    pub fn new(template_path: Option<&Path>) -> Result<Self> {
        let content = match template_path {
            Some(path) => {
                log::info!("[Distributor] Using instruction template {:?}", path);
                std::fs::read_to_string(path)
                    .map_err(|e| anyhow!("Failed to read template {:?}: {}", path, e))?
            }
            None => DEFAULT_TEMPLATE.to_string(),
        };
        Self::from_template(&content)
    }

    pub fn from_template(template: &str) -> Result<Self> {
        let mut tera = Tera::default();
        tera.add_raw_template(TEMPLATE_NAME, template)
            .map_err(|e| anyhow!("Failed to add template '{}': {}", TEMPLATE_NAME, e))?;
        Ok(Self { tera })
    }

    pub fn render(&self, instructions: &AgentInstructions) -> Result<String> {
        let context = Context::from_serialize(instructions)
            .map_err(|e| anyhow!("Failed to build template context: {}", e))?;
        self.tera
            .render(TEMPLATE_NAME, &context)
            .map_err(|e| anyhow!("Failed to render template '{}': {}", TEMPLATE_NAME, e))
    }

    /// Write `tasks/{agent}_instructions.md`, plus `.swarm/agent_instructions.md`
    /// inside the agent's worktree when it exists. Returns written paths.
    pub fn write(
        &self,
        coordination_dir: &Path,
        instructions: &AgentInstructions,
    ) -> Result<Vec<PathBuf>> {
        let rendered = self.render(instructions)?;
        let mut written = Vec::new();

        let path = get_tasks_dir(coordination_dir)
            .join(format!("{}_instructions.md", instructions.agent_id));
        atomic_write(&path, &rendered).map_err(|e| anyhow!(e))?;
        written.push(path);

        let worktree = Path::new(&instructions.worktree_path);
        if !instructions.worktree_path.is_empty() && worktree.is_dir() {
            let swarm_dir = worktree.join(".swarm");
            ensure_dir(&swarm_dir).map_err(|e| anyhow!(e))?;
            let path = swarm_dir.join("agent_instructions.md");
            atomic_write(&path, &rendered).map_err(|e| anyhow!(e))?;
            written.push(path);
        }

        log::debug!(
            "[Distributor] Wrote instructions for {} ({} files)",
            instructions.agent_id,
            written.len()
        );
        Ok(written)
    }
}
