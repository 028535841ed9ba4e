//! Coordinator context for one planning-to-merge cycle
//!
//! `SwarmContext` owns the configuration, the task graph, the last
//! assignment and the coordination protocol, and is passed explicitly to
//! every step. There is no process-wide swarm state.

use crate::config::SwarmConfig;
use crate::distributor::instructions::{AgentInstructions, InstructionRenderer};
use crate::distributor::{self, Assignment, DistributionSummary};
use crate::error::{SwarmError, SwarmResult};
use crate::file_storage::plan::{load_task_plan, save_task_plan};
use crate::file_storage::project::{load_project, save_distribution, save_project, ProjectFile};
use crate::file_storage::reports::{report_timestamp, write_report};
use crate::file_storage::{self, get_coordination_dir, sanitize_name};
use crate::git::GitManager;
use crate::merge::report::write_merge_report;
use crate::merge::{self, GitMergeBackend, MergePlan, MergeResult};
use crate::models::{Agent, AgentStatus, BranchRecord, TaskStatus};
use crate::parsers::{parse_requirements_file, RequirementSet};
use crate::planner::{PlanSummary, TaskGraph, TaskPlanner};
use crate::protocol::{AgentStatusSnapshot, CoordinationProtocol, CoordinationSummary};
use crate::shutdown::CancellationState;
use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchSummary {
    pub distribution: DistributionSummary,
    pub agents: Vec<Agent>,
    pub instruction_files: Vec<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub project: String,
    pub snapshot: AgentStatusSnapshot,
    pub coordination: CoordinationSummary,
    pub plan: Option<PlanSummary>,
    /// Tasks that became ready during this poll
    pub newly_ready: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeRun {
    pub plan: MergePlan,
    pub result: Option<MergeResult>,
    pub report_path: PathBuf,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupSummary {
    pub removed_worktrees: Vec<String>,
    pub archived: Vec<String>,
    pub pruned: u32,
}

pub struct SwarmContext {
    repo_path: PathBuf,
    project: String,
    coordination_dir: PathBuf,
    config: SwarmConfig,
    graph: Option<TaskGraph>,
    assignment: Option<Assignment>,
    protocol: CoordinationProtocol,
}

impl SwarmContext {
    /// Create (or re-open) the coordination directory for `project` and mark
    /// it active for the repository.
    pub fn init(repo_path: &Path, project: &str, config: SwarmConfig) -> SwarmResult<Self> {
        let project = sanitize_name(project);
        let coordination_dir = file_storage::init_coordination_dir(repo_path, &project)?;

        if load_project(&coordination_dir)?.is_none() {
            save_project(
                &coordination_dir,
                &ProjectFile {
                    name: project.clone(),
                    repo_path: repo_path.display().to_string(),
                    base_branch: config.project.base_branch.clone(),
                    created_at: Utc::now(),
                },
            )?;
        }
        file_storage::set_active_project(repo_path, &project)?;
        log::info!("[Coordinator] Initialized project {} at {:?}", project, coordination_dir);

        Self::open(repo_path, Some(&project), config)
    }

    /// Open an initialized project; `None` selects the active one
    pub fn open(repo_path: &Path, project: Option<&str>, config: SwarmConfig) -> SwarmResult<Self> {
        let project = match project {
            Some(name) => sanitize_name(name),
            None => file_storage::get_active_project(repo_path)?.ok_or_else(|| {
                SwarmError::Config("no active project; run `init` first".to_string())
            })?,
        };
        let coordination_dir = get_coordination_dir(repo_path, &project);
        if load_project(&coordination_dir)?.is_none() {
            return Err(SwarmError::Config(format!(
                "project '{}' is not initialized in {:?}",
                project, repo_path
            )));
        }

        let graph = match load_task_plan(&coordination_dir)? {
            Some(plan) => Some(TaskGraph::from_tasks(plan.tasks)?),
            None => None,
        };
        let protocol = CoordinationProtocol::open(&coordination_dir, config.protocol.clone())?;

        Ok(Self {
            repo_path: repo_path.to_path_buf(),
            project,
            coordination_dir,
            config,
            graph,
            assignment: None,
            protocol,
        })
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn coordination_dir(&self) -> &Path {
        &self.coordination_dir
    }

    pub fn config(&self) -> &SwarmConfig {
        &self.config
    }

    pub fn graph(&self) -> Option<&TaskGraph> {
        self.graph.as_ref()
    }

    pub fn assignment(&self) -> Option<&Assignment> {
        self.assignment.as_ref()
    }

    pub fn protocol(&self) -> &CoordinationProtocol {
        &self.protocol
    }

    fn require_graph(&self) -> SwarmResult<&TaskGraph> {
        self.graph
            .as_ref()
            .ok_or_else(|| SwarmError::Config("no task plan; run `plan` first".to_string()))
    }

    fn git(&self) -> SwarmResult<GitManager> {
        Ok(GitManager::new(&self.repo_path)?
            .with_author(&self.config.merge.author_name, &self.config.merge.author_email))
    }

    fn base_branch(&self, git: &GitManager) -> String {
        self.config
            .project
            .base_branch
            .clone()
            .unwrap_or_else(|| git.get_default_branch_name())
    }

    /// Plan from requirements, persist the task registry and a planning report
    pub fn plan(&mut self, requirements: &RequirementSet) -> SwarmResult<PlanSummary> {
        let graph = TaskPlanner::new(self.config.planner.clone()).analyze(requirements)?;
        save_task_plan(&self.coordination_dir, &requirements.title, graph.tasks())?;

        let summary = graph.get_summary();
        let now = Utc::now();
        write_report(
            &self.coordination_dir,
            "plan_report",
            now,
            &render_plan_report(&requirements.title, &graph, &summary),
        )?;

        self.graph = Some(graph);
        self.assignment = None;
        Ok(summary)
    }

    pub fn plan_file(&mut self, path: &Path) -> SwarmResult<PlanSummary> {
        let requirements = parse_requirements_file(path)
            .map_err(|e| SwarmError::parse(path.display().to_string(), e.to_string()))?;
        self.plan(&requirements)
    }

    fn branch_name(&self, n: usize) -> String {
        format!("{}-{}-{}", self.config.project.branch_prefix, self.project, n)
    }

    fn worktree_path(&self, agent_id: &str) -> PathBuf {
        self.repo_path
            .join(&self.config.project.worktree_dir)
            .join(format!("{}-{}", self.project, agent_id))
    }

    /// Distribute the plan, register agents, optionally create worktrees and
    /// write per-agent instructions.
    pub fn launch(
        &mut self,
        agent_count: Option<usize>,
        create_worktrees: bool,
    ) -> SwarmResult<LaunchSummary> {
        let agent_count = agent_count.unwrap_or(self.config.project.num_agents);
        let assignment = distributor::distribute(self.require_graph()?, agent_count)?;

        let now = Utc::now();
        let agents: Vec<Agent> = assignment
            .agents
            .iter()
            .enumerate()
            .map(|(i, queue)| Agent {
                id: queue.agent_id.clone(),
                branch: self.branch_name(i + 1),
                worktree_path: self.worktree_path(&queue.agent_id).display().to_string(),
                assigned_tasks: queue.tasks.clone(),
                registered_at: now,
            })
            .collect();

        if create_worktrees {
            let git = self.git()?;
            let base = self.base_branch(&git);
            for agent in &agents {
                if !git.branch_exists(&agent.branch) {
                    git.create_branch_from(&agent.branch, &base, false)?;
                }
                let path = Path::new(&agent.worktree_path);
                if path.exists() {
                    log::info!("[Coordinator] Reusing worktree {:?}", path);
                    continue;
                }
                if let Some(parent) = path.parent() {
                    file_storage::ensure_dir(parent)?;
                }
                git.create_worktree(&agent.branch, path)?;
            }
        }

        self.protocol.register_agents(&agents)?;
        let distribution = assignment.summary();
        save_distribution(&self.coordination_dir, &distribution)?;
        let instruction_files = self.write_instructions(&agents)?;

        log::info!(
            "[Coordinator] Launched {} agents for {} tasks",
            agents.len(),
            distribution.total_tasks
        );
        self.assignment = Some(assignment);
        Ok(LaunchSummary {
            distribution,
            agents,
            instruction_files,
        })
    }

    fn write_instructions(&self, agents: &[Agent]) -> SwarmResult<Vec<PathBuf>> {
        let graph = self.require_graph()?;
        let template = self
            .config
            .project
            .instruction_template
            .as_ref()
            .map(|t| self.repo_path.join(t));
        let renderer = InstructionRenderer::new(template.as_deref())
            .map_err(|e| SwarmError::Config(e.to_string()))?;

        let mut written = Vec::new();
        for agent in agents {
            let data =
                AgentInstructions::build(agent, &self.project, &self.coordination_dir, graph);
            let paths = renderer
                .write(&self.coordination_dir, &data)
                .map_err(|e| SwarmError::Storage(e.to_string()))?;
            written.extend(paths);
        }
        Ok(written)
    }

    /// Poll the protocol and project agent progress onto the task graph
    pub async fn status(&mut self) -> SwarmResult<StatusReport> {
        let snapshot = self.protocol.poll().await?;
        self.status_from(snapshot)
    }

    /// `status` with an explicit clock, for heartbeat expiry
    pub async fn status_at(&mut self, now: chrono::DateTime<Utc>) -> SwarmResult<StatusReport> {
        let snapshot = self.protocol.poll_at(now).await?;
        self.status_from(snapshot)
    }

    fn status_from(&mut self, snapshot: AgentStatusSnapshot) -> SwarmResult<StatusReport> {
        let mut newly_ready = Vec::new();
        if let Some(graph) = self.graph.as_mut() {
            for agent in snapshot.agents.values() {
                for (task, status) in &agent.tasks {
                    if matches!(
                        status,
                        TaskStatus::Done | TaskStatus::InProgress | TaskStatus::Blocked
                    ) && graph.task(task).map(|t| t.status) != Some(TaskStatus::Done)
                    {
                        graph.set_status(task, *status);
                    }
                }
            }
            newly_ready = graph.refresh_readiness();
        }

        Ok(StatusReport {
            project: self.project.clone(),
            coordination: self.protocol.coordination_summary()?,
            plan: self.graph.as_ref().map(|g| g.get_summary()),
            snapshot,
            newly_ready,
        })
    }

    /// Hand unfinished tasks of failed agents to survivors using the same
    /// layering and min-load procedure. `None` when nothing was freed.
    pub fn redistribute_failed(&mut self) -> SwarmResult<Option<Assignment>> {
        let snapshot = self.protocol.snapshot();
        let freed = snapshot.freed_tasks();
        if freed.is_empty() {
            return Ok(None);
        }

        let completed = snapshot.completed_tasks();
        let mut pool: Vec<String> = freed
            .values()
            .flatten()
            .filter(|t| !completed.contains(t))
            .cloned()
            .collect();
        pool.sort();
        pool.dedup();

        let survivors = snapshot.surviving_agents();
        let graph = self.require_graph()?;
        let loads: BTreeMap<String, u64> = survivors
            .iter()
            .filter_map(|id| snapshot.agents.get(id))
            .map(|agent| {
                let minutes = agent
                    .unfinished_tasks()
                    .iter()
                    .filter_map(|t| graph.task(t))
                    .map(|t| t.estimated_minutes as u64)
                    .sum();
                (agent.agent_id.clone(), minutes)
            })
            .collect();

        let assignment = distributor::redistribute(graph, &pool, &survivors, &loads)?;

        for queue in assignment.agents.iter().filter(|q| !q.tasks.is_empty()) {
            self.protocol.assign_tasks(&queue.agent_id, &queue.tasks)?;
        }
        for (agent_id, tasks) in &freed {
            self.protocol.release_tasks(agent_id, tasks)?;
            log::warn!(
                "[Coordinator] Released {} task(s) of failed agent {}",
                tasks.len(),
                agent_id
            );
        }

        let changed: Vec<Agent> = self
            .protocol
            .agents()?
            .into_iter()
            .filter(|a| assignment.tasks_for(&a.id).map_or(false, |t| !t.is_empty()))
            .collect();
        self.write_instructions(&changed)?;

        Ok(Some(assignment))
    }

    /// Branch records for every agent that reached `done`
    pub fn collect_branch_records(&self) -> SwarmResult<Vec<BranchRecord>> {
        let git = self.git()?;
        let base = self.base_branch(&git);
        let snapshot = self.protocol.snapshot();

        let mut records = Vec::new();
        for (order, agent) in self.protocol.agents()?.into_iter().enumerate() {
            let Some(state) = snapshot.agents.get(&agent.id) else {
                continue;
            };
            if state.status != AgentStatus::Done {
                log::info!(
                    "[Coordinator] {} is {}, not merging its branch",
                    agent.id,
                    state.status.as_str()
                );
                continue;
            }
            if !git.branch_exists(&agent.branch) {
                log::warn!("[Coordinator] Branch {} of {} not found", agent.branch, agent.id);
                continue;
            }
            records.push(BranchRecord {
                changed_files: git.changed_files(&agent.branch, &base)?,
                head_id: git.branch_head(&agent.branch)?,
                claimed_tasks: state.completed_tasks(),
                agent_id: agent.id,
                branch: agent.branch,
                creation_order: order,
            });
        }
        Ok(records)
    }

    /// Latest integration branch of this project, so re-running `merge`
    /// continues the same integration instead of starting over.
    fn integration_branch(&self, git: &GitManager) -> SwarmResult<String> {
        let prefix = &self.config.merge.integration_prefix;
        let existing = git
            .list_branches()?
            .into_iter()
            .map(|b| b.name)
            .filter(|name| merge::is_integration_branch(name, prefix, &self.project))
            .max();
        Ok(existing.unwrap_or_else(|| {
            merge::integration_branch_name(prefix, &self.project, &report_timestamp(Utc::now()))
        }))
    }

    /// Plan and (unless `dry_run`) execute the merge; always writes a report
    pub fn merge(&self, dry_run: bool, cancel: &CancellationState) -> SwarmResult<MergeRun> {
        let graph = self.require_graph()?;
        let records = self.collect_branch_records()?;
        let git = self.git()?;
        let base = self.base_branch(&git);
        let integration = self.integration_branch(&git)?;

        let plan = merge::plan_merge(&records, graph, &integration)
            .with_auto_resolve(self.config.merge.auto_resolve);

        let result = if dry_run {
            None
        } else {
            let mut backend = GitMergeBackend::prepare(git, &integration, &base)?;
            Some(merge::execute_merge(&plan, &mut backend, cancel))
        };

        let report_path = write_merge_report(
            &self.coordination_dir,
            &self.project,
            &plan,
            result.as_ref(),
            Utc::now(),
        )?;
        Ok(MergeRun {
            plan,
            result,
            report_path,
        })
    }

    /// Remove agent worktrees; with `archive`, tag each branch as
    /// `archive/<branch>` and delete it.
    pub fn cleanup(&self, archive: bool) -> SwarmResult<CleanupSummary> {
        let git = self.git()?;
        let mut summary = CleanupSummary::default();

        for agent in self.protocol.agents()? {
            let path = Path::new(&agent.worktree_path);
            if !agent.worktree_path.is_empty() && path.exists() {
                match git.remove_worktree(path) {
                    Ok(()) => summary.removed_worktrees.push(agent.worktree_path.clone()),
                    Err(e) => log::warn!(
                        "[Coordinator] Could not remove worktree {:?}: {}",
                        path,
                        e
                    ),
                }
            }

            if archive && git.branch_exists(&agent.branch) {
                summary.archived.push(git.archive_branch(&agent.branch)?);
                git.delete_branch(&agent.branch)?;
            }
        }

        summary.pruned = git.prune_orphaned_worktrees()?;
        log::info!(
            "[Coordinator] Cleanup: {} worktrees removed, {} branches archived",
            summary.removed_worktrees.len(),
            summary.archived.len()
        );
        Ok(summary)
    }
}

fn render_plan_report(title: &str, graph: &TaskGraph, summary: &PlanSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Plan Report: {}\n", title);
    let _ = writeln!(
        out,
        "{} tasks, {} dependencies ({} inferred), {} layers, ~{} minutes\n",
        summary.total_tasks,
        summary.dependency_count,
        summary.inferred_dependency_count,
        summary.layer_count,
        summary.total_estimated_minutes
    );
    let _ = writeln!(out, "| ID | Description | Category | Complexity | Minutes | Depends on |");
    let _ = writeln!(out, "|----|-------------|----------|------------|---------|------------|");
    for idx in graph.topological_order() {
        let task = graph.task_at(idx);
        let deps: Vec<String> = task
            .dependencies
            .iter()
            .map(|d| {
                if d.reason.is_heuristic() {
                    format!("{} ({})", d.task_id, d.reason.describe())
                } else {
                    d.task_id.clone()
                }
            })
            .collect();
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} | {} | {} |",
            task.id,
            task.description.replace('|', "\\|"),
            task.category,
            task.complexity.as_str(),
            task.estimated_minutes,
            if deps.is_empty() { "-".to_string() } else { deps.join(", ") }
        );
    }
    out
}
