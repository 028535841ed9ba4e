use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use swarm_coordinator_lib::config::{self, PartialConfig};
use swarm_coordinator_lib::coordinator::{StatusReport, SwarmContext};
use swarm_coordinator_lib::file_storage::messages::MessageStatus;
use swarm_coordinator_lib::file_storage::{get_active_project, get_coordination_dir};
use swarm_coordinator_lib::protocol::{emit_event, EventPayload};
use swarm_coordinator_lib::shutdown::{register_signal_handlers, CancellationState};
use swarm_coordinator_lib::SwarmConfig;

/// Swarm Coordinator - plan, distribute, track and merge work across parallel coding agents
#[derive(Parser, Debug)]
#[command(name = "swarm-coordinator")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Repository the swarm works on
    #[arg(long, global = true, env = "SWARM_REPO", default_value = ".")]
    repo: PathBuf,

    /// Project name (defaults to the active project)
    #[arg(long, global = true, env = "SWARM_PROJECT")]
    project: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the coordination directory and make the project active
    Init {
        /// Project name
        name: String,
        /// Branch agents start from and the merge targets
        #[arg(long)]
        base_branch: Option<String>,
    },

    /// Decompose a requirements file into a task graph
    Plan {
        /// Requirements file (.json, .yaml, .md or plain text)
        file: PathBuf,
    },

    /// Distribute the plan across agents and write their instructions
    #[command(alias = "distribute")]
    Launch {
        /// Number of agents (defaults to the configured count)
        #[arg(long, short = 'n')]
        agents: Option<usize>,
        /// Create a branch and worktree for every agent
        #[arg(long)]
        worktrees: bool,
    },

    /// Poll agent event streams and print the swarm state
    Status {
        /// Print the snapshot as JSON
        #[arg(long)]
        json: bool,
    },

    /// Hand tasks of failed agents to the surviving ones
    Redistribute,

    /// Merge completed agent branches into the integration branch
    Merge {
        /// Write the plan and predicted conflicts without touching branches
        #[arg(long)]
        dry_run: bool,
        /// Disable auto-resolution of docs, config and generated files
        #[arg(long)]
        no_auto_resolve: bool,
    },

    /// Remove agent worktrees
    Cleanup {
        /// Tag each agent branch as archive/<branch> and delete it
        #[arg(long)]
        archive: bool,
    },

    /// Agent-side event reporting
    Event {
        /// Reporting agent id
        #[arg(long, env = "SWARM_AGENT_ID")]
        agent: String,
        #[command(subcommand)]
        kind: EventCommand,
    },
}

#[derive(Subcommand, Debug)]
enum EventCommand {
    /// Report progress on a task
    Progress {
        task: String,
        #[arg(long)]
        percent: Option<u8>,
        #[arg(long, short = 'm')]
        message: Option<String>,
    },
    /// Liveness signal
    Heartbeat,
    /// Report that a task cannot proceed
    Blocker {
        task: String,
        description: String,
        #[arg(long)]
        impact: Option<String>,
    },
    /// Resolve a blocker (coordinator side)
    Resolve {
        blocker_id: String,
        #[arg(long)]
        resolution: Option<String>,
    },
    /// Announce an artifact other agents can use
    Share {
        name: String,
        file_path: String,
        description: String,
        #[arg(long)]
        usage: Option<String>,
    },
    /// Mark tasks finished
    Complete {
        #[arg(required = true)]
        tasks: Vec<String>,
    },
    /// Report that the agent gave up
    Fail { reason: String },
    /// Send a direct message to another agent
    Message { to: String, body: String },
    /// Print unread messages addressed to this agent and mark them read
    Inbox,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logger
    env_logger::init();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to create tokio runtime: {}", e);
            std::process::exit(1);
        }
    };

    match rt.block_on(run(cli)) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn load_config(repo: &Path, overrides: PartialConfig) -> Result<SwarmConfig> {
    config::load_merged_config(Some(repo), Some(overrides)).context("Failed to load configuration")
}

fn open_context(cli: &Cli, overrides: PartialConfig) -> Result<SwarmContext> {
    let config = load_config(&cli.repo, overrides)?;
    Ok(SwarmContext::open(&cli.repo, cli.project.as_deref(), config)?)
}

async fn run(cli: Cli) -> Result<i32> {
    match &cli.command {
        Command::Init { name, base_branch } => {
            let overrides = PartialConfig {
                base_branch: base_branch.clone(),
                ..Default::default()
            };
            let ctx = SwarmContext::init(&cli.repo, name, load_config(&cli.repo, overrides)?)?;
            println!(
                "Initialized project '{}' at {}",
                ctx.project(),
                ctx.coordination_dir().display()
            );
        }

        Command::Plan { file } => {
            let mut ctx = open_context(&cli, PartialConfig::default())?;
            let summary = ctx.plan_file(file)?;
            println!(
                "Planned {} tasks in {} layers ({} dependencies, {} inferred), ~{} minutes",
                summary.total_tasks,
                summary.layer_count,
                summary.dependency_count,
                summary.inferred_dependency_count,
                summary.total_estimated_minutes
            );
        }

        Command::Launch { agents, worktrees } => {
            let mut ctx = open_context(&cli, PartialConfig::default())?;
            let launch = ctx.launch(*agents, *worktrees)?;
            for queue in &launch.distribution.agents {
                println!(
                    "{}: {} tasks, {} min, complexity {} [{}]",
                    queue.agent_id,
                    queue.tasks.len(),
                    queue.total_minutes,
                    queue.complexity_score,
                    queue.tasks.join(", ")
                );
            }
            println!(
                "Estimated makespan: {} min; {} instruction files written",
                launch.distribution.max_agent_minutes,
                launch.instruction_files.len()
            );
        }

        Command::Status { json } => {
            let mut ctx = open_context(&cli, PartialConfig::default())?;
            let report = ctx.status().await?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_status(&report);
            }
        }

        Command::Redistribute => {
            let mut ctx = open_context(&cli, PartialConfig::default())?;
            ctx.status().await?;
            match ctx.redistribute_failed()? {
                Some(assignment) => {
                    for queue in assignment.agents.iter().filter(|q| !q.tasks.is_empty()) {
                        println!("{} takes over [{}]", queue.agent_id, queue.tasks.join(", "));
                    }
                }
                None => println!("No failed agents with unfinished tasks"),
            }
        }

        Command::Merge {
            dry_run,
            no_auto_resolve,
        } => {
            let overrides = PartialConfig {
                auto_resolve: no_auto_resolve.then_some(false),
                ..Default::default()
            };
            let mut ctx = open_context(&cli, overrides)?;
            ctx.status().await?;

            let cancel = CancellationState::new();
            if let Err(e) = register_signal_handlers(cancel.clone()) {
                log::warn!("Failed to register signal handlers: {}", e);
            }

            let run = ctx.merge(*dry_run, &cancel)?;
            println!(
                "Merge plan: {} branches into {}, {} predicted conflicts",
                run.plan.entries.len(),
                run.plan.integration_branch,
                run.plan.predicted_conflicts.len()
            );
            println!("Report: {}", run.report_path.display());
            if let Some(result) = run.result {
                println!(
                    "Merged {} ({} new), escalated {}, skipped {}",
                    result.merged.len(),
                    result.newly_merged.len(),
                    result.conflicts.len(),
                    result.skipped.len()
                );
                if !result.success {
                    return Ok(2);
                }
            }
        }

        Command::Cleanup { archive } => {
            let ctx = open_context(&cli, PartialConfig::default())?;
            let summary = ctx.cleanup(*archive)?;
            println!(
                "Removed {} worktrees, archived {} branches, pruned {}",
                summary.removed_worktrees.len(),
                summary.archived.len(),
                summary.pruned
            );
        }

        Command::Event { agent, kind } => run_event(&cli, agent, kind)?,
    }
    Ok(0)
}

/// Agent-side commands only append to the agent's own stream or write
/// their record files; they never fold or rewrite shared state.
fn run_event(cli: &Cli, agent: &str, kind: &EventCommand) -> Result<()> {
    let project = match &cli.project {
        Some(name) => name.clone(),
        None => get_active_project(&cli.repo)
            .map_err(|e| anyhow!(e))?
            .ok_or_else(|| anyhow!("no active project; run `init` first"))?,
    };
    let dir = get_coordination_dir(&cli.repo, &project);

    let payload = match kind {
        EventCommand::Progress {
            task,
            percent,
            message,
        } => EventPayload::Progress {
            task_id: task.clone(),
            percent: *percent,
            message: message.clone(),
        },
        EventCommand::Heartbeat => EventPayload::Heartbeat,
        EventCommand::Complete { tasks } => EventPayload::Completion {
            task_ids: tasks.clone(),
        },
        EventCommand::Fail { reason } => EventPayload::Failure {
            reason: reason.clone(),
        },
        EventCommand::Blocker { .. }
        | EventCommand::Resolve { .. }
        | EventCommand::Share { .. }
        | EventCommand::Message { .. }
        | EventCommand::Inbox => {
            let ctx = open_context(cli, PartialConfig::default())?;
            let protocol = ctx.protocol();
            match kind {
                EventCommand::Blocker {
                    task,
                    description,
                    impact,
                } => {
                    let id = protocol.report_blocker(agent, task, description, impact.as_deref())?;
                    println!("{}", id);
                }
                EventCommand::Resolve {
                    blocker_id,
                    resolution,
                } => protocol.resolve_blocker(blocker_id, resolution.as_deref())?,
                EventCommand::Share {
                    name,
                    file_path,
                    description,
                    usage,
                } => {
                    protocol.share_resource(agent, name, file_path, description, usage.as_deref())?;
                }
                EventCommand::Message { to, body } => {
                    let message = protocol.send_message(agent, to, body)?;
                    println!("{}", message.id);
                }
                EventCommand::Inbox => {
                    for message in protocol.get_messages(agent, Some(MessageStatus::Unread))? {
                        println!("[{}] {}: {}", message.id, message.from, message.body);
                        protocol.mark_message_read(&message.id)?;
                    }
                }
                _ => {}
            }
            return Ok(());
        }
    };

    emit_event(&dir, agent, payload)?;
    Ok(())
}

fn print_status(report: &StatusReport) {
    println!("Project: {}", report.project);
    if let Some(plan) = &report.plan {
        let done = plan.by_status.get("done").copied().unwrap_or(0);
        println!("Tasks: {}/{} done", done, plan.total_tasks);
    }
    for agent in report.snapshot.agents.values() {
        let completed = agent.completed_tasks();
        println!(
            "  {:<10} {:<8} {}/{} tasks{}{}",
            agent.agent_id,
            agent.status.as_str(),
            completed.len(),
            agent.assigned_tasks.len(),
            agent
                .progress
                .map(|p| format!(", {}%", p))
                .unwrap_or_default(),
            agent
                .last_message
                .as_deref()
                .map(|m| format!(" - {}", m))
                .unwrap_or_default()
        );
    }
    for blocker in &report.snapshot.open_blockers {
        println!(
            "  blocker {} ({} on {}): {}",
            blocker.id, blocker.agent_id, blocker.task_id, blocker.description
        );
    }
    if report.snapshot.all_finished() {
        println!("All agents finished; run `merge` to integrate their branches");
    }
    if !report.newly_ready.is_empty() {
        println!("Newly ready: {}", report.newly_ready.join(", "));
    }
    println!(
        "Blockers open: {}, shared resources: {}, unread messages: {}",
        report.coordination.open_blockers,
        report.coordination.shared_resources,
        report.coordination.unread_messages
    );
    if report.coordination.dropped_events > 0 {
        println!("Dropped malformed events: {}", report.coordination.dropped_events);
    }
}
