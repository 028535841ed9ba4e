// Integration tests for task distribution and agent instructions

#[cfg(test)]
mod distributor_integration_tests {
    use chrono::Utc;
    use std::collections::{BTreeMap, HashSet};
    use std::fs;
    use swarm_coordinator_lib::distributor::instructions::{AgentInstructions, InstructionRenderer};
    use swarm_coordinator_lib::distributor::{distribute, redistribute};
    use swarm_coordinator_lib::parsers::{RequirementItem, RequirementSet};
    use swarm_coordinator_lib::planner::{TaskGraph, TaskPlanner};
    use swarm_coordinator_lib::{Agent, Complexity, SwarmError};
    use tempfile::TempDir;

    fn item(id: &str, description: &str, deps: &[&str]) -> RequirementItem {
        RequirementItem::new(description, "general")
            .with_id(id)
            .with_complexity(Complexity::Medium)
            .with_dependencies(deps.iter().map(|d| d.to_string()).collect())
    }

    fn abc_graph() -> TaskGraph {
        let requirements = RequirementSet::new("ABC").with_items(vec![
            item("A", "Set up workspace", &[]),
            item("B", "Write parser", &["A"]),
            item("C", "Write printer", &["A"]),
        ]);
        TaskPlanner::default().analyze(&requirements).unwrap()
    }

    #[test]
    fn test_two_agents_share_three_tasks() {
        let graph = abc_graph();
        let assignment = distribute(&graph, 2).unwrap();

        // A alone in the first layer; B and C split by minimum load
        assert_eq!(assignment.tasks_for("agent-1").unwrap(), ["A", "C"]);
        assert_eq!(assignment.tasks_for("agent-2").unwrap(), ["B"]);

        let summary = assignment.summary();
        assert_eq!(summary.total_tasks, 3);
        assert_eq!(summary.total_minutes, 270);
        assert_eq!(summary.max_agent_minutes, 180);
        assert_eq!(summary.agents[0].complexity_score, 6);
    }

    #[test]
    fn test_no_task_lost_or_duplicated() {
        let graph = abc_graph();
        for agents in 1..=5 {
            let assignment = distribute(&graph, agents).unwrap();
            assert_eq!(assignment.agents.len(), agents);

            let mut seen = HashSet::new();
            for queue in &assignment.agents {
                for task in &queue.tasks {
                    assert!(seen.insert(task.clone()), "{} assigned twice", task);
                }
            }
            assert_eq!(seen.len(), graph.len());
        }
    }

    #[test]
    fn test_queue_order_follows_layers() {
        let graph = abc_graph();
        let assignment = distribute(&graph, 1).unwrap();
        let queue = assignment.tasks_for("agent-1").unwrap();
        assert_eq!(queue[0], "A");
        assert_eq!(queue.len(), 3);
    }

    #[test]
    fn test_zero_agents_is_infeasible() {
        assert!(matches!(
            distribute(&abc_graph(), 0),
            Err(SwarmError::Infeasible(_))
        ));
    }

    #[test]
    fn test_redistribute_freed_tasks_to_least_loaded_survivor() {
        let graph = abc_graph();
        // agent-2 failed holding B; agent-1 still has 90 minutes queued
        let loads = BTreeMap::from([("agent-1".to_string(), 90), ("agent-3".to_string(), 180)]);
        let assignment = redistribute(
            &graph,
            &["B".to_string()],
            &["agent-1".to_string(), "agent-3".to_string()],
            &loads,
        )
        .unwrap();
        assert_eq!(assignment.agent_for("B"), Some("agent-1"));
        assert_eq!(assignment.total_tasks(), 1);
    }

    #[test]
    fn test_instructions_rendered_for_each_agent() {
        let graph = abc_graph();
        let assignment = distribute(&graph, 2).unwrap();
        let temp_dir = TempDir::new().unwrap();
        let worktree = temp_dir.path().join("worktree-agent-2");
        fs::create_dir_all(&worktree).unwrap();

        let renderer = InstructionRenderer::new(None).unwrap();
        let queue = &assignment.agents[1];
        let agent = Agent {
            id: queue.agent_id.clone(),
            branch: "swarm-agent-abc-2".to_string(),
            worktree_path: worktree.display().to_string(),
            assigned_tasks: queue.tasks.clone(),
            registered_at: Utc::now(),
        };
        let data = AgentInstructions::build(&agent, "abc", temp_dir.path(), &graph);
        let written = renderer.write(temp_dir.path(), &data).unwrap();

        assert_eq!(written.len(), 2);
        let content = fs::read_to_string(&written[0]).unwrap();
        assert!(content.contains("**AGENT-2**"));
        assert!(content.contains("### B: Write parser"));
        assert!(content.contains("**Dependencies**: A"));
        assert!(worktree.join(".swarm/agent_instructions.md").exists());
    }

    #[test]
    fn test_custom_template_overrides_default() {
        let graph = abc_graph();
        let temp_dir = TempDir::new().unwrap();
        let template_path = temp_dir.path().join("instructions.tera");
        fs::write(
            &template_path,
            "{{ agent_id }}:{% for task in tasks %} {{ task.id }}{% endfor %}",
        )
        .unwrap();

        let renderer = InstructionRenderer::new(Some(&template_path)).unwrap();
        let agent = Agent {
            id: "agent-1".to_string(),
            branch: "b".to_string(),
            worktree_path: String::new(),
            assigned_tasks: vec!["A".to_string(), "C".to_string()],
            registered_at: Utc::now(),
        };
        let rendered = renderer
            .render(&AgentInstructions::build(&agent, "abc", temp_dir.path(), &graph))
            .unwrap();
        assert_eq!(rendered, "agent-1: A C");
    }
}
