// Normalized requirement types consumed by the planner

use crate::models::{Complexity, Priority};
use serde::{Deserialize, Serialize};

/// A parsed requirements document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RequirementSet {
    pub title: String,
    pub items: Vec<RequirementItem>,
}

impl RequirementSet {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            items: Vec::new(),
        }
    }

    pub fn with_items(mut self, items: Vec<RequirementItem>) -> Self {
        self.items = items;
        self
    }
}

/// One discrete requirement, prior to planning
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RequirementItem {
    pub id: Option<String>,
    pub description: String,
    pub category: String,
    pub complexity: Option<Complexity>,
    pub dependencies: Vec<String>,
    pub priority: Priority,
    pub estimated_minutes: Option<u32>,
    /// 1-based source line, when known
    pub line: Option<usize>,
}

impl RequirementItem {
    pub fn new(description: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            id: None,
            description: description.into(),
            category: category.into(),
            complexity: None,
            dependencies: Vec::new(),
            priority: Priority::Normal,
            estimated_minutes: None,
            line: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_complexity(mut self, complexity: Complexity) -> Self {
        self.complexity = Some(complexity);
        self
    }

    pub fn with_dependencies(mut self, dependencies: Vec<String>) -> Self {
        self.dependencies = dependencies;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_estimated_minutes(mut self, minutes: u32) -> Self {
        self.estimated_minutes = Some(minutes);
        self
    }

    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    /// Human-readable location used in parse errors
    pub fn location(&self, index: usize) -> String {
        match self.line {
            Some(line) => format!("line {}", line),
            None => format!("item {}", index + 1),
        }
    }
}
