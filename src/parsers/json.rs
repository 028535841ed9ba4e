// JSON requirements parser

use super::types::{RequirementItem, RequirementSet};
use crate::models::{Complexity, Priority};
use anyhow::{anyhow, Context, Result};
use serde_json::Value;

/// Parse requirements from JSON
///
/// Accepted shapes:
/// ```json
/// { "title": "Shop", "tasks": [ { "description": "Build cart API", "category": "backend",
///   "complexity": "high", "dependencies": ["TASK-0001"], "id": "TASK-0002" } ] }
/// ```
/// a bare list of strings or task objects, or a map of category to a list of strings.
pub fn parse_json(content: &str) -> Result<RequirementSet> {
    let value: Value = serde_json::from_str(content).context("Failed to parse JSON")?;
    parse_value(&value)
}

pub(super) fn parse_value(value: &Value) -> Result<RequirementSet> {
    match value {
        Value::Array(items) => Ok(RequirementSet::new("Untitled requirements")
            .with_items(parse_items(items, "general"))),
        Value::Object(map) => {
            if let Some(tasks) = map
                .get("tasks")
                .or_else(|| map.get("requirements"))
                .and_then(|v| v.as_array())
            {
                let title = map
                    .get("title")
                    .or_else(|| map.get("name"))
                    .and_then(|v| v.as_str())
                    .unwrap_or("Untitled requirements");
                return Ok(RequirementSet::new(title).with_items(parse_items(tasks, "general")));
            }

            // Category map: { "backend": ["..."], "frontend": "..." }
            let mut items = Vec::new();
            for (category, tasks) in map {
                match tasks {
                    Value::Array(list) => items.extend(parse_items(list, category)),
                    Value::String(s) => {
                        items.push(RequirementItem::new(s.clone(), category.clone()))
                    }
                    _ => {}
                }
            }
            Ok(RequirementSet::new("Untitled requirements").with_items(items))
        }
        _ => Err(anyhow!("Expected a JSON array or object of requirements")),
    }
}

fn parse_items(items: &[Value], category: &str) -> Vec<RequirementItem> {
    items
        .iter()
        .filter_map(|item| parse_item(item, category))
        .collect()
}

fn parse_item(value: &Value, default_category: &str) -> Option<RequirementItem> {
    if let Some(s) = value.as_str() {
        return Some(RequirementItem::new(s, default_category));
    }

    let obj = value.as_object()?;
    let description = obj
        .get("description")
        .or_else(|| obj.get("title"))
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();
    let category = obj
        .get("category")
        .and_then(|v| v.as_str())
        .unwrap_or(default_category);

    let mut item = RequirementItem::new(description, category);

    if let Some(id) = obj.get("id").and_then(|v| v.as_str()) {
        item = item.with_id(id);
    }

    if let Some(c) = obj
        .get("complexity")
        .and_then(|v| v.as_str())
        .and_then(Complexity::parse)
    {
        item = item.with_complexity(c);
    }

    if let Some(p) = obj
        .get("priority")
        .and_then(|v| v.as_str())
        .and_then(Priority::parse)
    {
        item = item.with_priority(p);
    }

    let dependencies: Vec<String> = obj
        .get("dependencies")
        .or_else(|| obj.get("depends_on"))
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(|s| s.to_string()))
                .collect()
        })
        .unwrap_or_default();
    if !dependencies.is_empty() {
        item = item.with_dependencies(dependencies);
    }

    if let Some(minutes) = obj
        .get("estimated_minutes")
        .or_else(|| obj.get("estimatedMinutes"))
        .and_then(|v| v.as_u64())
    {
        item = item.with_estimated_minutes(minutes as u32);
    }

    Some(item)
}
