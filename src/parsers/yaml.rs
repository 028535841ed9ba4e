// YAML requirements parser

use super::json;
use super::types::RequirementSet;
use anyhow::{Context, Result};

/// Parse requirements from YAML
///
/// Same shapes as the JSON form:
/// ```yaml
/// title: Shop
/// tasks:
///   - description: Create user model
///     category: backend
///   - description: Build user API
///     dependencies: [TASK-0001]
/// ```
pub fn parse_yaml(content: &str) -> Result<RequirementSet> {
    let value: serde_json::Value =
        serde_yaml::from_str(content).context("Failed to parse YAML")?;
    json::parse_value(&value)
}

/// Whether the content is a YAML mapping (used by format auto-detection)
pub fn is_yaml_mapping(content: &str) -> bool {
    matches!(
        serde_yaml::from_str::<serde_yaml::Value>(content),
        Ok(serde_yaml::Value::Mapping(_))
    )
}
