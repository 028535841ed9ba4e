// Requirements parsers: concrete syntax to the normalized RequirementSet

pub mod json;
pub mod markdown;
pub mod text;
pub mod types;
pub mod yaml;

use anyhow::{anyhow, Result};
use std::path::Path;
pub use types::{RequirementItem, RequirementSet};

/// Supported requirement file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequirementFormat {
    Json,
    Yaml,
    Markdown,
    Text,
}

impl RequirementFormat {
    /// Detect format from file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            "md" | "markdown" => Some(Self::Markdown),
            "txt" | "text" => Some(Self::Text),
            _ => None,
        }
    }

    /// Detect format from file path
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }
}

/// Parse requirements from the given content and format
pub fn parse_requirements(content: &str, format: RequirementFormat) -> Result<RequirementSet> {
    match format {
        RequirementFormat::Json => json::parse_json(content),
        RequirementFormat::Yaml => yaml::parse_yaml(content),
        RequirementFormat::Markdown => markdown::parse_markdown(content),
        RequirementFormat::Text => text::parse_text(content),
    }
}

/// Parse requirements, auto-detecting the format
///
/// JSON first (strictest), then YAML mappings, then Markdown when the
/// content has headings or list items, and plain text otherwise.
pub fn parse_requirements_auto(content: &str) -> Result<RequirementSet> {
    if let Ok(set) = json::parse_json(content) {
        return Ok(set);
    }

    if yaml::is_yaml_mapping(content) {
        if let Ok(set) = yaml::parse_yaml(content) {
            return Ok(set);
        }
    }

    if looks_like_markdown(content) {
        let set = markdown::parse_markdown(content)?;
        if !set.items.is_empty() {
            return Ok(set);
        }
    }

    text::parse_text(content).map_err(|e| anyhow!("Failed to parse requirements: {}", e))
}

/// Read and parse a requirements file, using its extension when known
pub fn parse_requirements_file(path: &Path) -> Result<RequirementSet> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("Failed to read requirements file '{}': {}", path.display(), e))?;

    match RequirementFormat::from_path(path) {
        Some(format) => parse_requirements(&content, format),
        None => parse_requirements_auto(&content),
    }
}

fn looks_like_markdown(content: &str) -> bool {
    content.lines().map(str::trim_start).any(|line| {
        line.starts_with('#')
            || line.starts_with("- ")
            || line.starts_with("* ")
            || line
                .split_once(". ")
                .map_or(false, |(n, _)| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            RequirementFormat::from_extension("json"),
            Some(RequirementFormat::Json)
        );
        assert_eq!(
            RequirementFormat::from_extension("YML"),
            Some(RequirementFormat::Yaml)
        );
        assert_eq!(
            RequirementFormat::from_extension("md"),
            Some(RequirementFormat::Markdown)
        );
        assert_eq!(
            RequirementFormat::from_extension("txt"),
            Some(RequirementFormat::Text)
        );
        assert_eq!(RequirementFormat::from_extension("pdf"), None);
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            RequirementFormat::from_path(Path::new("docs/requirements.markdown")),
            Some(RequirementFormat::Markdown)
        );
        assert_eq!(RequirementFormat::from_path(Path::new("REQUIREMENTS")), None);
    }

    #[test]
    fn test_auto_detects_markdown_before_yaml() {
        let md = "# Shop\n\n## Backend\n- Build API\n";
        let set = parse_requirements_auto(md).unwrap();
        assert_eq!(set.items.len(), 1);
        assert_eq!(set.items[0].category, "backend");
    }

    #[test]
    fn test_auto_detects_yaml_mapping() {
        let yaml = "title: Shop\ntasks:\n  - description: Build API\n";
        let set = parse_requirements_auto(yaml).unwrap();
        assert_eq!(set.title, "Shop");
        assert_eq!(set.items.len(), 1);
    }

    #[test]
    fn test_auto_falls_back_to_text() {
        let set = parse_requirements_auto("Build API\nWrite docs\n").unwrap();
        assert_eq!(set.items.len(), 2);
    }
}
