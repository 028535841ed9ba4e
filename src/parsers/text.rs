// Plain-text requirements parser: one requirement per line

use super::types::{RequirementItem, RequirementSet};
use crate::models::Priority;
use anyhow::Result;

/// Every non-empty line that is not a `#` comment becomes an item in
/// category `general`. Leading bullets and numbering are stripped.
pub fn parse_text(content: &str) -> Result<RequirementSet> {
    let mut items = Vec::new();

    for (idx, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut item = RequirementItem::new(strip_list_marker(line), "general").at_line(idx + 1);
        if let Some(rest) = line.strip_prefix("TODO:") {
            item.description = rest.trim().to_string();
            item = item.with_priority(Priority::High);
        }
        items.push(item);
    }

    Ok(RequirementSet::new("Untitled requirements").with_items(items))
}

fn strip_list_marker(line: &str) -> &str {
    let trimmed = line.trim_start_matches(['-', '*']);
    let digits = trimmed.trim_start_matches(|c: char| c.is_ascii_digit());
    let rest = if digits.len() < trimmed.len() {
        digits.strip_prefix('.').unwrap_or(trimmed)
    } else {
        trimmed
    };
    rest.trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lines() {
        let text = "# comment\nBuild login\n\n- Add logout\n2. Write docs\nTODO: audit deps\n";
        let set = parse_text(text).unwrap();
        let descriptions: Vec<&str> = set.items.iter().map(|i| i.description.as_str()).collect();
        assert_eq!(
            descriptions,
            vec!["Build login", "Add logout", "Write docs", "audit deps"]
        );
        assert_eq!(set.items[0].line, Some(2));
        assert_eq!(set.items[3].priority, Priority::High);
    }

    #[test]
    fn test_numbers_without_dot_kept() {
        assert_eq!(strip_list_marker("2024 roadmap"), "2024 roadmap");
    }
}
