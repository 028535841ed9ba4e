// Markdown requirements parser

use super::types::{RequirementItem, RequirementSet};
use crate::models::{Complexity, Priority};
use anyhow::Result;
use pulldown_cmark::{Event, Parser, Tag, TagEnd};
use regex::Regex;
use std::sync::OnceLock;

/// Parse requirements from Markdown
///
/// Expected structure:
/// ```markdown
/// # Project Title
///
/// ## Backend
/// - Create user model [id: M1]
/// - Build user API [after: M1] [complexity: high]
///
/// ## Testing
/// 1. Write integration tests
///
/// TODO: Add rate limiting
/// ```
/// Section headings (level 2 and below) become the category of the items under them.
/// `TODO:` markers produce high priority items.
pub fn parse_markdown(content: &str) -> Result<RequirementSet> {
    let lines = LineIndex::new(content);
    let mut state = ParserState::new();

    for (event, range) in Parser::new(content).into_offset_iter() {
        let line = lines.line_of(range.start);
        match event {
            Event::Start(tag) => state.handle_start_tag(tag, line),
            Event::End(tag_end) => state.handle_end_tag(tag_end),
            Event::Text(text) | Event::Code(text) => state.handle_text(&text),
            Event::SoftBreak | Event::HardBreak => state.handle_text(" "),
            _ => {}
        }
    }

    Ok(state.finalize())
}

/// Maps byte offsets to 1-based line numbers
struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    fn new(content: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(content.match_indices('\n').map(|(i, _)| i + 1));
        Self { starts }
    }

    fn line_of(&self, offset: usize) -> usize {
        self.starts.partition_point(|&start| start <= offset)
    }
}

#[derive(Debug)]
struct ParserState {
    title: Option<String>,
    category: String,
    items: Vec<RequirementItem>,
    heading: Option<(u32, String)>,
    /// One buffer per open list item; nested items get their own
    item_stack: Vec<(String, usize)>,
    paragraph: Option<(String, usize)>,
}

impl ParserState {
    fn new() -> Self {
        Self {
            title: None,
            category: "general".to_string(),
            items: Vec::new(),
            heading: None,
            item_stack: Vec::new(),
            paragraph: None,
        }
    }

    fn handle_start_tag(&mut self, tag: Tag, line: usize) {
        match tag {
            Tag::Heading { level, .. } => {
                self.heading = Some((level as u32, String::new()));
            }
            Tag::Item => {
                self.item_stack.push((String::new(), line));
            }
            Tag::Paragraph if self.item_stack.is_empty() => {
                self.paragraph = Some((String::new(), line));
            }
            _ => {}
        }
    }

    fn handle_end_tag(&mut self, tag_end: TagEnd) {
        match tag_end {
            TagEnd::Heading(_) => {
                if let Some((level, text)) = self.heading.take() {
                    self.process_heading(level, text.trim());
                }
            }
            TagEnd::Item => {
                if let Some((text, line)) = self.item_stack.pop() {
                    self.push_item(&text, line, false);
                }
            }
            TagEnd::Paragraph => {
                if let Some((text, line)) = self.paragraph.take() {
                    // Free text only contributes TODO markers
                    for (offset, sentence) in text.split('\n').enumerate() {
                        if todo_marker(sentence).is_some() {
                            self.push_item(sentence, line + offset, true);
                        }
                    }
                }
            }
            _ => {}
        }
    }

    fn handle_text(&mut self, text: &str) {
        if let Some((_, ref mut heading)) = self.heading {
            heading.push_str(text);
        } else if let Some((buffer, _)) = self.item_stack.last_mut() {
            buffer.push_str(text);
        } else if let Some((ref mut buffer, _)) = self.paragraph {
            // Keep line structure so each TODO line stands alone
            if text == " " {
                buffer.push('\n');
            } else {
                buffer.push_str(text);
            }
        }
    }

    fn process_heading(&mut self, level: u32, text: &str) {
        if text.is_empty() {
            return;
        }
        if level == 1 && self.title.is_none() {
            self.title = Some(text.to_string());
        } else {
            self.category = text.to_lowercase();
        }
    }

    fn push_item(&mut self, raw: &str, line: usize, from_paragraph: bool) {
        let raw = raw.trim();
        if raw.is_empty() {
            return;
        }

        let (text, priority) = match todo_marker(raw) {
            Some(rest) => (rest.to_string(), Priority::High),
            None if from_paragraph => return,
            None => (strip_checkbox(raw).to_string(), Priority::Normal),
        };

        let (description, markers) = extract_markers(&text);
        let mut item = RequirementItem::new(description, self.category.clone())
            .with_priority(priority)
            .at_line(line);

        if let Some(id) = markers.id {
            item = item.with_id(id);
        }
        if let Some(c) = markers.complexity {
            item = item.with_complexity(c);
        }
        if !markers.after.is_empty() {
            item = item.with_dependencies(markers.after);
        }

        self.items.push(item);
    }

    fn finalize(self) -> RequirementSet {
        let title = self
            .title
            .unwrap_or_else(|| "Untitled requirements".to_string());
        RequirementSet::new(title).with_items(self.items)
    }
}

#[derive(Debug, Default)]
struct Markers {
    id: Option<String>,
    complexity: Option<Complexity>,
    after: Vec<String>,
}

fn marker_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\[(id|complexity|after|depends):\s*([^\]]+)\]")
            .expect("marker pattern is valid")
    })
}

/// Extract inline markers like `[id: M1]`, `[complexity: high]`, `[after: M1, M2]`
fn extract_markers(text: &str) -> (String, Markers) {
    let re = marker_regex();
    let mut markers = Markers::default();

    for cap in re.captures_iter(text) {
        let value = cap[2].trim();
        match cap[1].to_lowercase().as_str() {
            "id" => markers.id = Some(value.to_string()),
            "complexity" => markers.complexity = Complexity::parse(value),
            _ => markers.after.extend(
                value
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty()),
            ),
        }
    }

    let description = re.replace_all(text, "").trim().to_string();
    (description, markers)
}

fn todo_marker(text: &str) -> Option<&str> {
    let idx = text.find("TODO:").or_else(|| text.find("todo:"))?;
    Some(text[idx + 5..].trim())
}

fn strip_checkbox(text: &str) -> &str {
    for prefix in ["[ ] ", "[x] ", "[X] "] {
        if let Some(rest) = text.strip_prefix(prefix) {
            return rest;
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sections_become_categories() {
        let md = r#"# Shop

## Backend
- Create user model
- Build user API

## Testing
1. Write integration tests
"#;
        let set = parse_markdown(md).unwrap();
        assert_eq!(set.title, "Shop");
        assert_eq!(set.items.len(), 3);
        assert_eq!(set.items[0].category, "backend");
        assert_eq!(set.items[1].description, "Build user API");
        assert_eq!(set.items[2].category, "testing");
        assert_eq!(set.items[2].line, Some(8));
    }

    #[test]
    fn test_todo_items_are_high_priority() {
        let md = "# Notes\n\nSome context here.\nTODO: Add rate limiting\n\n- TODO: Wire metrics\n";
        let set = parse_markdown(md).unwrap();
        assert_eq!(set.items.len(), 2);
        assert_eq!(set.items[0].description, "Add rate limiting");
        assert_eq!(set.items[0].priority, Priority::High);
        assert_eq!(set.items[1].description, "Wire metrics");
    }

    #[test]
    fn test_inline_markers() {
        let md = "- Create model [id: M1]\n- Build API [after: M1] [complexity: high]\n";
        let set = parse_markdown(md).unwrap();
        assert_eq!(set.items[0].id.as_deref(), Some("M1"));
        assert_eq!(set.items[1].description, "Build API");
        assert_eq!(set.items[1].dependencies, vec!["M1"]);
        assert_eq!(set.items[1].complexity, Some(Complexity::High));
        assert_eq!(set.items[0].category, "general");
    }

    #[test]
    fn test_nested_items_are_separate() {
        let md = "- Parent task\n  - Child task\n";
        let set = parse_markdown(md).unwrap();
        let descriptions: Vec<&str> = set.items.iter().map(|i| i.description.as_str()).collect();
        assert!(descriptions.contains(&"Parent task"));
        assert!(descriptions.contains(&"Child task"));
    }

    #[test]
    fn test_checkbox_prefix_stripped() {
        let set = parse_markdown("- [ ] Ship it\n").unwrap();
        assert_eq!(set.items[0].description, "Ship it");
    }

    #[test]
    fn test_line_index() {
        let idx = LineIndex::new("a\nbb\nccc");
        assert_eq!(idx.line_of(0), 1);
        assert_eq!(idx.line_of(2), 2);
        assert_eq!(idx.line_of(5), 3);
    }
}
