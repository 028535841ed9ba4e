// Complexity, duration and skill estimation from task descriptions

use crate::config::{DurationTable, PlannerConfig};
use crate::models::Complexity;

/// Skill name and the keywords that signal it
const SKILL_KEYWORDS: &[(&str, &[&str])] = &[
    ("api", &["api", "endpoint", "rest", "graphql"]),
    ("database", &["database", "sql", "query", "schema", "migration"]),
    ("frontend", &["ui", "ux", "react", "vue", "angular", "css", "html"]),
    ("backend", &["server", "api", "endpoint", "controller", "service"]),
    ("testing", &["test", "tests", "spec", "tdd", "unit", "integration"]),
    ("devops", &["deploy", "ci", "cd", "docker", "kubernetes"]),
    ("security", &["security", "auth", "encrypt", "permission", "role"]),
];

/// Lower-cased alphanumeric words
pub fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}

/// Inflections accepted after a single-word keyword
const SUFFIXES: &[&str] = &[
    "", "s", "es", "d", "ed", "ing", "er", "ers", "ure", "ation", "ion", "ions", "ment", "ments",
];

fn matches_keyword(word: &str, keyword: &str) -> bool {
    word.strip_prefix(keyword)
        .map_or(false, |rest| SUFFIXES.contains(&rest))
}

/// Count keywords present in the description. Single-word keywords match
/// whole words plus common inflections; phrases match as substrings.
fn keyword_hits(words: &[String], lowered: &str, keywords: &[String]) -> usize {
    keywords
        .iter()
        .filter(|kw| {
            let kw = kw.to_lowercase();
            if kw.contains(' ') {
                lowered.contains(&kw)
            } else {
                words.iter().any(|w| matches_keyword(w, &kw))
            }
        })
        .count()
}

pub struct Estimator<'a> {
    policy: &'a PlannerConfig,
}

impl<'a> Estimator<'a> {
    pub fn new(policy: &'a PlannerConfig) -> Self {
        Self { policy }
    }

    /// Keyword density picks the base level; long descriptions move one level up
    pub fn complexity(&self, description: &str) -> Complexity {
        let lowered = description.to_lowercase();
        let words = words(description);

        let high = keyword_hits(&words, &lowered, &self.policy.high_keywords);
        let low = keyword_hits(&words, &lowered, &self.policy.low_keywords);
        let trivial = keyword_hits(&words, &lowered, &self.policy.trivial_keywords);

        let base = if high >= self.policy.critical_keyword_hits {
            Complexity::Critical
        } else if high > low {
            Complexity::High
        } else if trivial > 0 && high == 0 {
            Complexity::Trivial
        } else if low > 0 {
            Complexity::Low
        } else {
            Complexity::Medium
        };

        if words.len() > self.policy.long_description_words {
            bump(base)
        } else {
            base
        }
    }

    pub fn duration(&self, complexity: Complexity) -> u32 {
        duration_for(&self.policy.durations, complexity)
    }

    pub fn required_skills(&self, description: &str) -> Vec<String> {
        let words = words(description);
        let mut skills: Vec<String> = SKILL_KEYWORDS
            .iter()
            .filter(|(_, keywords)| keywords.iter().any(|kw| words.iter().any(|w| w == kw)))
            .map(|(skill, _)| skill.to_string())
            .collect();

        if skills.is_empty() {
            skills.push("general".to_string());
        }
        skills
    }
}

/// Deterministic duration lookup
pub fn duration_for(table: &DurationTable, complexity: Complexity) -> u32 {
    match complexity {
        Complexity::Trivial => table.trivial,
        Complexity::Low => table.low,
        Complexity::Medium => table.medium,
        Complexity::High => table.high,
        Complexity::Critical => table.critical,
    }
}

fn bump(level: Complexity) -> Complexity {
    match level {
        Complexity::Trivial => Complexity::Low,
        Complexity::Low => Complexity::Medium,
        Complexity::Medium => Complexity::High,
        Complexity::High | Complexity::Critical => Complexity::Critical,
    }
}
