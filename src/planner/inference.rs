// Dependency inference: declared edges plus explainable heuristic edges

use super::estimate::words;
use crate::error::{SwarmError, SwarmResult};
use crate::models::{Dependency, InferenceReason};
use std::collections::HashSet;

const TESTING_CATEGORIES: &[&str] = &["testing", "tests", "test", "qa"];
const IMPLEMENTATION_CATEGORIES: &[&str] =
    &["feature", "features", "implementation", "backend", "frontend"];
const CONSUMER_WORDS: &[&str] = &[
    "api", "apis", "endpoint", "endpoints", "route", "routes", "controller", "handler",
];
const PRODUCER_WORDS: &[&str] = &[
    "model", "models", "schema", "schemas", "auth", "authentication", "entity", "entities",
];
const FILLER_WORDS: &[&str] = &[
    "a", "an", "the", "and", "or", "for", "of", "to", "with", "in", "on", "new", "build",
    "create", "implement", "add", "write", "design", "update", "define", "set", "up", "basic",
];
/// Testing tasks wait on at most this many implementation tasks
const CONVENTION_FANIN: usize = 2;

/// A task before edges are attached
#[derive(Debug, Clone)]
pub struct DraftTask {
    pub id: String,
    pub description: String,
    pub category: String,
    pub declared: Vec<String>,
}

/// Resolve declared dependencies and, when enabled, add heuristic ones.
/// Returns one edge list per draft, in draft order.
pub fn infer_dependencies(
    drafts: &[DraftTask],
    heuristics: bool,
) -> SwarmResult<Vec<Vec<Dependency>>> {
    let mut edges: Vec<Vec<Dependency>> = vec![Vec::new(); drafts.len()];
    let mut seen: HashSet<(usize, usize)> = HashSet::new();

    let mut add =
        |edges: &mut Vec<Vec<Dependency>>, from: usize, to: usize, reason: InferenceReason| {
            if seen.insert((from, to)) {
                edges[from].push(Dependency {
                    task_id: drafts[to].id.clone(),
                    reason,
                });
            }
        };

    for (i, draft) in drafts.iter().enumerate() {
        for reference in &draft.declared {
            let target = resolve_reference(drafts, reference).ok_or_else(|| {
                SwarmError::parse(
                    draft.id.clone(),
                    format!("depends on unknown task '{}'", reference),
                )
            })?;
            // Self references survive so graph validation reports them as a cycle
            add(&mut edges, i, target, InferenceReason::Declared);
        }
    }

    if !heuristics {
        return Ok(edges);
    }

    let word_lists: Vec<Vec<String>> = drafts.iter().map(|d| words(&d.description)).collect();

    for (i, draft) in drafts.iter().enumerate() {
        for (j, phrase) in text_references(drafts, i) {
            add(&mut edges, i, j, InferenceReason::TextReference { phrase });
        }

        if is_category(&draft.category, TESTING_CATEGORIES) && edges[i].is_empty() {
            let producers: Vec<usize> = drafts
                .iter()
                .enumerate()
                .filter(|(j, d)| *j != i && is_category(&d.category, IMPLEMENTATION_CATEGORIES))
                .map(|(j, _)| j)
                .take(CONVENTION_FANIN)
                .collect();
            for j in producers {
                add(
                    &mut edges,
                    i,
                    j,
                    InferenceReason::CategoryConvention {
                        rule: "testing waits on implementation".to_string(),
                    },
                );
            }
        }

        if has_any(&word_lists[i], CONSUMER_WORDS) && !has_any(&word_lists[i], PRODUCER_WORDS) {
            for (j, other) in word_lists.iter().enumerate() {
                if j == i || has_any(other, CONSUMER_WORDS) {
                    continue;
                }
                let Some(keyword) = other.iter().find(|w| PRODUCER_WORDS.contains(&w.as_str()))
                else {
                    continue;
                };
                if let Some(subject) = shared_subject(&word_lists[i], other) {
                    add(
                        &mut edges,
                        i,
                        j,
                        InferenceReason::SubjectMatch {
                            subject,
                            keyword: keyword.clone(),
                        },
                    );
                }
            }
        }
    }

    Ok(edges)
}

/// Match by id first, then by exact (case-insensitive) description
fn resolve_reference(drafts: &[DraftTask], reference: &str) -> Option<usize> {
    let reference = reference.trim();
    drafts
        .iter()
        .position(|d| d.id == reference)
        .or_else(|| {
            drafts
                .iter()
                .position(|d| d.description.eq_ignore_ascii_case(reference))
        })
}

/// "... after X" / "... depends on X" where X is another task's description
fn text_references(drafts: &[DraftTask], i: usize) -> Vec<(usize, String)> {
    let lowered = drafts[i].description.to_lowercase();
    let tail = ["depends on ", "after "]
        .iter()
        .filter_map(|marker| lowered.find(marker).map(|idx| &lowered[idx + marker.len()..]))
        .next();

    let Some(tail) = tail else {
        return Vec::new();
    };

    drafts
        .iter()
        .enumerate()
        .filter(|(j, d)| {
            *j != i
                && d.description.trim().len() >= 4
                && tail.contains(&d.description.to_lowercase())
        })
        .map(|(j, d)| (j, d.description.clone()))
        .collect()
}

fn is_category(category: &str, set: &[&str]) -> bool {
    set.contains(&category.to_lowercase().as_str())
}

fn has_any(words: &[String], set: &[&str]) -> bool {
    words.iter().any(|w| set.contains(&w.as_str()))
}

fn is_subject_word(word: &str) -> bool {
    word.len() > 2
        && !FILLER_WORDS.contains(&word)
        && !CONSUMER_WORDS.contains(&word)
        && !PRODUCER_WORDS.contains(&word)
}

fn shared_subject(consumer: &[String], producer: &[String]) -> Option<String> {
    consumer
        .iter()
        .filter(|w| is_subject_word(w))
        .find(|w| producer.contains(w))
        .cloned()
}
