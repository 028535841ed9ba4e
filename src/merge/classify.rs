// Conflict classification and the deterministic resolution rule per category

use super::backend::{ConflictSides, Resolution};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictCategory {
    Documentation,
    Configuration,
    Generated,
    Source,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStrategy {
    /// Keep the integration side and append lines only the branch has
    UnionAppend,
    /// Deep-merge structured documents, branch side wins on scalars
    StructuredMerge,
    /// Branch side replaces the integration side
    LastWriter,
    /// Never auto-resolved
    Escalate,
}

const GENERATED_FILES: &[&str] = &[
    "cargo.lock",
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "poetry.lock",
    "pipfile.lock",
    "composer.lock",
    "gemfile.lock",
    "go.sum",
];
const GENERATED_DIRS: &[&str] = &[
    "dist",
    "build",
    "target",
    "generated",
    "__generated__",
    "node_modules",
];
const GENERATED_SUFFIXES: &[&str] = &[
    ".min.js", ".min.css", ".map", ".pb.go", "_pb2.py", ".g.dart",
];

const DOC_EXTENSIONS: &[&str] = &["md", "markdown", "rst", "txt", "adoc"];
const DOC_NAMES: &[&str] = &["readme", "changelog", "license", "authors", "contributing", "notice"];

const CONFIG_EXTENSIONS: &[&str] = &[
    "json",
    "yaml",
    "yml",
    "toml",
    "ini",
    "cfg",
    "conf",
    "env",
    "properties",
];
const CONFIG_NAMES: &[&str] = &[
    ".gitignore",
    ".gitattributes",
    ".editorconfig",
    ".dockerignore",
    ".env",
];

impl ConflictCategory {
    /// Bucket a path by name and extension. Generated artifacts are checked
    /// first so `package-lock.json` is not treated as configuration.
    pub fn classify(path: &str) -> Self {
        let lower = path.to_lowercase().replace('\\', "/");
        let file_name = lower.rsplit('/').next().unwrap_or(&lower);
        let extension = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");
        let stem = file_name.split('.').next().unwrap_or(file_name);

        let in_generated_dir = lower
            .split('/')
            .rev()
            .skip(1)
            .any(|segment| GENERATED_DIRS.contains(&segment));
        if GENERATED_FILES.contains(&file_name)
            || in_generated_dir
            || GENERATED_SUFFIXES.iter().any(|s| file_name.ends_with(s))
            || file_name.contains(".generated.")
        {
            return ConflictCategory::Generated;
        }

        if DOC_EXTENSIONS.contains(&extension)
            || DOC_NAMES.contains(&stem)
            || lower.starts_with("docs/")
            || lower.contains("/docs/")
        {
            return ConflictCategory::Documentation;
        }

        if CONFIG_EXTENSIONS.contains(&extension) || CONFIG_NAMES.contains(&file_name) {
            return ConflictCategory::Configuration;
        }

        ConflictCategory::Source
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictCategory::Documentation => "documentation",
            ConflictCategory::Configuration => "configuration",
            ConflictCategory::Generated => "generated",
            ConflictCategory::Source => "source",
        }
    }

    pub fn strategy(&self) -> ResolutionStrategy {
        match self {
            ConflictCategory::Documentation => ResolutionStrategy::UnionAppend,
            ConflictCategory::Configuration => ResolutionStrategy::StructuredMerge,
            ConflictCategory::Generated => ResolutionStrategy::LastWriter,
            ConflictCategory::Source => ResolutionStrategy::Escalate,
        }
    }
}

impl ResolutionStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionStrategy::UnionAppend => "union-append",
            ResolutionStrategy::StructuredMerge => "structured-merge",
            ResolutionStrategy::LastWriter => "last-writer",
            ResolutionStrategy::Escalate => "escalate",
        }
    }

    /// Resolution for one conflicted path, or `None` when it must escalate.
    ///
    /// Text merges need both sides present and valid UTF-8; anything else
    /// (binary content, modify/delete) escalates. `LastWriter` takes the
    /// branch side verbatim, including its deletion.
    pub fn apply(&self, sides: &ConflictSides) -> Option<Resolution> {
        match self {
            ResolutionStrategy::UnionAppend => {
                let (ours, theirs) = (sides.ours_text()?, sides.theirs_text()?);
                Some(Resolution::Content(union_append(ours, theirs).into_bytes()))
            }
            ResolutionStrategy::StructuredMerge => {
                let (ours, theirs) = (sides.ours_text()?, sides.theirs_text()?);
                let merged = structured_merge(&sides.path, ours, theirs)
                    .unwrap_or_else(|| theirs.to_string());
                Some(Resolution::Content(merged.into_bytes()))
            }
            ResolutionStrategy::LastWriter => Some(match &sides.theirs {
                Some(theirs) => Resolution::Content(theirs.as_bytes().to_vec()),
                None => Resolution::Delete,
            }),
            ResolutionStrategy::Escalate => None,
        }
    }
}

/// Integration lines in order, then branch lines not already present
pub fn union_append(ours: &str, theirs: &str) -> String {
    let seen: HashSet<&str> = ours.lines().collect();
    let mut lines: Vec<&str> = ours.lines().collect();
    for line in theirs.lines() {
        if !seen.contains(line) && !line.trim().is_empty() {
            lines.push(line);
        }
    }

    let mut merged = lines.join("\n");
    if ours.ends_with('\n') || theirs.ends_with('\n') {
        merged.push('\n');
    }
    merged
}

/// Deep merge of JSON/YAML/TOML documents; `None` when either side does not parse
pub fn structured_merge(path: &str, ours: &str, theirs: &str) -> Option<String> {
    let extension = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "json" => {
            let mut base: serde_json::Value = serde_json::from_str(ours).ok()?;
            let overlay: serde_json::Value = serde_json::from_str(theirs).ok()?;
            merge_json(&mut base, overlay);
            let mut out = serde_json::to_string_pretty(&base).ok()?;
            out.push('\n');
            Some(out)
        }
        "yaml" | "yml" => {
            let mut base: serde_yaml::Value = serde_yaml::from_str(ours).ok()?;
            let overlay: serde_yaml::Value = serde_yaml::from_str(theirs).ok()?;
            merge_yaml(&mut base, overlay);
            serde_yaml::to_string(&base).ok()
        }
        "toml" => {
            let mut base: toml::Value = toml::from_str(ours).ok()?;
            let overlay: toml::Value = toml::from_str(theirs).ok()?;
            merge_toml(&mut base, overlay);
            toml::to_string_pretty(&base).ok()
        }
        _ => None,
    }
}

fn merge_json(base: &mut serde_json::Value, overlay: serde_json::Value) {
    match (base, overlay) {
        (serde_json::Value::Object(base), serde_json::Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_json(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

fn merge_yaml(base: &mut serde_yaml::Value, overlay: serde_yaml::Value) {
    match (base, overlay) {
        (serde_yaml::Value::Mapping(base), serde_yaml::Value::Mapping(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_yaml(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

fn merge_toml(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_toml(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}
