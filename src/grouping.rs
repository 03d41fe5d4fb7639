//! Grouping of proposed updates into named buckets
//!
//! Groups are evaluated in configuration order and the first group whose
//! patterns (and optional update-class filter) match an update claims it.
//! Updates matching no group land in the `ungrouped` bucket, which is always
//! emitted last.
//!
//! Patterns support `*` and `?` only. Square brackets are matched literally.

use crate::config::{ConfigWarning, WarningKind};
use crate::domain::{ProposedUpdate, UpdateClass};
use glob::{MatchOptions, Pattern};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Name of the bucket for updates that match no group
pub const UNGROUPED: &str = "ungrouped";

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// A group definition as written in configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GroupConfig {
    /// Glob patterns matched against the chart name
    #[serde(default)]
    pub patterns: Vec<String>,
    /// Restrict the group to these update classes
    #[serde(default)]
    pub update_types: Vec<String>,
}

impl GroupConfig {
    pub fn new(patterns: &[&str]) -> Self {
        Self {
            patterns: patterns.iter().map(|s| s.to_string()).collect(),
            update_types: Vec::new(),
        }
    }

    pub fn with_update_types(mut self, update_types: &[&str]) -> Self {
        self.update_types = update_types.iter().map(|s| s.to_string()).collect();
        self
    }
}

#[derive(Debug, Clone)]
struct CompiledGroup {
    name: String,
    patterns: Vec<Pattern>,
    /// True when no patterns were configured at all
    match_any_name: bool,
    /// `None` when no update types were configured; an empty list matches nothing
    classes: Option<Vec<UpdateClass>>,
}

impl CompiledGroup {
    fn matches(&self, update: &ProposedUpdate) -> bool {
        let name_matches = self.match_any_name
            || self
                .patterns
                .iter()
                .any(|p| p.matches_with(update.chart_name(), MATCH_OPTIONS));
        if !name_matches {
            return false;
        }
        match &self.classes {
            None => true,
            Some(classes) => update
                .update_class()
                .is_some_and(|class| classes.contains(&class)),
        }
    }
}

/// Quote `[` and `]` so glob character classes never apply
fn escape_brackets(pattern: &str) -> String {
    let mut escaped = String::with_capacity(pattern.len());
    for c in pattern.chars() {
        match c {
            '[' => escaped.push_str("[[]"),
            ']' => escaped.push_str("[]]"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Partitions proposed updates by compiled group definitions
#[derive(Debug, Clone, Default)]
pub struct GroupingEngine {
    groups: Vec<CompiledGroup>,
}

impl GroupingEngine {
    /// Compile group definitions, dropping invalid patterns with a warning
    pub fn compile(definitions: &IndexMap<String, GroupConfig>) -> (Self, Vec<ConfigWarning>) {
        let mut warnings = Vec::new();
        let mut groups = Vec::with_capacity(definitions.len());

        for (name, definition) in definitions {
            let mut patterns = Vec::new();
            for raw in &definition.patterns {
                match Pattern::new(&escape_brackets(raw)) {
                    Ok(pattern) => patterns.push(pattern),
                    Err(e) => warnings.push(ConfigWarning::new(
                        WarningKind::InvalidGroupPattern,
                        format!("groups.{}.patterns", name),
                        raw,
                        format!("invalid glob pattern '{}': {}", raw, e.msg),
                    )),
                }
            }

            let mut classes = Vec::new();
            for raw in &definition.update_types {
                match raw.parse::<UpdateClass>() {
                    Ok(class) => classes.push(class),
                    Err(e) => warnings.push(ConfigWarning::new(
                        WarningKind::InvalidUpdateType,
                        format!("groups.{}.update-types", name),
                        raw,
                        e.to_string(),
                    )),
                }
            }

            if !definition.update_types.is_empty() && classes.is_empty() {
                debug!(group = %name, "No valid update types, group matches nothing");
            }

            groups.push(CompiledGroup {
                name: name.clone(),
                patterns,
                match_any_name: definition.patterns.is_empty(),
                classes: (!definition.update_types.is_empty()).then_some(classes),
            });
        }

        (Self { groups }, warnings)
    }

    /// Name of the first group that claims the update, if any
    pub fn group_for(&self, update: &ProposedUpdate) -> Option<&str> {
        self.groups
            .iter()
            .find(|group| group.matches(update))
            .map(|group| group.name.as_str())
    }

    /// Partition updates into groups; every update lands in exactly one bucket
    pub fn group(&self, updates: &[ProposedUpdate]) -> IndexMap<String, Vec<ProposedUpdate>> {
        let mut buckets: IndexMap<String, Vec<ProposedUpdate>> = self
            .groups
            .iter()
            .map(|group| (group.name.clone(), Vec::new()))
            .collect();
        let mut ungrouped = Vec::new();

        for update in updates {
            match self.group_for(update) {
                Some(name) => {
                    debug!(chart = %update.chart_name(), group = name, "Grouped update");
                    if let Some(bucket) = buckets.get_mut(name) {
                        bucket.push(update.clone());
                    }
                }
                None => ungrouped.push(update.clone()),
            }
        }

        buckets.retain(|_, bucket| !bucket.is_empty());
        // A configured group literally named "ungrouped" shares the bucket
        if !ungrouped.is_empty() {
            let mut tail = buckets.shift_remove(UNGROUPED).unwrap_or_default();
            tail.extend(ungrouped);
            buckets.insert(UNGROUPED.to_string(), tail);
        }
        buckets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ChartReference;

    fn make_update(name: &str, current: &str, new: &str) -> ProposedUpdate {
        ProposedUpdate::new(
            ChartReference::new("https://charts.example.com", name, current),
            new,
        )
    }

    fn engine(definitions: &[(&str, GroupConfig)]) -> GroupingEngine {
        let map: IndexMap<String, GroupConfig> = definitions
            .iter()
            .map(|(name, config)| (name.to_string(), config.clone()))
            .collect();
        let (engine, warnings) = GroupingEngine::compile(&map);
        assert!(warnings.is_empty(), "unexpected warnings: {:?}", warnings);
        engine
    }

    fn names(bucket: &[ProposedUpdate]) -> Vec<&str> {
        bucket.iter().map(|u| u.chart_name()).collect()
    }

    #[test]
    fn test_no_definitions_everything_ungrouped() {
        let updates = vec![make_update("nginx", "1.0.0", "1.1.0")];
        let grouped = GroupingEngine::default().group(&updates);
        assert_eq!(grouped.len(), 1);
        assert_eq!(names(&grouped[UNGROUPED]), vec!["nginx"]);
    }

    #[test]
    fn test_no_updates_no_buckets() {
        let engine = engine(&[("web", GroupConfig::new(&["nginx"]))]);
        assert!(engine.group(&[]).is_empty());
    }

    #[test]
    fn test_first_match_wins() {
        let engine = engine(&[
            ("bitnami", GroupConfig::new(&["bitnami-*"])),
            ("all", GroupConfig::new(&["*"])),
        ]);
        let updates = vec![
            make_update("bitnami-redis", "1.0.0", "1.0.1"),
            make_update("cert-manager", "1.0.0", "1.0.1"),
        ];
        let grouped = engine.group(&updates);
        assert_eq!(names(&grouped["bitnami"]), vec!["bitnami-redis"]);
        assert_eq!(names(&grouped["all"]), vec!["cert-manager"]);
        assert!(!grouped.contains_key(UNGROUPED));
    }

    #[test]
    fn test_glob_is_case_insensitive() {
        let engine = engine(&[("web", GroupConfig::new(&["NGINX*"]))]);
        let grouped = engine.group(&[make_update("nginx-ingress", "1.0.0", "1.0.1")]);
        assert_eq!(names(&grouped["web"]), vec!["nginx-ingress"]);
    }

    #[test]
    fn test_question_mark_glob() {
        let engine = engine(&[("pg", GroupConfig::new(&["postgres??"]))]);
        let grouped = engine.group(&[
            make_update("postgresql", "1.0.0", "1.0.1"),
            make_update("postgres", "1.0.0", "1.0.1"),
        ]);
        assert_eq!(names(&grouped["pg"]), vec!["postgresql"]);
        assert_eq!(names(&grouped[UNGROUPED]), vec!["postgres"]);
    }

    #[test]
    fn test_update_class_filter() {
        let engine = engine(&[(
            "patches",
            GroupConfig::new(&["*"]).with_update_types(&["patch"]),
        )]);
        let grouped = engine.group(&[
            make_update("nginx", "1.0.0", "1.0.1"),
            make_update("redis", "1.0.0", "2.0.0"),
        ]);
        assert_eq!(names(&grouped["patches"]), vec!["nginx"]);
        assert_eq!(names(&grouped[UNGROUPED]), vec!["redis"]);
    }

    #[test]
    fn test_empty_groups_omitted_and_ungrouped_last() {
        let engine = engine(&[
            ("unused", GroupConfig::new(&["nothing-matches"])),
            ("web", GroupConfig::new(&["nginx"])),
        ]);
        let grouped = engine.group(&[
            make_update("redis", "1.0.0", "1.0.1"),
            make_update("nginx", "1.0.0", "1.0.1"),
        ]);
        let keys: Vec<_> = grouped.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["web", UNGROUPED]);
    }

    #[test]
    fn test_partition_property() {
        let engine = engine(&[
            ("a", GroupConfig::new(&["a*"])),
            ("b", GroupConfig::new(&["*b"])),
        ]);
        let updates = vec![
            make_update("ab", "1.0.0", "1.0.1"),
            make_update("cb", "1.0.0", "1.0.1"),
            make_update("cc", "1.0.0", "1.0.1"),
            make_update("aa", "1.0.0", "1.0.1"),
        ];
        let grouped = engine.group(&updates);
        let total: usize = grouped.values().map(Vec::len).sum();
        assert_eq!(total, updates.len());
        assert!(grouped.values().all(|bucket| !bucket.is_empty()));
        assert_eq!(names(&grouped["a"]), vec!["ab", "aa"]);
    }

    #[test]
    fn test_chart_name_with_slash() {
        let engine = engine(&[("org", GroupConfig::new(&["charts*"]))]);
        let grouped = engine.group(&[make_update("charts/podinfo", "6.0.0", "6.1.0")]);
        assert_eq!(names(&grouped["org"]), vec!["charts/podinfo"]);
    }

    #[test]
    fn test_invalid_pattern_dropped_with_warning() {
        let mut map = IndexMap::new();
        map.insert("broken".to_string(), GroupConfig::new(&["a**b", "nginx"]));
        let (engine, warnings) = GroupingEngine::compile(&map);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, WarningKind::InvalidGroupPattern);
        assert_eq!(warnings[0].field, "groups.broken.patterns");
        let grouped = engine.group(&[make_update("nginx", "1.0.0", "1.0.1")]);
        assert!(grouped.contains_key("broken"));
    }

    #[test]
    fn test_invalid_update_types_match_nothing() {
        let mut map = IndexMap::new();
        map.insert(
            "patches".to_string(),
            GroupConfig::new(&["*"]).with_update_types(&["pach"]),
        );
        let (engine, warnings) = GroupingEngine::compile(&map);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, WarningKind::InvalidUpdateType);
        assert_eq!(warnings[0].field, "groups.patches.update-types");

        let grouped = engine.group(&[
            make_update("nginx", "1.0.0", "2.0.0"),
            make_update("redis", "1.0.0", "1.0.1"),
        ]);
        assert!(!grouped.contains_key("patches"));
        assert_eq!(names(&grouped[UNGROUPED]), vec!["nginx", "redis"]);
    }

    #[test]
    fn test_partially_invalid_update_types_keep_valid_ones() {
        let mut map = IndexMap::new();
        map.insert(
            "small".to_string(),
            GroupConfig::new(&["*"]).with_update_types(&["pach", "minor"]),
        );
        let (engine, warnings) = GroupingEngine::compile(&map);
        assert_eq!(warnings.len(), 1);
        let grouped = engine.group(&[
            make_update("nginx", "1.0.0", "1.1.0"),
            make_update("redis", "1.0.0", "1.0.1"),
        ]);
        assert_eq!(names(&grouped["small"]), vec!["nginx"]);
        assert_eq!(names(&grouped[UNGROUPED]), vec!["redis"]);
    }

    #[test]
    fn test_brackets_are_literal() {
        let engine = engine(&[("legacy", GroupConfig::new(&["app[v1]*"]))]);
        let grouped = engine.group(&[
            make_update("app[v1]-api", "1.0.0", "1.0.1"),
            make_update("appv-api", "1.0.0", "1.0.1"),
        ]);
        assert_eq!(names(&grouped["legacy"]), vec!["app[v1]-api"]);
        assert_eq!(names(&grouped[UNGROUPED]), vec!["appv-api"]);

        assert_eq!(escape_brackets("a[b]?"), "a[[]b[]]?");
    }

    #[test]
    fn test_lone_bracket_is_not_an_error() {
        let engine = engine(&[("odd", GroupConfig::new(&["["]))]);
        let grouped = engine.group(&[make_update("[", "1.0.0", "1.0.1")]);
        assert_eq!(names(&grouped["odd"]), vec!["["]);
    }
}
