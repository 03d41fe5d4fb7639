//! Ignore rules
//!
//! Rules are compiled once into an `IgnoreFilter`. A rule either excludes a
//! chart reference entirely or removes individual candidate versions by
//! version pattern or by update class.

use crate::config::{ConfigWarning, WarningKind};
use crate::domain::{parse_version, ChartReference, UpdateClass};
use crate::error::ConfigError;
use regex::Regex;
use semver::VersionReq;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::{debug, info};

/// Matches wildcard patterns: "16.x", "16.*", "16.2.x", "v1.x.x"
static WILDCARD_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[vV]?((?:\d+\.)+)[xX*](?:\.[xX*])*$").expect("Invalid regex")
});

const RANGE_OPERATOR_CHARS: &[char] = &['<', '>', '=', '~', '^', ',', '|'];

/// An ignore rule as written in configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct IgnoreRule {
    /// Chart name the rule applies to (exact, case-sensitive)
    pub name: String,
    /// Version patterns to exclude
    #[serde(default)]
    pub versions: Vec<String>,
    /// Update classes to exclude ("major", "minor", "patch")
    #[serde(default)]
    pub update_types: Vec<String>,
}

impl IgnoreRule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_versions(mut self, versions: &[&str]) -> Self {
        self.versions = versions.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_update_types(mut self, update_types: &[&str]) -> Self {
        self.update_types = update_types.iter().map(|s| s.to_string()).collect();
        self
    }
}

/// A compiled version pattern
#[derive(Debug, Clone)]
pub enum VersionMatcher {
    /// Exact string equality with the published version
    Exact(String),
    /// Leading numeric components must match
    Wildcard(Vec<u64>),
    /// Any of the alternatives matches
    Range(Vec<VersionReq>),
}

impl VersionMatcher {
    /// Compile a single version pattern
    pub fn compile(pattern: &str) -> Result<Self, ConfigError> {
        let trimmed = pattern.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::invalid_pattern(
                "versions",
                pattern,
                "empty pattern",
            ));
        }

        if let Some(caps) = WILDCARD_PATTERN.captures(trimmed) {
            let prefix = caps[1]
                .split('.')
                .filter(|part| !part.is_empty())
                .map(|part| part.parse::<u64>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| ConfigError::invalid_pattern("versions", pattern, e.to_string()))?;
            return Ok(VersionMatcher::Wildcard(prefix));
        }

        let is_range = trimmed.contains(RANGE_OPERATOR_CHARS)
            || trimmed.contains(char::is_whitespace);
        if !is_range {
            return Ok(VersionMatcher::Exact(trimmed.to_string()));
        }

        let alternatives = trimmed
            .split("||")
            .map(|alt| {
                let normalized = normalize_range(alt);
                VersionReq::parse(&normalized).map_err(|e| {
                    ConfigError::invalid_pattern("versions", pattern, e.to_string())
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(VersionMatcher::Range(alternatives))
    }

    /// Returns true if the published version matches this pattern
    pub fn matches(&self, raw_version: &str) -> bool {
        match self {
            VersionMatcher::Exact(expected) => raw_version.trim() == expected,
            VersionMatcher::Wildcard(prefix) => {
                let Some(version) = parse_version(raw_version) else {
                    return false;
                };
                let parts = [version.major, version.minor, version.patch];
                prefix.iter().zip(parts.iter()).all(|(want, got)| want == got)
            }
            VersionMatcher::Range(alternatives) => {
                let Some(version) = parse_version(raw_version) else {
                    return false;
                };
                alternatives.iter().any(|req| req.matches(&version))
            }
        }
    }
}

/// Rewrite a space-separated range into the comma-separated form `VersionReq` accepts.
///
/// `>= 1.0.0 <2.0.0` becomes `>=1.0.0, <2.0.0` and `1.0.0 - 2.0.0` becomes
/// `>=1.0.0, <=2.0.0`.
fn normalize_range(range: &str) -> String {
    let range = range.trim();
    if let Some((low, high)) = range.split_once(" - ") {
        return format!(">={}, <={}", low.trim(), high.trim());
    }

    let mut comparators: Vec<String> = Vec::new();
    let mut pending_operator = String::new();
    for token in range
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
    {
        if token.chars().all(|c| matches!(c, '<' | '>' | '=' | '~' | '^')) {
            pending_operator.push_str(token);
            continue;
        }
        comparators.push(format!("{}{}", pending_operator, token));
        pending_operator.clear();
    }
    if !pending_operator.is_empty() {
        comparators.push(pending_operator);
    }
    comparators.join(", ")
}

#[derive(Debug, Clone)]
struct CompiledRule {
    name: String,
    matchers: Vec<VersionMatcher>,
    classes: Vec<UpdateClass>,
    /// Decided on the rule as written, so a rule whose patterns all fail to
    /// compile does not turn into a blanket exclusion
    excludes_all: bool,
}

/// Compiled set of ignore rules
#[derive(Debug, Clone, Default)]
pub struct IgnoreFilter {
    rules: Vec<CompiledRule>,
}

impl IgnoreFilter {
    /// Compile rules, collecting warnings for patterns and classes that are ignored
    pub fn compile(rules: &[IgnoreRule]) -> (Self, Vec<ConfigWarning>) {
        let mut warnings = Vec::new();
        let mut compiled = Vec::with_capacity(rules.len());

        for (index, rule) in rules.iter().enumerate() {
            let mut matchers = Vec::new();
            for pattern in &rule.versions {
                match VersionMatcher::compile(pattern) {
                    Ok(matcher) => matchers.push(matcher),
                    Err(e) => warnings.push(ConfigWarning::new(
                        WarningKind::InvalidVersionPattern,
                        format!("ignore[{}].versions", index),
                        pattern,
                        e.to_string(),
                    )),
                }
            }

            let mut classes = Vec::new();
            for value in &rule.update_types {
                match value.parse::<UpdateClass>() {
                    Ok(class) => classes.push(class),
                    Err(e) => warnings.push(ConfigWarning::new(
                        WarningKind::InvalidUpdateType,
                        format!("ignore[{}].update-types", index),
                        value,
                        e.to_string(),
                    )),
                }
            }

            compiled.push(CompiledRule {
                name: rule.name.clone(),
                matchers,
                classes,
                excludes_all: rule.versions.is_empty() && rule.update_types.is_empty(),
            });
        }

        (Self { rules: compiled }, warnings)
    }

    /// Returns true if there are no rules
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    fn rules_for<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a CompiledRule> + 'a {
        self.rules.iter().filter(move |rule| rule.name == name)
    }

    /// Returns true if a rule excludes the whole reference
    pub fn is_excluded(&self, reference: &ChartReference) -> bool {
        let excluded = self
            .rules_for(&reference.chart_name)
            .any(|rule| rule.excludes_all);
        if excluded {
            info!(chart = %reference.chart_name, "Chart excluded by ignore rule");
        }
        excluded
    }

    /// Returns true if a rule removes this candidate for the reference
    pub fn is_candidate_excluded(
        &self,
        reference: &ChartReference,
        candidate_version: &str,
        class: Option<UpdateClass>,
    ) -> bool {
        let excluded = self.rules_for(&reference.chart_name).any(|rule| {
            rule.matchers.iter().any(|m| m.matches(candidate_version))
                || class.is_some_and(|c| rule.classes.contains(&c))
        });
        if excluded {
            debug!(
                chart = %reference.chart_name,
                version = candidate_version,
                "Candidate excluded by ignore rule"
            );
        }
        excluded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nginx() -> ChartReference {
        ChartReference::new("https://charts.bitnami.com/bitnami", "nginx", "15.9.0")
    }

    fn compile(rules: &[IgnoreRule]) -> IgnoreFilter {
        let (filter, warnings) = IgnoreFilter::compile(rules);
        assert!(warnings.is_empty(), "unexpected warnings: {:?}", warnings);
        filter
    }

    #[test]
    fn test_matcher_exact() {
        let matcher = VersionMatcher::compile("16.5.0").unwrap();
        assert!(matches!(matcher, VersionMatcher::Exact(_)));
        assert!(matcher.matches("16.5.0"));
        assert!(!matcher.matches("16.5.1"));
    }

    #[test]
    fn test_matcher_wildcard() {
        let matcher = VersionMatcher::compile("16.x").unwrap();
        assert!(matches!(matcher, VersionMatcher::Wildcard(ref p) if p == &vec![16]));
        assert!(matcher.matches("16.0.0"));
        assert!(matcher.matches("16.5.3"));
        assert!(!matcher.matches("17.0.0"));
        assert!(!matcher.matches("1.6.0"));
    }

    #[test]
    fn test_matcher_wildcard_star_and_minor() {
        assert!(VersionMatcher::compile("16.*").unwrap().matches("16.9.9"));
        let minor = VersionMatcher::compile("16.2.x").unwrap();
        assert!(minor.matches("16.2.7"));
        assert!(!minor.matches("16.3.0"));
    }

    #[test]
    fn test_matcher_space_separated_range() {
        let matcher = VersionMatcher::compile(">=16.0.0 <17.0.0").unwrap();
        assert!(matches!(matcher, VersionMatcher::Range(_)));
        assert!(matcher.matches("16.0.0"));
        assert!(matcher.matches("16.99.1"));
        assert!(!matcher.matches("17.0.0"));
        assert!(!matcher.matches("15.9.0"));
    }

    #[test]
    fn test_matcher_comma_range_with_spaced_operators() {
        let matcher = VersionMatcher::compile(">= 1.2.0, < 1.3.0").unwrap();
        assert!(matcher.matches("1.2.5"));
        assert!(!matcher.matches("1.3.0"));
    }

    #[test]
    fn test_matcher_alternatives() {
        let matcher = VersionMatcher::compile("<1.0.0 || >=3.0.0").unwrap();
        assert!(matcher.matches("0.9.0"));
        assert!(matcher.matches("3.1.0"));
        assert!(!matcher.matches("2.0.0"));
    }

    #[test]
    fn test_matcher_hyphen_range() {
        let matcher = VersionMatcher::compile("1.0.0 - 2.0.0").unwrap();
        assert!(matcher.matches("1.0.0"));
        assert!(matcher.matches("2.0.0"));
        assert!(!matcher.matches("2.0.1"));
    }

    #[test]
    fn test_matcher_invalid() {
        assert!(VersionMatcher::compile(">=banana").is_err());
        assert!(VersionMatcher::compile("   ").is_err());
    }

    #[test]
    fn test_normalize_range() {
        assert_eq!(normalize_range(">=16.0.0 <17.0.0"), ">=16.0.0, <17.0.0");
        assert_eq!(normalize_range(">= 1.0.0"), ">=1.0.0");
        assert_eq!(normalize_range("1.0.0 - 2.0.0"), ">=1.0.0, <=2.0.0");
    }

    #[test]
    fn test_rule_without_patterns_excludes_reference() {
        let filter = compile(&[IgnoreRule::new("nginx")]);
        assert!(filter.is_excluded(&nginx()));
    }

    #[test]
    fn test_rule_name_is_case_sensitive() {
        let filter = compile(&[IgnoreRule::new("Nginx")]);
        assert!(!filter.is_excluded(&nginx()));
    }

    #[test]
    fn test_rule_with_patterns_does_not_exclude_reference() {
        let filter = compile(&[IgnoreRule::new("nginx").with_versions(&["16.x"])]);
        assert!(!filter.is_excluded(&nginx()));
        assert!(filter.is_candidate_excluded(&nginx(), "16.5.0", Some(UpdateClass::Major)));
        assert!(!filter.is_candidate_excluded(&nginx(), "17.0.0", Some(UpdateClass::Major)));
    }

    #[test]
    fn test_rule_update_types() {
        let filter = compile(&[IgnoreRule::new("nginx").with_update_types(&["major"])]);
        assert!(filter.is_candidate_excluded(&nginx(), "16.0.0", Some(UpdateClass::Major)));
        assert!(!filter.is_candidate_excluded(&nginx(), "15.10.0", Some(UpdateClass::Minor)));
    }

    #[test]
    fn test_rules_union() {
        let filter = compile(&[
            IgnoreRule::new("nginx").with_versions(&["16.x"]),
            IgnoreRule::new("nginx").with_update_types(&["patch"]),
        ]);
        assert!(filter.is_candidate_excluded(&nginx(), "16.1.0", Some(UpdateClass::Major)));
        assert!(filter.is_candidate_excluded(&nginx(), "15.9.1", Some(UpdateClass::Patch)));
        assert!(!filter.is_candidate_excluded(&nginx(), "15.10.0", Some(UpdateClass::Minor)));
    }

    #[test]
    fn test_rules_for_other_chart_do_not_apply() {
        let filter = compile(&[IgnoreRule::new("redis").with_versions(&["16.x"])]);
        assert!(!filter.is_candidate_excluded(&nginx(), "16.1.0", Some(UpdateClass::Major)));
    }

    #[test]
    fn test_invalid_pattern_warns_and_is_ignored() {
        let rules = [IgnoreRule::new("nginx").with_versions(&[">=banana", "16.x"])];
        let (filter, warnings) = IgnoreFilter::compile(&rules);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, WarningKind::InvalidVersionPattern);
        assert_eq!(warnings[0].field, "ignore[0].versions");
        assert_eq!(warnings[0].value, ">=banana");
        assert!(filter.is_candidate_excluded(&nginx(), "16.0.0", None));
    }

    #[test]
    fn test_all_invalid_patterns_exclude_nothing() {
        let rules = [IgnoreRule::new("nginx").with_versions(&[">=banana"])];
        let (filter, warnings) = IgnoreFilter::compile(&rules);
        assert_eq!(warnings.len(), 1);
        assert!(!filter.is_excluded(&nginx()));
        assert!(!filter.is_candidate_excluded(&nginx(), "16.0.0", None));
    }

    #[test]
    fn test_invalid_update_type_warns() {
        let rules = [IgnoreRule::new("nginx").with_update_types(&["huge"])];
        let (_, warnings) = IgnoreFilter::compile(&rules);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, WarningKind::InvalidUpdateType);
        assert_eq!(warnings[0].value, "huge");
    }

    #[test]
    fn test_deserialize_rule() {
        let yaml = "name: nginx\nversions: [\"16.x\"]\nupdate-types: [major]\n";
        let rule: IgnoreRule = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(rule.name, "nginx");
        assert_eq!(rule.versions, vec!["16.x"]);
        assert_eq!(rule.update_types, vec!["major"]);
    }
}
