//! JSON output formatter for machine processing
//!
//! This module provides:
//! - JSON serialization of plan results
//! - Manifest-by-manifest update/skip information
//! - Grouped updates, source failures and configuration warnings

use crate::config::ConfigWarning;
use crate::domain::{ManifestPlan, ProposedUpdate, SkipReason};
use crate::orchestrator::PlanResult;
use crate::output::{OutputFormatter, Verbosity};
use indexmap::IndexMap;
use serde::Serialize;
use std::io::Write;

/// JSON formatter for machine-readable output
pub struct JsonFormatter {
    /// Verbosity level affects detail in output
    verbosity: Verbosity,
}

impl JsonFormatter {
    /// Create a new JSON formatter
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }
}

/// JSON representation of the full result
#[derive(Serialize)]
struct JsonOutput<'a> {
    /// Summary statistics
    summary: JsonSummary,
    /// Per-manifest results
    manifests: Vec<JsonManifest<'a>>,
    /// Updates partitioned into groups
    groups: IndexMap<&'a str, Vec<JsonUpdate<'a>>>,
    /// Sources that failed to fetch
    #[serde(skip_serializing_if = "Vec::is_empty")]
    failures: Vec<JsonFailure<'a>>,
    /// Configuration warnings
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    warnings: &'a [ConfigWarning],
}

/// JSON representation of summary statistics
#[derive(Serialize)]
struct JsonSummary {
    updates: usize,
    skips: usize,
    failed_sources: usize,
}

/// JSON representation of a manifest plan
#[derive(Serialize)]
struct JsonManifest<'a> {
    path: String,
    updates: Vec<JsonUpdate<'a>>,
    /// List of skips (only in verbose mode)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    skips: Vec<JsonSkip<'a>>,
}

/// JSON representation of an update
#[derive(Serialize)]
struct JsonUpdate<'a> {
    name: &'a str,
    repository: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    address: &'a str,
    from: &'a str,
    to: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    app_version: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    class: Option<&'static str>,
}

/// JSON representation of a skip
#[derive(Serialize)]
struct JsonSkip<'a> {
    name: &'a str,
    version: &'a str,
    reason: String,
}

/// JSON representation of a failed source
#[derive(Serialize)]
struct JsonFailure<'a> {
    url: &'a str,
    charts: &'a [String],
    error: String,
}

impl JsonFormatter {
    /// Convert skip reason to a stable machine-readable string
    fn skip_reason_to_string(reason: &SkipReason) -> String {
        match reason {
            SkipReason::Excluded => "excluded".to_string(),
            SkipReason::UnsupportedSource(msg) => format!("unsupported_source: {}", msg),
            SkipReason::InvalidCurrentVersion => "invalid_current_version".to_string(),
            SkipReason::FetchFailed(msg) => format!("fetch_failed: {}", msg),
            SkipReason::NoVersionsAvailable => "no_versions_available".to_string(),
            SkipReason::NoSuitableVersion => "no_suitable_version".to_string(),
            SkipReason::Duplicate => "duplicate".to_string(),
        }
    }

    fn update_to_json(update: &ProposedUpdate) -> JsonUpdate<'_> {
        JsonUpdate {
            name: &update.reference.chart_name,
            repository: &update.reference.source_location,
            address: update.reference.address.as_str(),
            from: &update.current_version,
            to: &update.new_version,
            app_version: update.app_version.as_deref(),
            class: update.update_class().map(|c| c.label()),
        }
    }

    /// Convert manifest plan to JSON representation
    fn manifest_to_json<'a>(&self, manifest: &'a ManifestPlan) -> JsonManifest<'a> {
        let skips = if self.verbosity == Verbosity::Verbose {
            manifest
                .skips()
                .filter_map(|result| {
                    let reason = result.skip_reason()?;
                    Some(JsonSkip {
                        name: &result.reference().chart_name,
                        version: &result.reference().current_version,
                        reason: Self::skip_reason_to_string(reason),
                    })
                })
                .collect()
        } else {
            Vec::new()
        };

        JsonManifest {
            path: manifest.path.display().to_string(),
            updates: manifest.updates().map(Self::update_to_json).collect(),
            skips,
        }
    }

    fn write_json<T: Serialize>(value: &T, writer: &mut dyn Write) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(std::io::Error::other)?;
        writeln!(writer, "{}", json)
    }
}

impl OutputFormatter for JsonFormatter {
    fn format(&self, result: &PlanResult, writer: &mut dyn Write) -> std::io::Result<()> {
        let output = JsonOutput {
            summary: JsonSummary {
                updates: result.summary.total_updates(),
                skips: result.summary.total_skips(),
                failed_sources: result.failures.len(),
            },
            manifests: result
                .summary
                .manifests
                .iter()
                .map(|m| self.manifest_to_json(m))
                .collect(),
            groups: result
                .groups
                .iter()
                .map(|(name, updates)| {
                    (
                        name.as_str(),
                        updates.iter().map(Self::update_to_json).collect(),
                    )
                })
                .collect(),
            failures: result
                .failures
                .iter()
                .map(|f| JsonFailure {
                    url: &f.url,
                    charts: &f.charts,
                    error: f.error.to_string(),
                })
                .collect(),
            warnings: &result.warnings,
        };

        Self::write_json(&output, writer)
    }

    fn format_manifest(&self, manifest: &ManifestPlan, writer: &mut dyn Write) -> std::io::Result<()> {
        Self::write_json(&self.manifest_to_json(manifest), writer)
    }
}
