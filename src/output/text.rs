//! Text output formatter for human-readable display
//!
//! This module provides:
//! - Proposed updates per manifest or per group, with change class labels
//! - Skipped references with reasons (verbose)
//! - Source errors and configuration warnings
//! - Summary with a breakdown by change class

use crate::domain::{ManifestPlan, PlanSummary, ProposedUpdate, UpdateClass, UpdateResult};
use crate::orchestrator::PlanResult;
use crate::output::{OutputFormatter, Verbosity};
use colored::Colorize;
use std::io::Write;

/// Minimum width of the chart name column
const NAME_WIDTH: usize = 20;

/// Colored label for a change class
fn colored_label(class: Option<UpdateClass>) -> String {
    match class {
        Some(UpdateClass::Major) => "major".red().bold().to_string(),
        Some(UpdateClass::Minor) => "minor".yellow().to_string(),
        Some(UpdateClass::Patch) => "patch".green().to_string(),
        None => "?".dimmed().to_string(),
    }
}

fn plain_label(class: Option<UpdateClass>) -> &'static str {
    class.map(|c| c.label()).unwrap_or("?")
}

fn plural(count: usize, singular: &'static str, plural: &'static str) -> &'static str {
    if count == 1 {
        singular
    } else {
        plural
    }
}

/// Text formatter for human-readable output
pub struct TextFormatter {
    /// Verbosity level
    verbosity: Verbosity,
    /// List updates by group instead of by manifest
    grouped: bool,
    /// Whether to use colors
    color: bool,
}

impl TextFormatter {
    /// Create a new text formatter
    pub fn new(verbosity: Verbosity) -> Self {
        Self::with_color(verbosity, false, true)
    }

    /// Create a new text formatter with layout and color options
    pub fn with_color(verbosity: Verbosity, grouped: bool, color: bool) -> Self {
        Self {
            verbosity,
            grouped,
            color,
        }
    }

    fn name_width<'a>(names: impl Iterator<Item = &'a str>) -> usize {
        names.map(str::len).max().unwrap_or(0).max(NAME_WIDTH)
    }

    /// Format a single update line
    fn format_update_line(
        &self,
        update: &ProposedUpdate,
        width: usize,
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        let class = update.update_class();
        let app = update
            .app_version
            .as_deref()
            .map(|v| format!(" (app {})", v))
            .unwrap_or_default();

        if self.color {
            writeln!(
                writer,
                "  {} {} {} {} [{}]{}",
                format!("{:width$}", update.chart_name(), width = width),
                update.current_version.dimmed(),
                "→".dimmed(),
                update.new_version.bright_white().bold(),
                colored_label(class),
                app.dimmed()
            )
        } else {
            writeln!(
                writer,
                "  {:width$} {} -> {} [{}]{}",
                update.chart_name(),
                update.current_version,
                update.new_version,
                plain_label(class),
                app,
                width = width
            )
        }
    }

    /// Format a single skip line
    fn format_skip_line(
        &self,
        result: &UpdateResult,
        width: usize,
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        let Some(reason) = result.skip_reason() else {
            return Ok(());
        };
        let name = &result.reference().chart_name;
        if self.color {
            writeln!(
                writer,
                "  {} {}",
                format!("{:width$}", name, width = width).dimmed(),
                format!("({})", reason).dimmed()
            )
        } else {
            writeln!(writer, "  {:width$} ({})", name, reason, width = width)
        }
    }

    fn write_heading(&self, heading: &str, writer: &mut dyn Write) -> std::io::Result<()> {
        if self.color {
            writeln!(writer, "{}", heading.bold())
        } else {
            writeln!(writer, "{}", heading)
        }
    }

    /// Format updates partitioned by group
    fn format_groups(&self, result: &PlanResult, writer: &mut dyn Write) -> std::io::Result<()> {
        for (name, updates) in &result.groups {
            let heading = format!(
                "{} — {} {}",
                name,
                updates.len(),
                plural(updates.len(), "update", "updates")
            );
            self.write_heading(&heading, writer)?;
            let width = Self::name_width(updates.iter().map(|u| u.chart_name()));
            for update in updates {
                self.format_update_line(update, width, writer)?;
            }
            writeln!(writer)?;
        }
        Ok(())
    }

    fn format_failures(&self, result: &PlanResult, writer: &mut dyn Write) -> std::io::Result<()> {
        if result.failures.is_empty() {
            return Ok(());
        }
        if self.color {
            writeln!(writer, "{}:", "Source errors".red().bold())?;
        } else {
            writeln!(writer, "Source errors:")?;
        }
        for failure in &result.failures {
            let charts = failure.charts.join(", ");
            if self.color {
                writeln!(writer, "  {} {} ({})", "✗".red(), failure.error, charts.dimmed())?;
            } else {
                writeln!(writer, "  - {} ({})", failure.error, charts)?;
            }
        }
        writeln!(writer)
    }

    fn format_warnings(&self, result: &PlanResult, writer: &mut dyn Write) -> std::io::Result<()> {
        if result.warnings.is_empty() || self.verbosity != Verbosity::Verbose {
            return Ok(());
        }
        if self.color {
            writeln!(writer, "{}:", "Configuration warnings".yellow().bold())?;
        } else {
            writeln!(writer, "Configuration warnings:")?;
        }
        for warning in &result.warnings {
            writeln!(writer, "  - {}", warning)?;
        }
        writeln!(writer)
    }

    /// Count updates by change class: (major, minor, patch, unknown)
    fn count_by_class(summary: &PlanSummary) -> (usize, usize, usize, usize) {
        let mut counts = (0, 0, 0, 0);
        for update in summary.all_updates() {
            match update.update_class() {
                Some(UpdateClass::Major) => counts.0 += 1,
                Some(UpdateClass::Minor) => counts.1 += 1,
                Some(UpdateClass::Patch) => counts.2 += 1,
                None => counts.3 += 1,
            }
        }
        counts
    }

    fn format_summary(&self, summary: &PlanSummary, writer: &mut dyn Write) -> std::io::Result<()> {
        let updates = summary.total_updates();
        let skips = summary.total_skips();

        if self.verbosity == Verbosity::Quiet {
            return if updates > 0 {
                writeln!(
                    writer,
                    "{} {} available",
                    updates,
                    plural(updates, "update", "updates")
                )
            } else {
                writeln!(writer, "No updates")
            };
        }

        let (major, minor, patch, unknown) = Self::count_by_class(summary);
        let mut parts = Vec::new();
        for (count, label) in [(major, "major"), (minor, "minor"), (patch, "patch"), (unknown, "other")] {
            if count > 0 {
                parts.push(format!("{} {}", count, label));
            }
        }

        self.write_heading("Summary:", writer)?;
        if updates > 0 {
            writeln!(
                writer,
                "  {} chart(s) to update ({})",
                updates,
                parts.join(", ")
            )?;
        } else if self.color {
            writeln!(writer, "  {}", "No charts to update".dimmed())?;
        } else {
            writeln!(writer, "  No charts to update")?;
        }
        if skips > 0 {
            writeln!(writer, "  {} chart(s) skipped", skips)?;
        }
        Ok(())
    }
}

impl OutputFormatter for TextFormatter {
    fn format(&self, result: &PlanResult, writer: &mut dyn Write) -> std::io::Result<()> {
        // In quiet mode, only show summary
        if self.verbosity == Verbosity::Quiet {
            return self.format_summary(&result.summary, writer);
        }

        if self.grouped {
            self.format_groups(result, writer)?;
        } else {
            for manifest in &result.summary.manifests {
                self.format_manifest(manifest, writer)?;
            }
        }

        self.format_failures(result, writer)?;
        self.format_warnings(result, writer)?;
        self.format_summary(&result.summary, writer)
    }

    fn format_manifest(&self, manifest: &ManifestPlan, writer: &mut dyn Write) -> std::io::Result<()> {
        let update_count = manifest.update_count();
        let skip_count = manifest.skip_count();
        let verbose = self.verbosity == Verbosity::Verbose;

        // Skip manifests with nothing to show
        if update_count == 0 && (!verbose || skip_count == 0) {
            return Ok(());
        }

        let heading = format!(
            "{} — {} {}, {} {}",
            manifest.path.display(),
            update_count,
            plural(update_count, "update", "updates"),
            skip_count,
            plural(skip_count, "skip", "skips")
        );
        self.write_heading(&heading, writer)?;

        let width = Self::name_width(
            manifest
                .results
                .iter()
                .map(|r| r.reference().chart_name.as_str()),
        );
        for update in manifest.updates() {
            self.format_update_line(update, width, writer)?;
        }

        if verbose && skip_count > 0 {
            writeln!(writer)?;
            writeln!(writer, "  Skipped:")?;
            for result in manifest.skips() {
                self.format_skip_line(result, width, writer)?;
            }
        }

        writeln!(writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigWarning, WarningKind};
    use crate::domain::{ChartReference, SkipReason};
    use crate::error::SourceError;
    use crate::grouping::UNGROUPED;
    use crate::orchestrator::SourceFailure;
    use indexmap::IndexMap;

    fn reference(name: &str, version: &str) -> ChartReference {
        ChartReference::new("https://charts.example.com", name, version)
    }

    fn sample_result() -> PlanResult {
        let mut manifest = ManifestPlan::new("apps/web.yaml");
        let update = ProposedUpdate::new(reference("nginx", "15.8.0"), "15.9.0")
            .with_app_version(Some("1.25.3".to_string()));
        manifest.add_result(UpdateResult::Update(update.clone()));
        manifest.add_result(UpdateResult::update(reference("redis", "17.0.0"), "18.0.0"));
        manifest.add_result(UpdateResult::skip(
            reference("postgresql", "12.0.0"),
            SkipReason::NoSuitableVersion,
        ));
        let mut summary = PlanSummary::new();
        summary.add_manifest(manifest);

        let mut groups = IndexMap::new();
        groups.insert("web".to_string(), vec![update]);
        groups.insert(
            UNGROUPED.to_string(),
            vec![ProposedUpdate::new(reference("redis", "17.0.0"), "18.0.0")],
        );

        PlanResult {
            summary,
            groups,
            failures: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn render(formatter: &TextFormatter, result: &PlanResult) -> String {
        let mut output = Vec::new();
        formatter.format(result, &mut output).unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn test_format_by_manifest() {
        let formatter = TextFormatter::with_color(Verbosity::Normal, false, false);
        let output = render(&formatter, &sample_result());
        assert!(output.contains("apps/web.yaml — 2 updates, 1 skip"));
        assert!(output.contains("15.8.0 -> 15.9.0 [minor] (app 1.25.3)"));
        assert!(output.contains("17.0.0 -> 18.0.0 [major]"));
        assert!(!output.contains("Skipped:"));
        assert!(output.contains("2 chart(s) to update (1 major, 1 minor)"));
        assert!(output.contains("1 chart(s) skipped"));
    }

    #[test]
    fn test_format_verbose_shows_skips() {
        let formatter = TextFormatter::with_color(Verbosity::Verbose, false, false);
        let output = render(&formatter, &sample_result());
        assert!(output.contains("Skipped:"));
        assert!(output.contains("(no suitable version)"));
    }

    #[test]
    fn test_format_grouped() {
        let formatter = TextFormatter::with_color(Verbosity::Normal, true, false);
        let output = render(&formatter, &sample_result());
        let web = output.find("web — 1 update").unwrap();
        let ungrouped = output.find("ungrouped — 1 update").unwrap();
        assert!(web < ungrouped);
        assert!(!output.contains("apps/web.yaml"));
    }

    #[test]
    fn test_format_quiet() {
        let formatter = TextFormatter::with_color(Verbosity::Quiet, false, false);
        assert_eq!(render(&formatter, &sample_result()), "2 updates available\n");
        let empty = PlanResult {
            summary: PlanSummary::new(),
            groups: IndexMap::new(),
            failures: Vec::new(),
            warnings: Vec::new(),
        };
        assert_eq!(render(&formatter, &empty), "No updates\n");
    }

    #[test]
    fn test_format_failures_and_warnings() {
        let mut result = sample_result();
        result.failures.push(SourceFailure {
            url: "https://down.example.com/index.yaml".to_string(),
            charts: vec!["app".to_string()],
            error: SourceError::Timeout {
                url: "https://down.example.com/index.yaml".to_string(),
            },
        });
        result.warnings.push(ConfigWarning::new(
            WarningKind::UnknownStrategy,
            "strategy",
            "newest",
            "invalid update strategy 'newest'; using 'all'",
        ));

        let normal = render(&TextFormatter::with_color(Verbosity::Normal, false, false), &result);
        assert!(normal.contains("Source errors:"));
        assert!(normal.contains("timeout while fetching https://down.example.com/index.yaml (app)"));
        assert!(!normal.contains("Configuration warnings:"));

        let verbose = render(&TextFormatter::with_color(Verbosity::Verbose, false, false), &result);
        assert!(verbose.contains("Configuration warnings:"));
        assert!(verbose.contains("strategy: invalid update strategy"));
    }

    #[test]
    fn test_format_colored_does_not_fail() {
        let formatter = TextFormatter::new(Verbosity::Verbose);
        let output = render(&formatter, &sample_result());
        assert!(output.contains("nginx"));
    }
}
