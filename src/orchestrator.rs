//! Planning orchestrator
//!
//! This module provides:
//! - Workflow coordination: resolve sources → fetch (through the cache) → judge → group
//! - Parallel source fetches bounded by a semaphore
//! - De-duplication of references and of fetches per source key
//! - Error handling with partial continuation

use crate::config::{Config, ConfigWarning};
use crate::domain::{
    ChartReference, ChartSource, FetchKey, ManifestCharts, ManifestPlan, PlanSummary,
    ProposedUpdate, SkipReason, UpdateResult,
};
use crate::error::SourceError;
use crate::grouping::GroupingEngine;
use crate::progress::FetchProgress;
use crate::registry::{
    AuthResolver, FetchOutcome, HttpClient, SourceClient, VersionCache, VersionSource,
};
use crate::update::{IgnoreFilter, UpdateJudge};
use futures::future::join_all;
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

/// Default concurrency limit for source fetches
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Orchestrator for planning chart updates
pub struct Orchestrator {
    /// Where versions come from
    source: Arc<dyn VersionSource>,
    /// Fetched versions, shared across runs of this orchestrator
    cache: VersionCache,
    judge: UpdateJudge,
    grouping: GroupingEngine,
    /// Diagnostics collected while compiling the configuration
    warnings: Vec<ConfigWarning>,
    /// Bounds simultaneous fetches
    semaphore: Arc<Semaphore>,
}

/// A source that could not be fetched during a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFailure {
    /// URL that was requested
    pub url: String,
    /// Charts planned against this source
    pub charts: Vec<String>,
    pub error: SourceError,
}

/// Result of running the orchestrator
#[derive(Debug, Clone)]
pub struct PlanResult {
    /// Per-manifest results
    pub summary: PlanSummary,
    /// Proposed updates partitioned into groups
    pub groups: IndexMap<String, Vec<ProposedUpdate>>,
    /// Sources that failed to fetch
    pub failures: Vec<SourceFailure>,
    /// Configuration diagnostics
    pub warnings: Vec<ConfigWarning>,
}

impl PlanResult {
    /// All proposed updates in manifest order
    pub fn updates(&self) -> Vec<&ProposedUpdate> {
        self.summary.all_updates().collect()
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// A reference waiting for its source to be fetched
struct PendingReference {
    reference: ChartReference,
    source: ChartSource,
}

enum Slot {
    Done(UpdateResult),
    Pending(PendingReference),
}

impl Orchestrator {
    /// Create an orchestrator that fetches over HTTP with the configured credentials
    pub fn new(config: &Config) -> Result<Self, SourceError> {
        let (auth, auth_warnings) = AuthResolver::new(&config.registries);
        let client = HttpClient::new()?.with_auth(auth);
        Ok(Self::build(
            config,
            Arc::new(SourceClient::new(client)),
            auth_warnings,
        ))
    }

    /// Create an orchestrator with a custom version source (for testing)
    pub fn with_source(config: &Config, source: Arc<dyn VersionSource>) -> Self {
        Self::build(config, source, Vec::new())
    }

    fn build(
        config: &Config,
        source: Arc<dyn VersionSource>,
        auth_warnings: Vec<ConfigWarning>,
    ) -> Self {
        let mut warnings = Vec::new();

        let (strategy, strategy_warning) = config.update_strategy();
        warnings.extend(strategy_warning);
        warnings.extend(auth_warnings);

        let (filter, filter_warnings) = IgnoreFilter::compile(&config.ignore);
        warnings.extend(filter_warnings);

        let (grouping, group_warnings) = GroupingEngine::compile(&config.groups);
        warnings.extend(group_warnings);

        for warning in &warnings {
            warning.emit();
        }

        Self {
            source,
            cache: VersionCache::new(),
            judge: UpdateJudge::new(strategy, filter),
            grouping,
            warnings,
            semaphore: Arc::new(Semaphore::new(DEFAULT_CONCURRENCY)),
        }
    }

    /// Set the maximum number of simultaneous fetches
    pub fn with_concurrency(mut self, limit: usize) -> Self {
        self.semaphore = Arc::new(Semaphore::new(limit.max(1)));
        self
    }

    /// The version cache owned by this orchestrator
    pub fn cache(&self) -> &VersionCache {
        &self.cache
    }

    /// Configuration diagnostics
    pub fn warnings(&self) -> &[ConfigWarning] {
        &self.warnings
    }

    /// Plan updates for the given manifests
    pub async fn run(&self, manifests: &[ManifestCharts]) -> PlanResult {
        self.run_with_progress(manifests, false).await
    }

    /// Plan updates with optional progress display
    pub async fn run_with_progress(
        &self,
        manifests: &[ManifestCharts],
        show_progress: bool,
    ) -> PlanResult {
        // Step 1: Classify references, resolving their sources
        let mut seen: HashSet<(PathBuf, String)> = HashSet::new();
        let mut planned: Vec<(PathBuf, Vec<Slot>)> = Vec::with_capacity(manifests.len());
        for manifest in manifests {
            let slots = manifest
                .charts
                .iter()
                .map(|reference| self.classify(&manifest.path, reference, &mut seen))
                .collect();
            planned.push((manifest.path.clone(), slots));
        }

        // Step 2: Bucket pending references by fetch key
        let mut buckets: IndexMap<FetchKey, (ChartSource, Vec<String>)> = IndexMap::new();
        for (_, slots) in &planned {
            for slot in slots {
                if let Slot::Pending(pending) = slot {
                    let (_, charts) = buckets
                        .entry(pending.source.fetch_key())
                        .or_insert_with(|| (pending.source.clone(), Vec::new()));
                    if !charts.contains(&pending.reference.chart_name) {
                        charts.push(pending.reference.chart_name.clone());
                    }
                }
            }
        }

        // Step 3: Fetch each unique source once
        let progress = FetchProgress::start(show_progress, buckets.len());
        let fetches = buckets.iter().map(|(key, (source, _))| {
            let progress = &progress;
            async move {
                let outcome = self.fetch(key, source).await;
                progress.source_done(key);
                (key.clone(), outcome)
            }
        });
        let outcomes: HashMap<FetchKey, Arc<FetchOutcome>> =
            join_all(fetches).await.into_iter().collect();
        progress.finish();

        // Failures only count for this run; the next run asks the source again
        let evicted = self.cache.evict_failures();
        if evicted > 0 {
            debug!(evicted, "Dropped failed fetches from the version cache");
        }

        let failures: Vec<SourceFailure> = buckets
            .iter()
            .filter_map(|(key, (source, charts))| {
                let error = outcomes.get(key)?.error.clone()?;
                Some(SourceFailure {
                    url: source.url(),
                    charts: charts.clone(),
                    error,
                })
            })
            .collect();

        // Step 4: Judge each pending reference
        let mut summary = PlanSummary::new();
        for (path, slots) in planned {
            let mut plan = ManifestPlan::new(path);
            for slot in slots {
                let result = match slot {
                    Slot::Done(result) => result,
                    Slot::Pending(pending) => self.judge_pending(pending, &outcomes),
                };
                plan.add_result(result);
            }
            summary.add_manifest(plan);
        }

        // Step 5: Group proposed updates
        let updates: Vec<ProposedUpdate> = summary.all_updates().cloned().collect();
        let groups = self.grouping.group(&updates);

        info!(
            updates = summary.total_updates(),
            skipped = summary.total_skips(),
            failed_sources = failures.len(),
            "Planning finished"
        );

        PlanResult {
            summary,
            groups,
            failures,
            warnings: self.warnings.clone(),
        }
    }

    fn classify(
        &self,
        path: &Path,
        reference: &ChartReference,
        seen: &mut HashSet<(PathBuf, String)>,
    ) -> Slot {
        if !seen.insert((path.to_path_buf(), dedup_key(reference))) {
            debug!(
                chart = %reference.chart_name,
                path = %path.display(),
                "Duplicate reference, skipping"
            );
            return Slot::Done(UpdateResult::skip(reference.clone(), SkipReason::Duplicate));
        }

        if let Some(reason) = self.judge.should_skip(reference) {
            return Slot::Done(UpdateResult::skip(reference.clone(), reason));
        }

        match ChartSource::resolve(&reference.source_location, &reference.chart_name) {
            Ok(source) => Slot::Pending(PendingReference {
                reference: reference.clone(),
                source,
            }),
            Err(e) => {
                warn!(
                    chart = %reference.chart_name,
                    source = %reference.source_location,
                    error = %e,
                    "Unsupported chart source, skipping"
                );
                Slot::Done(UpdateResult::skip(
                    reference.clone(),
                    SkipReason::UnsupportedSource(e.to_string()),
                ))
            }
        }
    }

    /// Fetch a source through the cache, holding a permit only while fetching
    async fn fetch(&self, key: &FetchKey, source: &ChartSource) -> Arc<FetchOutcome> {
        self.cache
            .get_or_fetch(key, move || async move {
                let _permit = self.semaphore.acquire().await.ok();
                debug!(key = %key, "Fetching chart versions");
                let result = self.source.fetch(source).await;
                if let Err(e) = &result {
                    error!(url = %source.url(), error = %e, "Failed to fetch chart versions");
                }
                FetchOutcome::from_result(result)
            })
            .await
    }

    fn judge_pending(
        &self,
        pending: PendingReference,
        outcomes: &HashMap<FetchKey, Arc<FetchOutcome>>,
    ) -> UpdateResult {
        let PendingReference { reference, source } = pending;
        let Some(outcome) = outcomes.get(&source.fetch_key()) else {
            return UpdateResult::skip(reference, SkipReason::NoVersionsAvailable);
        };
        if let Some(error) = &outcome.error {
            return UpdateResult::skip(reference, SkipReason::FetchFailed(error.to_string()));
        }
        let versions = outcome.versions_for(source.chart_key(&reference.chart_name));
        self.judge.judge(&reference, versions)
    }
}

/// References are identified by their field address; without one, by their content
fn dedup_key(reference: &ChartReference) -> String {
    if reference.address.is_empty() {
        format!(
            "{}\u{0}{}\u{0}{}",
            reference.source_location, reference.chart_name, reference.current_version
        )
    } else {
        reference.address.as_str().to_string()
    }
}
