//! Update selection for chart references
//!
//! This module provides:
//! - Candidate versions as published by a chart source
//! - Ignore rules compiled into an exclusion filter
//! - The update judge that picks at most one target version per reference

mod candidate;
mod ignore;

pub use candidate::CandidateVersion;
pub use ignore::{IgnoreFilter, IgnoreRule, VersionMatcher};

use crate::domain::{
    cmp_precedence, parse_version, ChartReference, ProposedUpdate, SkipReason, UpdateClass,
    UpdateResult, UpdateStrategy,
};
use semver::Version;
use std::cmp::Ordering;
use tracing::{debug, warn};

/// Update judgment engine that decides whether to update a chart reference
#[derive(Debug, Clone, Default)]
pub struct UpdateJudge {
    /// How far an update may travel
    strategy: UpdateStrategy,
    /// Compiled ignore rules
    filter: IgnoreFilter,
}

impl UpdateJudge {
    /// Create a new UpdateJudge with the given strategy and ignore rules
    pub fn new(strategy: UpdateStrategy, filter: IgnoreFilter) -> Self {
        Self { strategy, filter }
    }

    pub fn strategy(&self) -> UpdateStrategy {
        self.strategy
    }

    /// Check if a reference should be processed at all
    /// Returns Some(SkipReason) if it should be skipped, None if it should be processed
    pub fn should_skip(&self, reference: &ChartReference) -> Option<SkipReason> {
        if self.filter.is_excluded(reference) {
            return Some(SkipReason::Excluded);
        }
        None
    }

    /// Judge whether to update a reference given the versions its source publishes
    pub fn judge(&self, reference: &ChartReference, candidates: &[CandidateVersion]) -> UpdateResult {
        if let Some(reason) = self.should_skip(reference) {
            return UpdateResult::skip(reference.clone(), reason);
        }

        match self.evaluate(reference, candidates) {
            Ok(update) => UpdateResult::Update(update),
            Err(reason) => UpdateResult::skip(reference.clone(), reason),
        }
    }

    /// Select the single best eligible newer version, if any
    pub fn select(
        &self,
        reference: &ChartReference,
        candidates: &[CandidateVersion],
    ) -> Option<ProposedUpdate> {
        self.evaluate(reference, candidates).ok()
    }

    fn evaluate(
        &self,
        reference: &ChartReference,
        candidates: &[CandidateVersion],
    ) -> Result<ProposedUpdate, SkipReason> {
        let Some(current) = parse_version(&reference.current_version) else {
            warn!(
                chart = %reference.chart_name,
                source = %reference.source_location,
                version = %reference.current_version,
                "Current version is not a valid semantic version, skipping"
            );
            return Err(SkipReason::InvalidCurrentVersion);
        };

        if candidates.is_empty() {
            warn!(
                chart = %reference.chart_name,
                source = %reference.source_location,
                "No versions available for chart"
            );
            return Err(SkipReason::NoVersionsAvailable);
        }

        let parsed: Vec<(&CandidateVersion, Version)> = candidates
            .iter()
            .filter_map(|candidate| match candidate.parsed() {
                Some(version) => Some((candidate, version)),
                None => {
                    debug!(
                        chart = %reference.chart_name,
                        version = %candidate.version,
                        "Ignoring candidate that is not a valid semantic version"
                    );
                    None
                }
            })
            .collect();

        let stable_ceiling = parsed
            .iter()
            .filter(|(_, version)| version.pre.is_empty())
            .map(|(_, version)| triplet(version))
            .max();

        let mut best: Option<(&CandidateVersion, &Version)> = None;
        for (candidate, version) in &parsed {
            if !version.pre.is_empty()
                && stable_ceiling.is_some_and(|ceiling| ceiling >= triplet(version))
            {
                continue;
            }
            if !self.strategy.allows(&current, version) {
                continue;
            }
            let class = UpdateClass::classify(&current, version);
            if self
                .filter
                .is_candidate_excluded(reference, &candidate.version, Some(class))
            {
                continue;
            }
            let is_better = match best {
                Some((_, best_version)) => cmp_precedence(version, best_version) == Ordering::Greater,
                None => true,
            };
            if is_better {
                best = Some((candidate, version));
            }
        }

        match best {
            Some((candidate, _)) => Ok(ProposedUpdate::new(reference.clone(), &candidate.version)
                .with_app_version(candidate.app_version.clone())),
            None => {
                warn!(
                    chart = %reference.chart_name,
                    source = %reference.source_location,
                    current = %reference.current_version,
                    strategy = %self.strategy,
                    "No suitable newer version found"
                );
                Err(SkipReason::NoSuitableVersion)
            }
        }
    }
}

/// Select an update for a reference under a strategy, with no ignore rules applied
pub fn select_update(
    reference: &ChartReference,
    candidates: &[CandidateVersion],
    strategy: UpdateStrategy,
) -> Option<ProposedUpdate> {
    UpdateJudge::new(strategy, IgnoreFilter::default()).select(reference, candidates)
}

fn triplet(version: &Version) -> (u64, u64, u64) {
    (version.major, version.minor, version.patch)
}
