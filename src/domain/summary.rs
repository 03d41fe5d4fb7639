//! Plan summary types
//!
//! Provides structures for tracking planning results per manifest and overall.

use super::{ProposedUpdate, UpdateResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Planning results for a single manifest file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestPlan {
    /// Path to the manifest file
    pub path: PathBuf,
    /// Per-reference results in document order
    pub results: Vec<UpdateResult>,
}

impl ManifestPlan {
    /// Creates a new, empty ManifestPlan
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            results: Vec::new(),
        }
    }

    /// Adds a result
    pub fn add_result(&mut self, result: UpdateResult) {
        self.results.push(result);
    }

    /// Returns the number of proposed updates
    pub fn update_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_update()).count()
    }

    /// Returns the number of skips
    pub fn skip_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_skip()).count()
    }

    /// Returns all proposed updates
    pub fn updates(&self) -> impl Iterator<Item = &ProposedUpdate> {
        self.results.iter().filter_map(|r| r.as_update())
    }

    /// Returns all skips
    pub fn skips(&self) -> impl Iterator<Item = &UpdateResult> {
        self.results.iter().filter(|r| r.is_skip())
    }

    /// Returns true if any update was proposed
    pub fn has_updates(&self) -> bool {
        self.update_count() > 0
    }
}

/// Overall summary of a planning run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanSummary {
    /// Results for each manifest processed
    pub manifests: Vec<ManifestPlan>,
}

impl PlanSummary {
    /// Creates a new, empty PlanSummary
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a manifest plan
    pub fn add_manifest(&mut self, manifest: ManifestPlan) {
        self.manifests.push(manifest);
    }

    /// Returns the total number of proposed updates
    pub fn total_updates(&self) -> usize {
        self.manifests.iter().map(|m| m.update_count()).sum()
    }

    /// Returns the total number of skipped references
    pub fn total_skips(&self) -> usize {
        self.manifests.iter().map(|m| m.skip_count()).sum()
    }

    /// Returns the total number of references planned
    pub fn total_references(&self) -> usize {
        self.manifests.iter().map(|m| m.results.len()).sum()
    }

    /// Returns the number of manifests with at least one update
    pub fn manifests_with_updates(&self) -> usize {
        self.manifests.iter().filter(|m| m.has_updates()).count()
    }

    /// Returns all proposed updates across all manifests
    pub fn all_updates(&self) -> impl Iterator<Item = &ProposedUpdate> {
        self.manifests.iter().flat_map(|m| m.updates())
    }

    /// Returns all skips across all manifests
    pub fn all_skips(&self) -> impl Iterator<Item = &UpdateResult> {
        self.manifests.iter().flat_map(|m| m.skips())
    }
}
