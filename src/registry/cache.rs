//! Per-run cache of fetched chart versions
//!
//! Entries are keyed by `FetchKey`. Concurrent lookups of one key share a
//! single fetch: the first caller runs the fetcher and every other caller
//! waits on the same cell. Failed fetches are cached as well, so a broken
//! source is contacted once per run.

use super::ChartVersions;
use crate::domain::{FetchKey, SourceKind};
use crate::error::SourceError;
use crate::update::CandidateVersion;
use dashmap::DashMap;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::debug;

/// Result of fetching one source
#[derive(Debug, Clone, Default)]
pub struct FetchOutcome {
    /// Versions keyed by chart (empty on failure)
    pub versions: ChartVersions,
    /// Why the fetch failed, if it did
    pub error: Option<SourceError>,
}

impl FetchOutcome {
    pub fn success(versions: ChartVersions) -> Self {
        Self {
            versions,
            error: None,
        }
    }

    pub fn failure(error: SourceError) -> Self {
        Self {
            versions: ChartVersions::new(),
            error: Some(error),
        }
    }

    pub fn from_result(result: Result<ChartVersions, SourceError>) -> Self {
        match result {
            Ok(versions) => Self::success(versions),
            Err(error) => Self::failure(error),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }

    /// Versions published for one chart, empty if the chart is unknown
    pub fn versions_for(&self, chart_key: &str) -> &[CandidateVersion] {
        self.versions
            .get(chart_key)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// Number of cached entries per source kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub classic: usize,
    pub oci: usize,
}

impl CacheStats {
    pub fn total(&self) -> usize {
        self.classic + self.oci
    }
}

type Slot = Arc<OnceCell<Arc<FetchOutcome>>>;

/// Fetch-or-join cache of version lists
#[derive(Debug, Default)]
pub struct VersionCache {
    entries: DashMap<FetchKey, Slot>,
}

impl VersionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached outcome for `key`, running `fetcher` only if no
    /// fetch for the key has completed or is in flight
    pub async fn get_or_fetch<F, Fut>(&self, key: &FetchKey, fetcher: F) -> Arc<FetchOutcome>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = FetchOutcome>,
    {
        // Clone the slot out so the map shard is not locked across the await
        let slot: Slot = self.entries.entry(key.clone()).or_default().value().clone();
        if slot.initialized() {
            debug!(key = %key, "Version cache hit");
        }
        slot.get_or_init(|| async { Arc::new(fetcher().await) })
            .await
            .clone()
    }

    /// Completed outcome for `key`, if any
    pub fn get(&self, key: &FetchKey) -> Option<Arc<FetchOutcome>> {
        self.entries
            .get(key)
            .and_then(|slot| slot.value().get().cloned())
    }

    /// Drop every entry; the next lookup of any key fetches again
    pub fn invalidate(&self) {
        debug!(entries = self.entries.len(), "Invalidating version cache");
        self.entries.clear();
    }

    /// Drop completed entries that hold a failure, keeping successes cached
    ///
    /// Returns the number of entries removed.
    pub fn evict_failures(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, slot| !slot.get().is_some_and(|outcome| outcome.is_failure()));
        before - self.entries.len()
    }

    /// Completed entries per source kind
    pub fn stats(&self) -> CacheStats {
        let mut stats = CacheStats::default();
        for entry in self.entries.iter() {
            if !entry.value().initialized() {
                continue;
            }
            match entry.key().kind {
                SourceKind::Classic => stats.classic += 1,
                SourceKind::Oci => stats.oci += 1,
            }
        }
        stats
    }

    pub fn len(&self) -> usize {
        self.stats().total()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
