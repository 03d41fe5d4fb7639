//! Version sources for chart references
//!
//! This module provides:
//! - HTTP client shared foundation with per-URL credentials
//! - Classic Helm repository (`index.yaml`) source
//! - OCI registry tag listing source
//! - Per-run version cache with fetch-or-join semantics

mod auth;
mod cache;
mod client;
mod helm_repo;
mod oci;

pub use auth::{AuthResolver, RegistryCredential, ResolvedAuth};
pub use cache::{CacheStats, FetchOutcome, VersionCache};
pub use client::{HttpClient, DEFAULT_TIMEOUT};
pub use helm_repo::{parse_index, HelmRepoSource};
pub use oci::{BearerChallenge, OciRegistrySource};

use crate::domain::ChartSource;
use crate::error::SourceError;
use crate::update::CandidateVersion;
use async_trait::async_trait;
use std::collections::HashMap;
use tracing::error;

/// Versions published by one source, keyed by chart
///
/// A classic index lists every chart of the repository; an OCI listing has a
/// single entry keyed by the repository path.
pub type ChartVersions = HashMap<String, Vec<CandidateVersion>>;

/// Trait for fetching the versions a chart source publishes
#[async_trait]
pub trait VersionSource: Send + Sync {
    /// Fetch every version listed by the source
    async fn fetch(&self, source: &ChartSource) -> Result<ChartVersions, SourceError>;
}

/// Fetches versions from classic repositories and OCI registries
pub struct SourceClient {
    helm: HelmRepoSource,
    oci: OciRegistrySource,
}

impl SourceClient {
    /// Create a new client sharing one HTTP client between both protocols
    pub fn new(client: HttpClient) -> Self {
        Self {
            helm: HelmRepoSource::new(client.clone()),
            oci: OciRegistrySource::new(client),
        }
    }

    /// Versions of one chart; failures are logged and yield an empty list
    pub async fn fetch_versions(&self, location: &str, chart_name: &str) -> Vec<CandidateVersion> {
        let source = match ChartSource::resolve(location, chart_name) {
            Ok(source) => source,
            Err(e) => {
                error!(chart = chart_name, source = location, error = %e, "Cannot resolve chart source");
                return Vec::new();
            }
        };

        match self.fetch(&source).await {
            Ok(mut versions) => versions
                .remove(source.chart_key(chart_name))
                .unwrap_or_default(),
            Err(e) => {
                error!(chart = chart_name, url = %source.url(), error = %e, "Failed to fetch versions");
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl VersionSource for SourceClient {
    async fn fetch(&self, source: &ChartSource) -> Result<ChartVersions, SourceError> {
        match source {
            ChartSource::Classic { index_url } => self.helm.fetch_index(index_url).await,
            ChartSource::Oci { repository, .. } => {
                let tags = self.oci.fetch_tags(&source.url(), repository).await?;
                Ok(HashMap::from([(repository.clone(), tags)]))
            }
        }
    }
}
