//! Chart source locations and their normalized fetch keys

use crate::error::SourceError;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Index file name appended to classic repository locations
const INDEX_FILE: &str = "index.yaml";

/// Scheme prefix marking an OCI registry location
const OCI_SCHEME: &str = "oci://";

/// Registry host serving `docker.io` references
const DOCKER_HUB_REGISTRY: &str = "registry-1.docker.io";

/// Kind of version source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Classic Helm repository serving `index.yaml`
    Classic,
    /// OCI registry serving tag listings
    Oci,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Classic => write!(f, "helm"),
            SourceKind::Oci => write!(f, "oci"),
        }
    }
}

/// A resolved chart source
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChartSource {
    /// Classic repository, identified by its normalized index URL
    Classic { index_url: String },
    /// OCI registry host and full repository path of the chart
    Oci { host: String, repository: String },
}

/// Normalized endpoint identity used for caching and request de-duplication
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FetchKey {
    pub kind: SourceKind,
    pub endpoint: String,
}

impl fmt::Display for FetchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.endpoint)
    }
}

impl ChartSource {
    /// Resolve a reference's repository location and chart name into a source
    pub fn resolve(location: &str, chart_name: &str) -> Result<Self, SourceError> {
        let location = location.trim();
        if location
            .get(..OCI_SCHEME.len())
            .is_some_and(|scheme| scheme.eq_ignore_ascii_case(OCI_SCHEME))
        {
            return Self::resolve_oci(location, chart_name);
        }

        let lower = location.to_ascii_lowercase();
        if lower.starts_with("https://") || lower.starts_with("http://") {
            return Self::resolve_classic(location);
        }

        Err(SourceError::unsupported(
            location,
            "expected an http(s):// repository or an oci:// registry",
        ))
    }

    fn resolve_classic(location: &str) -> Result<Self, SourceError> {
        let trimmed = location.trim_end_matches('/');
        let with_index = if trimmed.ends_with(INDEX_FILE) {
            trimmed.to_string()
        } else {
            format!("{}/{}", trimmed, INDEX_FILE)
        };

        let url = Url::parse(&with_index)
            .map_err(|e| SourceError::unsupported(location, e.to_string()))?;
        if url.host_str().is_none() {
            return Err(SourceError::unsupported(location, "missing host"));
        }

        Ok(ChartSource::Classic {
            index_url: url.to_string(),
        })
    }

    fn resolve_oci(location: &str, chart_name: &str) -> Result<Self, SourceError> {
        let bare = location[OCI_SCHEME.len()..].trim_end_matches('/');
        let (host, prefix) = match bare.split_once('/') {
            Some((host, prefix)) => (host, prefix.trim_matches('/')),
            None => (bare, ""),
        };
        if host.is_empty() {
            return Err(SourceError::unsupported(location, "missing registry host"));
        }

        let chart = chart_name.trim().trim_matches('/');
        if chart.is_empty() {
            return Err(SourceError::unsupported(location, "missing chart name"));
        }

        let repository = if prefix.is_empty() {
            chart.to_string()
        } else {
            format!("{}/{}", prefix, chart)
        };

        Ok(ChartSource::Oci {
            host: canonical_registry_host(host),
            repository,
        })
    }

    /// The kind of this source
    pub fn kind(&self) -> SourceKind {
        match self {
            ChartSource::Classic { .. } => SourceKind::Classic,
            ChartSource::Oci { .. } => SourceKind::Oci,
        }
    }

    /// Key identifying the network endpoint this source is fetched from
    pub fn fetch_key(&self) -> FetchKey {
        let endpoint = match self {
            ChartSource::Classic { index_url } => index_url.clone(),
            ChartSource::Oci { host, repository } => {
                format!("{}/v2/{}/tags/list", host, repository)
            }
        };
        FetchKey {
            kind: self.kind(),
            endpoint,
        }
    }

    /// URL requested to list versions
    pub fn url(&self) -> String {
        match self {
            ChartSource::Classic { index_url } => index_url.clone(),
            ChartSource::Oci { host, repository } => format!(
                "{}://{}/v2/{}/tags/list",
                registry_scheme(host),
                host,
                repository
            ),
        }
    }

    /// Key under which a chart's versions appear in a fetched result
    pub fn chart_key<'a>(&'a self, chart_name: &'a str) -> &'a str {
        match self {
            ChartSource::Classic { .. } => chart_name,
            ChartSource::Oci { repository, .. } => repository,
        }
    }
}

/// Lower-case a registry host and map Docker Hub aliases to the API host
fn canonical_registry_host(host: &str) -> String {
    let host = host.to_ascii_lowercase();
    match host.as_str() {
        "docker.io" | "index.docker.io" => DOCKER_HUB_REGISTRY.to_string(),
        _ => host,
    }
}

/// Loopback registries are spoken to over plain HTTP, everything else over HTTPS
pub fn registry_scheme(host: &str) -> &'static str {
    let bare = if host.starts_with('[') {
        host.split(']').next().map(|h| &h[1..]).unwrap_or(host)
    } else {
        host.split(':').next().unwrap_or(host)
    };
    match bare {
        "localhost" | "127.0.0.1" | "::1" => "http",
        _ => "https",
    }
}
