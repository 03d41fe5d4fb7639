//! Classic Helm chart repository source
//!
//! Fetches `index.yaml` from a repository and lists the versions of every
//! chart it contains. An index that does not have the expected structure is
//! rejected as a whole.

use super::client::HttpClient;
use super::ChartVersions;
use crate::error::SourceError;
use crate::update::CandidateVersion;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_yaml::Value;
use std::collections::HashMap;
use tracing::debug;

/// The parts of a Helm repository index the engine uses
#[derive(Debug, Deserialize)]
struct IndexDocument {
    entries: Option<HashMap<String, Vec<IndexEntry>>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IndexEntry {
    version: Value,
    #[serde(default)]
    app_version: Option<Value>,
    #[serde(default)]
    created: Option<String>,
    #[serde(default)]
    digest: Option<String>,
}

/// Version source for classic `index.yaml` repositories
pub struct HelmRepoSource {
    client: HttpClient,
}

impl HelmRepoSource {
    /// Create a new source using the given HTTP client
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    /// Fetch and parse the index at `index_url`
    pub async fn fetch_index(&self, index_url: &str) -> Result<ChartVersions, SourceError> {
        let body = self.client.get_text(index_url).await?;
        let versions = parse_index(index_url, &body)?;
        debug!(
            url = index_url,
            charts = versions.len(),
            "Parsed repository index"
        );
        Ok(versions)
    }
}

/// Parse an index document into versions keyed by chart name
pub fn parse_index(url: &str, body: &str) -> Result<ChartVersions, SourceError> {
    let document: IndexDocument = serde_yaml::from_str(body)
        .map_err(|e| SourceError::invalid_response(url, format!("invalid index.yaml: {}", e)))?;

    let entries = document
        .entries
        .ok_or_else(|| SourceError::invalid_response(url, "index.yaml has no 'entries' map"))?;

    let mut versions = HashMap::with_capacity(entries.len());
    for (chart, chart_entries) in entries {
        let mut candidates = Vec::with_capacity(chart_entries.len());
        for entry in chart_entries {
            let version = scalar_to_string(&entry.version).ok_or_else(|| {
                SourceError::invalid_response(
                    url,
                    format!("entry for chart '{}' has no usable version", chart),
                )
            })?;

            let mut candidate = CandidateVersion::new(version);
            if let Some(app_version) = entry.app_version.as_ref().and_then(scalar_to_string) {
                candidate = candidate.with_app_version(app_version);
            }
            if let Some(created) = entry.created.as_deref().and_then(parse_timestamp) {
                candidate = candidate.with_published_at(created);
            }
            if let Some(digest) = entry.digest {
                candidate = candidate.with_digest(digest);
            }
            candidates.push(candidate);
        }
        versions.insert(chart, candidates);
    }

    Ok(versions)
}

/// Unquoted versions may be typed as numbers by YAML
fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
