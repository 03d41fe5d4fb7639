//! Loading chart references produced by manifest extraction
//!
//! The input is a YAML or JSON document listing manifests and the chart
//! references found in each, either under a top-level `manifests` key or as
//! a bare list.

use crate::domain::ManifestCharts;
use crate::error::InputError;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InputDocument {
    Wrapped { manifests: Vec<ManifestCharts> },
    List(Vec<ManifestCharts>),
}

impl InputDocument {
    fn into_manifests(self) -> Vec<ManifestCharts> {
        match self {
            InputDocument::Wrapped { manifests } => manifests,
            InputDocument::List(manifests) => manifests,
        }
    }
}

/// Load manifests and their chart references from a file
pub fn load_manifests(path: &Path) -> Result<Vec<ManifestCharts>, InputError> {
    let content = fs::read_to_string(path).map_err(|e| InputError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;
    let manifests = parse_manifests(path, &content)?;
    debug!(
        path = %path.display(),
        manifests = manifests.len(),
        "Loaded chart references"
    );
    Ok(manifests)
}

/// Parse manifests from file content; JSON when the extension says so, YAML otherwise
pub fn parse_manifests(path: &Path, content: &str) -> Result<Vec<ManifestCharts>, InputError> {
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if content.trim().is_empty() {
        return Ok(Vec::new());
    }

    let document: InputDocument = if is_json {
        serde_json::from_str(content).map_err(|e| InputError::parse_error(path, e.to_string()))?
    } else {
        serde_yaml::from_str(content).map_err(|e| InputError::parse_error(path, e.to_string()))?
    };
    Ok(document.into_manifests())
}
