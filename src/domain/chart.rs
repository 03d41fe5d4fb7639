//! Chart reference structures

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Location of a version field inside its originating document.
///
/// The planning engine carries this value through untouched; only the
/// collaborator that rewrites manifests knows how to interpret it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldAddress(String);

impl FieldAddress {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A chart dependency found in a manifest
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChartReference {
    /// Repository URL (`https://...` index or `oci://...` registry)
    #[serde(rename = "repository")]
    pub source_location: String,
    /// Chart name, possibly with `/`-separated path segments for OCI
    #[serde(rename = "name")]
    pub chart_name: String,
    /// Version currently referenced, as written in the manifest
    #[serde(rename = "version")]
    pub current_version: String,
    /// Opaque field address for the rewriting collaborator
    #[serde(default, skip_serializing_if = "FieldAddress::is_empty")]
    pub address: FieldAddress,
}

impl ChartReference {
    /// Creates a new chart reference without an address
    pub fn new(
        source_location: impl Into<String>,
        chart_name: impl Into<String>,
        current_version: impl Into<String>,
    ) -> Self {
        Self {
            source_location: source_location.into(),
            chart_name: chart_name.into(),
            current_version: current_version.into(),
            address: FieldAddress::default(),
        }
    }

    /// Sets the field address (builder pattern)
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = FieldAddress::new(address);
        self
    }
}

impl fmt::Display for ChartReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{} ({})",
            self.chart_name, self.current_version, self.source_location
        )
    }
}

/// Chart references extracted from a single manifest file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestCharts {
    /// Path of the manifest the references came from
    pub path: PathBuf,
    /// References in document order
    #[serde(default)]
    pub charts: Vec<ChartReference>,
}

impl ManifestCharts {
    pub fn new(path: impl Into<PathBuf>, charts: Vec<ChartReference>) -> Self {
        Self {
            path: path.into(),
            charts,
        }
    }
}
