//! Candidate versions published by a chart source
//!
//! This module provides the CandidateVersion struct that represents
//! one published chart version with its optional metadata.

use crate::domain::parse_version;
use chrono::{DateTime, Utc};
use semver::Version;
use serde::{Deserialize, Serialize};

/// A single version published for a chart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateVersion {
    /// The version string exactly as published (e.g., "15.9.0+build.1")
    pub version: String,
    /// Application version packaged by this chart version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,
    /// When this version was published
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    /// Content digest of the packaged chart
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

impl CandidateVersion {
    /// Create a new CandidateVersion with no metadata
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            app_version: None,
            published_at: None,
            digest: None,
        }
    }

    /// Set the application version
    pub fn with_app_version(mut self, app_version: impl Into<String>) -> Self {
        self.app_version = Some(app_version.into());
        self
    }

    /// Set the publication time
    pub fn with_published_at(mut self, published_at: DateTime<Utc>) -> Self {
        self.published_at = Some(published_at);
        self
    }

    /// Set the content digest
    pub fn with_digest(mut self, digest: impl Into<String>) -> Self {
        self.digest = Some(digest.into());
        self
    }

    /// Parse the version as semver, None if it is not valid
    pub fn parsed(&self) -> Option<Version> {
        parse_version(&self.version)
    }
}
