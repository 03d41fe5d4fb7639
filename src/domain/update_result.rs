//! Update decision result types

use super::{ChartReference, UpdateClass};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A new version proposed for a single chart reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposedUpdate {
    /// The reference being updated
    pub reference: ChartReference,
    /// Version currently referenced
    pub current_version: String,
    /// Version to move to, verbatim from the source (build metadata preserved)
    pub new_version: String,
    /// Application version published with the new chart version, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,
}

impl ProposedUpdate {
    /// Creates a new proposed update from a reference and the selected version
    pub fn new(reference: ChartReference, new_version: impl Into<String>) -> Self {
        let current_version = reference.current_version.clone();
        Self {
            reference,
            current_version,
            new_version: new_version.into(),
            app_version: None,
        }
    }

    /// Sets the application version (builder pattern)
    pub fn with_app_version(mut self, app_version: Option<String>) -> Self {
        self.app_version = app_version;
        self
    }

    /// Returns the chart name
    pub fn chart_name(&self) -> &str {
        &self.reference.chart_name
    }

    /// Classify the change from current to new version
    pub fn update_class(&self) -> Option<UpdateClass> {
        UpdateClass::from_versions(&self.current_version, &self.new_version)
    }
}

impl fmt::Display for ProposedUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} → {}",
            self.reference.chart_name, self.current_version, self.new_version
        )
    }
}

/// Reason why no update was proposed for a reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// An ignore rule excludes the whole reference
    Excluded,
    /// Repository location could not be resolved to a source
    UnsupportedSource(String),
    /// Current version is not a valid semantic version
    InvalidCurrentVersion,
    /// Source could not be fetched this run
    FetchFailed(String),
    /// Source lists no versions for this chart
    NoVersionsAvailable,
    /// Versions exist but none is an eligible newer version
    NoSuitableVersion,
    /// Same reference was already planned in this run
    Duplicate,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Excluded => write!(f, "excluded by ignore rule"),
            SkipReason::UnsupportedSource(msg) => write!(f, "unsupported source: {}", msg),
            SkipReason::InvalidCurrentVersion => write!(f, "current version is not semver"),
            SkipReason::FetchFailed(msg) => write!(f, "fetch failed: {}", msg),
            SkipReason::NoVersionsAvailable => write!(f, "no versions available"),
            SkipReason::NoSuitableVersion => write!(f, "no suitable version"),
            SkipReason::Duplicate => write!(f, "duplicate reference"),
        }
    }
}

/// Result of planning a single chart reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UpdateResult {
    /// A newer version is proposed
    Update(ProposedUpdate),
    /// No update is proposed
    Skip {
        /// The reference that was skipped
        reference: ChartReference,
        /// The reason for skipping
        reason: SkipReason,
    },
}

impl UpdateResult {
    /// Creates an Update result
    pub fn update(reference: ChartReference, new_version: impl Into<String>) -> Self {
        UpdateResult::Update(ProposedUpdate::new(reference, new_version))
    }

    /// Creates a Skip result
    pub fn skip(reference: ChartReference, reason: SkipReason) -> Self {
        UpdateResult::Skip { reference, reason }
    }

    /// Returns true if this is an update result
    pub fn is_update(&self) -> bool {
        matches!(self, UpdateResult::Update(_))
    }

    /// Returns true if this is a skip result
    pub fn is_skip(&self) -> bool {
        matches!(self, UpdateResult::Skip { .. })
    }

    /// Returns the chart reference
    pub fn reference(&self) -> &ChartReference {
        match self {
            UpdateResult::Update(update) => &update.reference,
            UpdateResult::Skip { reference, .. } => reference,
        }
    }

    /// Returns the proposed update, if any
    pub fn as_update(&self) -> Option<&ProposedUpdate> {
        match self {
            UpdateResult::Update(update) => Some(update),
            UpdateResult::Skip { .. } => None,
        }
    }

    /// Consumes the result, returning the proposed update, if any
    pub fn into_update(self) -> Option<ProposedUpdate> {
        match self {
            UpdateResult::Update(update) => Some(update),
            UpdateResult::Skip { .. } => None,
        }
    }

    /// Returns the skip reason, if any
    pub fn skip_reason(&self) -> Option<&SkipReason> {
        match self {
            UpdateResult::Update(_) => None,
            UpdateResult::Skip { reason, .. } => Some(reason),
        }
    }
}

impl fmt::Display for UpdateResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateResult::Update(update) => write!(f, "{}", update),
            UpdateResult::Skip { reference, reason } => {
                write!(f, "{}: skipped ({})", reference.chart_name, reason)
            }
        }
    }
}
