//! Update strategies and update classes

use crate::error::ConfigError;
use semver::Version;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// How far a version bump is allowed to travel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateStrategy {
    /// Same major and minor
    Patch,
    /// Same major
    Minor,
    /// Any newer version
    Major,
    /// Any newer version
    #[default]
    All,
}

impl UpdateStrategy {
    /// Returns true if `candidate` is an allowed move away from `current`
    pub fn allows(&self, current: &Version, candidate: &Version) -> bool {
        let newer = cmp_precedence(candidate, current) == Ordering::Greater
            || is_stable_promotion(current, candidate);
        if !newer {
            return false;
        }
        match self {
            UpdateStrategy::Patch => {
                candidate.major == current.major && candidate.minor == current.minor
            }
            UpdateStrategy::Minor => candidate.major == current.major,
            UpdateStrategy::Major | UpdateStrategy::All => true,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateStrategy::Patch => "patch",
            UpdateStrategy::Minor => "minor",
            UpdateStrategy::Major => "major",
            UpdateStrategy::All => "all",
        }
    }
}

impl FromStr for UpdateStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "patch" => Ok(UpdateStrategy::Patch),
            "minor" => Ok(UpdateStrategy::Minor),
            "major" => Ok(UpdateStrategy::Major),
            "all" => Ok(UpdateStrategy::All),
            _ => Err(ConfigError::InvalidStrategy {
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for UpdateStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Semantic version change class between two versions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateClass {
    /// Major version change (breaking)
    Major,
    /// Minor version change (features)
    Minor,
    /// Patch version change (fixes), including pre-release moves within a triplet
    Patch,
}

impl UpdateClass {
    /// Classify the move from `current` to `candidate` by comparing components
    pub fn classify(current: &Version, candidate: &Version) -> Self {
        if candidate.major != current.major {
            UpdateClass::Major
        } else if candidate.minor != current.minor {
            UpdateClass::Minor
        } else {
            UpdateClass::Patch
        }
    }

    /// Classify two raw version strings; None if either does not parse
    pub fn from_versions(current: &str, candidate: &str) -> Option<Self> {
        let current = parse_version(current)?;
        let candidate = parse_version(candidate)?;
        Some(Self::classify(&current, &candidate))
    }

    pub fn label(&self) -> &'static str {
        match self {
            UpdateClass::Major => "major",
            UpdateClass::Minor => "minor",
            UpdateClass::Patch => "patch",
        }
    }
}

impl FromStr for UpdateClass {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "major" => Ok(UpdateClass::Major),
            "minor" => Ok(UpdateClass::Minor),
            "patch" => Ok(UpdateClass::Patch),
            _ => Err(ConfigError::InvalidUpdateClass {
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for UpdateClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Parse a version string as semver, tolerating a leading `v`
pub fn parse_version(raw: &str) -> Option<Version> {
    let trimmed = raw.trim();
    let stripped = trimmed
        .strip_prefix('v')
        .or_else(|| trimmed.strip_prefix('V'))
        .unwrap_or(trimmed);
    Version::parse(stripped).ok()
}

/// Semver precedence: build metadata does not take part in ordering
pub fn cmp_precedence(a: &Version, b: &Version) -> Ordering {
    a.major
        .cmp(&b.major)
        .then(a.minor.cmp(&b.minor))
        .then(a.patch.cmp(&b.patch))
        .then_with(|| a.pre.cmp(&b.pre))
}

/// A pre-release current version may move to the stable release of the same triplet
pub fn is_stable_promotion(current: &Version, candidate: &Version) -> bool {
    !current.pre.is_empty()
        && candidate.pre.is_empty()
        && same_triplet(current, candidate)
}

fn same_triplet(a: &Version, b: &Version) -> bool {
    a.major == b.major && a.minor == b.minor && a.patch == b.patch
}
