//! Core domain models for chartup
//!
//! This module contains the fundamental types used throughout the engine:
//! - Chart references and the manifests they came from
//! - Chart sources (classic repository or OCI registry) and their fetch keys
//! - Update strategies and update classes
//! - Update decision results
//! - Plan summary structures

mod chart;
mod source;
mod strategy;
mod summary;
mod update_result;

pub use chart::{ChartReference, FieldAddress, ManifestCharts};
pub use source::{registry_scheme, ChartSource, FetchKey, SourceKind};
pub use strategy::{
    cmp_precedence, is_stable_promotion, parse_version, UpdateClass, UpdateStrategy,
};
pub use summary::{ManifestPlan, PlanSummary};
pub use update_result::{ProposedUpdate, SkipReason, UpdateResult};
