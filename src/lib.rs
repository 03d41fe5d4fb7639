//! chartup - Helm chart version resolution and update planning library
//!
//! Given chart references found in GitOps manifests, this library:
//! - Fetches available versions from classic Helm repositories (`index.yaml`)
//!   and OCI registries (tag listings), once per source per run
//! - Selects the best update per reference under an update strategy
//! - Applies ignore rules and partitions updates into named groups

pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod grouping;
pub mod input;
pub mod orchestrator;
pub mod output;
pub mod progress;
pub mod registry;
pub mod update;

pub use config::{Config, ConfigWarning};
pub use domain::{ChartReference, ManifestCharts, ProposedUpdate, UpdateResult, UpdateStrategy};
pub use orchestrator::{Orchestrator, PlanResult};
pub use update::select_update;
