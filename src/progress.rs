//! Progress display for source fetches
//!
//! Draws one bar on stderr while chart versions are fetched, so JSON on
//! stdout stays clean. Nothing is drawn when there is nothing to fetch.

use crate::domain::FetchKey;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const BAR_TEMPLATE: &str = "{spinner:.cyan} Fetching chart versions [{bar:30.cyan/blue}] {pos}/{len} {wide_msg:.dim}";

/// Progress of the fetch phase of one planning run
pub struct FetchProgress {
    bar: Option<ProgressBar>,
}

impl FetchProgress {
    /// Start tracking `sources` fetches; hidden when disabled or empty
    pub fn start(enabled: bool, sources: usize) -> Self {
        if !enabled || sources == 0 {
            return Self { bar: None };
        }

        let bar = ProgressBar::new(sources as u64);
        if let Ok(style) = ProgressStyle::default_bar().template(BAR_TEMPLATE) {
            bar.set_style(style.progress_chars("█▓▒░"));
        }
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar: Some(bar) }
    }

    /// Record a completed source, showing its endpoint
    pub fn source_done(&self, key: &FetchKey) {
        if let Some(bar) = &self.bar {
            bar.set_message(key.endpoint.clone());
            bar.inc(1);
        }
    }

    /// Sources completed so far
    pub fn completed(&self) -> u64 {
        self.bar.as_ref().map_or(0, ProgressBar::position)
    }

    pub fn is_visible(&self) -> bool {
        self.bar.is_some()
    }

    /// Remove the bar from the terminal
    pub fn finish(self) {
        if let Some(bar) = self.bar {
            bar.finish_and_clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SourceKind;

    fn key(endpoint: &str) -> FetchKey {
        FetchKey {
            kind: SourceKind::Classic,
            endpoint: endpoint.to_string(),
        }
    }

    #[test]
    fn test_disabled_draws_nothing() {
        let progress = FetchProgress::start(false, 3);
        assert!(!progress.is_visible());
        progress.source_done(&key("https://charts.example.com/index.yaml"));
        assert_eq!(progress.completed(), 0);
        progress.finish();
    }

    #[test]
    fn test_no_sources_draws_nothing() {
        assert!(!FetchProgress::start(true, 0).is_visible());
    }

    #[test]
    fn test_counts_completed_sources() {
        let progress = FetchProgress::start(true, 2);
        assert!(progress.is_visible());
        progress.source_done(&key("https://a.example.com/index.yaml"));
        progress.source_done(&key("https://b.example.com/index.yaml"));
        assert_eq!(progress.completed(), 2);
        progress.finish();
    }
}
