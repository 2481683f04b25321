//! Progress reporting service
//!
//! This module separates progress reporting concerns from the download,
//! extraction and post-processing logic, so the CLI can draw progress bars
//! while tests record the reported values.

#[cfg(feature = "cli")]
use indicatif::{ProgressBar, ProgressStyle};
#[cfg(feature = "cli")]
use std::sync::Mutex;

/// What kind of quantity a progress task counts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressUnit {
    /// Byte transfers (downloads)
    Bytes,
    /// Discrete items (archive entries, image files)
    Items,
}

/// Trait for receiving progress of a single long-running task at a time
pub trait ProgressReporter: Send + Sync {
    /// A new task starts; `total` is `None` when the size is unknown
    fn start(&self, label: &str, total: Option<u64>, unit: ProgressUnit);

    /// `delta` more units were completed
    fn advance(&self, delta: u64);

    /// The current task finished
    fn finish(&self, message: &str);
}

/// No-op progress reporter that discards all progress updates
#[derive(Debug, Default)]
pub struct NoOpProgressReporter;

impl ProgressReporter for NoOpProgressReporter {
    fn start(&self, _label: &str, _total: Option<u64>, _unit: ProgressUnit) {
        // Intentionally empty - discards progress updates
    }

    fn advance(&self, _delta: u64) {}

    fn finish(&self, _message: &str) {}
}

/// Log-based reporter used when progress bars are unavailable
#[derive(Debug, Default)]
pub struct LogProgressReporter;

impl ProgressReporter for LogProgressReporter {
    fn start(&self, label: &str, total: Option<u64>, _unit: ProgressUnit) {
        match total {
            Some(total) => log::info!("{} ({} total)", label, total),
            None => log::info!("{}", label),
        }
    }

    fn advance(&self, delta: u64) {
        log::trace!("progress +{}", delta);
    }

    fn finish(&self, message: &str) {
        log::info!("✅ {}", message);
    }
}

/// Terminal progress bars backed by `indicatif`
#[cfg(feature = "cli")]
#[derive(Debug, Default)]
pub struct IndicatifReporter {
    bar: Mutex<Option<ProgressBar>>,
}

#[cfg(feature = "cli")]
impl IndicatifReporter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn style(unit: ProgressUnit, known_total: bool) -> ProgressStyle {
        let template = match (unit, known_total) {
            (ProgressUnit::Bytes, true) => {
                "{msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes}"
            },
            (ProgressUnit::Items, true) => {
                "{msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len}"
            },
            (ProgressUnit::Bytes, false) => "{spinner:.green} {msg} {bytes}",
            (ProgressUnit::Items, false) => "{spinner:.green} {msg} {pos}",
        };
        ProgressStyle::default_bar()
            .template(template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-")
    }
}

#[cfg(feature = "cli")]
impl ProgressReporter for IndicatifReporter {
    fn start(&self, label: &str, total: Option<u64>, unit: ProgressUnit) {
        let bar = match total {
            Some(total) => ProgressBar::new(total),
            None => ProgressBar::new_spinner(),
        };
        bar.set_style(Self::style(unit, total.is_some()));
        bar.set_message(label.to_string());

        if let Ok(mut slot) = self.bar.lock() {
            if let Some(previous) = slot.replace(bar) {
                previous.finish_and_clear();
            }
        }
    }

    fn advance(&self, delta: u64) {
        if let Ok(slot) = self.bar.lock() {
            if let Some(bar) = slot.as_ref() {
                bar.inc(delta);
            }
        }
    }

    fn finish(&self, message: &str) {
        if let Ok(mut slot) = self.bar.lock() {
            if let Some(bar) = slot.take() {
                bar.finish_with_message(message.to_string());
            }
        }
    }
}

/// Create the reporter the CLI should use
#[must_use]
pub fn create_cli_progress_reporter() -> std::sync::Arc<dyn ProgressReporter> {
    #[cfg(feature = "cli")]
    {
        std::sync::Arc::new(IndicatifReporter::new())
    }
    #[cfg(not(feature = "cli"))]
    {
        std::sync::Arc::new(LogProgressReporter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::RecordingProgressReporter;

    #[test]
    fn test_no_op_reporter() {
        let reporter = NoOpProgressReporter;
        reporter.start("Downloading rps.zip", Some(100), ProgressUnit::Bytes);
        reporter.advance(50);
        reporter.finish("done");
    }

    #[test]
    fn test_recording_reporter_tracks_totals() {
        let reporter = RecordingProgressReporter::default();
        reporter.start("Extracting", Some(3), ProgressUnit::Items);
        reporter.advance(1);
        reporter.advance(2);
        reporter.finish("Dataset extracted");

        assert_eq!(reporter.last_total(), Some(3));
        assert_eq!(reporter.advanced(), 3);
        assert_eq!(reporter.finished(), vec!["Dataset extracted".to_string()]);
    }

    #[cfg(feature = "cli")]
    #[test]
    fn test_indicatif_reporter_lifecycle() {
        let reporter = IndicatifReporter::new();
        reporter.start("Downloading", Some(10), ProgressUnit::Bytes);
        reporter.advance(10);
        reporter.start("Extracting", None, ProgressUnit::Items);
        reporter.advance(1);
        reporter.finish("done");
        reporter.advance(1);
    }
}
