//! Progress reporting for export operations
//!
//! [`ProgressReporter`] decides *when* to report: at most once per interval,
//! as a pure function of the pipeline's [`ExportState`] and the current time.
//! A [`ProgressSink`] decides *where* the update goes. Sinks must not block
//! and their failures never stop an export.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;

use crate::error::ProgressDeliveryError;

/// Minimum time between two progress updates unless configured otherwise
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_secs(7);

/// Mutable state owned by a single pipeline run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportState {
    /// Rows written so far
    pub emitted_count: u64,
    /// When the last update went out; `None` until the first one
    pub last_progress_report: Option<Instant>,
}

/// Time-gated progress policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressReporter {
    pub interval: Duration,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self {
            interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

impl ProgressReporter {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    /// Decide whether an update is due at `now`.
    ///
    /// Returns the state to carry forward and, when due, the count to report.
    pub fn report_if_due(&self, state: ExportState, now: Instant) -> (ExportState, Option<u64>) {
        let due = match state.last_progress_report {
            None => true,
            Some(last) => now.saturating_duration_since(last) > self.interval,
        };

        if due {
            let next = ExportState {
                last_progress_report: Some(now),
                ..state
            };
            (next, Some(state.emitted_count))
        } else {
            (state, None)
        }
    }
}

/// Receiver of progress updates.
pub trait ProgressSink: Send + Sync {
    /// Deliver the running row count. Must return promptly.
    fn report(&self, emitted: u64) -> Result<(), ProgressDeliveryError>;

    /// Called once after the destination is closed.
    fn finish(&self, _emitted: u64) {}
}

/// Progress tracker for terminal use
///
/// Shows a spinner with the row count and throughput. With `enable_bar`
/// off it only records the count.
pub struct TerminalProgress {
    /// Number of rows reported so far
    processed: AtomicU64,
    /// Start time of the operation
    start_time: Instant,
    /// Spinner (optional, can be disabled)
    bar: Option<ProgressBar>,
}

impl TerminalProgress {
    /// Create a new terminal tracker
    ///
    /// # Arguments
    /// * `limit` - Row cap if one was requested; shown as a bar instead of a spinner
    /// * `enable_bar` - Whether to draw anything
    pub fn new(limit: Option<u64>, enable_bar: bool) -> Self {
        let bar = enable_bar.then(|| match limit {
            Some(n) => {
                let bar = ProgressBar::new(n);
                if let Ok(style) =
                    ProgressStyle::default_bar().template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                {
                    bar.set_style(style.progress_chars("#>-"));
                }
                bar
            }
            None => {
                let bar = ProgressBar::new_spinner();
                if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {pos} messages {msg}") {
                    bar.set_style(style);
                }
                bar
            }
        });

        Self {
            processed: AtomicU64::new(0),
            start_time: Instant::now(),
            bar,
        }
    }

    /// Last count reported
    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }
}

impl ProgressSink for TerminalProgress {
    fn report(&self, emitted: u64) -> Result<(), ProgressDeliveryError> {
        self.processed.store(emitted, Ordering::Relaxed);

        if let Some(ref bar) = self.bar {
            bar.set_position(emitted);

            let elapsed = self.start_time.elapsed().as_secs_f64();
            if elapsed > 0.0 {
                let speed = emitted as f64 / elapsed;
                bar.set_message(format!("({:.0} msgs/sec)", speed));
            }
        }
        Ok(())
    }

    fn finish(&self, emitted: u64) {
        self.processed.store(emitted, Ordering::Relaxed);
        if let Some(ref bar) = self.bar {
            bar.finish_and_clear();
        }
    }
}

/// Forwards counts to a task that owns a remote status message.
///
/// Uses `try_send`, so a slow or full consumer drops updates instead of
/// stalling the export.
#[derive(Debug, Clone)]
pub struct ChannelProgress {
    tx: mpsc::Sender<u64>,
}

impl ChannelProgress {
    pub fn new(tx: mpsc::Sender<u64>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelProgress {
    fn report(&self, emitted: u64) -> Result<(), ProgressDeliveryError> {
        self.tx.try_send(emitted).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                ProgressDeliveryError("status channel is full".to_string())
            }
            mpsc::error::TrySendError::Closed(_) => {
                ProgressDeliveryError("status channel is closed".to_string())
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_report_is_always_due() {
        let reporter = ProgressReporter::default();
        let now = Instant::now();
        let state = ExportState {
            emitted_count: 1,
            last_progress_report: None,
        };
        let (next, update) = reporter.report_if_due(state, now);
        assert_eq!(update, Some(1));
        assert_eq!(next.last_progress_report, Some(now));
    }

    #[test]
    fn test_one_second_apart_reports_once() {
        let reporter = ProgressReporter::default();
        let t0 = Instant::now();

        let (state, first) = reporter.report_if_due(
            ExportState {
                emitted_count: 1,
                last_progress_report: None,
            },
            t0,
        );
        let (_, second) = reporter.report_if_due(
            ExportState {
                emitted_count: 2,
                ..state
            },
            t0 + Duration::from_secs(1),
        );

        assert_eq!([first, second].iter().flatten().count(), 1);
    }

    #[test]
    fn test_eight_seconds_apart_reports_twice() {
        let reporter = ProgressReporter::default();
        let t0 = Instant::now();

        let (state, first) = reporter.report_if_due(
            ExportState {
                emitted_count: 1,
                last_progress_report: None,
            },
            t0,
        );
        let (state, second) = reporter.report_if_due(
            ExportState {
                emitted_count: 2,
                ..state
            },
            t0 + Duration::from_secs(8),
        );

        assert_eq!(first, Some(1));
        assert_eq!(second, Some(2));
        assert_eq!(state.last_progress_report, Some(t0 + Duration::from_secs(8)));
    }

    #[test]
    fn test_exact_interval_is_not_due() {
        let reporter = ProgressReporter::new(Duration::from_secs(7));
        let t0 = Instant::now();
        let state = ExportState {
            emitted_count: 10,
            last_progress_report: Some(t0),
        };
        let (unchanged, update) = reporter.report_if_due(state, t0 + Duration::from_secs(7));
        assert_eq!(update, None);
        assert_eq!(unchanged, state);
    }

    #[test]
    fn test_terminal_progress_without_bar() {
        let tracker = TerminalProgress::new(None, false);
        tracker.report(500).unwrap();
        assert_eq!(tracker.processed(), 500);
        tracker.finish(510);
        assert_eq!(tracker.processed(), 510);
    }

    #[test]
    fn test_terminal_progress_with_limit() {
        let tracker = TerminalProgress::new(Some(1000), false);
        tracker.report(250).unwrap();
        assert_eq!(tracker.processed(), 250);
    }

    #[tokio::test]
    async fn test_channel_progress_delivers() {
        let (tx, mut rx) = mpsc::channel(4);
        let sink = ChannelProgress::new(tx);
        sink.report(42).unwrap();
        assert_eq!(rx.recv().await, Some(42));
    }

    #[test]
    fn test_channel_progress_full_is_an_error_not_a_wait() {
        let (tx, _rx) = mpsc::channel(1);
        let sink = ChannelProgress::new(tx);
        sink.report(1).unwrap();
        assert!(sink.report(2).is_err());
    }

    #[test]
    fn test_channel_progress_closed() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let err = ChannelProgress::new(tx).report(1).unwrap_err();
        assert!(err.to_string().contains("closed"));
    }
}
