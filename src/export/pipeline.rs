//! Export pipeline
//!
//! Brings together the message source, filter, projector, writer, throttle
//! and progress reporting. One [`ExportPipeline::run`] call is one export:
//! it owns its state and its destination handle, and shares nothing with
//! other exports running in the same process.

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ExportConfig;
use crate::error::ExportError;

use super::clock::{Clock, TokioClock};
use super::filter::should_skip;
use super::message::ExportOptions;
use super::naming::resolve_path;
use super::progress::{ExportState, ProgressReporter, ProgressSink};
use super::row::project;
use super::source::MessageSource;
use super::throttle::ThrottlePolicy;
use super::writer::CsvWriter;

/// Attempts at claiming a fresh name when another writer takes it first
const NAME_ATTEMPTS: usize = 3;

/// Result of an export operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportResult {
    /// Number of rows written, header excluded
    pub emitted_count: u64,
    /// Destination file
    pub output_path: PathBuf,
    /// File size in bytes
    pub file_size_bytes: u64,
    /// Time taken for export
    pub elapsed_ms: u64,
    /// Whether the export was cancelled before the source was exhausted
    pub cancelled: bool,
}

/// How the row loop ended
enum Completion {
    Finished,
    Cancelled,
}

/// Streams one channel's history into a CSV file.
pub struct ExportPipeline {
    throttle: ThrottlePolicy,
    reporter: ProgressReporter,
    clock: Arc<dyn Clock>,
    cancel_token: Option<CancellationToken>,
}

impl Default for ExportPipeline {
    fn default() -> Self {
        Self::new(ThrottlePolicy::default(), ProgressReporter::default())
    }
}

impl ExportPipeline {
    pub fn new(throttle: ThrottlePolicy, reporter: ProgressReporter) -> Self {
        Self {
            throttle,
            reporter,
            clock: Arc::new(TokioClock),
            cancel_token: None,
        }
    }

    /// Build a pipeline from the `[export]` configuration section
    pub fn from_config(config: &ExportConfig) -> Self {
        Self::new(
            ThrottlePolicy::new(config.throttle_batch_size, config.throttle_pause()),
            ProgressReporter::new(config.progress_interval()),
        )
    }

    /// Replace the time source used for progress gating and throttle pauses
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Set cancellation token for this export operation
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel_token = Some(token);
        self
    }

    /// Export `source` into a new file at `destination`.
    ///
    /// The file must not exist yet. On any error the destination is closed
    /// and left in place with every row written so far.
    pub async fn run(
        &self,
        source: &mut dyn MessageSource,
        destination: &Path,
        options: &ExportOptions,
        sink: &dyn ProgressSink,
    ) -> Result<ExportResult, ExportError> {
        let writer = CsvWriter::create(destination).await?;
        self.drive(source, writer, options, sink).await
    }

    /// Export into `output_dir` under a collision-free name for `channel_id`.
    ///
    /// Creates `output_dir` when missing.
    pub async fn export_channel(
        &self,
        source: &mut dyn MessageSource,
        output_dir: &Path,
        channel_id: &str,
        options: &ExportOptions,
        sink: &dyn ProgressSink,
    ) -> Result<ExportResult, ExportError> {
        tokio::fs::create_dir_all(output_dir)
            .await
            .map_err(|e| ExportError::io(output_dir, e))?;

        let mut attempt = 1;
        let writer = loop {
            let path = resolve_path(output_dir, channel_id)
                .await
                .map_err(|e| ExportError::io(output_dir, e))?;
            match CsvWriter::create(&path).await {
                Ok(writer) => break writer,
                Err(ExportError::Io { source, .. })
                    if source.kind() == io::ErrorKind::AlreadyExists && attempt < NAME_ATTEMPTS =>
                {
                    debug!("{} was created concurrently, resolving again", path.display());
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        };

        self.drive(source, writer, options, sink).await
    }

    /// Run the row loop and close everything down, on success or failure
    async fn drive(
        &self,
        source: &mut dyn MessageSource,
        mut writer: CsvWriter,
        options: &ExportOptions,
        sink: &dyn ProgressSink,
    ) -> Result<ExportResult, ExportError> {
        let start_time = self.clock.now();
        info!(
            "Starting export of #{} to {}",
            source.channel_name(),
            writer.path().display()
        );

        let mut state = ExportState::default();
        let outcome = self
            .stream_rows(source, &mut writer, options, sink, &mut state)
            .await;

        let completion = match outcome {
            Ok(completion) => completion,
            Err(e) => {
                warn!(
                    "Export to {} failed after {} rows: {}",
                    writer.path().display(),
                    state.emitted_count,
                    e
                );
                if let Err(close_err) = writer.finalize().await {
                    debug!("Could not flush partial export: {}", close_err);
                }
                if let Err(close_err) = source.close().await {
                    debug!("Could not close message source: {}", close_err);
                }
                return Err(e);
            }
        };

        debug!("Finalizing output file");
        let finalized = writer.finalize().await;

        if let Err(e) = source.close().await {
            warn!("Message source did not close cleanly: {}", e);
        }
        if let Err(e) = finalized {
            warn!(
                "Final flush of {} failed after {} rows: {}",
                writer.path().display(),
                state.emitted_count,
                e
            );
            return Err(e);
        }

        sink.finish(state.emitted_count);

        let elapsed_ms = self.clock.now().saturating_duration_since(start_time).as_millis() as u64;
        let file_size_bytes = writer.file_size().await?;
        let cancelled = matches!(completion, Completion::Cancelled);

        if cancelled {
            info!(
                "Export cancelled: {} rows kept in {}",
                state.emitted_count,
                writer.path().display()
            );
        } else {
            info!(
                "Export completed: {} rows, {} bytes, {} ms",
                state.emitted_count, file_size_bytes, elapsed_ms
            );
        }

        Ok(ExportResult {
            emitted_count: state.emitted_count,
            output_path: writer.path().to_path_buf(),
            file_size_bytes,
            elapsed_ms,
            cancelled,
        })
    }

    async fn stream_rows(
        &self,
        source: &mut dyn MessageSource,
        writer: &mut CsvWriter,
        options: &ExportOptions,
        sink: &dyn ProgressSink,
        state: &mut ExportState,
    ) -> Result<Completion, ExportError> {
        let channel_name = source.channel_name().to_string();
        let mut page_count = 0u64;

        loop {
            if options.limit_reached(state.emitted_count) {
                debug!("Row limit reached, not fetching further pages");
                return Ok(Completion::Finished);
            }

            debug!("Fetching page #{}", page_count + 1);
            let page = match self.until_cancelled(source.next_page()).await {
                Some(page) => page?,
                None => return Ok(Completion::Cancelled),
            };
            let Some(messages) = page else {
                debug!("No more messages available");
                return Ok(Completion::Finished);
            };
            page_count += 1;

            for message in &messages {
                if self.is_cancelled() {
                    return Ok(Completion::Cancelled);
                }
                if should_skip(message, options) {
                    continue;
                }

                let row = project(&channel_name, message, options);
                writer.write_row(&row).await?;
                state.emitted_count += 1;

                // no pause once the last wanted row is written
                let limit_hit = options.limit_reached(state.emitted_count);
                let pause = self
                    .throttle
                    .pause_after(state.emitted_count)
                    .filter(|_| !limit_hit);
                if let Some(pause) = pause {
                    debug!(
                        "Pausing {} ms after {} rows",
                        pause.as_millis(),
                        state.emitted_count
                    );
                    if self.until_cancelled(self.clock.sleep(pause)).await.is_none() {
                        return Ok(Completion::Cancelled);
                    }
                }

                let (next, update) = self.reporter.report_if_due(*state, self.clock.now());
                *state = next;
                if let Some(count) = update {
                    if let Err(e) = sink.report(count) {
                        warn!("Ignoring failed progress update: {}", e);
                    }
                }

                if limit_hit {
                    debug!("Row limit of {} reached", state.emitted_count);
                    return Ok(Completion::Finished);
                }
            }

            if page_count % 10 == 0 {
                info!(
                    "Progress: {} rows exported ({} pages)",
                    state.emitted_count, page_count
                );
            }
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel_token
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }

    /// Await `fut` unless the export is cancelled first
    async fn until_cancelled<F: Future>(&self, fut: F) -> Option<F::Output> {
        match &self.cancel_token {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => None,
                out = fut => Some(out),
            },
            None => Some(fut.await),
        }
    }
}
