//! Channel history export
//!
//! This module turns a paginated, oldest-first message history into a CSV
//! file without holding the history in memory:
//! - Messages are filtered and projected one at a time
//! - Long exports pause periodically to respect source rate limits
//! - Progress is reported at most once per interval
//! - Output names never overwrite an earlier export
//!
//! # Architecture
//!
//! 1. **MessageSource**: yields pages of [`SourceMessage`] from a chat client or a dump file
//! 2. **should_skip / project**: decide inclusion and build the [`OutputRow`]
//! 3. **ThrottlePolicy / ProgressReporter**: pure policies consulted after each row
//! 4. **CsvWriter**: appends rows to an exclusively created file
//!
//! These components are orchestrated by the **ExportPipeline**.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use chanlog::export::{ExportOptions, ExportPipeline, JsonlSource, TerminalProgress};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let mut source = JsonlSource::open(Path::new("dump.jsonl"), "general", 100).await?;
//! let options = ExportOptions { exclude_bots: true, ..Default::default() };
//! let progress = TerminalProgress::new(options.limit, true);
//!
//! let result = ExportPipeline::default()
//!     .export_channel(&mut source, Path::new("."), "42", &options, &progress)
//!     .await?;
//! println!("{} rows in {}", result.emitted_count, result.output_path.display());
//! # Ok(())
//! # }
//! ```

pub mod clock;
#[cfg(feature = "discord")]
pub mod discord;
pub mod filter;
pub mod message;
pub mod naming;
pub mod pipeline;
pub mod progress;
pub mod row;
pub mod source;
pub mod throttle;
pub mod writer;

pub use clock::{Clock, TokioClock};
#[cfg(feature = "discord")]
pub use discord::DiscordHistory;
pub use filter::should_skip;
pub use message::{Author, ExportOptions, MessageTimestamp, SourceMessage};
pub use naming::resolve_path;
pub use pipeline::{ExportPipeline, ExportResult};
pub use progress::{
    ChannelProgress, ExportState, ProgressReporter, ProgressSink, TerminalProgress,
};
pub use row::{CSV_HEADER, OutputRow, project};
pub use source::{JsonlSource, MessageSource, StreamSource};
pub use throttle::ThrottlePolicy;
pub use writer::{CsvWriter, Destination};
