//! Chanlog Library
//!
//! Streaming export of chat channel history to CSV. The export pipeline can
//! be driven by any paginated [`export::MessageSource`]; a JSON Lines dump
//! reader ships with the crate and a Discord history client is available
//! behind the `discord` feature.
//!
//! # Modules
//!
//! - `cli`: Command-line interface and argument parsing
//! - `config`: Configuration management
//! - `error`: Error types and handling
//! - `export`: Filtering, projection, throttling and CSV output
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use chanlog::{Config, ExportOptions, ExportPipeline};
//! use chanlog::export::{JsonlSource, TerminalProgress};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let mut source = JsonlSource::open(Path::new("general.jsonl"), "general", 100).await?;
//!     let progress = TerminalProgress::new(None, false);
//!
//!     let result = ExportPipeline::from_config(&config.export)
//!         .export_channel(
//!             &mut source,
//!             &config.export.output_dir,
//!             "1234",
//!             &ExportOptions::default(),
//!             &progress,
//!         )
//!         .await?;
//!
//!     println!("Exported {} messages", result.emitted_count);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod export;

// Re-export commonly used types
pub use config::Config;
pub use error::{ChanlogError, Result};
pub use export::{ExportOptions, ExportPipeline, ExportResult, MessageSource, SourceMessage};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get library version string
///
/// # Returns
/// * `&str` - Version string
pub fn version() -> &'static str {
    VERSION
}
