//! Error handling for chanlog.
//!
//! Errors are split by how the export pipeline treats them:
//! - [`ExportError`] is fatal to one export and is surfaced to the caller
//! - [`SourceError`] describes a failure of the paginated message source
//! - [`ProgressDeliveryError`] is never fatal; the pipeline logs it and moves on
//!
//! [`ChanlogError`] wraps everything for the binary and the configuration layer.
//!
//! # Example
//!
//! ```rust,no_run
//! use chanlog::error::{ChanlogError, ExportError, Result};
//!
//! fn report(err: &ChanlogError) {
//!     if let ChanlogError::Export(ExportError::Io { path, .. }) = err {
//!         eprintln!("destination {} is unusable", path.display());
//!     }
//! }
//! ```

pub mod kinds;

pub use kinds::{
    ChanlogError, ConfigError, ExportError, ProgressDeliveryError, Result, SourceError,
};
