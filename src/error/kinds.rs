use std::path::PathBuf;
use std::{fmt, io};

/// Crate-wide `Result` type using [`ChanlogError`] as the error.
pub type Result<T> = std::result::Result<T, ChanlogError>;

/// Top-level error type for chanlog.
#[derive(Debug)]
pub enum ChanlogError {
    /// An export failed.
    Export(ExportError),

    /// Configuration errors.
    Config(ConfigError),

    /// I/O errors outside of an export (log files, output directory setup).
    Io(io::Error),

    /// Generic error with a free-form message.
    Generic(String),
}

/// Fatal export failures.
///
/// The partially written destination is left in place for both variants.
#[derive(Debug)]
pub enum ExportError {
    /// The destination could not be created, written, or closed.
    Io { path: PathBuf, source: io::Error },

    /// The paginated source failed mid-stream.
    Source(SourceError),
}

/// Failures raised by a paginated message source.
#[derive(Debug)]
pub enum SourceError {
    /// The remote collaborator failed (network, auth, rate limit).
    Fetch(String),

    /// A record could not be decoded.
    Malformed { position: u64, reason: String },

    /// Local I/O while reading the source.
    Io(io::Error),
}

/// A progress update could not be delivered.
#[derive(Debug)]
pub struct ProgressDeliveryError(pub String);

/// Configuration-specific errors.
#[derive(Debug)]
pub enum ConfigError {
    /// Config file not found.
    FileNotFound(String),

    /// Invalid config format.
    InvalidFormat(String),

    /// Invalid field value.
    InvalidValue { field: String, value: String },
}

/* ========================= Display & Error impls ========================= */

impl fmt::Display for ChanlogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChanlogError::Export(e) => write!(f, "Export failed: {e}"),
            ChanlogError::Config(e) => write!(f, "Configuration error: {e}"),
            ChanlogError::Io(e) => write!(f, "I/O error: {e}"),
            ChanlogError::Generic(msg) => write!(f, "{msg}"),
        }
    }
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportError::Io { path, source } => {
                write!(f, "cannot write {}: {source}", path.display())
            }
            ExportError::Source(e) => write!(f, "message source failed: {e}"),
        }
    }
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::Fetch(msg) => write!(f, "fetch failed: {msg}"),
            SourceError::Malformed { position, reason } => {
                write!(f, "malformed message at {position}: {reason}")
            }
            SourceError::Io(e) => write!(f, "read failed: {e}"),
        }
    }
}

impl fmt::Display for ProgressDeliveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "progress update not delivered: {}", self.0)
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => write!(f, "Config file not found: {path}"),
            ConfigError::InvalidFormat(msg) => write!(f, "Invalid config format: {msg}"),
            ConfigError::InvalidValue { field, value } => {
                write!(f, "Invalid value '{value}' for field '{field}'")
            }
        }
    }
}

impl std::error::Error for ChanlogError {}
impl std::error::Error for ConfigError {}
impl std::error::Error for ProgressDeliveryError {}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExportError::Io { source, .. } => Some(source),
            ExportError::Source(e) => Some(e),
        }
    }
}

impl std::error::Error for SourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SourceError::Io(e) => Some(e),
            _ => None,
        }
    }
}

/* ========================= Conversions ========================= */

impl ExportError {
    /// Wrap an I/O failure on the destination at `path`.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ExportError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<SourceError> for ExportError {
    fn from(err: SourceError) -> Self {
        ExportError::Source(err)
    }
}

impl From<io::Error> for SourceError {
    fn from(err: io::Error) -> Self {
        SourceError::Io(err)
    }
}

impl From<ExportError> for ChanlogError {
    fn from(err: ExportError) -> Self {
        ChanlogError::Export(err)
    }
}

impl From<ConfigError> for ChanlogError {
    fn from(err: ConfigError) -> Self {
        ChanlogError::Config(err)
    }
}

impl From<io::Error> for ChanlogError {
    fn from(err: io::Error) -> Self {
        ChanlogError::Io(err)
    }
}

impl From<String> for ChanlogError {
    fn from(msg: String) -> Self {
        ChanlogError::Generic(msg)
    }
}

impl From<&str> for ChanlogError {
    fn from(msg: &str) -> Self {
        ChanlogError::Generic(msg.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_error_display_names_destination() {
        let err = ExportError::io(
            "/tmp/message_log_1.csv",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        let text = err.to_string();
        assert!(text.contains("/tmp/message_log_1.csv"));
        assert!(text.contains("denied"));
    }

    #[test]
    fn test_source_error_converts_into_export_error() {
        let err: ExportError = SourceError::Fetch("rate limited".to_string()).into();
        assert!(matches!(err, ExportError::Source(SourceError::Fetch(_))));
        assert_eq!(err.to_string(), "message source failed: fetch failed: rate limited");
    }

    #[test]
    fn test_malformed_display() {
        let err = SourceError::Malformed {
            position: 7,
            reason: "missing id".to_string(),
        };
        assert_eq!(err.to_string(), "malformed message at 7: missing id");
    }
}
