//! Data model shared by every stage of the export pipeline.

use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};

/// User-supplied export flags, fixed for the duration of one export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportOptions {
    /// Leave out messages written by bots
    pub exclude_bots: bool,
    /// Write an empty attachments column
    pub exclude_attachments: bool,
    /// Maximum number of rows to emit; `None` consumes the whole history
    pub limit: Option<u64>,
}

impl ExportOptions {
    /// Whether `emitted` rows already satisfy the configured limit.
    pub fn limit_reached(&self, emitted: u64) -> bool {
        self.limit.is_some_and(|limit| emitted >= limit)
    }
}

/// Author of a historical message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    pub username: String,
    /// Server nickname or global name; absent for system or non-member authors
    pub display_name: Option<String>,
    pub is_bot: bool,
}

/// Creation time as reported by the source.
///
/// Sources do not always attach a zone. A naive value is taken to be UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageTimestamp {
    Zoned(DateTime<FixedOffset>),
    Naive(NaiveDateTime),
}

impl MessageTimestamp {
    /// Normalize to UTC.
    pub fn to_utc(&self) -> DateTime<Utc> {
        match self {
            MessageTimestamp::Zoned(ts) => ts.with_timezone(&Utc),
            MessageTimestamp::Naive(ts) => ts.and_utc(),
        }
    }

    /// Parse an RFC 3339 timestamp, falling back to a zone-less ISO 8601 form.
    pub fn parse(value: &str) -> Option<Self> {
        if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
            return Some(MessageTimestamp::Zoned(ts));
        }
        ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
            .map(MessageTimestamp::Naive)
    }
}

impl From<DateTime<Utc>> for MessageTimestamp {
    fn from(ts: DateTime<Utc>) -> Self {
        MessageTimestamp::Zoned(ts.fixed_offset())
    }
}

/// Read-only view of one message in the channel history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceMessage {
    pub id: String,
    pub author: Author,
    pub created_at: MessageTimestamp,
    pub content: String,
    /// Attachment URLs in the order the source lists them
    pub attachment_urls: Vec<String>,
}
