//! Row projection for the CSV export
//!
//! Every included message becomes exactly one [`OutputRow`] with a fixed
//! eight-column schema, rendered with standard CSV quoting.

use chrono::SecondsFormat;

use super::message::{ExportOptions, SourceMessage};

/// Header line written at the top of every export.
pub const CSV_HEADER: &str = "channel_name,message_id,author_username,author_display_name,created_at_iso,content,is_bot,attachments";

/// Number of columns in an [`OutputRow`]
pub const COLUMN_COUNT: usize = 8;

/// Separator between attachment URLs in the `attachments` column
pub const ATTACHMENT_SEPARATOR: &str = ";";

/// One CSV data row, in header order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRow {
    fields: [String; COLUMN_COUNT],
}

impl OutputRow {
    /// Field values in header order
    pub fn fields(&self) -> &[String; COLUMN_COUNT] {
        &self.fields
    }

    pub fn message_id(&self) -> &str {
        &self.fields[1]
    }

    pub fn content(&self) -> &str {
        &self.fields[5]
    }

    pub fn attachments(&self) -> &str {
        &self.fields[7]
    }

    /// Render as a single newline-terminated CSV line.
    pub fn to_csv_line(&self) -> String {
        let mut line = self
            .fields
            .iter()
            .map(|field| escape_csv_value(field))
            .collect::<Vec<_>>()
            .join(",");
        line.push('\n');
        line
    }
}

/// Map an included message to its output row.
///
/// No filtering happens here; callers run [`super::filter::should_skip`] first.
pub fn project(channel_name: &str, message: &SourceMessage, options: &ExportOptions) -> OutputRow {
    let created_at = message
        .created_at
        .to_utc()
        .to_rfc3339_opts(SecondsFormat::AutoSi, false);

    let attachments = if options.exclude_attachments {
        String::new()
    } else {
        message.attachment_urls.join(ATTACHMENT_SEPARATOR)
    };

    OutputRow {
        fields: [
            channel_name.to_string(),
            message.id.clone(),
            message.author.username.clone(),
            message.author.display_name.clone().unwrap_or_default(),
            created_at,
            message.content.clone(),
            message.author.is_bot.to_string(),
            attachments,
        ],
    }
}

/// Quote a CSV value if it contains a delimiter, quote, or line break.
fn escape_csv_value(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') || value.contains('\r') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
