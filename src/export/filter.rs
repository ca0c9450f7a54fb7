//! Decides which messages are left out of an export.

use super::message::{ExportOptions, SourceMessage};

/// Whether `message` should be excluded from the export.
///
/// Rules are checked in order and the first match wins:
/// 1. messages without text are skipped, including attachment-only messages
/// 2. bot messages are skipped when `exclude_bots` is set
pub fn should_skip(message: &SourceMessage, options: &ExportOptions) -> bool {
    if message.content.is_empty() {
        return true;
    }
    options.exclude_bots && message.author.is_bot
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::message::{Author, MessageTimestamp};
    use chrono::Utc;

    fn message(content: &str, is_bot: bool, attachments: &[&str]) -> SourceMessage {
        SourceMessage {
            id: "1".to_string(),
            author: Author {
                username: "someone".to_string(),
                display_name: None,
                is_bot,
            },
            created_at: MessageTimestamp::from(Utc::now()),
            content: content.to_string(),
            attachment_urls: attachments.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn all_options() -> Vec<ExportOptions> {
        let mut out = Vec::new();
        for exclude_bots in [false, true] {
            for exclude_attachments in [false, true] {
                for limit in [None, Some(0), Some(10)] {
                    out.push(ExportOptions {
                        exclude_bots,
                        exclude_attachments,
                        limit,
                    });
                }
            }
        }
        out
    }

    #[test]
    fn test_empty_content_always_skipped() {
        for options in all_options() {
            assert!(should_skip(&message("", false, &[]), &options));
            assert!(should_skip(&message("", true, &[]), &options));
            assert!(should_skip(
                &message("", false, &["https://cdn.example/a.png"]),
                &options
            ));
        }
    }

    #[test]
    fn test_bot_skipped_only_when_excluded() {
        for options in all_options() {
            let bot = message("beep", true, &[]);
            assert_eq!(should_skip(&bot, &options), options.exclude_bots);
        }
    }

    #[test]
    fn test_human_with_text_included() {
        for options in all_options() {
            assert!(!should_skip(&message("hello", false, &[]), &options));
        }
    }
}
