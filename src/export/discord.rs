//! Discord channel history as a [`MessageSource`].
//!
//! Pages are requested with `after`, starting from the beginning of the
//! channel, so the export walks forward in time. Discord returns each page
//! newest-first; pages are re-sorted before they reach the pipeline.
//! Rate limiting is left to serenity's HTTP client.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serenity::all::{ChannelId, GetMessages, Http, Message, MessageId};
use tracing::debug;

use crate::error::SourceError;

use super::message::{Author, MessageTimestamp, SourceMessage};
use super::source::MessageSource;

/// Milliseconds between the Unix epoch and the first Discord snowflake
const DISCORD_EPOCH_MS: i64 = 1_420_070_400_000;

/// Largest page the messages endpoint serves
const MAX_PAGE_SIZE: usize = 100;

pub struct DiscordHistory {
    http: Arc<Http>,
    channel_id: ChannelId,
    channel_name: String,
    /// Newest message id already returned
    after: MessageId,
    page_size: u8,
    exhausted: bool,
    total_fetched: u64,
}

impl DiscordHistory {
    pub fn new(
        http: Arc<Http>,
        channel_id: ChannelId,
        channel_name: impl Into<String>,
        page_size: usize,
    ) -> Self {
        Self {
            http,
            channel_id,
            channel_name: channel_name.into(),
            after: MessageId::new(1),
            page_size: page_size.clamp(1, MAX_PAGE_SIZE) as u8,
            exhausted: false,
            total_fetched: 0,
        }
    }
}

/// Creation time encoded in a snowflake id
fn snowflake_time(id: u64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis((id >> 22) as i64 + DISCORD_EPOCH_MS)
}

fn to_source_message(message: &Message) -> SourceMessage {
    let display_name = message
        .member
        .as_ref()
        .and_then(|member| member.nick.clone())
        .or_else(|| message.author.global_name.clone());

    SourceMessage {
        id: message.id.get().to_string(),
        author: Author {
            username: message.author.name.clone(),
            display_name,
            is_bot: message.author.bot,
        },
        created_at: MessageTimestamp::from(snowflake_time(message.id.get()).unwrap_or_default()),
        content: message.content.clone(),
        attachment_urls: message.attachments.iter().map(|a| a.url.clone()).collect(),
    }
}

#[async_trait]
impl MessageSource for DiscordHistory {
    fn channel_name(&self) -> &str {
        &self.channel_name
    }

    async fn next_page(&mut self) -> Result<Option<Vec<SourceMessage>>, SourceError> {
        if self.exhausted {
            return Ok(None);
        }

        let builder = GetMessages::new().after(self.after).limit(self.page_size);
        let mut page = self
            .channel_id
            .messages(&*self.http, builder)
            .await
            .map_err(|e| SourceError::Fetch(e.to_string()))?;

        if page.is_empty() {
            debug!(
                "Channel {} history exhausted after {} messages",
                self.channel_id, self.total_fetched
            );
            self.exhausted = true;
            return Ok(None);
        }

        page.sort_by_key(|m| m.id);
        if let Some(newest) = page.last() {
            self.after = newest.id;
        }
        self.total_fetched += page.len() as u64;

        Ok(Some(page.iter().map(to_source_message).collect()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snowflake_time() {
        let ts = snowflake_time(175_928_847_299_117_063).unwrap();
        assert_eq!(ts.timestamp_millis(), 1_462_015_105_796);
    }

    #[test]
    fn test_page_size_clamped() {
        let http = Arc::new(Http::new("token"));
        let history = DiscordHistory::new(http.clone(), ChannelId::new(1), "general", 500);
        assert_eq!(history.page_size, 100);
        let history = DiscordHistory::new(http, ChannelId::new(1), "general", 0);
        assert_eq!(history.page_size, 1);
    }
}
