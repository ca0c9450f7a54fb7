//! Paginated message sources
//!
//! A [`MessageSource`] yields a channel's history in pages, oldest message
//! first. The pipeline pulls one page at a time and stops pulling as soon as
//! it has what it needs, so sources should fetch lazily.

use std::path::Path;

use async_trait::async_trait;
use futures::TryStreamExt;
use futures::stream::BoxStream;
use serde::Deserialize;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tracing::{debug, info};

use crate::error::SourceError;

use super::message::{Author, MessageTimestamp, SourceMessage};

/// Ordered, lazily paginated channel history.
#[async_trait]
pub trait MessageSource: Send {
    /// Human-readable channel name written into every row
    fn channel_name(&self) -> &str;

    /// Fetch the next page, oldest-first; `None` once the history is exhausted
    async fn next_page(&mut self) -> Result<Option<Vec<SourceMessage>>, SourceError>;

    /// Release any held resources
    async fn close(&mut self) -> Result<(), SourceError> {
        Ok(())
    }
}

/// Adapts a stream of pages from a chat client into a [`MessageSource`].
pub struct StreamSource {
    channel_name: String,
    pages: BoxStream<'static, Result<Vec<SourceMessage>, SourceError>>,
    exhausted: bool,
}

impl StreamSource {
    pub fn new(
        channel_name: impl Into<String>,
        pages: BoxStream<'static, Result<Vec<SourceMessage>, SourceError>>,
    ) -> Self {
        Self {
            channel_name: channel_name.into(),
            pages,
            exhausted: false,
        }
    }
}

#[async_trait]
impl MessageSource for StreamSource {
    fn channel_name(&self) -> &str {
        &self.channel_name
    }

    async fn next_page(&mut self) -> Result<Option<Vec<SourceMessage>>, SourceError> {
        if self.exhausted {
            return Ok(None);
        }
        match self.pages.try_next().await {
            Ok(Some(page)) => Ok(Some(page)),
            Ok(None) => {
                self.exhausted = true;
                Ok(None)
            }
            Err(e) => {
                self.exhausted = true;
                Err(e)
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    id: serde_json::Value,
    author: RawAuthor,
    #[serde(alias = "timestamp")]
    created_at: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    attachments: Vec<RawAttachment>,
}

#[derive(Debug, Deserialize)]
struct RawAuthor {
    username: String,
    #[serde(default)]
    nick: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    global_name: Option<String>,
    #[serde(default, alias = "is_bot")]
    bot: bool,
}

impl RawAuthor {
    /// Guild nickname, then explicit display name, then global name
    fn resolved_name(&mut self) -> Option<String> {
        [
            self.nick.take(),
            self.display_name.take(),
            self.global_name.take(),
        ]
        .into_iter()
        .flatten()
        .find(|name| !name.is_empty())
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawAttachment {
    Url(String),
    Object { url: String },
}

impl RawMessage {
    fn into_message(mut self, line_number: u64) -> Result<SourceMessage, SourceError> {
        let malformed = |reason: String| SourceError::Malformed {
            position: line_number,
            reason,
        };

        let id = match self.id {
            serde_json::Value::String(s) if !s.is_empty() => s,
            serde_json::Value::Number(n) => n.to_string(),
            other => return Err(malformed(format!("invalid id: {other}"))),
        };
        let created_at = MessageTimestamp::parse(&self.created_at)
            .ok_or_else(|| malformed(format!("invalid timestamp: {}", self.created_at)))?;

        let display_name = self.author.resolved_name();

        Ok(SourceMessage {
            id,
            author: Author {
                username: self.author.username,
                display_name,
                is_bot: self.author.bot,
            },
            created_at,
            content: self.content,
            attachment_urls: self
                .attachments
                .into_iter()
                .map(|a| match a {
                    RawAttachment::Url(url) | RawAttachment::Object { url } => url,
                })
                .collect(),
        })
    }
}

/// Reads a channel dump stored as JSON Lines, one message per line.
///
/// Lines must already be in chronological order. Blank lines are ignored.
pub struct JsonlSource {
    channel_name: String,
    lines: Option<Lines<BufReader<File>>>,
    page_size: usize,
    line_number: u64,
    total_fetched: u64,
}

impl JsonlSource {
    /// Open a dump file
    ///
    /// # Arguments
    /// * `path` - JSON Lines file with one message object per line
    /// * `channel_name` - Name to write into the `channel_name` column
    /// * `page_size` - Messages returned per page
    pub async fn open(
        path: &Path,
        channel_name: impl Into<String>,
        page_size: usize,
    ) -> Result<Self, SourceError> {
        let file = File::open(path).await?;
        debug!("Opened message dump: {}", path.display());
        Ok(Self {
            channel_name: channel_name.into(),
            lines: Some(BufReader::new(file).lines()),
            page_size: page_size.max(1),
            line_number: 0,
            total_fetched: 0,
        })
    }
}

#[async_trait]
impl MessageSource for JsonlSource {
    fn channel_name(&self) -> &str {
        &self.channel_name
    }

    async fn next_page(&mut self) -> Result<Option<Vec<SourceMessage>>, SourceError> {
        let lines = match self.lines.as_mut() {
            Some(l) => l,
            None => return Ok(None),
        };

        let mut page = Vec::with_capacity(self.page_size);
        while page.len() < self.page_size {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    self.lines = None;
                    return Err(e.into());
                }
            };
            self.line_number += 1;
            if line.trim().is_empty() {
                continue;
            }

            let raw: RawMessage = serde_json::from_str(&line).map_err(|e| SourceError::Malformed {
                position: self.line_number,
                reason: e.to_string(),
            })?;
            page.push(raw.into_message(self.line_number)?);
        }

        if page.is_empty() {
            debug!(
                "Message dump exhausted after {} messages",
                self.total_fetched
            );
            self.lines = None;
            Ok(None)
        } else {
            self.total_fetched += page.len() as u64;
            debug!(
                "Read page of {} messages (total: {})",
                page.len(),
                self.total_fetched
            );
            Ok(Some(page))
        }
    }

    async fn close(&mut self) -> Result<(), SourceError> {
        if self.lines.take().is_some() {
            info!(
                "Closed message dump after reading {} messages",
                self.total_fetched
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use tempfile::TempDir;

    async fn dump(dir: &TempDir, body: &str) -> std::path::PathBuf {
        let path = dir.path().join("dump.jsonl");
        tokio::fs::write(&path, body).await.unwrap();
        path
    }

    #[tokio::test]
    async fn test_jsonl_pages() {
        let dir = TempDir::new().unwrap();
        let body = (1..=5)
            .map(|i| {
                format!(
                    r#"{{"id":"{i}","author":{{"username":"u{i}"}},"created_at":"2024-01-01T00:00:0{i}Z","content":"m{i}"}}"#
                )
            })
            .collect::<Vec<_>>()
            .join("\n");
        let path = dump(&dir, &body).await;

        let mut source = JsonlSource::open(&path, "general", 2).await.unwrap();
        let sizes = [
            source.next_page().await.unwrap().map(|p| p.len()),
            source.next_page().await.unwrap().map(|p| p.len()),
            source.next_page().await.unwrap().map(|p| p.len()),
            source.next_page().await.unwrap().map(|p| p.len()),
        ];
        assert_eq!(sizes, [Some(2), Some(2), Some(1), None]);
        assert_eq!(source.channel_name(), "general");
        source.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_jsonl_record_shapes() {
        let dir = TempDir::new().unwrap();
        let body = concat!(
            r#"{"id":1188,"author":{"username":"bot","global_name":"Helper","is_bot":true},"timestamp":"2024-01-01T10:00:00","content":"hi","attachments":["https://a/1.png",{"url":"https://a/2.png"}]}"#,
            "\n\n",
            r#"{"id":"1189","author":{"username":"ada","display_name":""},"created_at":"2024-01-01T10:00:01+00:00"}"#,
            "\n"
        );
        let path = dump(&dir, body).await;

        let mut source = JsonlSource::open(&path, "general", 10).await.unwrap();
        let page = source.next_page().await.unwrap().unwrap();
        assert_eq!(page.len(), 2);

        assert_eq!(page[0].id, "1188");
        assert!(page[0].author.is_bot);
        assert_eq!(page[0].author.display_name.as_deref(), Some("Helper"));
        assert!(matches!(page[0].created_at, MessageTimestamp::Naive(_)));
        assert_eq!(page[0].attachment_urls, vec!["https://a/1.png", "https://a/2.png"]);

        assert_eq!(page[1].content, "");
        assert_eq!(page[1].author.display_name, None);
        assert!(source.next_page().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_jsonl_author_name_precedence() {
        let dir = TempDir::new().unwrap();
        let body = concat!(
            r#"{"id":"1","author":{"username":"ada","global_name":"Ada","nick":"ada-mod","display_name":"Ada L"},"created_at":"2024-01-01T00:00:00Z","content":"a"}"#,
            "\n",
            r#"{"id":"2","author":{"username":"ada","global_name":"Ada","nick":"ada-mod"},"created_at":"2024-01-01T00:00:01Z","content":"b"}"#,
            "\n",
            r#"{"id":"3","author":{"username":"ada","global_name":"Ada","nick":""},"created_at":"2024-01-01T00:00:02Z","content":"c"}"#,
            "\n"
        );
        let path = dump(&dir, body).await;

        let mut source = JsonlSource::open(&path, "general", 10).await.unwrap();
        let page = source.next_page().await.unwrap().unwrap();
        let names: Vec<_> = page
            .iter()
            .map(|m| m.author.display_name.as_deref())
            .collect();
        assert_eq!(names, vec![Some("ada-mod"), Some("ada-mod"), Some("Ada")]);
    }

    #[tokio::test]
    async fn test_jsonl_malformed_line_reports_position() {
        let dir = TempDir::new().unwrap();
        let body = concat!(
            r#"{"id":"1","author":{"username":"a"},"created_at":"2024-01-01T00:00:00Z","content":"ok"}"#,
            "\n",
            r#"{"id":"2","author":{"username":"a"},"created_at":"not a time","content":"bad"}"#,
            "\n"
        );
        let path = dump(&dir, body).await;

        let mut source = JsonlSource::open(&path, "general", 10).await.unwrap();
        match source.next_page().await {
            Err(SourceError::Malformed { position, .. }) => assert_eq!(position, 2),
            other => panic!("expected malformed error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_dump_is_io_error() {
        let dir = TempDir::new().unwrap();
        let result = JsonlSource::open(&dir.path().join("absent.jsonl"), "general", 10).await;
        assert!(matches!(result, Err(SourceError::Io(_))));
    }

    #[tokio::test]
    async fn test_stream_source_stops_after_error() {
        let pages: Vec<Result<Vec<SourceMessage>, SourceError>> = vec![
            Ok(vec![]),
            Err(SourceError::Fetch("boom".to_string())),
            Ok(vec![]),
        ];
        let mut source = StreamSource::new("general", Box::pin(stream::iter(pages)));

        assert!(source.next_page().await.unwrap().is_some());
        assert!(source.next_page().await.is_err());
        assert!(source.next_page().await.unwrap().is_none());
    }
}
