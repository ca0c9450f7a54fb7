//! CSV destination writer
//!
//! The destination is created exclusively, so an existing export is never
//! overwritten. Rows are accumulated whole and only handed to the file in
//! row-aligned chunks; if the owning task is dropped mid-export the file
//! still ends on a complete row.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::error::ExportError;

use super::row::{CSV_HEADER, OutputRow};

/// Buffered bytes that trigger a write to the file
const FLUSH_THRESHOLD: usize = 64 * 1024;

/// Byte sink behind a [`CsvWriter`].
#[async_trait]
pub trait Destination: AsyncWrite + Unpin + Send {
    /// Make written bytes durable
    async fn sync(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[async_trait]
impl Destination for File {
    async fn sync(&mut self) -> io::Result<()> {
        self.sync_all().await
    }
}

/// Writer for one export artifact.
pub struct CsvWriter {
    /// Open destination; `None` once closed
    file: Option<Box<dyn Destination>>,
    /// Path to the output file
    path: PathBuf,
    /// Complete rows not yet handed to the file
    buffer: Vec<u8>,
    /// Number of data rows accepted
    written: u64,
}

impl CsvWriter {
    /// Create the destination and write the header row.
    ///
    /// Fails if the file already exists.
    pub async fn create(path: &Path) -> Result<Self, ExportError> {
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .await
            .map_err(|e| ExportError::io(path, e))?;

        debug!("Created CSV writer for: {}", path.display());
        Self::with_destination(path, Box::new(file)).await
    }

    /// Write the header row to an already opened destination.
    ///
    /// `path` names the destination in errors and is where
    /// [`file_size`](Self::file_size) looks.
    pub async fn with_destination(
        path: &Path,
        destination: Box<dyn Destination>,
    ) -> Result<Self, ExportError> {
        let mut writer = Self {
            file: Some(destination),
            path: path.to_path_buf(),
            buffer: Vec::with_capacity(FLUSH_THRESHOLD),
            written: 0,
        };
        writer.buffer.extend_from_slice(CSV_HEADER.as_bytes());
        writer.buffer.push(b'\n');
        writer.flush_buffer().await?;
        Ok(writer)
    }

    /// Append one data row.
    pub async fn write_row(&mut self, row: &OutputRow) -> Result<(), ExportError> {
        self.buffer.extend_from_slice(row.to_csv_line().as_bytes());
        self.written += 1;
        if self.buffer.len() >= FLUSH_THRESHOLD {
            self.flush_buffer().await?;
        }
        Ok(())
    }

    /// Flush everything and close the file. Safe to call more than once.
    pub async fn finalize(&mut self) -> Result<(), ExportError> {
        if self.file.is_none() {
            return Ok(());
        }
        self.flush_buffer().await?;
        if let Some(mut file) = self.file.take() {
            file.flush().await.map_err(|e| ExportError::io(&self.path, e))?;
            file.sync().await.map_err(|e| ExportError::io(&self.path, e))?;
        }
        debug!("Finalized CSV file: {} ({} rows)", self.path.display(), self.written);
        Ok(())
    }

    /// Size of the file on disk
    pub async fn file_size(&self) -> Result<u64, ExportError> {
        let metadata = tokio::fs::metadata(&self.path)
            .await
            .map_err(|e| ExportError::io(&self.path, e))?;
        Ok(metadata.len())
    }

    /// Data rows accepted so far
    pub fn rows_written(&self) -> u64 {
        self.written
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn flush_buffer(&mut self) -> Result<(), ExportError> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let file = match self.file.as_mut() {
            Some(f) => f,
            None => {
                return Err(ExportError::io(&self.path, io::Error::other("write after close")));
            }
        };
        let result = file.write_all(&self.buffer).await;
        if let Err(e) = result {
            // the handle is unusable after a failed write; close it now
            self.file = None;
            return Err(ExportError::io(&self.path, e));
        }
        self.buffer.clear();
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::testing::FailingDestination;
    use super::*;
    use crate::export::message::{Author, ExportOptions, MessageTimestamp, SourceMessage};
    use crate::export::row::project;
    use chrono::Utc;
    use tempfile::TempDir;

    fn row(id: u64, content: &str) -> OutputRow {
        let message = SourceMessage {
            id: id.to_string(),
            author: Author {
                username: "u".to_string(),
                display_name: None,
                is_bot: false,
            },
            created_at: MessageTimestamp::from(Utc::now()),
            content: content.to_string(),
            attachment_urls: vec![],
        };
        project("general", &message, &ExportOptions::default())
    }

    #[tokio::test]
    async fn test_header_written_on_create() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("message_log_1.csv");
        let mut writer = CsvWriter::create(&path).await.unwrap();
        writer.finalize().await.unwrap();

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(content, format!("{CSV_HEADER}\n"));
    }

    #[tokio::test]
    async fn test_rows_written_after_finalize() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("message_log_1.csv");
        let mut writer = CsvWriter::create(&path).await.unwrap();

        writer.write_row(&row(1, "Hello, world!")).await.unwrap();
        writer.write_row(&row(2, "plain")).await.unwrap();
        writer.finalize().await.unwrap();

        assert_eq!(writer.rows_written(), 2);
        let content = tokio::fs::read_to_string(&path).await.unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].contains("\"Hello, world!\""));
        assert!(writer.file_size().await.unwrap() > 0);
    }

    #[tokio::test]
    async fn test_existing_file_is_not_overwritten() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("message_log_1.csv");
        tokio::fs::write(&path, "keep me").await.unwrap();

        let err = CsvWriter::create(&path).await.err().unwrap();
        assert!(matches!(err, ExportError::Io { .. }));
        assert_eq!(tokio::fs::read_to_string(&path).await.unwrap(), "keep me");
    }

    #[tokio::test]
    async fn test_large_export_flushes_on_row_boundaries() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("message_log_1.csv");
        let mut writer = CsvWriter::create(&path).await.unwrap();

        let body = "x".repeat(1000);
        for id in 0..200 {
            writer.write_row(&row(id, &body)).await.unwrap();
        }
        // earlier rows were handed off; what is left is whole rows under the threshold
        assert!(writer.buffer.len() < FLUSH_THRESHOLD);
        assert!(writer.buffer.is_empty() || writer.buffer.ends_with(b"\n"));

        writer.finalize().await.unwrap();
        let content = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(content.lines().count(), 201);
    }

    #[tokio::test]
    async fn test_failed_write_closes_destination() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("message_log_1.csv");
        let destination = FailingDestination::create(&path, 2);
        let mut writer = CsvWriter::with_destination(&path, Box::new(destination))
            .await
            .unwrap();

        let body = "x".repeat(1000);
        let mut failure = None;
        for id in 0..200 {
            if let Err(e) = writer.write_row(&row(id, &body)).await {
                failure = Some(e);
                break;
            }
        }
        assert!(matches!(failure, Some(ExportError::Io { .. })));
        assert!(writer.file.is_none());
        writer.finalize().await.unwrap();

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(content.starts_with(CSV_HEADER));
        assert!(content.ends_with('\n'));
        assert!(content.lines().count() > 1);
    }

    #[tokio::test]
    async fn test_finalize_twice_is_harmless() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("message_log_1.csv");
        let mut writer = CsvWriter::create(&path).await.unwrap();
        writer.finalize().await.unwrap();
        writer.finalize().await.unwrap();
    }
}
