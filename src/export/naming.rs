//! Collision-free destination names for exports.

use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

const PREFIX: &str = "message_log_";
const EXTENSION: &str = ".csv";

/// Default file name for a channel export
pub fn base_file_name(channel_id: &str) -> String {
    format!("{PREFIX}{channel_id}{EXTENSION}")
}

fn suffixed_file_name(channel_id: &str, n: u64) -> String {
    format!("{PREFIX}{channel_id}_{n}{EXTENSION}")
}

/// Whether `channel_id` can be embedded in a file name.
///
/// Empty ids and ids containing path separators or NUL are rejected so a
/// destination always lands directly in the output directory.
pub fn is_valid_channel_id(channel_id: &str) -> bool {
    !channel_id.is_empty() && !channel_id.contains(['/', '\\', '\0'])
}

/// Whether `name` follows the export naming convention
fn is_export_artifact(name: &str) -> bool {
    name.len() > PREFIX.len() + EXTENSION.len() && name.starts_with(PREFIX) && name.ends_with(EXTENSION)
}

/// Count files in `dir` that look like exports
async fn count_export_artifacts(dir: &Path) -> io::Result<u64> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut count = 0;
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() && is_export_artifact(&entry.file_name().to_string_lossy()) {
            count += 1;
        }
    }
    Ok(count)
}

/// Resolve a destination in `base_dir` that does not overwrite an existing export.
///
/// `message_log_{channel_id}.csv` is used when free. Otherwise the suffix
/// starts at one more than the number of existing export files and is bumped
/// until the name is free. Nothing is created, so calling this twice without
/// writing in between returns the same path.
pub async fn resolve_path(base_dir: &Path, channel_id: &str) -> io::Result<PathBuf> {
    if !is_valid_channel_id(channel_id) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("channel id {channel_id:?} cannot be used in a file name"),
        ));
    }

    let candidate = base_dir.join(base_file_name(channel_id));
    if !tokio::fs::try_exists(&candidate).await? {
        return Ok(candidate);
    }

    let mut n = count_export_artifacts(base_dir).await? + 1;
    let mut candidate = base_dir.join(suffixed_file_name(channel_id, n));
    let first_choice = n;

    while tokio::fs::try_exists(&candidate).await? {
        n += 1;
        candidate = base_dir.join(suffixed_file_name(channel_id, n));
    }

    if n != first_choice {
        warn!(
            "Export name {} was taken, using suffix {} instead",
            suffixed_file_name(channel_id, first_choice),
            n
        );
    }
    debug!("Resolved export path: {}", candidate.display());
    Ok(candidate)
}
