//! Sync orchestration: list → derive metadata → compress → upload.

use std::path::Path;

use futures::stream::{self, StreamExt, TryStreamExt};

use crate::config::{RemoteTarget, SyncOptions};
use crate::error::DeployError;
use crate::gzip;
use crate::list;
use crate::meta::{self, FileEntry};
use crate::upload::Uploader;

/// Push every file under `root` to the remote target and return the
/// processed entries.
///
/// Stages have a hard barrier per file (a file is fully compressed before
/// its upload starts) while files fan out concurrently within each stage,
/// bounded by `options.concurrency`. The first error aborts the run;
/// uploads that already completed stay in the bucket.
pub async fn sync(
    root: &Path,
    target: &RemoteTarget,
    options: &SyncOptions,
) -> Result<Vec<FileEntry>, DeployError> {
    let path_prefix = normalize_prefix(&options.path_prefix);
    let concurrency = options.concurrency.max(1);

    let files = list::list_files(root, &options.exclude)?;
    tracing::info!("deploying {} files from {}", files.len(), root.display());

    let entries: Vec<FileEntry> = files
        .into_iter()
        .map(|relative| meta::derive_entry(root, relative))
        .collect();

    let entries: Vec<FileEntry> = stream::iter(
        entries
            .into_iter()
            .map(|entry| gzip::gzip_if_needed(entry, &options.gzip_extensions)),
    )
    .buffer_unordered(concurrency)
    .try_collect()
    .await?;

    let uploader = Uploader::new(target.clone(), options)?;
    stream::iter(
        entries
            .iter()
            .map(|entry| uploader.upload(entry, &path_prefix)),
    )
    .buffer_unordered(concurrency)
    .try_collect::<Vec<()>>()
    .await?;

    Ok(entries)
}

/// A non-empty prefix always ends with `/` so keys never glue the prefix to
/// the first path segment.
fn normalize_prefix(prefix: &str) -> String {
    if prefix.is_empty() || prefix.ends_with('/') {
        prefix.to_string()
    } else {
        format!("{prefix}/")
    }
}
