//! Gzip compression stage.
//!
//! Eligible files are compressed into a temporary file before upload: the
//! PUT needs a `content-length` up front, so the compressed bytes have to be
//! fully materialized first.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufReader};

use flate2::Compression;
use flate2::write::GzEncoder;

use crate::error::DeployError;
use crate::headers;
use crate::meta::FileEntry;

/// A file is eligible when its relative path ends with one of the configured
/// suffixes. The match is a plain suffix match, not extension-aware.
pub fn should_gzip(extensions: &[String], relative_path: &str) -> bool {
    extensions.iter().any(|ext| relative_path.ends_with(ext.as_str()))
}

/// Compress the entry into a temp file when eligible, rewriting `local_path`
/// and adding `content-encoding: gzip`. Ineligible entries pass through
/// unchanged. flate2 does blocking I/O, so the work runs on the blocking
/// pool.
pub async fn gzip_if_needed(
    entry: FileEntry,
    extensions: &[String],
) -> Result<FileEntry, DeployError> {
    if !should_gzip(extensions, &entry.relative_path) {
        return Ok(entry);
    }

    tracing::debug!("gzip compressing \"{}\"", entry.relative_path);
    let original_path = entry.local_path.clone();
    tokio::task::spawn_blocking(move || gzip_entry(entry))
        .await
        .map_err(|err| DeployError::local_io(&original_path, io::Error::other(err)))?
}

fn gzip_entry(mut entry: FileEntry) -> Result<FileEntry, DeployError> {
    let source = File::open(&entry.local_path)
        .map_err(|err| DeployError::local_io(&entry.local_path, err))?;
    let mut reader = BufReader::new(source);

    let mut tmp = tempfile::NamedTempFile::new()
        .map_err(|err| DeployError::local_io(&entry.local_path, err))?;
    let mut encoder = GzEncoder::new(&mut tmp, Compression::default());
    io::copy(&mut reader, &mut encoder)
        .and_then(|_| encoder.finish().map(|_| ()))
        .map_err(|err| DeployError::local_io(&entry.local_path, err))?;

    let gzip_header = HashMap::from([("content-encoding".to_string(), "gzip".to_string())]);
    entry.headers = headers::compose(&[&entry.headers, &gzip_header]);

    let tmp_path = tmp.into_temp_path();
    entry.local_path = tmp_path.to_path_buf();
    entry.gzip_tmp = Some(tmp_path);
    Ok(entry)
}
