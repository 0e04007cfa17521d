//! Per-file upload metadata.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tempfile::TempPath;

/// One file moving through the deploy pipeline.
///
/// `local_path` points at the bytes that will actually be uploaded; the gzip
/// stage redirects it to a temporary compressed copy and keeps that file
/// alive through `gzip_tmp` until the entry is dropped.
#[derive(Debug)]
pub struct FileEntry {
    pub relative_path: String,
    pub local_path: PathBuf,
    pub headers: HashMap<String, String>,
    pub(crate) gzip_tmp: Option<TempPath>,
}

/// Build the initial entry for one enumerated file: resolve its content type
/// from the file extension and point `local_path` into the build folder.
pub fn derive_entry(root: &Path, relative_path: String) -> FileEntry {
    let mut headers = HashMap::new();
    match content_type_for(&relative_path) {
        Some(content_type) => {
            headers.insert("content-type".to_string(), content_type);
        }
        None => tracing::warn!("could not determine content type for \"{relative_path}\""),
    }

    FileEntry {
        local_path: root.join(&relative_path),
        relative_path,
        headers,
        gzip_tmp: None,
    }
}

fn content_type_for(relative_path: &str) -> Option<String> {
    // Webpack commonly emits `*.LICENSE` files next to bundles; the standard
    // table has no mapping for them.
    let is_license = Path::new(relative_path)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("license"));

    let mime = if is_license {
        "text/plain".to_string()
    } else {
        mime_guess::from_path(relative_path).first_raw()?.to_string()
    };

    Some(add_charset(mime))
}

/// Text-like types are served as UTF-8.
fn add_charset(mime: String) -> String {
    if mime.starts_with("text/")
        || mime == "application/json"
        || mime == "application/javascript"
    {
        format!("{mime}; charset=utf-8")
    } else {
        mime
    }
}
