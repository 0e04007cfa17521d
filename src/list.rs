//! File enumeration for the build folder.

use std::path::Path;

use walkdir::WalkDir;

use crate::error::DeployError;

/// Walk `root` recursively and return every regular file as a `/`-separated
/// path relative to `root`. A path is dropped when it contains any entry of
/// `exclude` as a substring. The order of the result is unspecified.
pub fn list_files(root: &Path, exclude: &[String]) -> Result<Vec<String>, DeployError> {
    if !root.is_dir() {
        return Err(DeployError::BuildDirNotFound(root.to_path_buf()));
    }

    let mut files = Vec::new();
    for entry_result in WalkDir::new(root).follow_links(false) {
        let entry = match entry_result {
            Ok(entry) => entry,
            Err(err) => {
                let path = err
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| root.to_path_buf());
                return Err(DeployError::LocalIo {
                    path,
                    source: err.into(),
                });
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(root)
            .expect("walkdir entries live under the walk root")
            .components()
            .map(|component| component.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        if exclude.iter().any(|pattern| relative.contains(pattern.as_str())) {
            tracing::debug!("excluding \"{relative}\"");
            continue;
        }

        files.push(relative);
    }

    Ok(files)
}
