use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Everything that can abort a deploy run.
#[derive(Error, Debug)]
pub enum DeployError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("The build folder {} does not exist", .0.display())]
    BuildDirNotFound(PathBuf),

    #[error("I/O error on {}: {source}", path.display())]
    LocalIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to upload \"{key}\", status {status}: {body}")]
    Upload {
        key: String,
        status: u16,
        body: String,
    },

    #[error("Network error while uploading \"{key}\": {source}")]
    Transport {
        key: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Too many redirects while uploading \"{key}\" ({hops} hops)")]
    TooManyRedirects { key: String, hops: usize },

    #[error("Failed to resolve build version: {0}")]
    VersionResolution(String),
}

impl DeployError {
    pub(crate) fn local_io(path: impl AsRef<Path>, source: io::Error) -> Self {
        DeployError::LocalIo {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}
