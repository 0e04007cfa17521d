//! Deploy configuration.
//!
//! Everything the pipeline needs is collected here once, at the boundary,
//! from parsed CLI/environment arguments. The pipeline itself never reads
//! ambient environment state.

use std::collections::HashMap;
use std::path::PathBuf;

use reqwest::Url;

use crate::cli::Args;
use crate::error::DeployError;
use crate::sign;

pub const THIRTY_DAYS_IN_SECONDS: u64 = 30 * 24 * 3600;

/// Supplies extra headers for a single file, keyed by its relative path.
pub type HeaderPolicy = fn(&str) -> HashMap<String, String>;

/// Per-run sync settings, immutable for the duration of a run.
pub struct SyncOptions {
    /// Remote "folder" every key is placed under. Normalized to end with `/`
    /// when non-empty.
    pub path_prefix: String,
    /// Substrings that exclude a relative path from upload.
    pub exclude: Vec<String>,
    /// Suffixes of files to gzip before upload.
    pub gzip_extensions: Vec<String>,
    /// Default `cache-control: max-age=<seconds>`.
    pub cache_seconds: u64,
    /// Fan-out bound for compression and upload.
    pub concurrency: usize,
    pub headers_for_file: HeaderPolicy,
}

/// The bucket a run uploads into.
#[derive(Debug, Clone)]
pub struct RemoteTarget {
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    /// Endpoint host for virtual-hosted URLs, or a full base URL when
    /// `path_style` is set (local stubs, S3-compatible stores).
    endpoint: String,
    path_style: bool,
}

impl RemoteTarget {
    pub fn new(
        bucket: impl Into<String>,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
        region: impl Into<String>,
        endpoint: impl Into<String>,
        path_style: bool,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            region: region.into(),
            endpoint: endpoint.into(),
            path_style,
        }
    }

    /// Absolute URL for one object key.
    pub fn object_url(&self, key: &str) -> Result<Url, DeployError> {
        let encoded = sign::uri_encode(key, false);
        let raw = if self.path_style {
            format!(
                "{}/{}/{encoded}",
                self.endpoint.trim_end_matches('/'),
                self.bucket
            )
        } else {
            format!("https://{}.{}/{encoded}", self.bucket, self.endpoint)
        };
        Url::parse(&raw)
            .map_err(|err| DeployError::Config(format!("invalid object url \"{raw}\": {err}")))
    }
}

/// Validated configuration for one deploy invocation.
#[derive(Debug)]
pub struct Config {
    pub build_folder: PathBuf,
    pub target: RemoteTarget,
    pub bucket_folder: Option<String>,
    pub add_version_to_path: bool,
    pub version_prefix: Option<String>,
    pub gzip_extensions: Vec<String>,
    pub exclude: Vec<String>,
    pub cache_seconds: u64,
    pub concurrency: usize,
}

impl Config {
    /// Validate parsed arguments, reporting every missing credential at once.
    pub fn from_args(args: Args) -> Result<Self, DeployError> {
        let mut missing = Vec::new();
        if args.bucket.is_none() {
            missing.push("AWS_BUCKET");
        }
        if args.access_key.is_none() {
            missing.push("AWS_ACCESS_KEY");
        }
        if args.secret_key.is_none() {
            missing.push("AWS_SECRET_KEY");
        }
        if !missing.is_empty() {
            return Err(DeployError::Config(format!(
                "missing required settings: {} (set them as environment variables or flags)",
                missing.join(", ")
            )));
        }

        let target = RemoteTarget::new(
            args.bucket.unwrap_or_default(),
            args.access_key.unwrap_or_default(),
            args.secret_key.unwrap_or_default(),
            args.region,
            args.endpoint,
            args.path_style,
        );

        Ok(Self {
            build_folder: args.build_folder,
            target,
            bucket_folder: args.bucket_folder,
            add_version_to_path: args.add_version_to_path,
            version_prefix: args.version_prefix,
            gzip_extensions: args.gzip_extensions,
            exclude: args.exclude,
            cache_seconds: args.cache_seconds,
            concurrency: args.concurrency,
        })
    }

    /// Remote key prefix: `[<bucket-folder>/][<prefix>-]<version>/`, each
    /// present segment terminated with `/`.
    pub fn remote_prefix(&self, version: &str) -> String {
        let mut prefix = String::new();
        if let Some(folder) = self.bucket_folder.as_deref().filter(|f| !f.is_empty()) {
            prefix.push_str(folder);
            if !prefix.ends_with('/') {
                prefix.push('/');
            }
        }
        if self.add_version_to_path {
            match self.version_prefix.as_deref() {
                Some(vp) => prefix.push_str(&format!("{vp}-{version}")),
                None => prefix.push_str(version),
            }
            prefix.push('/');
        }
        prefix
    }
}

/// Built-in per-file header policy: everything is publicly readable, and
/// entry points (`index.html`, `*.json`) must always be revalidated.
pub fn default_headers_for_file(relative_path: &str) -> HashMap<String, String> {
    let mut headers = HashMap::from([("x-amz-acl".to_string(), "public-read".to_string())]);
    if relative_path.contains("index.html") || relative_path.ends_with(".json") {
        headers.insert("cache-control".to_string(), "max-age=0".to_string());
    }
    headers
}
