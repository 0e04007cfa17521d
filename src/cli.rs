use std::path::PathBuf;

use clap::Parser;

use crate::config::THIRTY_DAYS_IN_SECONDS;

#[derive(Parser, Debug)]
#[command(
    name = "s3push",
    version,
    about = "Deploy a local build folder to an S3-compatible bucket"
)]
pub struct Args {
    /// Build folder to upload
    #[arg(value_name = "BUILD_FOLDER")]
    pub build_folder: PathBuf,

    /// Target bucket name
    #[arg(long, env = "AWS_BUCKET")]
    pub bucket: Option<String>,

    /// Access key id
    #[arg(long, env = "AWS_ACCESS_KEY", hide_env_values = true)]
    pub access_key: Option<String>,

    /// Secret access key
    #[arg(long, env = "AWS_SECRET_KEY", hide_env_values = true)]
    pub secret_key: Option<String>,

    /// Signing region
    #[arg(long, env = "AWS_REGION", default_value = "us-east-1")]
    pub region: String,

    /// Storage endpoint host, or a full base URL when --path-style is set
    #[arg(long, env = "AWS_ENDPOINT", default_value = "s3.amazonaws.com")]
    pub endpoint: String,

    /// Use path-style object URLs ({endpoint}/{bucket}/{key})
    #[arg(long, env = "AWS_PATH_STYLE")]
    pub path_style: bool,

    /// Folder inside the bucket to upload into
    #[arg(long, env = "AWS_BUCKET_FOLDER")]
    pub bucket_folder: Option<String>,

    /// Append the resolved build version to the remote path
    #[arg(long, env = "AWS_ADD_VERSION_TO_PATH")]
    pub add_version_to_path: bool,

    /// Prefix joined to the version path segment with a dash
    #[arg(long, env = "AWS_VERSION_PREFIX")]
    pub version_prefix: Option<String>,

    /// Comma-separated suffixes of files to gzip before upload
    #[arg(long, env = "AWS_GZIP_EXTENSIONS", value_delimiter = ',')]
    pub gzip_extensions: Vec<String>,

    /// Comma-separated substrings excluded from upload
    #[arg(long, env = "AWS_EXCLUDE", value_delimiter = ',')]
    pub exclude: Vec<String>,

    /// Default cache-control max-age in seconds
    #[arg(long, default_value_t = THIRTY_DAYS_IN_SECONDS)]
    pub cache_seconds: u64,

    /// Maximum concurrent compressions and uploads
    #[arg(long, default_value_t = 8)]
    pub concurrency: usize,

    /// Turn verbose logging on
    #[arg(short, long)]
    pub verbose: bool,
}
