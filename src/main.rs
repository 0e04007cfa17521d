pub mod cli;
pub mod config;
pub mod error;
pub mod gzip;
pub mod headers;
pub mod list;
pub mod meta;
pub mod sign;
pub mod sync;
#[cfg(test)]
mod testserver;
pub mod upload;
pub mod version;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::Args;
use crate::config::{Config, SyncOptions};
use crate::error::DeployError;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    init_tracing(args.verbose);

    match run(args).await {
        Ok(count) => println!("{count} files uploaded"),
        Err(err) => {
            match err.downcast_ref::<DeployError>() {
                Some(DeployError::BuildDirNotFound(path)) => {
                    eprintln!("The build folder {} does not exist", path.display())
                }
                _ => eprintln!("Failed with error:\n{err:?}"),
            }
            std::process::exit(1);
        }
    }
}

async fn run(args: Args) -> anyhow::Result<usize> {
    let config = Config::from_args(args)?;
    if !config.build_folder.is_dir() {
        return Err(DeployError::BuildDirNotFound(config.build_folder.clone()).into());
    }

    let version = version::resolve_build_version(&std::env::current_dir()?).await?;
    tracing::debug!("resolved build version {version}");
    version::write_version_manifest(&config.build_folder, &version).await?;

    let options = SyncOptions {
        path_prefix: config.remote_prefix(&version),
        exclude: config.exclude.clone(),
        gzip_extensions: config.gzip_extensions.clone(),
        cache_seconds: config.cache_seconds,
        concurrency: config.concurrency,
        headers_for_file: config::default_headers_for_file,
    };

    let entries = sync::sync(&config.build_folder, &config.target, &options).await?;
    Ok(entries.len())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();
}
