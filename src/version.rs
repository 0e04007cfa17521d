//! Build version resolution and the `version.json` manifest.

use std::path::Path;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use tokio::process::Command;

use crate::error::DeployError;

#[derive(Serialize)]
struct VersionManifest<'a> {
    revision: &'a str,
    timestamp: String,
}

/// Resolve the build version from the repository at `dir`: `git describe`
/// first, the short commit hash as a fallback.
pub async fn resolve_build_version(dir: &Path) -> Result<String, DeployError> {
    match git(dir, &["describe"]).await {
        Ok(version) => Ok(version),
        Err(describe_err) => match git(dir, &["log", "-1", "--format=%h"]).await {
            Ok(sha) => Ok(sha),
            Err(log_err) => Err(DeployError::VersionResolution(format!(
                "git describe failed ({describe_err}); git log failed ({log_err})"
            ))),
        },
    }
}

/// Write `version.json` into the build folder so it is uploaded like any
/// other file.
pub async fn write_version_manifest(
    build_folder: &Path,
    revision: &str,
) -> Result<(), DeployError> {
    let manifest = VersionManifest {
        revision,
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    };
    let path = build_folder.join("version.json");
    let bytes = serde_json::to_vec(&manifest)
        .map_err(|err| DeployError::local_io(&path, std::io::Error::other(err)))?;
    tokio::fs::write(&path, bytes)
        .await
        .map_err(|err| DeployError::local_io(&path, err))
}

async fn git(dir: &Path, args: &[&str]) -> Result<String, String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .await
        .map_err(|err| err.to_string())?;
    if !output.status.success() {
        return Err(String::from_utf8_lossy(&output.stderr).trim().to_string());
    }
    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if stdout.is_empty() {
        return Err(format!("git {} produced no output", args.join(" ")));
    }
    Ok(stdout)
}
