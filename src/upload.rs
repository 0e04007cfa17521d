//! Authenticated PUT of one file to the remote bucket.

use std::collections::HashMap;
use std::path::Path;

use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, LOCATION};
use reqwest::{Body, Response, StatusCode, Url};
use tokio_util::io::ReaderStream;

use crate::config::{HeaderPolicy, RemoteTarget, SyncOptions};
use crate::error::DeployError;
use crate::headers;
use crate::meta::FileEntry;
use crate::sign;

/// Hop limit for temporary redirects. S3 is only ever observed to redirect
/// once, the bound guards against a misbehaving endpoint.
pub const MAX_REDIRECT_HOPS: usize = 5;

pub struct Uploader {
    client: reqwest::Client,
    target: RemoteTarget,
    cache_seconds: u64,
    headers_for_file: HeaderPolicy,
}

impl Uploader {
    pub fn new(target: RemoteTarget, options: &SyncOptions) -> Result<Self, DeployError> {
        // 307s are handled manually; the client must not follow redirects on
        // its own (it could not replay a streamed body anyway).
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|err| DeployError::Config(format!("failed to build http client: {err}")))?;
        Ok(Self {
            client,
            target,
            cache_seconds: options.cache_seconds,
            headers_for_file: options.headers_for_file,
        })
    }

    /// Upload one entry to `<path_prefix><relative_path>`, composing the
    /// computed, derived and caller-supplied header layers and following
    /// temporary redirects up to [`MAX_REDIRECT_HOPS`].
    pub async fn upload(&self, entry: &FileEntry, path_prefix: &str) -> Result<(), DeployError> {
        let metadata = tokio::fs::metadata(&entry.local_path)
            .await
            .map_err(|err| DeployError::local_io(&entry.local_path, err))?;

        let computed = HashMap::from([
            ("content-length".to_string(), metadata.len().to_string()),
            (
                "cache-control".to_string(),
                format!("max-age={}", self.cache_seconds),
            ),
        ]);
        let user = (self.headers_for_file)(&entry.relative_path);
        let composed = headers::compose(&[&computed, &entry.headers, &user]);

        let key = format!("{path_prefix}{}", entry.relative_path);
        let mut url = self.target.object_url(&key)?;

        tracing::debug!("uploading \"{}\"", entry.relative_path);
        for _hop in 0..MAX_REDIRECT_HOPS {
            let response = self
                .put_once(&url, &composed, &entry.local_path, &key)
                .await?;
            let status = response.status();

            if status == StatusCode::TEMPORARY_REDIRECT {
                let location = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|value| value.to_str().ok())
                    .ok_or_else(|| DeployError::Upload {
                        key: key.clone(),
                        status: status.as_u16(),
                        body: "307 response without a location header".to_string(),
                    })?;
                tracing::debug!(
                    "redirected to {location} while uploading \"{}\"",
                    entry.relative_path
                );
                url = location.parse().map_err(|err| DeployError::Upload {
                    key: key.clone(),
                    status: status.as_u16(),
                    body: format!("invalid redirect location \"{location}\": {err}"),
                })?;
                continue;
            }

            if status.as_u16() >= 300 {
                let body = response.text().await.unwrap_or_default();
                return Err(DeployError::Upload {
                    key,
                    status: status.as_u16(),
                    body,
                });
            }

            tracing::debug!("done uploading \"{}\"", entry.relative_path);
            return Ok(());
        }

        Err(DeployError::TooManyRedirects {
            key,
            hops: MAX_REDIRECT_HOPS,
        })
    }

    /// One signed PUT attempt. The body streams from disk, and the request
    /// is re-signed for whichever host `url` currently points at.
    async fn put_once(
        &self,
        url: &Url,
        composed: &HashMap<String, String>,
        local_path: &Path,
        key: &str,
    ) -> Result<Response, DeployError> {
        let mut header_map = HeaderMap::new();
        for (name, value) in composed {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|err| {
                DeployError::Config(format!("invalid header name \"{name}\": {err}"))
            })?;
            let value = HeaderValue::from_str(value).map_err(|err| {
                DeployError::Config(format!("invalid value for header {name}: {err}"))
            })?;
            header_map.insert(name, value);
        }
        sign::sign_request(
            "PUT",
            url,
            &mut header_map,
            &self.target.access_key,
            &self.target.secret_key,
            &self.target.region,
            Utc::now(),
        )?;

        let file = tokio::fs::File::open(local_path)
            .await
            .map_err(|err| DeployError::local_io(local_path, err))?;
        let body = Body::wrap_stream(ReaderStream::new(file));

        self.client
            .put(url.clone())
            .headers(header_map)
            .body(body)
            .send()
            .await
            .map_err(|source| DeployError::Transport {
                key: key.to_string(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::config::{self, RemoteTarget};
    use crate::meta;
    use crate::testserver::StubStore;

    fn options() -> SyncOptions {
        SyncOptions {
            path_prefix: String::new(),
            exclude: Vec::new(),
            gzip_extensions: Vec::new(),
            cache_seconds: 2_592_000,
            concurrency: 4,
            headers_for_file: config::default_headers_for_file,
        }
    }

    fn target_for(stub: &StubStore) -> RemoteTarget {
        RemoteTarget::new("test-bucket", "AKID", "SECRET", "us-east-1", stub.endpoint(), true)
    }

    #[tokio::test]
    async fn composes_header_layers_and_streams_the_body() {
        let stub = StubStore::spawn().await;
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("static")).unwrap();
        let content = b"body { margin: 0; }".to_vec();
        fs::write(dir.path().join("static/app.css"), &content).unwrap();

        let uploader = Uploader::new(target_for(&stub), &options()).unwrap();
        let entry = meta::derive_entry(dir.path(), "static/app.css".to_string());
        uploader.upload(&entry, "site/").await.unwrap();

        let puts = stub.puts();
        assert_eq!(puts.len(), 1);
        let put = &puts[0];
        assert_eq!(put.path, "/test-bucket/site/static/app.css");
        assert_eq!(put.body, content);
        assert_eq!(put.headers.get("cache-control").unwrap(), "max-age=2592000");
        assert_eq!(
            put.headers.get("content-type").unwrap(),
            "text/css; charset=utf-8"
        );
        assert_eq!(put.headers.get("x-amz-acl").unwrap(), "public-read");
        assert_eq!(
            put.headers.get("content-length").unwrap(),
            &content.len().to_string()
        );
        assert_eq!(
            put.headers.get("x-amz-content-sha256").unwrap(),
            sign::UNSIGNED_PAYLOAD
        );
        assert!(
            put.headers
                .get("authorization")
                .unwrap()
                .starts_with("AWS4-HMAC-SHA256 Credential=AKID/")
        );
    }

    #[tokio::test]
    async fn caller_policy_overrides_the_computed_cache_header() {
        let stub = StubStore::spawn().await;
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("index.html"), b"<html></html>").unwrap();

        let uploader = Uploader::new(target_for(&stub), &options()).unwrap();
        let entry = meta::derive_entry(dir.path(), "index.html".to_string());
        uploader.upload(&entry, "").await.unwrap();

        let puts = stub.puts();
        assert_eq!(puts[0].headers.get("cache-control").unwrap(), "max-age=0");
    }

    #[tokio::test]
    async fn follows_a_temporary_redirect_exactly_once() {
        let stub = StubStore::spawn().await;
        let dir = tempfile::tempdir().unwrap();
        let content = b"console.log(1);".to_vec();
        fs::write(dir.path().join("app.js"), &content).unwrap();

        let uploader = Uploader::new(target_for(&stub), &options()).unwrap();
        let entry = meta::derive_entry(dir.path(), "app.js".to_string());
        uploader.upload(&entry, "hot/").await.unwrap();

        let puts = stub.puts();
        assert_eq!(puts.len(), 2);
        assert_eq!(puts[0].path, "/test-bucket/hot/app.js");
        assert_eq!(puts[1].path, "/test-bucket/landed/app.js");
        assert_eq!(puts[1].body, content);
        assert_eq!(
            puts[0].headers.get("cache-control"),
            puts[1].headers.get("cache-control")
        );
        assert_eq!(
            puts[0].headers.get("content-type"),
            puts[1].headers.get("content-type")
        );
    }

    #[tokio::test]
    async fn terminal_error_status_carries_the_response_body() {
        let stub = StubStore::spawn().await;
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("app.js"), b"x").unwrap();

        let uploader = Uploader::new(target_for(&stub), &options()).unwrap();
        let entry = meta::derive_entry(dir.path(), "app.js".to_string());
        match uploader.upload(&entry, "boom/").await {
            Err(DeployError::Upload { key, status, body }) => {
                assert_eq!(key, "boom/app.js");
                assert_eq!(status, 500);
                assert_eq!(body, "kaboom");
            }
            other => panic!("expected Upload error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn redirect_loops_are_bounded() {
        let stub = StubStore::spawn().await;
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("app.js"), b"x").unwrap();

        let uploader = Uploader::new(target_for(&stub), &options()).unwrap();
        let entry = meta::derive_entry(dir.path(), "app.js".to_string());
        match uploader.upload(&entry, "loop/").await {
            Err(DeployError::TooManyRedirects { key, hops }) => {
                assert_eq!(key, "loop/app.js");
                assert_eq!(hops, MAX_REDIRECT_HOPS);
            }
            other => panic!("expected TooManyRedirects, got {other:?}"),
        }
        assert_eq!(stub.puts().len(), MAX_REDIRECT_HOPS);
    }

    #[tokio::test]
    async fn missing_local_file_is_a_local_io_error() {
        let stub = StubStore::spawn().await;
        let dir = tempfile::tempdir().unwrap();
        let uploader = Uploader::new(target_for(&stub), &options()).unwrap();
        let entry = meta::derive_entry(dir.path(), "gone.txt".to_string());
        match uploader.upload(&entry, "").await {
            Err(DeployError::LocalIo { path, .. }) => {
                assert_eq!(path, dir.path().join("gone.txt"))
            }
            other => panic!("expected LocalIo, got {other:?}"),
        }
        assert!(stub.puts().is_empty());
    }
}
