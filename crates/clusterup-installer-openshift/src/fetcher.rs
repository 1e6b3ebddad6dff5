//! Installer binary cache.
//!
//! Binaries live at `<binaries_dir>/<channel>/<version>/openshift-install`.
//! A cached binary is used as-is. A missing one is downloaded from the
//! configured URL template, or reported as missing configuration when no
//! template is set.

use async_trait::async_trait;
use clusterup_core::traits::BinaryFetcher;
use clusterup_core::{Error, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;

/// File name of the installer executable inside a version directory
pub const INSTALLER_BINARY: &str = "openshift-install";

const CONNECT_TIMEOUT_SECS: u64 = 10;
const DOWNLOAD_TIMEOUT_SECS: u64 = 600;

/// Resolves installer versions to cached executables
#[derive(Debug, Clone)]
pub struct CachedFetcher {
    binaries_dir: PathBuf,
    url_template: Option<String>,
    client: reqwest::Client,
}

impl CachedFetcher {
    pub fn new(binaries_dir: impl Into<PathBuf>, url_template: Option<String>) -> Self {
        Self {
            binaries_dir: binaries_dir.into(),
            url_template,
            client: reqwest::Client::builder()
                .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
                .timeout(Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
                .build()
                .unwrap_or_default(),
        }
    }

    /// Where `version` from `channel` is (or would be) cached
    pub fn cached_path(&self, version: &str, channel: &str) -> PathBuf {
        self.binaries_dir
            .join(channel)
            .join(version)
            .join(INSTALLER_BINARY)
    }

    fn download_url(template: &str, version: &str, channel: &str) -> String {
        template
            .replace("{version}", version)
            .replace("{channel}", channel)
    }

    async fn download(&self, url: &str, target: &Path) -> Result<()> {
        tracing::info!(url, target = %target.display(), "Downloading installer");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::http(format!("GET {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::http(format!("GET {} returned {}", url, status)));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::http(format!("Reading {} failed: {}", url, e)))?;

        let parent = target
            .parent()
            .ok_or_else(|| Error::invalid_input(format!("{} has no parent", target.display())))?;
        tokio::fs::create_dir_all(parent).await?;

        // Written under a temporary name so an interrupted download is never
        // mistaken for a cached binary.
        let partial = parent.join(format!(".{}.part", INSTALLER_BINARY));
        let mut file = tokio::fs::File::create(&partial).await?;
        file.write_all(&body).await?;
        file.flush().await?;
        drop(file);

        make_executable(&partial).await?;
        tokio::fs::rename(&partial, target).await?;

        tracing::info!(bytes = body.len(), target = %target.display(), "Installer cached");
        Ok(())
    }
}

#[cfg(unix)]
async fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).await?;
    Ok(())
}

#[cfg(not(unix))]
async fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}

#[async_trait]
impl BinaryFetcher for CachedFetcher {
    async fn fetch(&self, version: &str, channel: &str) -> Result<PathBuf> {
        let path = self.cached_path(version, channel);

        if tokio::fs::try_exists(&path).await? {
            tracing::debug!(version, channel, path = %path.display(), "Installer cache hit");
            return Ok(path);
        }

        let Some(template) = &self.url_template else {
            return Err(Error::config_missing(format!(
                "Installer {} ({}) is not cached at {} and settings.installer_url_template is not set",
                version,
                channel,
                path.display()
            )));
        };

        let url = Self::download_url(template, version, channel);
        self.download(&url, &path).await?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    /// Serve one canned HTTP response and return the request line
    async fn serve_once(status: &'static str, body: &'static [u8]) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let n = socket.read(&mut buf).await.unwrap();
            let request = String::from_utf8_lossy(&buf[..n]).to_string();

            let head = format!(
                "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                status,
                body.len()
            );
            socket.write_all(head.as_bytes()).await.unwrap();
            socket.write_all(body).await.unwrap();
            socket.shutdown().await.unwrap();

            request.lines().next().unwrap_or_default().to_string()
        });

        (base, handle)
    }

    #[test]
    fn test_cached_path_layout() {
        let fetcher = CachedFetcher::new("/var/cache/bin", None);
        assert_eq!(
            fetcher.cached_path("4.14.3", "stable"),
            PathBuf::from("/var/cache/bin/stable/4.14.3/openshift-install")
        );
    }

    #[test]
    fn test_download_url_substitution() {
        assert_eq!(
            CachedFetcher::download_url("https://mirror/{channel}/{version}/openshift-install", "4.14.3", "fast"),
            "https://mirror/fast/4.14.3/openshift-install"
        );
    }

    #[tokio::test]
    async fn test_cache_hit_skips_download() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = CachedFetcher::new(dir.path(), Some("http://127.0.0.1:9/{version}".to_string()));
        let cached = fetcher.cached_path("4.14.3", "stable");
        std::fs::create_dir_all(cached.parent().unwrap()).unwrap();
        std::fs::write(&cached, b"binary").unwrap();

        let path = fetcher.fetch("4.14.3", "stable").await.unwrap();
        assert_eq!(path, cached);
    }

    #[tokio::test]
    async fn test_missing_without_template_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = CachedFetcher::new(dir.path(), None);

        let err = fetcher.fetch("4.14.3", "stable").await.unwrap_err();
        assert!(matches!(err, Error::ConfigMissing(_)));
        assert!(err.to_string().contains("4.14.3"));
    }

    #[tokio::test]
    async fn test_download_populates_cache() {
        let dir = tempfile::tempdir().unwrap();
        let (base, server) = serve_once("200 OK", b"#!/bin/sh\nexit 0\n").await;
        let fetcher = CachedFetcher::new(dir.path(), Some(format!("{}/{{channel}}/{{version}}", base)));

        let path = fetcher.fetch("4.14.3", "stable").await.unwrap();

        assert_eq!(server.await.unwrap(), "GET /stable/4.14.3 HTTP/1.1");
        assert_eq!(path, fetcher.cached_path("4.14.3", "stable"));
        assert_eq!(std::fs::read(&path).unwrap(), b"#!/bin/sh\nexit 0\n");
        assert!(!path.with_file_name(".openshift-install.part").exists());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o755);
        }
    }

    #[tokio::test]
    async fn test_download_error_status() {
        let dir = tempfile::tempdir().unwrap();
        let (base, server) = serve_once("404 Not Found", b"").await;
        let fetcher = CachedFetcher::new(dir.path(), Some(format!("{}/{{version}}", base)));

        let err = fetcher.fetch("9.9.9", "stable").await.unwrap_err();
        server.await.unwrap();

        assert!(matches!(err, Error::Http(_)));
        assert!(!fetcher.cached_path("9.9.9", "stable").exists());
    }
}
