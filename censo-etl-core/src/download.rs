//! Fetching the yearly archive: HTTP streaming plus a bounded retry policy.

use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use serde::Serialize;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, error, info, warn};

use crate::archive::validate_archive;
use crate::contract::{DownloadedArchive, Fetcher};
use crate::error::{DownloadError, FetchError};

/// Size of the write buffer between the network stream and the archive file.
pub const CHUNK_SIZE: usize = 8 * 1024;

/// How many times a download is attempted and how long to wait in between.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub cooldown: Duration,
}

impl Default for RetryPolicy {
    /// One retry after a 100 second cooldown.
    fn default() -> Self {
        Self {
            max_attempts: 2,
            cooldown: Duration::from_secs(100),
        }
    }
}

impl RetryPolicy {
    /// A body cut short or a file that is not a valid archive may succeed on a
    /// second try; HTTP status, connection and local I/O failures will not.
    pub fn is_retryable(&self, error: &FetchError) -> bool {
        matches!(
            error,
            FetchError::Truncated { .. } | FetchError::InvalidArchive(_)
        )
    }

    /// Whether another attempt follows a failed `attempt` (1-based).
    pub fn should_retry(&self, attempt: u32, error: &FetchError) -> bool {
        attempt < self.max_attempts && self.is_retryable(error)
    }
}

/// [`Fetcher`] backed by a streaming reqwest client.
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, dest: &Path) -> Result<u64, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            error!(url = %url, status = %status, "Archive server returned error status");
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }
        let expected = response.content_length();
        debug!(url = %url, ?expected, path = %dest.display(), "Streaming archive to disk");

        let io_err = |source: std::io::Error| FetchError::Io {
            path: dest.to_path_buf(),
            source,
        };
        let file = tokio::fs::File::create(dest).await.map_err(io_err)?;
        let mut writer = BufWriter::with_capacity(CHUNK_SIZE, file);
        let mut stream = response.bytes_stream();
        let mut received: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| FetchError::Truncated {
                url: url.to_string(),
                received,
                reason: e.to_string(),
            })?;
            writer.write_all(&chunk).await.map_err(io_err)?;
            received += chunk.len() as u64;
        }
        writer.flush().await.map_err(io_err)?;

        if let Some(expected) = expected {
            if received < expected {
                return Err(FetchError::Truncated {
                    url: url.to_string(),
                    received,
                    reason: format!("expected {expected} bytes"),
                });
            }
        }
        Ok(received)
    }
}

/// Runs a [`Fetcher`] under a [`RetryPolicy`], validating every downloaded file.
pub struct Downloader<'a, F: Fetcher + ?Sized> {
    fetcher: &'a F,
    policy: RetryPolicy,
}

impl<'a, F: Fetcher + ?Sized> Downloader<'a, F> {
    pub fn new(fetcher: &'a F, policy: RetryPolicy) -> Self {
        Self { fetcher, policy }
    }

    /// Downloads `url` into `dest` (overwriting it) and checks the result is a valid archive.
    pub async fn download(&self, url: &str, dest: &Path) -> Result<DownloadedArchive, DownloadError> {
        info!(url = %url, path = %dest.display(), "Downloading");
        let mut attempt: u32 = 1;
        loop {
            match self.attempt(url, dest).await {
                Ok((bytes, entries)) => {
                    info!(url = %url, bytes, entries, attempt, "Download complete");
                    return Ok(DownloadedArchive {
                        url: url.to_string(),
                        path: dest.to_path_buf(),
                        bytes,
                        entries,
                        attempts: attempt,
                    });
                }
                Err(e) if self.policy.should_retry(attempt, &e) => {
                    warn!(
                        url = %url,
                        attempt,
                        error = %e,
                        cooldown_secs = self.policy.cooldown.as_secs(),
                        "Download attempt failed, retrying after cooldown"
                    );
                    tokio::time::sleep(self.policy.cooldown).await;
                    remove_partial(dest).await.map_err(|source| DownloadError {
                        url: url.to_string(),
                        attempts: attempt,
                        source,
                    })?;
                    attempt += 1;
                }
                Err(e) => {
                    error!(url = %url, attempt, error = %e, "Download failed");
                    return Err(DownloadError {
                        url: url.to_string(),
                        attempts: attempt,
                        source: e,
                    });
                }
            }
        }
    }

    async fn attempt(&self, url: &str, dest: &Path) -> Result<(u64, usize), FetchError> {
        let bytes = self.fetcher.fetch(url, dest).await?;
        let entries = validate_archive(dest)?;
        Ok((bytes, entries))
    }
}

async fn remove_partial(path: &Path) -> Result<(), FetchError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            debug!(path = %path.display(), "Removed partial archive");
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(source) => Err(FetchError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}
