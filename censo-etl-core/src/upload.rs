#![doc = "Uploading extracted tabular files to an object store under `censo-escolar/{year}/`."]
//
//! # Upload stage
//!
//! The store is any `object_store::ObjectStore` already bound to the
//! destination bucket: Google Cloud Storage in production (built by the CLI
//! crate from the service-account credentials path), `InMemory` in tests.
//!
//! - Tabular files are found by walking every `*{year}/DADOS` directory.
//! - Keys are derived from the path relative to `DADOS`, lowercased, with the
//!   extension normalised to `.csv`.
//! - Small files go up in a single put; larger ones are streamed with a
//!   multipart upload so multi-gigabyte tables are never held in memory.
//!   Writing to an existing key replaces it.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, PutPayload, WriteMultipart};
use tokio::io::AsyncReadExt;
use tracing::{debug, error, info, warn};

use crate::contract::{UploadReport, UploadedObject};
use crate::error::UploadError;
use crate::extract::find_data_dirs;

/// Fixed prefix of every uploaded key.
pub const KEY_PREFIX: &str = "censo-escolar";
pub const TABULAR_EXTENSION: &str = "csv";

const READ_CHUNK_SIZE: usize = 8 * 1024 * 1024;
const MAX_CONCURRENT_PARTS: usize = 1;

/// Whether `path` carries the tabular extension, in any case.
pub fn is_tabular(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(TABULAR_EXTENSION))
}

/// Object key for a tabular file found under `data_dir`.
///
/// `.../DADOS/Escola_2020.CSV` becomes `censo-escolar/2020/escola_2020.csv`;
/// files in subdirectories keep their relative path.
pub fn object_key(year: i32, data_dir: &Path, file: &Path) -> Option<String> {
    let relative = file.strip_prefix(data_dir).ok()?;
    let stem = relative.with_extension("");
    let segments: Vec<String> = stem
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_lowercase())
        .collect();
    if segments.is_empty() {
        return None;
    }
    Some(format!(
        "{KEY_PREFIX}/{year}/{}.{TABULAR_EXTENSION}",
        segments.join("/")
    ))
}

/// Every tabular file below `data_dir`, recursively, sorted.
pub fn collect_tabular_files(data_dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    fn visit_dir(dir: &Path, results: &mut Vec<PathBuf>) -> std::io::Result<()> {
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_dir() {
                visit_dir(&path, results)?;
            } else if path.is_file() && is_tabular(&path) {
                results.push(path);
            }
        }
        Ok(())
    }

    let mut results = Vec::new();
    visit_dir(data_dir, &mut results)?;
    results.sort();
    Ok(results)
}

pub struct Uploader {
    store: Arc<dyn ObjectStore>,
    bucket: String,
}

impl Uploader {
    /// `store` must already point at `bucket`; the name is used for checks and logs.
    pub fn new(store: Arc<dyn ObjectStore>, bucket: impl Into<String>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
        }
    }

    /// Uploads every tabular file of the extracted tree for `year`.
    /// The first failure aborts the remaining uploads.
    pub async fn upload(&self, year: i32, work_dir: &Path) -> Result<UploadReport, UploadError> {
        info!(bucket = %self.bucket, year, "Uploading files");
        self.ensure_bucket(year).await?;

        let data_dirs = find_data_dirs(work_dir, year).map_err(|source| UploadError::Scan {
            path: work_dir.to_path_buf(),
            source,
        })?;

        let mut uploaded = Vec::new();
        for data_dir in &data_dirs {
            let files = collect_tabular_files(data_dir).map_err(|source| UploadError::Scan {
                path: data_dir.clone(),
                source,
            })?;
            for file in files {
                let Some(key) = object_key(year, data_dir, &file) else {
                    continue;
                };
                info!("Uploading: gs://{}/{}", self.bucket, key);
                let size = self.upload_file(&file, &key).await?;
                uploaded.push(UploadedObject {
                    source: file,
                    key,
                    size,
                });
            }
        }

        info!(bucket = %self.bucket, count = uploaded.len(), "Upload complete");
        Ok(UploadReport {
            bucket: self.bucket.clone(),
            uploaded,
        })
    }

    /// Lists the year prefix once so a missing bucket or bad credentials fail before any write.
    async fn ensure_bucket(&self, year: i32) -> Result<(), UploadError> {
        let prefix = ObjectPath::from(format!("{KEY_PREFIX}/{year}"));
        match self.store.list_with_delimiter(Some(&prefix)).await {
            Ok(listing) => {
                debug!(
                    bucket = %self.bucket,
                    existing = listing.objects.len(),
                    "Bucket reachable"
                );
                Ok(())
            }
            Err(source) => {
                error!(bucket = %self.bucket, error = %source, "Bucket lookup failed");
                Err(UploadError::Bucket {
                    bucket: self.bucket.clone(),
                    source,
                })
            }
        }
    }

    async fn upload_file(&self, file: &Path, key: &str) -> Result<u64, UploadError> {
        let read_err = |source| UploadError::Read {
            path: file.to_path_buf(),
            source,
        };
        let object_err = |source| UploadError::Object {
            key: key.to_string(),
            source,
        };

        let location = ObjectPath::from(key);
        let mut reader = tokio::fs::File::open(file).await.map_err(read_err)?;
        let len = reader.metadata().await.map_err(read_err)?.len();

        if len <= READ_CHUNK_SIZE as u64 {
            let mut content = Vec::with_capacity(len as usize);
            reader.read_to_end(&mut content).await.map_err(read_err)?;
            let size = content.len() as u64;
            self.store
                .put(&location, PutPayload::from(content))
                .await
                .map_err(object_err)?;
            debug!(key = %key, size, "Uploaded object");
            return Ok(size);
        }

        let upload = self
            .store
            .put_multipart(&location)
            .await
            .map_err(object_err)?;
        let mut writer = WriteMultipart::new(upload);

        let mut buf = vec![0u8; READ_CHUNK_SIZE];
        let mut size: u64 = 0;
        loop {
            let n = match reader.read(&mut buf).await {
                Ok(n) => n,
                Err(e) => {
                    abort_multipart(writer, key).await;
                    return Err(read_err(e));
                }
            };
            if n == 0 {
                break;
            }
            if let Err(e) = writer.wait_for_capacity(MAX_CONCURRENT_PARTS).await {
                error!(key = %key, error = %e, "Part upload failed");
                abort_multipart(writer, key).await;
                return Err(object_err(e));
            }
            writer.write(&buf[..n]);
            size += n as u64;
        }
        writer.finish().await.map_err(|e| {
            error!(key = %key, error = %e, "Upload failed");
            object_err(e)
        })?;
        debug!(key = %key, size, "Uploaded object");
        Ok(size)
    }
}

/// Aborts an unfinished multipart upload so no orphaned parts stay behind.
async fn abort_multipart(writer: WriteMultipart, key: &str) {
    if let Err(e) = writer.abort().await {
        warn!(key = %key, error = %e, "Failed to abort multipart upload");
    }
}
