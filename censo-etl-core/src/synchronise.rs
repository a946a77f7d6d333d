//! High-level pipeline: orchestrates download → extract → upload for one year.
//!
//! # Responsibilities
//! - Resolve the source URL first, so an unmapped year fails before any I/O
//! - Download `{year}.zip` into the working directory under the configured [`RetryPolicy`](crate::download::RetryPolicy)
//! - Expand it with the [`Extractor`], including nested archives in `DADOS`
//! - Upload every tabular file through the [`Uploader`]
//!
//! Every stage is all-or-nothing: the first error is logged and returned, and
//! later stages do not run. Stages only hand each other files on disk.
//!
//! # Callable From
//! - The CLI crate, with an `HttpFetcher` and a Google Cloud Storage store
//! - Integration tests, with `MockFetcher` and an in-memory store

use tracing::{debug, error, info};

use crate::config::PipelineConfig;
use crate::contract::{Fetcher, SynchroniseReport};
use crate::download::Downloader;
use crate::error::EtlError;
use crate::extract::Extractor;
use crate::source::source_url;
use crate::upload::Uploader;

pub async fn synchronise<F>(
    config: &PipelineConfig,
    fetcher: &F,
    extractor: &Extractor,
    uploader: &Uploader,
) -> Result<SynchroniseReport, EtlError>
where
    F: Fetcher + ?Sized,
{
    info!(year = config.year, bucket = %config.bucket, "[SYNC] Starting pipeline");
    let url = source_url(config.year)?;

    // --- Step 1: Download ---
    let archive_path = config.archive_path();
    let archive = Downloader::new(fetcher, config.retry.clone())
        .download(&url, &archive_path)
        .await
        .map_err(|e| {
            error!(error = %e, "[SYNC][ERROR] Download failed");
            EtlError::from(e)
        })?;

    // --- Step 2: Extract ---
    let extraction = extractor
        .extract(&archive.path, config.year, &config.work_dir)
        .map_err(|e| {
            error!(error = %e, "[SYNC][ERROR] Extraction failed");
            EtlError::from(e)
        })?;

    // --- Step 3: Upload ---
    let upload = uploader
        .upload(config.year, &config.work_dir)
        .await
        .map_err(|e| {
            error!(error = %e, "[SYNC][ERROR] Upload failed");
            EtlError::from(e)
        })?;

    let report = SynchroniseReport {
        year: config.year,
        archive,
        extraction,
        upload,
    };
    match serde_json::to_string_pretty(&report) {
        Ok(json) => debug!(json = %json, "[SYNC][DEBUG] Report as JSON"),
        Err(e) => error!(error = ?e, "[SYNC][DEBUG] Failed to serialize report as JSON"),
    }
    info!(
        year = report.year,
        uploaded = report.upload.uploaded.len(),
        "[SYNC] Pipeline complete"
    );
    Ok(report)
}
