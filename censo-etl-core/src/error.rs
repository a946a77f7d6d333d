//! Error types for every pipeline stage.
//!
//! Each stage owns its error enum; [`EtlError`] is what the orchestration in
//! [`crate::synchronise`] returns, so the CLI only has to deal with one type.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level failure of a pipeline run.
#[derive(Debug, Error)]
pub enum EtlError {
    #[error("year {0} not mapped to a source archive")]
    UnsupportedYear(i32),

    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Upload(#[from] UploadError),
}

/// The archive container could not be opened.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("cannot open archive {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("archive {path} is not a valid zip container: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },
}

/// Failure of a single fetch attempt.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("server answered {status} for {url}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("transfer from {url} interrupted after {received} bytes: {reason}")]
    Truncated {
        url: String,
        received: u64,
        reason: String,
    },

    #[error(transparent)]
    InvalidArchive(#[from] ValidationError),

    #[error("writing {path} failed: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The download stage gave up.
#[derive(Debug, Error)]
#[error("download error: fetching {url} failed after {attempts} attempt(s): {source}")]
pub struct DownloadError {
    pub url: String,
    pub attempts: u32,
    #[source]
    pub source: FetchError,
}

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("extraction error: cannot read archive {path}: {source}")]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("extraction error: {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("extraction error: failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("extraction error: {program} exited with {status} while expanding {path}")]
    Command {
        program: String,
        path: PathBuf,
        status: std::process::ExitStatus,
    },

    #[error("extraction error: no `*{year}/DADOS` directory found under {work_dir}")]
    MissingDataDir { year: i32, work_dir: PathBuf },
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("upload error: cannot configure storage client: {0}")]
    Client(#[source] object_store::Error),

    #[error("upload error: bucket {bucket} is not accessible: {source}")]
    Bucket {
        bucket: String,
        #[source]
        source: object_store::Error,
    },

    #[error("upload error: scanning {path} failed: {source}")]
    Scan {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("upload error: reading {path} failed: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("upload error: writing {key} failed: {source}")]
    Object {
        key: String,
        #[source]
        source: object_store::Error,
    },
}
