//! # contract: seams between the pipeline and the outside world
//!
//! The pipeline talks to three collaborators it does not own: the HTTP server
//! publishing the archive, the archive formats found inside it, and the
//! object store receiving the tabular files. The first two are modelled here
//! as traits; the object store is already a trait (`object_store::ObjectStore`).
//!
//! ## Mocking & Testing
//! - Both traits are annotated for `mockall`, exported under the default
//!   `test-export-mocks` feature so integration tests can script fetch and
//!   expansion outcomes without network access or external tools.
//!
//! ## Reports
//! - Each stage returns a plain report struct describing what it left on disk
//!   or in the bucket; [`SynchroniseReport`] bundles them for the caller.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use mockall::automock;
use serde::Serialize;

use crate::error::{ExtractionError, FetchError};

/// Transfers the body behind a URL into a local file.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Stream `url` into `dest`, truncating any existing file.
    /// Returns the number of bytes written.
    async fn fetch(&self, url: &str, dest: &Path) -> Result<u64, FetchError>;
}

/// Expands one archive into a directory.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait Expander: Send + Sync {
    fn expand(&self, archive: &Path, dest: &Path) -> Result<(), ExtractionError>;
}

/// Outcome of the download stage.
#[derive(Debug, Clone, Serialize)]
pub struct DownloadedArchive {
    pub url: String,
    pub path: PathBuf,
    pub bytes: u64,
    /// Number of archive entries seen by the validator.
    pub entries: usize,
    pub attempts: u32,
}

/// Outcome of the extraction stage.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionReport {
    /// Every `*{year}/DADOS` directory found after the top-level expansion.
    pub data_dirs: Vec<PathBuf>,
    /// Nested archives that were expanded and then removed.
    pub nested_expanded: Vec<PathBuf>,
}

/// A tabular file written to the object store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadedObject {
    pub source: PathBuf,
    pub key: String,
    pub size: u64,
}

/// Outcome of the upload stage.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UploadReport {
    pub bucket: String,
    pub uploaded: Vec<UploadedObject>,
}

impl UploadReport {
    pub fn keys(&self) -> Vec<&str> {
        self.uploaded.iter().map(|o| o.key.as_str()).collect()
    }
}

/// Everything a full run produced.
#[derive(Debug, Clone, Serialize)]
pub struct SynchroniseReport {
    pub year: i32,
    pub archive: DownloadedArchive,
    pub extraction: ExtractionReport,
    pub upload: UploadReport,
}
