//! Run configuration resolved once at process start.

use std::path::PathBuf;

use serde::Serialize;
use tracing::{debug, info};

use crate::download::RetryPolicy;

/// Environment variable holding the service-account credentials path.
pub const CREDENTIALS_ENV: &str = "GOOGLE_APPLICATION_CREDENTIALS";
/// Used when [`CREDENTIALS_ENV`] is unset.
pub const DEFAULT_CREDENTIALS_PATH: &str = "./key.json";

/// Everything one pipeline run needs, resolved once at process start.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineConfig {
    pub year: i32,
    pub bucket: String,
    pub credentials_path: PathBuf,
    /// Directory receiving `{year}.zip` and the extracted tree.
    pub work_dir: PathBuf,
    pub retry: RetryPolicy,
}

impl PipelineConfig {
    /// Config with the default credentials path, working directory and retry policy.
    pub fn new(year: i32, bucket: impl Into<String>) -> Self {
        Self {
            year,
            bucket: bucket.into(),
            credentials_path: PathBuf::from(DEFAULT_CREDENTIALS_PATH),
            work_dir: PathBuf::from("."),
            retry: RetryPolicy::default(),
        }
    }

    pub fn archive_path(&self) -> PathBuf {
        self.work_dir.join(crate::source::archive_file_name(self.year))
    }

    pub fn trace_loaded(&self) {
        info!(
            year = self.year,
            bucket = %self.bucket,
            credentials_path = %self.credentials_path.display(),
            work_dir = %self.work_dir.display(),
            max_attempts = self.retry.max_attempts,
            cooldown_secs = self.retry.cooldown.as_secs(),
            "Loaded PipelineConfig"
        );
        debug!(?self, "PipelineConfig loaded (full debug)");
    }
}

/// Credentials path from the environment value, falling back to [`DEFAULT_CREDENTIALS_PATH`].
pub fn resolve_credentials_path(env_value: Option<String>) -> PathBuf {
    match env_value {
        Some(path) if !path.trim().is_empty() => PathBuf::from(path),
        _ => PathBuf::from(DEFAULT_CREDENTIALS_PATH),
    }
}
