/// `load_config` module: resolves the run configuration from the two CLI
/// arguments plus the process environment, once, at startup.
///
/// # Responsibilities
/// - Read the service-account credentials path (`GOOGLE_APPLICATION_CREDENTIALS`,
///   falling back to `./key.json`)
/// - Read optional overrides for the working directory and the retry cooldown
/// - Hand a fully resolved [`PipelineConfig`] to the pipeline, so no stage
///   reads the environment on its own
///
/// # Errors
/// All errors use `anyhow::Error` and are surfaced at the CLI boundary.
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use censo_etl_core::config::{resolve_credentials_path, PipelineConfig, CREDENTIALS_ENV};
use tracing::{error, info};

/// Directory receiving the archive and the extracted tree. Defaults to the current directory.
pub const WORK_DIR_ENV: &str = "CENSO_ETL_WORK_DIR";
/// Seconds to wait before the download retry. Defaults to 100.
pub const RETRY_COOLDOWN_ENV: &str = "CENSO_ETL_RETRY_COOLDOWN_SECS";

pub fn load_config(year: i32, bucket: &str) -> Result<PipelineConfig> {
    let mut config = PipelineConfig::new(year, bucket);

    config.credentials_path = resolve_credentials_path(env::var(CREDENTIALS_ENV).ok());
    info!(
        credentials_path = %config.credentials_path.display(),
        from_env = env::var_os(CREDENTIALS_ENV).is_some(),
        "Resolved credentials path"
    );

    if let Some(dir) = env::var_os(WORK_DIR_ENV) {
        config.work_dir = PathBuf::from(dir);
        info!(work_dir = %config.work_dir.display(), "Working directory set from env");
    }

    if let Ok(raw) = env::var(RETRY_COOLDOWN_ENV) {
        let secs = match raw.trim().parse::<u64>() {
            Ok(secs) => secs,
            Err(e) => {
                error!(error = ?e, raw = %raw, "{RETRY_COOLDOWN_ENV} must be a whole number of seconds");
                return Err(anyhow::anyhow!(
                    "{RETRY_COOLDOWN_ENV} must be a whole number of seconds: {e}"
                ));
            }
        };
        config.retry.cooldown = Duration::from_secs(secs);
    }

    if bucket.trim().is_empty() {
        error!("Empty bucket name");
        anyhow::bail!("bucket name must not be empty");
    }

    Ok(config)
}
