///
/// This module implements the CLI interface for censo-etl: argument parsing
/// and the async entrypoint that wires real collaborators into the pipeline.
///
/// All pipeline logic (URL rules, download, extraction, upload) lives in the
/// [`censo-etl-core`] crate. This module is strictly CLI glue.
///
/// ## How To Use
/// - Command line: `censo-etl <YEAR> <BUCKET>`.
/// - Programmatic/integration use: call [`run`] with a constructed [`Cli`].
///
/// [`censo-etl-core`]: ../../censo-etl-core/
use anyhow::Result;
use censo_etl_core::download::HttpFetcher;
use censo_etl_core::extract::Extractor;
use censo_etl_core::source::source_url;
use censo_etl_core::synchronise::synchronise;
use censo_etl_core::upload::Uploader;
use clap::Parser;

use crate::load_config::load_config;
use crate::storage::build_store;

/// CLI for censo-etl: publish one year of INEP Censo Escolar microdata to a bucket.
#[derive(Debug, Parser)]
#[clap(
    name = "censo-etl",
    version,
    about = "Download, extract and upload one year of INEP Censo Escolar microdata"
)]
pub struct Cli {
    /// Census year to process, e.g. 2019
    pub year: i32,
    /// Destination Google Cloud Storage bucket
    pub bucket: String,
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.year, &cli.bucket)?;
    config.trace_loaded();

    // Unmapped years fail here, before credentials are read or anything is written.
    source_url(config.year)?;

    let store = build_store(&config)?;
    let uploader = Uploader::new(store, config.bucket.clone());
    let fetcher = HttpFetcher::default();
    let extractor = Extractor::default();

    match synchronise(&config, &fetcher, &extractor, &uploader).await {
        Ok(report) => {
            tracing::info!(
                year = report.year,
                archive = %report.archive.path.display(),
                uploaded = report.upload.uploaded.len(),
                "Synchronisation complete"
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!(error = %e, "Synchronisation failed");
            Err(e.into())
        }
    }
}
