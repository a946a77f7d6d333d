//! Where each year's archive lives.
//!
//! INEP renamed the published archive twice; the rule is chosen purely by
//! which year range the request falls into.

use crate::error::EtlError;

const INEP_DOWNLOAD_BASE: &str = "https://download.inep.gov.br";

/// Returns the canonical archive URL for `year`.
pub fn source_url(year: i32) -> Result<String, EtlError> {
    let url = match year {
        2020 => format!("{INEP_DOWNLOAD_BASE}/dados_abertos/microdados_censo_escolar_2020.zip"),
        2018 | 2019 => {
            format!("{INEP_DOWNLOAD_BASE}/microdados/microdados_educacao_basica_{year}.zip")
        }
        2011..=2017 => format!("{INEP_DOWNLOAD_BASE}/microdados/micro_censo_escolar_{year}.zip"),
        _ => {
            tracing::error!(year, "No source URL rule for year");
            return Err(EtlError::UnsupportedYear(year));
        }
    };
    tracing::debug!(year, url = %url, "Resolved source URL");
    Ok(url)
}

/// Name of the local file the archive for `year` is downloaded into.
pub fn archive_file_name(year: i32) -> String {
    format!("{year}.zip")
}
