//! Expanding the downloaded archive into the working directory.
//!
//! The yearly archive unpacks into a directory named after the year (for
//! example `microdados_educacao_basica_2019/`) whose `DADOS` child holds the
//! tabular payload. Some years ship that payload as further archives inside
//! `DADOS`; those are expanded in place in a single pass and then removed.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info};

use crate::archive::{ArchiveKind, UnarExpander, ZipExpander};
use crate::contract::{Expander, ExtractionReport};
use crate::error::ExtractionError;

/// Name of the payload directory inside the extraction root.
pub const DATA_DIR_NAME: &str = "DADOS";

/// Expands the top-level archive and any nested archive in the data directory.
pub struct Extractor {
    zip: Box<dyn Expander>,
    rar: Box<dyn Expander>,
}

impl Default for Extractor {
    /// In-process zip expansion, `unar` for rar.
    fn default() -> Self {
        Self::new(Box::new(ZipExpander), Box::new(UnarExpander::new()))
    }
}

impl Extractor {
    pub fn new(zip: Box<dyn Expander>, rar: Box<dyn Expander>) -> Self {
        Self { zip, rar }
    }

    fn expander_for(&self, kind: ArchiveKind) -> &dyn Expander {
        match kind {
            ArchiveKind::Zip => self.zip.as_ref(),
            ArchiveKind::Rar => self.rar.as_ref(),
        }
    }

    pub fn extract(
        &self,
        archive: &Path,
        year: i32,
        work_dir: &Path,
    ) -> Result<ExtractionReport, ExtractionError> {
        info!(archive = %archive.display(), work_dir = %work_dir.display(), "Unzipping");
        self.zip.expand(archive, work_dir)?;

        let data_dirs = find_data_dirs(work_dir, year).map_err(|source| ExtractionError::Io {
            path: work_dir.to_path_buf(),
            source,
        })?;
        if data_dirs.is_empty() {
            error!(year, work_dir = %work_dir.display(), "No data directory after extraction");
            return Err(ExtractionError::MissingDataDir {
                year,
                work_dir: work_dir.to_path_buf(),
            });
        }

        // Collect first so archives produced below are not picked up again.
        let mut nested = Vec::new();
        for data_dir in &data_dirs {
            for path in nested_archives(data_dir)? {
                nested.push((data_dir.clone(), path));
            }
        }

        let mut nested_expanded = Vec::with_capacity(nested.len());
        for (data_dir, path) in nested {
            let Some(kind) = ArchiveKind::from_path(&path) else {
                continue;
            };
            info!(archive = %path.display(), ?kind, "Expanding nested archive");
            self.expander_for(kind).expand(&path, &data_dir)?;
            fs::remove_file(&path).map_err(|source| ExtractionError::Io {
                path: path.clone(),
                source,
            })?;
            debug!(archive = %path.display(), "Removed nested archive");
            nested_expanded.push(path);
        }

        info!(
            data_dirs = data_dirs.len(),
            nested = nested_expanded.len(),
            "Unzip complete"
        );
        Ok(ExtractionReport {
            data_dirs,
            nested_expanded,
        })
    }
}

/// Directories `{work_dir}/*{year}/DADOS`, sorted.
pub fn find_data_dirs(work_dir: &Path, year: i32) -> std::io::Result<Vec<PathBuf>> {
    let suffix = year.to_string();
    let mut dirs = Vec::new();
    for entry in fs::read_dir(work_dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if !name.ends_with(&suffix) || !entry.file_type()?.is_dir() {
            continue;
        }
        let data_dir = entry.path().join(DATA_DIR_NAME);
        if data_dir.is_dir() {
            dirs.push(data_dir);
        }
    }
    dirs.sort();
    Ok(dirs)
}

fn nested_archives(data_dir: &Path) -> Result<Vec<PathBuf>, ExtractionError> {
    let io_err = |source| ExtractionError::Io {
        path: data_dir.to_path_buf(),
        source,
    };
    let mut found = Vec::new();
    for entry in fs::read_dir(data_dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if path.is_file() && ArchiveKind::from_path(&path).is_some() {
            found.push(path);
        }
    }
    found.sort();
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn data_dirs_match_year_suffix_only() {
        let work = tempdir().unwrap();
        fs::create_dir_all(work.path().join("microdados_2019/DADOS")).unwrap();
        fs::create_dir_all(work.path().join("2019/DADOS")).unwrap();
        fs::create_dir_all(work.path().join("microdados_2018/DADOS")).unwrap();
        fs::create_dir_all(work.path().join("2019_extra/DADOS")).unwrap();
        fs::create_dir_all(work.path().join("sem_dados_2019/OUTROS")).unwrap();
        fs::write(work.path().join("2019.zip"), b"").unwrap();

        let dirs = find_data_dirs(work.path(), 2019).unwrap();

        assert_eq!(
            dirs,
            vec![
                work.path().join("2019/DADOS"),
                work.path().join("microdados_2019/DADOS"),
            ]
        );
    }
}
