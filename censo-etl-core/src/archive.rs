//! Archive container handling: validation and the two expander variants.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, error, info};
use zip::ZipArchive;

use crate::contract::Expander;
use crate::error::{ExtractionError, ValidationError};

/// Container formats recognised inside the data directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Zip,
    Rar,
}

impl ArchiveKind {
    /// Classifies a path by its extension, ignoring case.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "zip" => Some(ArchiveKind::Zip),
            "rar" => Some(ArchiveKind::Rar),
            _ => None,
        }
    }
}

/// Confirms `path` opens as a zip container and returns its entry count.
///
/// Only the central directory is read; entry contents are not checked.
pub fn validate_archive(path: &Path) -> Result<usize, ValidationError> {
    let file = File::open(path).map_err(|source| ValidationError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let archive = ZipArchive::new(file).map_err(|source| {
        error!(path = %path.display(), error = %source, "Archive failed validation");
        ValidationError::Corrupt {
            path: path.to_path_buf(),
            source,
        }
    })?;
    debug!(path = %path.display(), entries = archive.len(), "Archive validated");
    Ok(archive.len())
}

/// In-process zip expansion.
#[derive(Debug, Default, Clone, Copy)]
pub struct ZipExpander;

impl Expander for ZipExpander {
    fn expand(&self, archive: &Path, dest: &Path) -> Result<(), ExtractionError> {
        let file = File::open(archive).map_err(|source| ExtractionError::Io {
            path: archive.to_path_buf(),
            source,
        })?;
        let mut zip = ZipArchive::new(file).map_err(|source| ExtractionError::Archive {
            path: archive.to_path_buf(),
            source,
        })?;
        info!(
            archive = %archive.display(),
            dest = %dest.display(),
            entries = zip.len(),
            "Expanding zip archive"
        );
        zip.extract(dest).map_err(|source| ExtractionError::Archive {
            path: archive.to_path_buf(),
            source,
        })
    }
}

/// Expansion through the external `unar` tool, which understands both zip and rar.
#[derive(Debug, Clone)]
pub struct UnarExpander {
    program: PathBuf,
}

impl UnarExpander {
    pub fn new() -> Self {
        Self::with_program("unar")
    }

    /// Uses another executable accepting unar's `-o <dir> <archive>` arguments.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for UnarExpander {
    fn default() -> Self {
        Self::new()
    }
}

impl Expander for UnarExpander {
    fn expand(&self, archive: &Path, dest: &Path) -> Result<(), ExtractionError> {
        let program = self.program.display().to_string();
        info!(
            program = %program,
            archive = %archive.display(),
            dest = %dest.display(),
            "Expanding archive with external tool"
        );
        let status = Command::new(&self.program)
            .arg("-o")
            .arg(dest)
            .arg(archive)
            .status();

        match status {
            Ok(s) if s.success() => {
                debug!(program = %program, archive = %archive.display(), status = ?s, "External expansion finished");
                Ok(())
            }
            Ok(s) => {
                error!(
                    program = %program,
                    archive = %archive.display(),
                    "External expansion exited with non-zero code: {}", s
                );
                Err(ExtractionError::Command {
                    program,
                    path: archive.to_path_buf(),
                    status: s,
                })
            }
            Err(e) => {
                error!(error = ?e, program = %program, "Failed to launch external expansion tool");
                Err(ExtractionError::Spawn { program, source: e })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;
    use zip::write::SimpleFileOptions;

    fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
        let file = File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        for (name, content) in entries {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(content).unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn kind_is_detected_case_insensitively() {
        assert_eq!(ArchiveKind::from_path(Path::new("a/B.ZIP")), Some(ArchiveKind::Zip));
        assert_eq!(ArchiveKind::from_path(Path::new("a/b.Rar")), Some(ArchiveKind::Rar));
        assert_eq!(ArchiveKind::from_path(Path::new("a/b.CSV")), None);
        assert_eq!(ArchiveKind::from_path(Path::new("a/zip")), None);
    }

    #[test]
    fn valid_zip_passes_validation() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ok.zip");
        write_zip(&path, &[("a.txt", b"a"), ("b/c.txt", b"c")]);
        assert_eq!(validate_archive(&path).unwrap(), 2);
    }

    #[test]
    fn truncated_zip_fails_validation() {
        let dir = tempdir().unwrap();
        let full = dir.path().join("full.zip");
        write_zip(&full, &[("a.txt", b"some content that takes space")]);
        let bytes = std::fs::read(&full).unwrap();
        let cut = dir.path().join("cut.zip");
        std::fs::write(&cut, &bytes[..bytes.len() / 2]).unwrap();

        assert!(matches!(
            validate_archive(&cut),
            Err(ValidationError::Corrupt { .. })
        ));
    }

    #[test]
    fn missing_file_fails_validation() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            validate_archive(&dir.path().join("absent.zip")),
            Err(ValidationError::Open { .. })
        ));
    }

    #[test]
    fn zip_expander_writes_entries_into_dest() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("in.zip");
        write_zip(&path, &[("nested/x.CSV", b"1;2")]);
        let out = dir.path().join("out");
        std::fs::create_dir(&out).unwrap();

        ZipExpander.expand(&path, &out).unwrap();

        assert_eq!(std::fs::read(out.join("nested/x.CSV")).unwrap(), b"1;2");
    }

    #[test]
    fn unar_expander_reports_missing_program() {
        let dir = tempdir().unwrap();
        let expander = UnarExpander::with_program(dir.path().join("no-such-unar"));
        let err = expander
            .expand(&dir.path().join("x.rar"), dir.path())
            .unwrap_err();
        assert!(matches!(err, ExtractionError::Spawn { .. }));
    }
}
