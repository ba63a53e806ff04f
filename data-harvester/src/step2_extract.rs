use crate::gtfs_file::GTFS_FILES_TO_IMPORT;
use common::types::provenance::Provenance;
use log::{debug, info, warn};
use std::collections::HashSet;
use std::fmt;
use std::fmt::Display;
use std::fs::{create_dir_all, read_dir, File};
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use zip::ZipArchive;

/// The archive to load: the one named by the provenance record if it is still on disk,
/// otherwise the most recently modified archive in `raw_dir`.
pub fn find_latest_archive(raw_dir: &Path) -> Result<PathBuf, ExtractError> {
    match Provenance::read_from(raw_dir) {
        Ok(Some(provenance)) => match provenance.archive_in(raw_dir) {
            Some(archive) => {
                debug!(target: "extract", "Using archive from provenance record");
                return Ok(archive);
            }
            None => warn!(
                target: "extract",
                "Archive {} from provenance record is gone, using the newest archive instead",
                provenance.filename
            ),
        },
        Ok(None) => debug!(target: "extract", "No provenance record in {}", raw_dir.display()),
        Err(e) => warn!(target: "extract", "Ignoring unreadable provenance record: {e}"),
    }

    newest_archive(raw_dir)?.ok_or_else(|| ExtractError::NoArchives(raw_dir.to_path_buf()))
}

fn newest_archive(raw_dir: &Path) -> io::Result<Option<PathBuf>> {
    if !raw_dir.is_dir() {
        return Ok(None);
    }

    let mut newest: Option<(SystemTime, PathBuf)> = None;
    for entry in read_dir(raw_dir)? {
        let entry = entry?;
        let path = entry.path();
        let is_zip = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"));
        if !is_zip || !path.is_file() {
            continue;
        }

        let modified = entry.metadata()?.modified()?;
        let is_newer = match &newest {
            None => true,
            Some((newest_modified, newest_path)) => {
                (modified, &path) > (*newest_modified, newest_path)
            }
        };
        if is_newer {
            newest = Some((modified, path));
        }
    }

    Ok(newest.map(|(_, path)| path))
}

/// Extracts `archive` into `<extracted_root>/<archive stem>`. Nothing is written if every
/// feed file contained in the archive is already present there.
pub fn extract_archive(
    archive: &Path,
    extracted_root: &Path,
) -> Result<ExtractStepOutput, ExtractError> {
    let stem = archive
        .file_stem()
        .ok_or_else(|| ExtractError::InvalidArchiveName(archive.to_path_buf()))?;
    let dir = extracted_root.join(stem);
    create_dir_all(&dir)?;

    let mut zip_archive = ZipArchive::new(File::open(archive)?)?;
    let names: HashSet<&str> = zip_archive.file_names().collect();

    let needs_extraction = GTFS_FILES_TO_IMPORT
        .iter()
        .filter(|file| names.contains(*file))
        .any(|file| !dir.join(file).exists());

    if needs_extraction {
        zip_archive.extract(&dir)?;
        info!(target: "extract", "Extracted {} into {}", archive.display(), dir.display());
    } else {
        info!(target: "extract", "{} is already extracted, skipping", dir.display());
    }

    Ok(ExtractStepOutput {
        archive: archive.to_path_buf(),
        dir,
        extracted: needs_extraction,
    })
}

#[derive(thiserror::Error, Debug)]
pub enum ExtractError {
    Zip(#[from] zip::result::ZipError),
    File(#[from] io::Error),
    NoArchives(PathBuf),
    InvalidArchiveName(PathBuf),
}

impl Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ExtractError::Zip(err) => write!(f, "{}", err),
            ExtractError::File(err) => write!(f, "{}", err),
            ExtractError::NoArchives(dir) => write!(
                f,
                "No archives found in {}. Run `transitlens fetch` first.",
                dir.display()
            ),
            ExtractError::InvalidArchiveName(path) => {
                write!(f, "Cannot derive a directory name from {}", path.display())
            }
        }
    }
}

pub struct ExtractStepOutput {
    pub archive: PathBuf,
    /// Directory containing the feed files
    pub dir: PathBuf,
    /// Whether this run wrote files, `false` if they were already present
    pub extracted: bool,
}
