use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io;
use std::io::{BufReader, ErrorKind};
use std::path::{Path, PathBuf};

/// Name of the sidecar file that points at the most recently downloaded archive
pub const PROVENANCE_FILE_NAME: &str = "latest.json";

/// Where the latest archive came from. Overwritten on every successful fetch.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Provenance {
    pub source_page: String,
    pub zip_url: String,
    pub filename: String,
    pub downloaded_at_utc: DateTime<Utc>,
    pub size_bytes: u64,
}

impl Provenance {
    pub fn path_in(raw_dir: &Path) -> PathBuf {
        raw_dir.join(PROVENANCE_FILE_NAME)
    }

    /// Reads the provenance record from `raw_dir`. A missing record is `Ok(None)`.
    pub fn read_from(raw_dir: &Path) -> io::Result<Option<Self>> {
        let file = match File::open(Self::path_in(raw_dir)) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };

        let provenance = serde_json::from_reader(BufReader::new(file))?;
        Ok(Some(provenance))
    }

    /// The archive this record points at, if it is still on disk
    pub fn archive_in(&self, raw_dir: &Path) -> Option<PathBuf> {
        let path = raw_dir.join(&self.filename);
        path.is_file().then_some(path)
    }
}
