use crate::step1_fetch::FetchError;
use common::util::logging::run_with_pb_async;
use reqwest::Client;
use std::ffi::OsString;
use std::fs::{create_dir_all, remove_file, rename, File};
use std::io;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Every ZIP archive starts with these bytes
pub const ZIP_MAGIC: &[u8; 2] = b"PK";

const WRITE_BUFFER_SIZE: usize = 1024 * 1024;
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(120);
const FALLBACK_FILENAME: &str = "gtfs.zip";

/// The name an archive is stored under: the last path segment of its url
pub fn archive_filename(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|segment| !segment.is_empty())
        .unwrap_or(FALLBACK_FILENAME)
        .to_string()
}

/// Streams `url` into `raw_dir`. The body is written to `<name>.part` first and only renamed
/// to its final name once it is complete and looks like a ZIP archive.
pub async fn download_archive(
    client: &Client,
    url: &Url,
    raw_dir: &Path,
) -> Result<PathBuf, FetchError> {
    create_dir_all(raw_dir)?;
    let filename = archive_filename(url);
    let final_path = raw_dir.join(&filename);
    let part_path = part_path_for(&final_path);

    let mut response = client
        .get(url.clone())
        .timeout(DOWNLOAD_TIMEOUT)
        .send()
        .await?
        .error_for_status()?;
    let total = response.content_length();

    let task_desc = format!("Downloading {filename}");
    let part = part_path.as_path();
    let written = run_with_pb_async("fetch", &task_desc, total, |pb| async move {
        let mut writer = BufWriter::with_capacity(WRITE_BUFFER_SIZE, File::create(part)?);
        let mut written = 0u64;
        while let Some(chunk) = response.chunk().await? {
            writer.write_all(&chunk)?;
            written += chunk.len() as u64;
            pb.set_position(written);
        }
        writer.flush()?;
        Ok::<u64, FetchError>(written)
    })
    .await;

    if let Err(e) = written {
        let _ = remove_file(&part_path);
        return Err(e);
    }

    promote_archive(&part_path, &final_path)?;

    Ok(final_path)
}

fn part_path_for(final_path: &Path) -> PathBuf {
    let mut name = final_path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_else(|| OsString::from(FALLBACK_FILENAME));
    name.push(".part");
    final_path.with_file_name(name)
}

/// Moves a finished download to its final name, unless it isn't a ZIP archive. Invalid
/// downloads are deleted.
pub fn promote_archive(part_path: &Path, final_path: &Path) -> Result<(), FetchError> {
    let magic = read_magic(part_path)?;
    if magic != ZIP_MAGIC {
        let _ = remove_file(part_path);
        return Err(FetchError::NotAZip {
            path: final_path.to_path_buf(),
            magic,
        });
    }

    rename(part_path, final_path)?;
    Ok(())
}

fn read_magic(path: &Path) -> io::Result<Vec<u8>> {
    let mut magic = Vec::with_capacity(ZIP_MAGIC.len());
    File::open(path)?
        .take(ZIP_MAGIC.len() as u64)
        .read_to_end(&mut magic)?;
    Ok(magic)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step1_fetch::test_server::{local_client, serve};
    use std::fs;

    fn files_in(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_download_streams_and_promotes_archive() {
        let base = serve("200 OK", b"PK\x03\x04rest-of-archive").await;
        let url = base.join("descargas/GTFS_20250301.zip").unwrap();
        let raw = tempfile::tempdir().unwrap();

        let archive = download_archive(&local_client(), &url, raw.path()).await.unwrap();

        assert_eq!(archive, raw.path().join("GTFS_20250301.zip"));
        assert_eq!(fs::read(&archive).unwrap(), b"PK\x03\x04rest-of-archive");
        assert_eq!(files_in(raw.path()), vec!["GTFS_20250301.zip"]);
    }

    #[tokio::test]
    async fn test_download_of_html_page_is_rejected() {
        let base = serve("200 OK", b"<!DOCTYPE html><html>Mantenimiento</html>").await;
        let url = base.join("descargas/GTFS_20250301.zip").unwrap();
        let raw = tempfile::tempdir().unwrap();

        let result = download_archive(&local_client(), &url, raw.path()).await;

        assert!(matches!(result, Err(FetchError::NotAZip { .. })));
        assert!(files_in(raw.path()).is_empty());
    }

    #[tokio::test]
    async fn test_download_http_error_aborts() {
        let base = serve("404 Not Found", b"PK but not found").await;
        let url = base.join("descargas/GTFS_20250301.zip").unwrap();
        let raw = tempfile::tempdir().unwrap();

        let result = download_archive(&local_client(), &url, raw.path()).await;

        match result {
            Err(FetchError::Reqwest(err)) => {
                assert_eq!(err.status(), Some(reqwest::StatusCode::NOT_FOUND))
            }
            other => panic!("expected an HTTP error, got {other:?}"),
        }
        assert!(files_in(raw.path()).is_empty());
    }

    #[test]
    fn test_archive_filename() {
        let url = Url::parse("https://example.org/descargas/GTFS_20250301.zip?dl=1#top").unwrap();
        assert_eq!(archive_filename(&url), "GTFS_20250301.zip");

        let url = Url::parse("https://example.org/").unwrap();
        assert_eq!(archive_filename(&url), "gtfs.zip");
    }

    #[test]
    fn test_part_path() {
        let part = part_path_for(Path::new("data/raw/GTFS_20250301.zip"));
        assert_eq!(part, PathBuf::from("data/raw/GTFS_20250301.zip.part"));
    }

    #[test]
    fn test_promote_rejects_non_zip_before_rename() {
        let dir = tempfile::tempdir().unwrap();
        let final_path = dir.path().join("GTFS_20250301.zip");
        let part_path = part_path_for(&final_path);
        fs::write(&part_path, b"<!DOCTYPE html><html>Not found</html>").unwrap();

        let result = promote_archive(&part_path, &final_path);

        match result {
            Err(FetchError::NotAZip { magic, .. }) => assert_eq!(magic, b"<!".to_vec()),
            other => panic!("expected NotAZip, got {other:?}"),
        }
        assert!(!final_path.exists());
        assert!(!part_path.exists());
    }

    #[test]
    fn test_promote_rejects_empty_download() {
        let dir = tempfile::tempdir().unwrap();
        let final_path = dir.path().join("gtfs.zip");
        let part_path = part_path_for(&final_path);
        fs::write(&part_path, b"").unwrap();

        assert!(matches!(
            promote_archive(&part_path, &final_path),
            Err(FetchError::NotAZip { .. })
        ));
        assert!(!final_path.exists());
    }

    #[test]
    fn test_promote_moves_valid_archive() {
        let dir = tempfile::tempdir().unwrap();
        let final_path = dir.path().join("GTFS_20250301.zip");
        let part_path = part_path_for(&final_path);
        fs::write(&part_path, b"PK\x03\x04rest-of-archive").unwrap();

        promote_archive(&part_path, &final_path).unwrap();

        assert!(final_path.is_file());
        assert!(!part_path.exists());
        assert_eq!(fs::read(&final_path).unwrap()[..2], *ZIP_MAGIC);
    }
}
