mod download;
mod scrape;
#[cfg(test)]
mod test_server;

pub use download::{archive_filename, download_archive, promote_archive, ZIP_MAGIC};
pub use scrape::{choose_latest, date_token, find_zip_links};

use chrono::Utc;
use common::types::provenance::Provenance;
use common::util::logging::run_with_spinner_async;
use log::{debug, info};
use reqwest::Client;
use std::fmt;
use std::fmt::Display;
use std::fs::{create_dir_all, metadata};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;
use url::Url;

const PAGE_TIMEOUT: Duration = Duration::from_secs(60);

/// Where to look for the feed and where to put it
#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub source_page: Url,
    /// Skips scraping `source_page` when set
    pub zip_url: Option<Url>,
    pub user_agent: String,
    pub raw_dir: PathBuf,
}

pub async fn fetch_latest_feed(settings: &FetchSettings) -> Result<FetchStepOutput, FetchError> {
    let client = Client::builder()
        .user_agent(settings.user_agent.as_str())
        .build()?;

    let zip_url =
        resolve_zip_url(&client, &settings.source_page, settings.zip_url.as_ref()).await?;
    info!(target: "fetch", "Downloading feed from {zip_url}");

    let archive = download_archive(&client, &zip_url, &settings.raw_dir).await?;
    let size_bytes = metadata(&archive)?.len();

    let provenance = Provenance {
        source_page: settings.source_page.to_string(),
        zip_url: zip_url.to_string(),
        filename: archive_filename(&zip_url),
        downloaded_at_utc: Utc::now(),
        size_bytes,
    };
    write_provenance(&settings.raw_dir, &provenance)?;

    info!(
        target: "fetch",
        "Saved {} ({:.1} MiB)",
        archive.display(),
        size_bytes as f64 / 1024.0 / 1024.0
    );

    Ok(FetchStepOutput {
        archive,
        provenance,
    })
}

/// Finds the url of the current feed archive. A configured `zip_url_override` is used as
/// is, otherwise the source page is scraped for links to archives.
pub async fn resolve_zip_url(
    client: &Client,
    source_page: &Url,
    zip_url_override: Option<&Url>,
) -> Result<Url, FetchError> {
    if let Some(zip_url) = zip_url_override {
        debug!(target: "fetch", "Archive url is configured, not looking at {source_page}");
        return Ok(zip_url.clone());
    }

    let page = run_with_spinner_async("fetch", "Looking for feed archives", || async {
        let response = client
            .get(source_page.clone())
            .timeout(PAGE_TIMEOUT)
            .send()
            .await?
            .error_for_status()?;
        Ok::<String, reqwest::Error>(response.text().await?)
    })
    .await?;

    let candidates = find_zip_links(&page, source_page);
    debug!(target: "fetch", "Found {} candidate archive(s) on {source_page}", candidates.len());

    choose_latest(candidates).ok_or_else(|| FetchError::NoZipLinks(source_page.clone()))
}

/// Replaces the provenance record in `raw_dir`
pub fn write_provenance(raw_dir: &Path, provenance: &Provenance) -> Result<(), FetchError> {
    create_dir_all(raw_dir)?;

    let mut tmp_file = NamedTempFile::new_in(raw_dir)?;
    serde_json::to_writer_pretty(tmp_file.as_file_mut(), provenance)?;
    tmp_file.persist(Provenance::path_in(raw_dir))?;

    Ok(())
}

#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    Reqwest(#[from] reqwest::Error),
    File(#[from] std::io::Error),
    Json(#[from] serde_json::Error),
    Persist(#[from] tempfile::PersistError),
    NoZipLinks(Url),
    NotAZip { path: PathBuf, magic: Vec<u8> },
}

impl Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FetchError::Reqwest(err) => write!(f, "{}", err),
            FetchError::File(err) => write!(f, "{}", err),
            FetchError::Json(err) => write!(f, "Could not write provenance record: {}", err),
            FetchError::Persist(err) => write!(f, "Could not write provenance record: {}", err),
            FetchError::NoZipLinks(page) => write!(f, "No links to .zip files found on {}", page),
            FetchError::NotAZip { path, magic } => write!(
                f,
                "Downloaded file for {} is not a ZIP archive (starts with \"{}\")",
                path.display(),
                magic.escape_ascii()
            ),
        }
    }
}

pub struct FetchStepOutput {
    pub archive: PathBuf,
    pub provenance: Provenance,
}
