pub mod bootstrap_config;
mod config;

use crate::config::load_config;
use bootstrap_config::{BootstrapConfig, Command};
use common::types::config::Config;
use common::util::logging;
use data_harvester::step1_fetch::{fetch_latest_feed, FetchError, FetchSettings};
use data_harvester::step2_extract::{extract_archive, find_latest_archive, ExtractError};
use data_harvester::step3_load::{load_feed, LoadError};
use log::{debug, error, info, log_enabled, Level};
use std::fmt::{Display, Formatter};
use std::process::ExitCode;
use visualization::database::FeedDatabase;
use visualization::errors::DashboardError;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let logged = log_enabled!(target: "main", Level::Error);
            match unlogged_message(&err, logged) {
                Some(message) => eprintln!("{message}"),
                None => error!(target: "main", "{}", err),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), TransitLensError> {
    let bootstrap_config = BootstrapConfig::read();

    logging::initialize_logging(bootstrap_config.log_level.clone().into());
    print_startup_message();

    let config = load_config(&bootstrap_config)?;
    debug!(target: "main", "Using data directory {}", config.data_dir().display());

    match bootstrap_config.command {
        Command::Fetch { .. } => fetch(&config).await,
        Command::Load => load(&config),
        Command::Dashboard { .. } => dashboard(&config).await,
    }
}

async fn fetch(config: &Config) -> Result<(), TransitLensError> {
    let source = config.source();
    let settings = FetchSettings {
        source_page: source.page.clone(),
        zip_url: source.zip_url.clone(),
        user_agent: source.user_agent.clone(),
        raw_dir: config.layout().raw,
    };

    let output = fetch_latest_feed(&settings).await?;
    info!(target: "main", "Latest feed is {}", output.archive.display());

    Ok(())
}

fn load(config: &Config) -> Result<(), TransitLensError> {
    let layout = config.layout();

    let archive = find_latest_archive(&layout.raw)?;
    let extracted = extract_archive(&archive, &layout.extracted)?;
    let output = load_feed(&extracted.dir, &layout.store)?;

    for table in &output.loaded {
        info!(target: "main", "{:>12}: {} rows", table.name, table.rows);
    }
    if !output.skipped.is_empty() {
        info!(target: "main", "Not in this feed: {}", output.skipped.join(", "));
    }

    Ok(())
}

async fn dashboard(config: &Config) -> Result<(), TransitLensError> {
    let database = FeedDatabase::open_read_only(&config.layout().store)?;

    info!(target: "dashboard", "Launching dashboard server");
    visualization::run_server(database, config.dashboard().clone()).await?;

    Ok(())
}

/// Fatal errors must reach the operator even with logging turned off
fn unlogged_message(err: &TransitLensError, logged: bool) -> Option<String> {
    (!logged).then(|| format!("transitlens: {err}"))
}

fn print_startup_message() {
    info!("\n  _                        _ _                \n | |_ _ __ __ _ _ __  ___(_) |_| | ___ _ __  ___ \n | __| '__/ _` | '_ \\/ __| | __| |/ _ \\ '_ \\/ __|\n | |_| | | (_| | | | \\__ \\ | |_| |  __/ | | \\__ \\\n  \\__|_|  \\__,_|_| |_|___/_|\\__|_|\\___|_| |_|___/\n\n G T F S   D A S H B O A R D\n");
}

#[derive(thiserror::Error, Debug)]
pub enum TransitLensError {
    Config(#[from] config::ConfigError),
    Fetch(#[from] FetchError),
    Extract(#[from] ExtractError),
    Load(#[from] LoadError),
    Dashboard(#[from] DashboardError),
    IO(#[from] std::io::Error),
}

impl Display for TransitLensError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let err: &dyn Display = match self {
            TransitLensError::Config(err) => err,
            TransitLensError::Fetch(err) => err,
            TransitLensError::Extract(err) => err,
            TransitLensError::Load(err) => err,
            TransitLensError::Dashboard(err) => err,
            TransitLensError::IO(err) => err,
        };
        let prefix = match self {
            TransitLensError::Config(_) => "Reading config file",
            TransitLensError::Fetch(_) => "Fetching feed",
            TransitLensError::Extract(_) => "Extracting feed",
            TransitLensError::Load(_) => "Loading feed",
            TransitLensError::Dashboard(_) => "Opening database",
            TransitLensError::IO(_) => "Error during IO",
        };
        write!(f, "{}: {}", prefix, err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_error_printed_when_logging_is_off() {
        let err = TransitLensError::IO(std::io::Error::other("disk full"));

        assert_eq!(
            unlogged_message(&err, false).as_deref(),
            Some("transitlens: Error during IO: disk full")
        );
        assert_eq!(unlogged_message(&err, true), None);
    }

    #[test]
    fn test_error_prefix_names_stage() {
        let err = TransitLensError::Extract(ExtractError::NoArchives("data/raw".into()));
        assert_eq!(
            err.to_string(),
            "Extracting feed: No archives found in data/raw. Run `transitlens fetch` first."
        );
    }
}
