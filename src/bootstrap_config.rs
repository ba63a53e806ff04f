use clap::{Parser, Subcommand};
use log::LevelFilter;
use url::Url;

#[derive(Parser, Clone, Debug)]
#[command(version, about)]
pub struct BootstrapConfig {
    #[clap(short('c'), long("config"), env("TRANSITLENS_CONFIG"), default_value_os = "config.yaml")]
    pub config_file: String,
    #[clap(short('l'), long("log-level"), env("TRANSITLENS_LOG_LEVEL"), default_value_t, value_enum)]
    pub log_level: LogLevel,
    #[command(subcommand)]
    pub command: Command,
}

impl BootstrapConfig {
    pub fn read() -> Self {
        BootstrapConfig::parse()
    }
}

#[derive(Subcommand, Clone, Debug)]
pub enum Command {
    /// Download the current feed archive
    Fetch {
        /// Page that links to the current feed
        #[clap(long, env("GTFS_SOURCE_PAGE"))]
        source_page: Option<Url>,
        /// Download this archive instead of looking for one on the source page
        #[clap(long, env("GTFS_ZIP_URL"))]
        zip_url: Option<Url>,
    },
    /// Extract the latest archive and load it into the store
    Load,
    /// Serve the dashboard
    Dashboard {
        #[clap(long)]
        bind: Option<String>,
        #[clap(long)]
        port: Option<u16>,
    },
}

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Off => Self::Off,
            LogLevel::Error => Self::Error,
            LogLevel::Warn => Self::Warn,
            LogLevel::Info => Self::Info,
            LogLevel::Debug => Self::Debug,
            LogLevel::Trace => Self::Trace,
        }
    }
}
