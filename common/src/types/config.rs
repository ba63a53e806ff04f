use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

pub const DEFAULT_SOURCE_PAGE: &str = "https://www.dtpm.cl/index.php/gtfs-vigente";
pub const DEFAULT_USER_AGENT: &str = concat!("transitlens/", env!("CARGO_PKG_VERSION"));

/// Santiago city center, used when a trip has neither stops nor a shape to center on
pub const DEFAULT_CENTER: GeoPoint = GeoPoint { lat: -33.45, lon: -70.65 };

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(tag = "version")]
pub enum Config {
    #[serde(rename = "1")]
    Version1 {
        #[serde(default = "default_data_dir")]
        data_dir: PathBuf,
        #[serde(default)]
        source: SourceConfig,
        #[serde(default)]
        dashboard: DashboardConfig,
    },
}

impl Default for Config {
    fn default() -> Self {
        Config::Version1 {
            data_dir: default_data_dir(),
            source: SourceConfig::default(),
            dashboard: DashboardConfig::default(),
        }
    }
}

impl Config {
    pub fn data_dir(&self) -> &Path {
        match self {
            Config::Version1 { data_dir, .. } => data_dir,
        }
    }

    pub fn source(&self) -> &SourceConfig {
        match self {
            Config::Version1 { source, .. } => source,
        }
    }

    pub fn source_mut(&mut self) -> &mut SourceConfig {
        match self {
            Config::Version1 { source, .. } => source,
        }
    }

    pub fn dashboard(&self) -> &DashboardConfig {
        match self {
            Config::Version1 { dashboard, .. } => dashboard,
        }
    }

    pub fn dashboard_mut(&mut self) -> &mut DashboardConfig {
        match self {
            Config::Version1 { dashboard, .. } => dashboard,
        }
    }

    pub fn layout(&self) -> DataLayout {
        DataLayout::new(self.data_dir())
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

/// Where the feed comes from
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SourceConfig {
    /// Page that links to the current feed
    #[serde(default = "default_source_page")]
    pub page: Url,
    /// Direct link to the archive. Skips scraping `page` when set.
    #[serde(default)]
    pub zip_url: Option<Url>,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            page: default_source_page(),
            zip_url: None,
            user_agent: default_user_agent(),
        }
    }
}

fn default_source_page() -> Url {
    Url::parse(DEFAULT_SOURCE_PAGE).expect("default source page is a valid url")
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DashboardConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_center")]
    pub default_center: GeoPoint,
    /// Origins allowed to call the API, e.g. a dev server for the frontend
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            default_center: default_center(),
            allowed_origins: vec![],
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3001
}

fn default_center() -> GeoPoint {
    DEFAULT_CENTER
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

/// On-disk locations shared by all stages
#[derive(Debug, Clone)]
pub struct DataLayout {
    /// Downloaded archives and `latest.json`
    pub raw: PathBuf,
    /// One directory per extracted archive
    pub extracted: PathBuf,
    /// The table store
    pub store: PathBuf,
}

impl DataLayout {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            raw: data_dir.join("raw"),
            extracted: data_dir.join("extracted"),
            store: data_dir.join("gtfs.db"),
        }
    }
}
