use crate::bootstrap_config::{BootstrapConfig, Command};
use common::types::config::Config;
use log::{debug, info};
use std::fmt::{Display, Formatter};
use std::fs::read_to_string;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Reads the config file, falling back to defaults if there is none, and applies the
/// overrides given on the command line.
pub(super) fn load_config(bootstrap_config: &BootstrapConfig) -> Result<Config, ConfigError> {
    let path = Path::new(&bootstrap_config.config_file);

    let mut config = read_config_file(path)?;
    apply_overrides(&mut config, &bootstrap_config.command);

    Ok(config)
}

fn read_config_file(path: &Path) -> Result<Config, ConfigError> {
    let contents = match read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(target: "main", "No config file at '{}', using defaults", path.display());
            return Ok(Config::default());
        }
        Err(e) => return Err(ConfigError::Io(path.to_path_buf(), e)),
    };

    let config: Config =
        serde_yml::from_str(&contents).map_err(|e| ConfigError::Yaml(path.to_path_buf(), e))?;
    info!(target: "main", "Config read successfully from '{}'", path.display());

    Ok(config)
}

fn apply_overrides(config: &mut Config, command: &Command) {
    match command {
        Command::Fetch {
            source_page,
            zip_url,
        } => {
            let source = config.source_mut();
            if let Some(page) = source_page {
                source.page = page.clone();
            }
            if let Some(zip_url) = zip_url {
                source.zip_url = Some(zip_url.clone());
            }
        }
        Command::Load => {}
        Command::Dashboard { bind, port } => {
            let dashboard = config.dashboard_mut();
            if let Some(bind) = bind {
                dashboard.bind = bind.clone();
            }
            if let Some(port) = port {
                dashboard.port = *port;
            }
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Yaml(PathBuf, serde_yml::Error),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(path, err) => write!(f, "Could not open '{}': {}", path.display(), err),
            ConfigError::Yaml(path, err) => {
                write!(f, "Could not read config file '{}': {}", path.display(), err)
            }
        }
    }
}
