use std::{
    env::{self, VarError},
    fs::File,
    path::{Path, PathBuf},
};

use platform_dirs::AppDirs;
use serde::{Deserialize, Serialize};

use playbacker_core::api::DEFAULT_SERVER_URL;

const APP_NAME: &str = "Playbacker";
const CONFIG_FILENAME: &str = "config.json";
const SELECTION_FILENAME: &str = "selection.json";
const PROXY_ENV_VAR: &str = "HTTPS_PROXY";

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server_url: String,
    /// Number of requests that may run at once.
    pub workers: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_owned(),
            workers: 4,
        }
    }
}

impl Config {
    fn app_dirs() -> Option<AppDirs> {
        const USE_XDG_ON_MACOS: bool = false;

        AppDirs::new(Some(APP_NAME), USE_XDG_ON_MACOS)
    }

    pub fn config_dir() -> Option<PathBuf> {
        Self::app_dirs().map(|dirs| dirs.config_dir)
    }

    fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join(CONFIG_FILENAME))
    }

    /// File keeping the selected setlist and song between runs.
    pub fn selection_path() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join(SELECTION_FILENAME))
    }

    pub fn load() -> Option<Config> {
        let path = Self::config_path()?;
        Self::load_from(&path)
    }

    fn load_from(path: &Path) -> Option<Config> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(err) => {
                log::info!("no config at {:?}, using defaults: {}", path, err);
                return None;
            }
        };
        log::info!("loading config: {:?}", path);
        match serde_json::from_reader(file) {
            Ok(config) => Some(config),
            Err(err) => {
                log::error!("failed to read config {:?}, using defaults: {}", path, err);
                None
            }
        }
    }

    pub fn proxy() -> Option<String> {
        env::var(PROXY_ENV_VAR).map_or_else(
            |err| match err {
                VarError::NotPresent => None,
                VarError::NotUnicode(_) => {
                    log::error!("proxy URL is not a valid unicode");
                    None
                }
            },
            Some,
        )
    }
}
