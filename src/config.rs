/// Configuration for the activity log
///
/// Two directories matter: where projects live and where bundles are
/// written. Defaults come from the platform directories:
/// - Linux: ~/.local/share/bitacora/projects and ~/.cache/bitacora/bundles
/// - macOS: ~/Library/Application Support/bitacora/projects and ~/Library/Caches/bitacora/bundles
/// - Windows: %APPDATA%\bitacora\projects and %LOCALAPPDATA%\bitacora\bundles
///
/// A TOML file can override either one; command-line flags and environment
/// variables override the file.
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::Result;

const APP_DIR: &str = "bitacora";
const CONFIG_FILE: &str = "config.toml";

/// Resolved configuration, passed explicitly to whoever needs it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Root folder; one subfolder per project
    pub projects_dir: PathBuf,
    /// Where ZIP bundles are written (outside every project folder)
    pub cache_dir: PathBuf,
}

/// On-disk config file, every key optional
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    projects_dir: Option<PathBuf>,
    cache_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            projects_dir: default_projects_dir(),
            cache_dir: default_cache_dir(),
        }
    }
}

impl Config {
    /// Load the config file at `path`, or the default location when `None`.
    /// A missing default file is fine; a missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = Config::default();

        let file = match path {
            Some(path) => Some(fs::read_to_string(path)?),
            None => match default_config_path() {
                Some(path) if path.is_file() => Some(fs::read_to_string(path)?),
                _ => None,
            },
        };

        if let Some(text) = file {
            config.apply(toml::from_str(&text)?);
        }

        debug!("Using config {:?}", config);
        Ok(config)
    }

    fn apply(&mut self, file: ConfigFile) {
        if let Some(dir) = file.projects_dir {
            self.projects_dir = dir;
        }
        if let Some(dir) = file.cache_dir {
            self.cache_dir = dir;
        }
    }

    /// Apply command-line / environment overrides
    pub fn with_overrides(mut self, projects_dir: Option<PathBuf>, cache_dir: Option<PathBuf>) -> Self {
        self.apply(ConfigFile {
            projects_dir,
            cache_dir,
        });
        self
    }
}

/// ~/.config/bitacora/config.toml on Linux
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
}

fn default_projects_dir() -> PathBuf {
    match dirs::data_dir().or_else(dirs::home_dir) {
        Some(dir) => dir.join(APP_DIR).join("projects"),
        None => PathBuf::from("Proyecto"),
    }
}

fn default_cache_dir() -> PathBuf {
    match dirs_next::cache_dir().or_else(dirs_next::home_dir) {
        Some(dir) => dir.join(APP_DIR).join("bundles"),
        None => PathBuf::from("CACHE"),
    }
}
