use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    Error, Result,
    fs::{config_dir, state_dir},
};

const CURRENT_CONFIG_VERSION: u16 = 1;
const FILE_NAME: &str = "core.toml";

/// Handle to the core configuration
pub type Cfg = Arc<RwLock<CoreConfig>>;

/// The library's core configuration, serialized to TOML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoreConfig {
    version: u16,
    /// Location of the list database
    database: PathBuf,
}

impl CoreConfig {
    /// Load the configuration from the config directory, writing out the defaults if no file
    /// exists yet. A file that fails to parse is replaced by the defaults in memory only. A file
    /// written by a newer version is refused.
    pub fn load() -> Result<Self> {
        Self::load_from(&config_dir()?.join(FILE_NAME))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)?;
            match toml::from_str::<Self>(&contents) {
                Ok(cfg) if cfg.version > CURRENT_CONFIG_VERSION => {
                    Err(Error::UnsupportedConfig {
                        found: cfg.version,
                        supported: CURRENT_CONFIG_VERSION,
                    })
                }
                Ok(cfg) => Ok(cfg),
                Err(err) => {
                    warn!("Ignoring malformed config {}: {err}", path.display());
                    Self::with_defaults()
                }
            }
        } else {
            let cfg = Self::with_defaults()?;
            cfg.save_to(path)?;
            Ok(cfg)
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&config_dir()?.join(FILE_NAME))
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, contents)?;

        Ok(())
    }

    pub fn database(&self) -> &Path {
        &self.database
    }

    pub fn set_database(&mut self, path: impl Into<PathBuf>) {
        self.database = path.into();
    }

    pub fn into_handle(self) -> Cfg {
        Arc::new(RwLock::new(self))
    }

    fn with_defaults() -> Result<Self> {
        Ok(Self {
            version: CURRENT_CONFIG_VERSION,
            database: state_dir()?.join("lists.db"),
        })
    }

    #[cfg(test)]
    pub(crate) fn mock(database: &Path) -> Self {
        Self {
            version: CURRENT_CONFIG_VERSION,
            database: database.to_path_buf(),
        }
    }
}
