use directories::ProjectDirs;
use log::warn;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::session::{DEFAULT_ARMING_DELAY, DEFAULT_REST_WARNING_SECS};
use crate::store::StorageKind;

/// User settings read from `config.json`. Missing fields take their defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Grace period after entering Training before bail/stop are accepted
    pub arming_delay_ms: u64,
    /// Remaining rest seconds at which the warning cue fires
    pub rest_warning_secs: u32,
    /// Redraw interval of the terminal UI
    pub tick_rate_ms: u64,
    pub storage: StorageKind,
    /// Overrides the default state directory
    pub data_dir: Option<PathBuf>,
    /// Ring the terminal bell on rest cues
    pub bell: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            arming_delay_ms: DEFAULT_ARMING_DELAY.as_millis() as u64,
            rest_warning_secs: DEFAULT_REST_WARNING_SECS,
            tick_rate_ms: 100,
            storage: StorageKind::default(),
            data_dir: None,
            bell: true,
        }
    }
}

impl AppConfig {
    pub fn arming_delay(&self) -> Duration {
        Duration::from_millis(self.arming_delay_ms)
    }

    pub fn tick_rate(&self) -> Duration {
        Duration::from_millis(self.tick_rate_ms.max(10))
    }
}

pub trait ConfigStore {
    fn load(&self) -> AppConfig;
    fn save(&self, cfg: &AppConfig) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = if let Some(pd) = ProjectDirs::from("", "", "accrue") {
            pd.config_dir().join("config.json")
        } else {
            PathBuf::from("accrue_config.json")
        };
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> AppConfig {
        let Ok(bytes) = fs::read(&self.path) else {
            return AppConfig::default();
        };
        match serde_json::from_slice::<AppConfig>(&bytes) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!("ignoring unreadable config {}: {e}", self.path.display());
                AppConfig::default()
            }
        }
    }

    fn save(&self, cfg: &AppConfig) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)
    }
}
