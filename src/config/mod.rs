pub mod target_config;
pub mod timing_config;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::config::target_config::TargetConfig;
use crate::config::timing_config::TimingConfig;
use crate::core::ManagerSettings;

pub const CONFIG_FILE_NAME: &str = "ringout.json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Tone asset played on an alert. None rings the terminal bell only.
    pub tone_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub target: TargetConfig,
    pub timing: TimingConfig,
    pub alert: AlertConfig,
    /// One of error, warn, info, debug, trace. `RUST_LOG` takes precedence.
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            target: TargetConfig::default(),
            timing: TimingConfig::default(),
            alert: AlertConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Loads the config from `path`. A missing file is created with the defaults.
    pub async fn load_config(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!("Config file not found at {:?}, using default.", path);
            let config = Self::default();
            if let Err(e) = config.save_config(path).await {
                warn!("Failed to write default config: {:#}", e);
            }
            return Ok(config);
        }

        let config_json = fs::read_to_string(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Self = serde_json::from_str(&config_json)
            .with_context(|| format!("parsing {}", path.display()))?;

        info!("Config loaded from {:?}", path);
        Ok(config)
    }

    /// Saves the config to `path`, creating its directory if needed.
    async fn save_config(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .await
                .with_context(|| format!("creating {}", dir.display()))?;
        }

        let config_json = match serde_json::to_string_pretty(&self) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize config to JSON: {}", e);
                return Err(e.into());
            }
        };

        fs::write(path, config_json).await?;

        info!("Config saved to {:?}.", path);
        Ok(())
    }

    pub fn log_level(&self) -> log::LevelFilter {
        self.log_level.parse().unwrap_or(log::LevelFilter::Info)
    }

    pub fn manager_settings(&self) -> ManagerSettings {
        ManagerSettings {
            target: (&self.target).into(),
            alert_duration: self.timing.alert_duration(),
            rescan_interval: self.timing.rescan_interval(),
            badge_reset_delay: self.timing.badge_reset_delay(),
        }
    }
}
