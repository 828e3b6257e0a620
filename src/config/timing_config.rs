use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::bluetooth::{
    ALERT_DURATION_MS, BADGE_RESET_DELAY_SECS, CONNECT_TIMEOUT_SECS, RESCAN_INTERVAL_SECS,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Alert auto-expiry after a trigger signal.
    pub alert_duration_ms: u64,
    /// Rescan watchdog period while unconnected.
    pub rescan_interval_secs: u64,
    /// Delay after a delivered notification before the badge is cleared.
    pub badge_reset_delay_secs: u64,
    /// How long the adapter waits for a link-level connect before reporting failure.
    pub connect_timeout_secs: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            alert_duration_ms: ALERT_DURATION_MS,
            rescan_interval_secs: RESCAN_INTERVAL_SECS,
            badge_reset_delay_secs: BADGE_RESET_DELAY_SECS,
            connect_timeout_secs: CONNECT_TIMEOUT_SECS,
        }
    }
}

impl TimingConfig {
    pub fn alert_duration(&self) -> Duration {
        Duration::from_millis(self.alert_duration_ms)
    }

    pub fn rescan_interval(&self) -> Duration {
        Duration::from_secs(self.rescan_interval_secs)
    }

    pub fn badge_reset_delay(&self) -> Duration {
        Duration::from_secs(self.badge_reset_delay_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}
