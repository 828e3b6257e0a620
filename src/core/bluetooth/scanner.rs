use std::time::Duration;

use log::{error, info, warn};
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

use crate::core::bluetooth::adapter::LinkAdapter;
use crate::core::manager::Message;
use crate::core::timer::ScheduledTask;

/// Owns the scanning flag and the rescan watchdog.
///
/// Some stacks silently stop delivering discovery callbacks after a while, so
/// while scanning and unconnected the watchdog forces a stop/start every
/// `rescan_interval`.
pub struct ScanSupervisor {
    service_filter: Uuid,
    rescan_interval: Duration,
    scanning: bool,
    watchdog: Option<ScheduledTask>,
    inbox: UnboundedSender<Message>,
}

impl ScanSupervisor {
    pub fn new(
        service_filter: Uuid,
        rescan_interval: Duration,
        inbox: UnboundedSender<Message>,
    ) -> Self {
        Self {
            service_filter,
            rescan_interval,
            scanning: false,
            watchdog: None,
            inbox,
        }
    }

    pub fn is_scanning(&self) -> bool {
        self.scanning
    }

    #[cfg(test)]
    fn watchdog_armed(&self) -> bool {
        self.watchdog.as_ref().is_some_and(|task| !task.is_cancelled())
    }

    /// Begin discovery filtered to the target service. No-op while already scanning.
    pub async fn start_scanning(&mut self, adapter: &dyn LinkAdapter) {
        if self.scanning {
            return;
        }

        info!("Starting bluetooth scan for service {}", self.service_filter);
        if let Err(e) = adapter.scan(&[self.service_filter]).await {
            error!("Failed to start scan: {}", e);
            return;
        }
        self.scanning = true;
        self.watchdog = Some(ScheduledTask::every(
            self.inbox.clone(),
            self.rescan_interval,
            Message::ScanWatchdog,
        ));
    }

    /// Disarm the watchdog and halt discovery. Idempotent.
    pub async fn stop_scanning(&mut self, adapter: &dyn LinkAdapter) {
        if !self.scanning {
            return;
        }

        info!("Stopping Bluetooth scan.");
        self.scanning = false;
        self.watchdog = None;
        if let Err(e) = adapter.stop_scan().await {
            warn!("Failed to stop scan: {}", e);
        }
    }

    /// Watchdog firing. Restarts discovery only while still scanning and unconnected.
    pub async fn on_watchdog(&mut self, adapter: &dyn LinkAdapter, connected: bool) {
        if !self.scanning || connected {
            return;
        }

        info!("Restarting scan...");
        if let Err(e) = adapter.stop_scan().await {
            warn!("Failed to stop scan before restart: {}", e);
        }
        if let Err(e) = adapter.scan(&[self.service_filter]).await {
            error!("Failed to restart scan: {}", e);
        }
    }
}
