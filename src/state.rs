//! Application state management
//! This module wires the Bluetooth adapter, the output ports and the manager
//! together and keeps the handle the operator surface talks to.

use std::sync::Arc;

use anyhow::Result;
use log::info;
use tokio::task::JoinHandle;

use crate::config::AppConfig;
use crate::core::bluetooth::{BluestLink, TargetProfile};
use crate::core::outputs::{ConsoleAudio, ConsoleHaptics, ConsoleNotifier};
use crate::core::{Inbox, ManagerHandle, Outputs, RingoutManager};

/// Global application state
pub struct AppState {
    /// Handle to the running manager
    pub manager: ManagerHandle,
    manager_task: JoinHandle<()>,
}

impl AppState {
    /// Opens the Bluetooth adapter and starts the manager. A host without an
    /// adapter still gets a running manager that reports it as unsupported.
    pub async fn new(config: &AppConfig) -> Self {
        info!("Initializing Ringout manager...");
        let inbox = Inbox::new();
        let link = BluestLink::new(inbox.link_events(), config.timing.connect_timeout()).await;
        let link = Arc::new(link);

        let outputs = Outputs {
            audio: Arc::new(ConsoleAudio::new(config.alert.tone_path.clone())),
            haptics: Arc::new(ConsoleHaptics),
            notifier: Arc::new(ConsoleNotifier::new()),
        };
        let manager = RingoutManager::new(inbox, link.clone(), outputs, config.manager_settings());
        let handle = manager.handle();
        let manager_task = tokio::spawn(manager.run());

        // Power state and restoration events land in the inbox the manager is already draining.
        let target = TargetProfile::from(&config.target);
        link.start(&target).await;

        Self {
            manager: handle,
            manager_task,
        }
    }

    /// Gets a clone of the manager handle
    pub fn manager_handle(&self) -> ManagerHandle {
        self.manager.clone()
    }

    /// Requests shutdown and waits for the manager to finish its teardown.
    pub async fn shutdown(self) -> Result<()> {
        self.manager.shutdown()?;
        self.manager_task.await?;
        Ok(())
    }
}
