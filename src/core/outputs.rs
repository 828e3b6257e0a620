//! Console implementations of the output ports
//! Platform audio players and notification centers are outside this crate; on a
//! terminal the tone and the notification sound are the bell character and
//! everything else goes through the log.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Local;
use log::{info, warn};

use crate::core::alert::{AudioOutput, HapticOutput};
use crate::core::notification::{Notification, Notifier};
use crate::error::DeliveryError;

fn ring_bell() -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    stderr.write_all(b"\x07")?;
    stderr.flush()
}

/// Rings the terminal bell in place of the tone asset.
pub struct ConsoleAudio {
    tone: Option<PathBuf>,
    playing: AtomicBool,
}

impl ConsoleAudio {
    pub fn new(tone: Option<PathBuf>) -> Self {
        Self {
            tone,
            playing: AtomicBool::new(false),
        }
    }
}

impl AudioOutput for ConsoleAudio {
    fn play_tone(&self) -> Result<(), DeliveryError> {
        if let Some(path) = &self.tone {
            if !path.exists() {
                return Err(DeliveryError::ToneUnavailable(path.display().to_string()));
            }
            info!("Playing tone {}", path.display());
        }
        ring_bell()?;
        self.playing.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn stop_tone(&self) {
        if self.playing.swap(false, Ordering::SeqCst) {
            info!("Tone stopped");
        }
    }
}

pub struct ConsoleHaptics;

impl HapticOutput for ConsoleHaptics {
    fn pulse(&self) {
        info!("Haptic pulse");
    }
}

/// Prints notifications to stderr. Keeps a single visible slot and a badge count.
pub struct ConsoleNotifier {
    authorized: AtomicBool,
    visible: Mutex<Option<Notification>>,
    badge: Mutex<u32>,
}

impl ConsoleNotifier {
    pub fn new() -> Self {
        Self {
            authorized: AtomicBool::new(false),
            visible: Mutex::new(None),
            badge: Mutex::new(0),
        }
    }

    pub fn visible(&self) -> Option<Notification> {
        self.visible.lock().ok().and_then(|slot| slot.clone())
    }
}

impl Default for ConsoleNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Notifier for ConsoleNotifier {
    async fn request_permission(&self) -> Result<bool, DeliveryError> {
        // A terminal needs no grant.
        self.authorized.store(true, Ordering::SeqCst);
        Ok(true)
    }

    async fn is_authorized(&self) -> bool {
        self.authorized.load(Ordering::SeqCst)
    }

    async fn deliver(&self, notification: &Notification) -> Result<(), DeliveryError> {
        if !self.is_authorized().await {
            return Err(DeliveryError::NotAuthorized);
        }
        if notification.sound {
            ring_bell()?;
        }
        let marker = if notification.critical { "!!" } else { "--" };
        eprintln!(
            "{} [{}] {}: {}",
            marker,
            Local::now().format("%H:%M:%S"),
            notification.title,
            notification.body
        );
        if let Ok(mut slot) = self.visible.lock() {
            *slot = Some(notification.clone());
        }
        if let Ok(mut badge) = self.badge.lock() {
            *badge = notification.badge;
        }
        Ok(())
    }

    async fn clear_all(&self) {
        if let Ok(mut slot) = self.visible.lock() {
            *slot = None;
        }
    }

    async fn reset_badge(&self) -> Result<(), DeliveryError> {
        let mut badge = self.badge.lock().map_err(|_| {
            warn!("Badge state poisoned");
            DeliveryError::Output(std::io::Error::other("badge state poisoned"))
        })?;
        *badge = 0;
        Ok(())
    }
}
