//! Alert handling for inbound Ringout signals
//! This module turns a trigger signal into a bounded tone + haptic + notification
//! alert, with at most one alert session alive at a time.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info};
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::Instant;

use crate::core::bluetooth::protocol::Signal;
use crate::core::manager::Message;
use crate::core::notification::{NotificationDispatcher, NotificationKind};
use crate::core::timer::ScheduledTask;
use crate::error::DeliveryError;

/// Plays the alert tone asset.
pub trait AudioOutput: Send + Sync {
    fn play_tone(&self) -> Result<(), DeliveryError>;
    fn stop_tone(&self);
}

/// Issues a single haptic pulse.
pub trait HapticOutput: Send + Sync {
    fn pulse(&self);
}

/// One active alert.
#[derive(Debug)]
pub struct AlertSession {
    pub id: u64,
    pub started_at: Instant,
    pub expires_at: Instant,
    expiry: ScheduledTask,
}

pub struct AlertController {
    audio: Arc<dyn AudioOutput>,
    haptics: Arc<dyn HapticOutput>,
    duration: Duration,
    inbox: UnboundedSender<Message>,
    session: Option<AlertSession>,
    next_session_id: u64,
    manual_test: Option<ScheduledTask>,
}

impl AlertController {
    pub fn new(
        audio: Arc<dyn AudioOutput>,
        haptics: Arc<dyn HapticOutput>,
        duration: Duration,
        inbox: UnboundedSender<Message>,
    ) -> Self {
        Self {
            audio,
            haptics,
            duration,
            inbox,
            session: None,
            next_session_id: 0,
            manual_test: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<&AlertSession> {
        self.session.as_ref()
    }

    /// Dispatch a decoded inbound payload.
    pub fn on_inbound_signal(&mut self, signal: Signal, dispatcher: &mut NotificationDispatcher) {
        match signal {
            Signal::Trigger => {
                self.start_alert(dispatcher);
            }
            Signal::Stop => {
                self.stop_alert();
            }
        }
    }

    /// Start an alert session. Returns false if one is already active; the
    /// running session keeps its original deadline.
    pub fn start_alert(&mut self, dispatcher: &mut NotificationDispatcher) -> bool {
        if self.session.is_some() {
            debug!("Alert already active, ignoring trigger");
            return false;
        }

        self.next_session_id += 1;
        let id = self.next_session_id;
        let started_at = Instant::now();
        info!("Alert session {} started", id);

        self.haptics.pulse();
        self.play_tone();
        dispatcher.notify_kind(NotificationKind::AlertTriggered);

        // The stop signal may never arrive if the link drops mid-alert.
        let expiry =
            ScheduledTask::once(self.inbox.clone(), self.duration, Message::AlertExpired(id));
        self.session = Some(AlertSession {
            id,
            started_at,
            expires_at: started_at + self.duration,
            expiry,
        });
        true
    }

    /// End the active session. Returns false if there was none.
    pub fn stop_alert(&mut self) -> bool {
        let Some(session) = self.session.take() else {
            return false;
        };

        session.expiry.cancel();
        self.haptics.pulse();
        self.audio.stop_tone();
        info!(
            "Alert session {} stopped after {:?}",
            session.id,
            session.started_at.elapsed()
        );
        true
    }

    /// Auto-expiry firing. Ignored unless it belongs to the live session.
    pub fn on_expired(&mut self, session_id: u64) {
        match &self.session {
            Some(session) if session.id == session_id => {
                info!("Alert session {} expired", session_id);
                self.stop_alert();
            }
            _ => debug!("Stale expiry for alert session {}", session_id),
        }
    }

    /// Operator test path: same haptic, tone and notification as a real alert,
    /// without opening a session. The manager writes the outbound signals.
    pub fn manual_trigger(&mut self, dispatcher: &mut NotificationDispatcher) {
        info!("Test beep triggered");
        self.haptics.pulse();
        self.play_tone();
        dispatcher.notify_kind(NotificationKind::ManualTest);
        self.manual_test = Some(ScheduledTask::once(
            self.inbox.clone(),
            self.duration,
            Message::ManualTestElapsed,
        ));
    }

    /// End of the manual test window. Silences the test tone unless a real alert took over.
    pub fn on_manual_test_elapsed(&mut self) {
        self.manual_test = None;
        if self.session.is_none() {
            self.audio.stop_tone();
        }
    }

    fn play_tone(&self) {
        if let Err(e) = self.audio.play_tone() {
            error!("Error playing beep sound: {}", e);
        }
    }
}
