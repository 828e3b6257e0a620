//! User notification dispatch
//! Serializes user-visible notifications through a single worker so that the
//! newest notification always supersedes everything before it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error, info, warn};
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::DeliveryError;

/// Notification categories used by the bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NotificationKind {
    ConnectionEstablished,
    ConnectionLost,
    AlertTriggered,
    ManualTest,
}

impl NotificationKind {
    pub fn notification(&self) -> Notification {
        let (title, body) = match self {
            Self::ConnectionEstablished => ("Bluetooth", "Connected to device"),
            Self::ConnectionLost => ("Bluetooth", "Device disconnected"),
            Self::AlertTriggered => ("Alert", "Cable found!"),
            Self::ManualTest => ("Test", "Testing notification system"),
        };
        Notification::new(title, body, *self)
    }

    /// The manual test only shows up when the user granted permission.
    fn requires_authorization(&self) -> bool {
        matches!(self, Self::ManualTest)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub category: NotificationKind,
    /// Maximum interruption level, surfaces while foregrounded or locked.
    pub critical: bool,
    /// Badge count shown with the notification
    pub badge: u32,
    /// Play the system alert tone with the notification
    pub sound: bool,
}

impl Notification {
    pub fn new(
        title: impl Into<String>,
        body: impl Into<String>,
        category: NotificationKind,
    ) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            category,
            critical: true,
            badge: 1,
            sound: true,
        }
    }
}

/// Platform notification center.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn request_permission(&self) -> Result<bool, DeliveryError>;

    async fn is_authorized(&self) -> bool;

    async fn deliver(&self, notification: &Notification) -> Result<(), DeliveryError>;

    /// Remove every pending and every delivered notification.
    async fn clear_all(&self);

    async fn reset_badge(&self) -> Result<(), DeliveryError>;
}

enum Request {
    Deliver(Notification),
    Flush(oneshot::Sender<()>),
}

/// Single-slot mailbox in front of a [`Notifier`].
///
/// `notify` never blocks; delivery happens on a worker task in call order.
/// Dropping the dispatcher lets queued deliveries drain, then the worker exits
/// and cancels its pending badge reset.
pub struct NotificationDispatcher {
    tx: mpsc::UnboundedSender<Request>,
    pending: Option<Notification>,
}

impl NotificationDispatcher {
    /// Spawn the delivery worker. Permission is requested before the first delivery.
    pub fn new(notifier: Arc<dyn Notifier>, badge_reset_delay: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(Self::run_worker(notifier, badge_reset_delay, rx));
        Self { tx, pending: None }
    }

    /// The most recent notification handed to the dispatcher.
    pub fn pending(&self) -> Option<&Notification> {
        self.pending.as_ref()
    }

    pub fn notify_kind(&mut self, kind: NotificationKind) {
        self.notify(kind.notification());
    }

    /// Supersede whatever is pending or delivered with `notification`.
    pub fn notify(&mut self, notification: Notification) {
        info!(
            "Attempting to show notification: {} - {}",
            notification.title, notification.body
        );
        self.pending = Some(notification.clone());
        if self.tx.send(Request::Deliver(notification)).is_err() {
            error!("Notification worker is gone, dropping notification");
        }
    }

    /// Wait until every notification issued so far has been handed to the notifier.
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(Request::Flush(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
    }

    async fn run_worker(
        notifier: Arc<dyn Notifier>,
        badge_reset_delay: Duration,
        mut rx: mpsc::UnboundedReceiver<Request>,
    ) {
        match notifier.request_permission().await {
            Ok(true) => info!("Notification permission granted"),
            Ok(false) => warn!("Notification permission not granted"),
            Err(e) => error!("Notification permission error: {}", e),
        }

        let mut badge_reset: Option<JoinHandle<()>> = None;

        while let Some(request) = rx.recv().await {
            let notification = match request {
                Request::Deliver(notification) => notification,
                Request::Flush(done) => {
                    let _ = done.send(());
                    continue;
                }
            };

            if notification.category.requires_authorization() && !notifier.is_authorized().await {
                warn!("Notification permission not granted, skipping {:?}", notification.category);
                continue;
            }

            notifier.clear_all().await;

            match notifier.deliver(&notification).await {
                Ok(()) => {
                    debug!("Successfully queued notification");
                    if let Some(previous) = badge_reset.take() {
                        previous.abort();
                    }
                    let notifier = notifier.clone();
                    badge_reset = Some(tokio::spawn(async move {
                        tokio::time::sleep(badge_reset_delay).await;
                        if let Err(e) = notifier.reset_badge().await {
                            warn!("Failed to reset badge count: {}", e);
                        }
                    }));
                }
                Err(e) => error!("Failed to show notification: {}", e),
            }
        }

        if let Some(task) = badge_reset {
            task.abort();
        }
        debug!("Notification worker stopped");
    }
}
