//! Ringout manager
//! The single actor that owns the connection phase, scan state, alert session
//! and pending notification. Adapter callbacks, timer firings and operator
//! requests all arrive as [`Message`]s on one inbox and are applied in order.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, anyhow};
use log::{debug, info, warn};
use tokio::sync::{mpsc, watch};

use crate::core::alert::{AlertController, AudioOutput, HapticOutput};
use crate::core::bluetooth::adapter::{LinkAdapter, LinkEvents};
use crate::core::bluetooth::connection::{ConnectionMachine, Effect};
use crate::core::bluetooth::protocol::Signal;
use crate::core::bluetooth::scanner::ScanSupervisor;
use crate::core::bluetooth::types::{ConnectionPhase, LinkEvent, LinkStatus, TargetProfile};
use crate::core::notification::{NotificationDispatcher, Notifier};

/// Everything the manager reacts to.
#[derive(Debug, Clone)]
pub enum Message {
    Link(LinkEvent),
    /// Explicit start request. Only scans once the adapter is powered on.
    Start,
    ScanWatchdog,
    AlertExpired(u64),
    ManualTrigger,
    ManualTestElapsed,
    Shutdown,
}

/// Tunables of the connection and alert policies.
#[derive(Debug, Clone)]
pub struct ManagerSettings {
    pub target: TargetProfile,
    pub alert_duration: Duration,
    pub rescan_interval: Duration,
    pub badge_reset_delay: Duration,
}

/// User-facing output ports.
#[derive(Clone)]
pub struct Outputs {
    pub audio: Arc<dyn AudioOutput>,
    pub haptics: Arc<dyn HapticOutput>,
    pub notifier: Arc<dyn Notifier>,
}

/// The manager's inbox. Created first so the adapter can be handed its event sink.
pub struct Inbox {
    tx: mpsc::UnboundedSender<Message>,
    rx: mpsc::UnboundedReceiver<Message>,
}

impl Inbox {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx }
    }

    pub fn link_events(&self) -> LinkEvents {
        LinkEvents::new(self.tx.clone())
    }
}

impl Default for Inbox {
    fn default() -> Self {
        Self::new()
    }
}

pub struct RingoutManager {
    adapter: Arc<dyn LinkAdapter>,
    machine: ConnectionMachine,
    scanner: ScanSupervisor,
    alert: AlertController,
    dispatcher: NotificationDispatcher,
    status_tx: watch::Sender<LinkStatus>,
    tx: mpsc::UnboundedSender<Message>,
    rx: mpsc::UnboundedReceiver<Message>,
}

impl RingoutManager {
    /// Must be called inside a tokio runtime: the notification worker is spawned here.
    pub fn new(
        inbox: Inbox,
        adapter: Arc<dyn LinkAdapter>,
        outputs: Outputs,
        settings: ManagerSettings,
    ) -> Self {
        let Inbox { tx, rx } = inbox;
        let scanner =
            ScanSupervisor::new(settings.target.service, settings.rescan_interval, tx.clone());
        let alert = AlertController::new(
            outputs.audio,
            outputs.haptics,
            settings.alert_duration,
            tx.clone(),
        );
        let dispatcher = NotificationDispatcher::new(outputs.notifier, settings.badge_reset_delay);
        let (status_tx, _) = watch::channel(LinkStatus::default());

        Self {
            adapter,
            machine: ConnectionMachine::new(settings.target),
            scanner,
            alert,
            dispatcher,
            status_tx,
            tx,
            rx,
        }
    }

    pub fn handle(&self) -> ManagerHandle {
        ManagerHandle {
            tx: self.tx.clone(),
            status: self.status_tx.subscribe(),
        }
    }

    pub fn phase(&self) -> ConnectionPhase {
        self.machine.phase()
    }

    pub fn is_scanning(&self) -> bool {
        self.scanner.is_scanning()
    }

    pub fn is_alert_active(&self) -> bool {
        self.alert.is_active()
    }

    pub fn status(&self) -> LinkStatus {
        self.status_tx.borrow().clone()
    }

    /// Drain the inbox until a shutdown request.
    pub async fn run(mut self) {
        info!("Ringout manager started, looking for {}", self.machine.target().name);
        while let Some(message) = self.rx.recv().await {
            if !self.process(message).await {
                break;
            }
        }
        self.teardown().await;
    }

    /// Apply one message. Returns false once the manager should stop.
    pub async fn process(&mut self, message: Message) -> bool {
        match message {
            Message::Link(event) => {
                debug!("Link event: {:?}", event);
                let effects = self.machine.handle(event);
                if effects.is_empty() {
                    debug!("Event ignored in phase {:?}", self.machine.phase());
                }
                self.apply(effects).await;
            }
            Message::Start => {
                let effects = self.machine.start();
                if effects.is_empty() {
                    info!(
                        "Start ignored in phase {:?}: {}",
                        self.machine.phase(),
                        self.machine.status_text()
                    );
                }
                self.apply(effects).await;
            }
            Message::ScanWatchdog => {
                let connected = self.machine.phase() != ConnectionPhase::Scanning;
                self.scanner.on_watchdog(self.adapter.as_ref(), connected).await;
            }
            Message::AlertExpired(session_id) => self.alert.on_expired(session_id),
            Message::ManualTrigger => {
                self.alert.manual_trigger(&mut self.dispatcher);
                self.write_signal(Signal::Trigger).await;
            }
            Message::ManualTestElapsed => {
                self.alert.on_manual_test_elapsed();
                self.write_signal(Signal::Stop).await;
            }
            Message::Shutdown => return false,
        }
        self.publish_status();
        true
    }

    /// Wait until every notification issued so far reached the notifier.
    pub async fn flush_notifications(&self) {
        self.dispatcher.flush().await;
    }

    async fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Entered(phase) => info!("Connection phase: {:?}", phase),
                Effect::StartScan => self.scanner.start_scanning(self.adapter.as_ref()).await,
                Effect::StopScan => self.scanner.stop_scanning(self.adapter.as_ref()).await,
                Effect::Connect(peripheral) => {
                    info!(
                        "Found target device {} ({}), connecting",
                        peripheral.name,
                        peripheral.address().unwrap_or_else(|| peripheral.id.clone())
                    );
                    if let Err(e) = self.adapter.connect(&peripheral).await {
                        // Fed back through the inbox, behind anything already queued.
                        let _ = self.tx.send(Message::Link(LinkEvent::ConnectFailed {
                            reason: e.to_string(),
                        }));
                    }
                }
                Effect::Disconnect => {
                    if let Err(e) = self.adapter.disconnect().await {
                        warn!("Failed to release link: {}", e);
                    }
                }
                Effect::DiscoverServices(service) => {
                    if let Err(e) = self.adapter.discover_services(service).await {
                        warn!("Service discovery request failed: {}", e);
                    }
                }
                Effect::DiscoverCharacteristics { service, characteristics } => {
                    if let Err(e) = self
                        .adapter
                        .discover_characteristics(service, &characteristics)
                        .await
                    {
                        warn!("Characteristic discovery request failed: {}", e);
                    }
                }
                Effect::EnableNotify(characteristic) => {
                    if let Err(e) = self.adapter.set_notify(characteristic, true).await {
                        warn!("Failed to enable notifications: {}", e);
                    }
                }
                Effect::Notify(kind) => self.dispatcher.notify_kind(kind),
                Effect::Inbound(signal) => {
                    info!("Inbound signal: {:?}", signal);
                    self.alert.on_inbound_signal(signal, &mut self.dispatcher);
                }
            }
        }
    }

    async fn write_signal(&self, signal: Signal) {
        let Some(characteristic) = self.machine.write_channel() else {
            debug!("Write channel not resolved, not sending {:?}", signal);
            return;
        };
        info!("Sending {:?} to peripheral", signal);
        if let Err(e) = self.adapter.write(characteristic, &signal.to_bytes()).await {
            warn!("Failed to write {:?}: {}", signal, e);
        }
    }

    fn publish_status(&self) {
        let next = LinkStatus {
            phase: self.machine.phase(),
            connected: self.machine.is_ready(),
            status_text: self.machine.status_text().to_string(),
            alert_active: self.alert.is_active(),
            peripheral: self.machine.peripheral().cloned(),
        };
        self.status_tx.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }

    async fn teardown(&mut self) {
        info!("Ringout manager shutting down");
        self.scanner.stop_scanning(self.adapter.as_ref()).await;
        self.alert.stop_alert();
        if self.machine.phase().is_linked() {
            if let Err(e) = self.adapter.disconnect().await {
                warn!("Failed to disconnect on shutdown: {}", e);
            }
        }
        self.dispatcher.flush().await;
        self.publish_status();
    }
}

/// Cloneable access to a running manager: operator actions and read-only status.
#[derive(Clone)]
pub struct ManagerHandle {
    tx: mpsc::UnboundedSender<Message>,
    status: watch::Receiver<LinkStatus>,
}

impl ManagerHandle {
    pub fn start(&self) -> Result<()> {
        self.send(Message::Start)
    }

    /// Run the manual round-trip test.
    pub fn manual_test(&self) -> Result<()> {
        self.send(Message::ManualTrigger)
    }

    pub fn shutdown(&self) -> Result<()> {
        self.send(Message::Shutdown)
    }

    pub fn status(&self) -> LinkStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<LinkStatus> {
        self.status.clone()
    }

    fn send(&self, message: Message) -> Result<()> {
        self.tx
            .send(message)
            .map_err(|_| anyhow!("Ringout manager is not running"))
    }
}
