//! Connection lifecycle state machine
//!
//! ```text
//!  Idle ──power on──▶ Scanning ──name match──▶ Connecting ──connected──▶ DiscoveringServices
//!                       ▲   ▲                     │                          │ service found
//!                       │   └──connect failed─────┘                          ▼
//!                       │                                          DiscoveringCharacteristics
//!                       │                                                    │ both resolved
//!                       └───────────── Disconnected ◀──disconnect/power off── Ready
//! ```
//!
//! [`ConnectionMachine::handle`] is a pure function of (state, event) that
//! returns the side effects to perform. The manager executes them against the
//! adapter, the scan supervisor and the notification dispatcher.

use uuid::Uuid;

use crate::core::bluetooth::protocol::Signal;
use crate::core::bluetooth::types::{
    ConnectionPhase, LinkEvent, PeripheralIdentity, PowerState, TargetProfile,
};
use crate::core::notification::NotificationKind;

/// Side effect requested by a transition, in the order it must be applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// The machine entered a new phase.
    Entered(ConnectionPhase),
    StartScan,
    StopScan,
    Connect(PeripheralIdentity),
    /// Release the link, or abandon a pending connect, at the adapter.
    Disconnect,
    DiscoverServices(Uuid),
    DiscoverCharacteristics { service: Uuid, characteristics: Vec<Uuid> },
    EnableNotify(Uuid),
    Notify(NotificationKind),
    Inbound(Signal),
}

/// Write and notify handles resolved during characteristic discovery.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Channels {
    write: Option<Uuid>,
    notify: Option<Uuid>,
}

/// Owns the peripheral identity, the connection phase and the reconnect policy.
#[derive(Debug)]
pub struct ConnectionMachine {
    target: TargetProfile,
    phase: ConnectionPhase,
    peripheral: Option<PeripheralIdentity>,
    channels: Channels,
    powered: bool,
    status_text: String,
}

impl ConnectionMachine {
    pub fn new(target: TargetProfile) -> Self {
        Self {
            target,
            phase: ConnectionPhase::Idle,
            peripheral: None,
            channels: Channels::default(),
            powered: false,
            status_text: "Not connected".to_string(),
        }
    }

    pub fn phase(&self) -> ConnectionPhase {
        self.phase
    }

    pub fn target(&self) -> &TargetProfile {
        &self.target
    }

    pub fn peripheral(&self) -> Option<&PeripheralIdentity> {
        self.peripheral.as_ref()
    }

    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    pub fn is_ready(&self) -> bool {
        self.phase == ConnectionPhase::Ready
    }

    /// The write channel, only while `Ready`.
    pub fn write_channel(&self) -> Option<Uuid> {
        if self.is_ready() { self.channels.write } else { None }
    }

    /// Explicit start request. Does nothing until the adapter has reported power-on.
    pub fn start(&mut self) -> Vec<Effect> {
        if !self.powered {
            return Vec::new();
        }
        self.handle(LinkEvent::PowerChanged(PowerState::PoweredOn))
    }

    /// Apply one adapter event and return the effects to execute.
    pub fn handle(&mut self, event: LinkEvent) -> Vec<Effect> {
        let mut effects = Vec::new();

        match event {
            LinkEvent::PowerChanged(PowerState::PoweredOn) => {
                self.powered = true;
                if matches!(self.phase, ConnectionPhase::Idle | ConnectionPhase::Disconnected) {
                    self.begin_scanning(&mut effects, PowerState::PoweredOn.status_text());
                }
            }
            LinkEvent::PowerChanged(state) => {
                self.powered = false;
                effects.push(Effect::StopScan);
                match self.phase {
                    phase if phase.is_linked() => {
                        effects.push(Effect::Disconnect);
                        self.drop_link(&mut effects);
                    }
                    ConnectionPhase::Connecting => {
                        effects.push(Effect::Disconnect);
                        self.enter(ConnectionPhase::Idle, &mut effects);
                    }
                    ConnectionPhase::Scanning => self.enter(ConnectionPhase::Idle, &mut effects),
                    _ => {}
                }
                self.status_text = state.status_text().to_string();
            }
            LinkEvent::Discovered(identity) => {
                if self.phase == ConnectionPhase::Scanning && self.target.matches(&identity) {
                    effects.push(Effect::StopScan);
                    self.begin_connecting(identity, &mut effects);
                }
            }
            LinkEvent::Restored(identity) => {
                let can_restore = matches!(
                    self.phase,
                    ConnectionPhase::Idle
                        | ConnectionPhase::Scanning
                        | ConnectionPhase::Disconnected
                );
                if can_restore && self.target.matches(&identity) {
                    if self.phase == ConnectionPhase::Scanning {
                        effects.push(Effect::StopScan);
                    }
                    self.begin_connecting(identity, &mut effects);
                }
            }
            LinkEvent::Connected => {
                if self.phase == ConnectionPhase::Connecting {
                    self.enter(ConnectionPhase::DiscoveringServices, &mut effects);
                    self.status_text = "Discovering services...".to_string();
                    effects.push(Effect::DiscoverServices(self.target.service));
                }
            }
            LinkEvent::ConnectFailed { .. } => {
                if self.phase == ConnectionPhase::Connecting {
                    self.begin_scanning(&mut effects, "Failed to connect");
                }
            }
            LinkEvent::Disconnected { .. } => match self.phase {
                phase if phase.is_linked() => self.drop_link(&mut effects),
                ConnectionPhase::Connecting => {
                    self.begin_scanning(&mut effects, "Failed to connect")
                }
                _ => {}
            },
            LinkEvent::ServicesDiscovered(services) => {
                if self.phase == ConnectionPhase::DiscoveringServices
                    && services.contains(&self.target.service)
                {
                    self.enter(ConnectionPhase::DiscoveringCharacteristics, &mut effects);
                    self.status_text = "Discovering characteristics...".to_string();
                    effects.push(Effect::DiscoverCharacteristics {
                        service: self.target.service,
                        characteristics: vec![
                            self.target.write_characteristic,
                            self.target.notify_characteristic,
                        ],
                    });
                }
            }
            LinkEvent::CharacteristicsDiscovered(characteristics) => {
                if self.phase == ConnectionPhase::DiscoveringCharacteristics {
                    for uuid in characteristics {
                        if uuid == self.target.write_characteristic {
                            self.channels.write = Some(uuid);
                        } else if uuid == self.target.notify_characteristic {
                            self.channels.notify = Some(uuid);
                        }
                    }
                    if let (Some(_), Some(notify)) = (self.channels.write, self.channels.notify) {
                        effects.push(Effect::EnableNotify(notify));
                        self.enter(ConnectionPhase::Ready, &mut effects);
                        self.status_text = "Connected".to_string();
                        effects.push(Effect::StopScan);
                        effects.push(Effect::Notify(NotificationKind::ConnectionEstablished));
                    }
                }
            }
            LinkEvent::ValueUpdated { characteristic, value } => {
                if self.is_ready() && self.channels.notify == Some(characteristic) {
                    if let Some(signal) = Signal::decode(&value) {
                        effects.push(Effect::Inbound(signal));
                    }
                }
            }
        }

        effects
    }

    fn enter(&mut self, phase: ConnectionPhase, effects: &mut Vec<Effect>) {
        self.phase = phase;
        effects.push(Effect::Entered(phase));
    }

    fn begin_scanning(&mut self, effects: &mut Vec<Effect>, status: &str) {
        self.enter(ConnectionPhase::Scanning, effects);
        self.status_text = status.to_string();
        effects.push(Effect::StartScan);
    }

    fn begin_connecting(&mut self, identity: PeripheralIdentity, effects: &mut Vec<Effect>) {
        self.enter(ConnectionPhase::Connecting, effects);
        self.status_text = "Connecting...".to_string();
        self.peripheral = Some(identity.clone());
        effects.push(Effect::Connect(identity));
    }

    /// Linked phase → Disconnected, then straight back to scanning if the adapter is up.
    fn drop_link(&mut self, effects: &mut Vec<Effect>) {
        self.channels = Channels::default();
        self.enter(ConnectionPhase::Disconnected, effects);
        self.status_text = "Disconnected".to_string();
        effects.push(Effect::Notify(NotificationKind::ConnectionLost));
        if self.powered {
            self.begin_scanning(effects, "Disconnected");
        }
    }
}
