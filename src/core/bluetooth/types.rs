//! Defines shared data structures for the Bluetooth module.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use uuid::Uuid;

use crate::core::bluetooth::constants::{
    PERIPHERAL_NAME, UUID_RINGOUT_NOTIFY_CHAR, UUID_RINGOUT_SERVICE, UUID_RINGOUT_WRITE_CHAR,
};

/// A MAC address at the end of a platform id.
static TRAILING_ADDRESS: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?:[0-9A-Fa-f]{2}[:-]){5}[0-9A-Fa-f]{2}$").ok());

/// Identity of a discovered peripheral.
///
/// The advertised `name` is the match key; `id` is the platform handle used to
/// reach the device again (a MAC address on most platforms, an opaque UUID on macOS).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeripheralIdentity {
    pub id: String,
    pub name: String,
}

impl PeripheralIdentity {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// Extracts a MAC address from the platform id, if the platform exposes one.
    pub fn address(&self) -> Option<String> {
        let re = TRAILING_ADDRESS.as_ref()?;
        re.find(&self.id).map(|m| m.as_str().to_uppercase())
    }
}

/// The fixed identity of the peripheral we look for and the GATT layout it exposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetProfile {
    pub name: String,
    pub service: Uuid,
    pub write_characteristic: Uuid,
    pub notify_characteristic: Uuid,
}

impl TargetProfile {
    /// Exact string equality, no prefix or case folding.
    pub fn matches(&self, identity: &PeripheralIdentity) -> bool {
        identity.name == self.name
    }
}

impl Default for TargetProfile {
    fn default() -> Self {
        Self {
            name: PERIPHERAL_NAME.to_string(),
            service: UUID_RINGOUT_SERVICE,
            write_characteristic: UUID_RINGOUT_WRITE_CHAR,
            notify_characteristic: UUID_RINGOUT_NOTIFY_CHAR,
        }
    }
}

/// Power/authorization state reported by the Bluetooth stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PowerState {
    PoweredOn,
    PoweredOff,
    Unauthorized,
    Unsupported,
    Other,
}

impl PowerState {
    /// Status text shown while the adapter is in this state.
    pub fn status_text(&self) -> &'static str {
        match self {
            Self::PoweredOn => "Scanning...",
            Self::PoweredOff => "Bluetooth is off",
            Self::Unauthorized => "Bluetooth access denied",
            Self::Unsupported => "Bluetooth not supported",
            Self::Other => "Bluetooth not available",
        }
    }
}

/// Everything the link adapter reports back, in delivery order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    PowerChanged(PowerState),
    Discovered(PeripheralIdentity),
    /// A peripheral the platform already holds a connection to at startup.
    Restored(PeripheralIdentity),
    Connected,
    ConnectFailed { reason: String },
    Disconnected { reason: Option<String> },
    ServicesDiscovered(Vec<Uuid>),
    CharacteristicsDiscovered(Vec<Uuid>),
    ValueUpdated { characteristic: Uuid, value: Vec<u8> },
}

/// Phase of the connection lifecycle. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConnectionPhase {
    Idle,
    Scanning,
    Connecting,
    DiscoveringServices,
    DiscoveringCharacteristics,
    Ready,
    Disconnected,
}

impl ConnectionPhase {
    /// True once the link-level connection exists, whether or not GATT is resolved.
    pub fn is_linked(&self) -> bool {
        matches!(
            self,
            Self::DiscoveringServices | Self::DiscoveringCharacteristics | Self::Ready
        )
    }
}

/// Read-only snapshot published to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkStatus {
    pub phase: ConnectionPhase,
    pub connected: bool,
    pub status_text: String,
    pub alert_active: bool,
    pub peripheral: Option<PeripheralIdentity>,
}

impl Default for LinkStatus {
    fn default() -> Self {
        Self {
            phase: ConnectionPhase::Idle,
            connected: false,
            status_text: "Not connected".to_string(),
            alert_active: false,
            peripheral: None,
        }
    }
}
