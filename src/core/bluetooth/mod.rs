//! Bluetooth functionality for the Ringout bridge
//! This module handles the link to the Ringout peripheral: scanning,
//! connecting, GATT resolution and the signals exchanged over it.

pub mod adapter;
mod bluest_link;
pub mod connection;
mod constants;
pub mod protocol;
pub mod scanner;
pub mod types;

// Re-export types that should be publicly accessible
pub use adapter::{LinkAdapter, LinkEvents};
pub use bluest_link::BluestLink;
pub use connection::{ConnectionMachine, Effect};
pub use constants::*; // Re-export all constants
pub use protocol::Signal;
pub use scanner::ScanSupervisor;
pub use types::{
    ConnectionPhase, LinkEvent, LinkStatus, PeripheralIdentity, PowerState, TargetProfile,
};
