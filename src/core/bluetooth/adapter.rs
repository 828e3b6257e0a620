//! The boundary between the connection logic and a Bluetooth stack.
//!
//! Commands on [`LinkAdapter`] return as soon as the request is issued.
//! Their outcomes come back later as [`LinkEvent`]s through [`LinkEvents`],
//! which feeds the manager's inbox so every callback is applied on one task,
//! in delivery order.

use async_trait::async_trait;
use log::trace;
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

use crate::core::bluetooth::types::{LinkEvent, PeripheralIdentity};
use crate::core::manager::Message;
use crate::error::LinkError;

/// Commands a Bluetooth central stack must support.
#[async_trait]
pub trait LinkAdapter: Send + Sync {
    /// Start discovery filtered to `services`, reporting duplicate advertisements.
    async fn scan(&self, services: &[Uuid]) -> Result<(), LinkError>;

    /// Halt discovery. Calling it while not scanning is harmless.
    async fn stop_scan(&self) -> Result<(), LinkError>;

    /// Request a link-level connection; answered by `Connected` or `ConnectFailed`.
    async fn connect(&self, peripheral: &PeripheralIdentity) -> Result<(), LinkError>;

    /// Drop the link to the connected peripheral, if any.
    async fn disconnect(&self) -> Result<(), LinkError>;

    /// Answered by `ServicesDiscovered`.
    async fn discover_services(&self, service: Uuid) -> Result<(), LinkError>;

    /// Answered by `CharacteristicsDiscovered`.
    async fn discover_characteristics(
        &self,
        service: Uuid,
        characteristics: &[Uuid],
    ) -> Result<(), LinkError>;

    /// Enable or disable `ValueUpdated` delivery for a characteristic.
    async fn set_notify(&self, characteristic: Uuid, enabled: bool) -> Result<(), LinkError>;

    /// Acknowledged write. The outcome is only logged.
    async fn write(&self, characteristic: Uuid, value: &[u8]) -> Result<(), LinkError>;
}

/// Sending half used by adapters to report events to the manager.
#[derive(Debug, Clone)]
pub struct LinkEvents {
    tx: UnboundedSender<Message>,
}

impl LinkEvents {
    pub fn new(tx: UnboundedSender<Message>) -> Self {
        Self { tx }
    }

    pub fn emit(&self, event: LinkEvent) {
        if self.tx.send(Message::Link(event)).is_err() {
            trace!("Link event dropped, manager has shut down");
        }
    }
}
