//! Error types for the link adapter and the user-facing output ports.

use thiserror::Error;
use uuid::Uuid;

/// Failures reported by a [`LinkAdapter`](crate::core::bluetooth::LinkAdapter).
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("no Bluetooth adapter found")]
    NoAdapter,
    #[error("peripheral {0} has not been discovered")]
    UnknownPeripheral(String),
    #[error("no peripheral connected")]
    NotConnected,
    #[error("characteristic {0} has not been resolved")]
    UnknownCharacteristic(Uuid),
    #[error("service {0} has not been resolved")]
    UnknownService(Uuid),
    #[error(transparent)]
    Bluetooth(#[from] bluest::Error),
}

/// Failures of notification, audio and haptic delivery. Logged, never escalated.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("notification permission not granted")]
    NotAuthorized,
    #[error("tone asset unavailable: {0}")]
    ToneUnavailable(String),
    #[error("output failed: {0}")]
    Output(#[from] std::io::Error),
}
