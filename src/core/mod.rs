//! Core functionality for the Ringout bridge
//! This module contains the link lifecycle, the alert controller and the
//! notification dispatcher, all driven by the manager actor.

pub mod alert;
pub mod bluetooth;
pub mod manager;
pub mod notification;
pub mod outputs;
pub mod timer;

#[cfg(test)]
mod lifecycle;
#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use alert::{AlertController, AudioOutput, HapticOutput};
pub use manager::{Inbox, ManagerHandle, ManagerSettings, Message, Outputs, RingoutManager};
pub use notification::{Notification, NotificationDispatcher, NotificationKind, Notifier};
