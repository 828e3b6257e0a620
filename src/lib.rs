//! Ringout bridge library
//! Keeps a Bluetooth LE link to the Ringout peripheral alive and turns its
//! trigger signals into bounded tone, haptic and notification alerts.

// Module declarations
pub mod commands;
pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod state;
