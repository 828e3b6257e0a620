//! Constants used throughout the application
//! This module contains the fixed identity of the Ringout peripheral, its
//! GATT UUIDs, and the timing values of the connection and alert policies.

use uuid::Uuid;

/// The advertised name of the Ringout peripheral
pub const PERIPHERAL_NAME: &str = "ESP32_WROOM_BLE_Ringout";

/// The UUID of the Ringout service (Nordic UART layout)
pub const UUID_RINGOUT_SERVICE: Uuid = Uuid::from_u128(0x6e400001_b5a3_f393_e0a9_e50e24dcca9e);

/// The UUID of the write characteristic (controller -> peripheral)
pub const UUID_RINGOUT_WRITE_CHAR: Uuid = Uuid::from_u128(0x6e400002_b5a3_f393_e0a9_e50e24dcca9e);

/// The UUID of the notify characteristic (peripheral -> controller)
pub const UUID_RINGOUT_NOTIFY_CHAR: Uuid = Uuid::from_u128(0x6e400003_b5a3_f393_e0a9_e50e24dcca9e);

/// How long an alert session lasts without an explicit stop signal, in milliseconds
pub const ALERT_DURATION_MS: u64 = 3000;

/// Interval of the rescan watchdog in seconds
pub const RESCAN_INTERVAL_SECS: u64 = 10;

/// Delay after a delivered notification before the badge is reset, in seconds
pub const BADGE_RESET_DELAY_SECS: u64 = 5;

/// Timeout for a link-level connect attempt in seconds
pub const CONNECT_TIMEOUT_SECS: u64 = 10;
