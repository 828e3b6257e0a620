use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::bluetooth::{
    PERIPHERAL_NAME, TargetProfile, UUID_RINGOUT_NOTIFY_CHAR, UUID_RINGOUT_SERVICE,
    UUID_RINGOUT_WRITE_CHAR,
};

/// Which peripheral to look for and how its GATT table is laid out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    /// Advertised name, matched exactly.
    pub name: String,
    pub service_uuid: Uuid,
    /// Characteristic we write test signals to.
    pub write_char_uuid: Uuid,
    /// Characteristic the peripheral pushes signals on.
    pub notify_char_uuid: Uuid,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            name: PERIPHERAL_NAME.to_string(),
            service_uuid: UUID_RINGOUT_SERVICE,
            write_char_uuid: UUID_RINGOUT_WRITE_CHAR,
            notify_char_uuid: UUID_RINGOUT_NOTIFY_CHAR,
        }
    }
}

impl From<&TargetConfig> for TargetProfile {
    fn from(config: &TargetConfig) -> Self {
        Self {
            name: config.name.clone(),
            service: config.service_uuid,
            write_characteristic: config.write_char_uuid,
            notify_characteristic: config.notify_char_uuid,
        }
    }
}
