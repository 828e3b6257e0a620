//! Ringout wire protocol
//! Single-byte ASCII signals exchanged over the notify and write characteristics.

/// Signals understood by both ends of the link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Start the alert ('T')
    Trigger,
    /// Stop the alert ('S')
    Stop,
}

impl Signal {
    /// Convert the signal to its byte representation
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Self::Trigger => b"T".to_vec(),
            Self::Stop => b"S".to_vec(),
        }
    }

    /// Decode an inbound payload. Anything other than exactly "T" or "S" is not a signal.
    pub fn decode(payload: &[u8]) -> Option<Self> {
        match std::str::from_utf8(payload).ok()? {
            "T" => Some(Self::Trigger),
            "S" => Some(Self::Stop),
            _ => None,
        }
    }
}
