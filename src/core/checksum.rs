//! Payload checksum policy.
//!
//! A connection picks a [`ChecksumMode`] once; the flush cycle uses it to decide
//! whether the checksum header is written when it finalizes framing on the
//! connection's behalf.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumMode {
    /// Length-only framing
    #[default]
    Disabled,
    /// CRC-32 (IEEE) over the payload
    Crc32,
}

impl ChecksumMode {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, ChecksumMode::Disabled)
    }

    /// Checksum of `payload` under this mode. `0` when disabled.
    pub fn compute(&self, payload: &[u8]) -> u32 {
        match self {
            ChecksumMode::Disabled => 0,
            ChecksumMode::Crc32 => crc32fast::hash(payload),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc32_known_vector() {
        assert_eq!(ChecksumMode::Crc32.compute(b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn test_disabled() {
        assert!(!ChecksumMode::Disabled.is_enabled());
        assert_eq!(ChecksumMode::Disabled.compute(b"anything"), 0);
    }
}
