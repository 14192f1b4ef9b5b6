//! Record layout configuration
//!
//! The sniffer writes one fixed-size record per frame. The byte layout is
//! the RP1210C read-message format the vendor's Device Tester exports, kept
//! here as explicit, named offsets rather than magic numbers scattered
//! through the decoder. Tests (and the CLI, via a TOML file) can supply an
//! alternate layout without touching any global state.
//!
//! Default layout, 19 bytes per record:
//!
//! | offset | width | field                                           |
//! |--------|-------|-------------------------------------------------|
//! | 0      | 4     | timestamp, f32 big-endian, seconds              |
//! | 4      | 1     | flag byte (see the `FLAG_*` constants)          |
//! | 5      | 3     | PGN, little-endian, 18-bit                      |
//! | 8      | 1     | priority (0-7)                                  |
//! | 9      | 1     | source address                                  |
//! | 10     | 1     | destination address (0xFF for broadcast)        |
//! | 11     | 8     | payload region, zero-padded past the declared length |
//!
//! The flag byte carries the frame-type bits and the declared payload
//! length: bit 0 marks a Tx echo, bit 1 an extended (29-bit) identifier,
//! bit 2 a remote frame, bit 3 is reserved and must be zero, and the high
//! nibble holds the declared data length (0-8).

use serde::{Deserialize, Serialize};

use crate::types::{DecodeError, Result};

/// Width of the big-endian f32 timestamp field
pub const TIMESTAMP_LEN: usize = 4;
/// Width of the little-endian PGN field
pub const PGN_LEN: usize = 3;
/// Width of the payload region (classic CAN)
pub const PAYLOAD_LEN: usize = 8;

/// Flag byte, bit 0: record is the echo of a transmitted message
pub const FLAG_ECHO: u8 = 0x01;
/// Flag byte, bit 1: extended (29-bit) identifier
pub const FLAG_EXTENDED_ID: u8 = 0x02;
/// Flag byte, bit 2: remote frame
pub const FLAG_REMOTE: u8 = 0x04;
/// Flag byte, bit 3: reserved, must be zero
pub const FLAG_RESERVED: u8 = 0x08;

/// Byte offsets of the fields within one capture record
///
/// All offsets are relative to the start of the record; `stride` is the
/// total record size. `Default` is the layout observed in real Nexiq
/// captures. Deserialization fills missing keys from the default, so an
/// override file only needs the fields it changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordLayout {
    /// Total record size in bytes
    pub stride: usize,
    /// Offset of the timestamp field
    pub timestamp: usize,
    /// Offset of the flag byte
    pub flags: usize,
    /// Offset of the PGN field
    pub pgn: usize,
    /// Offset of the priority byte
    pub priority: usize,
    /// Offset of the source address byte
    pub source: usize,
    /// Offset of the destination address byte
    pub destination: usize,
    /// Offset of the payload region
    pub payload: usize,
}

impl Default for RecordLayout {
    fn default() -> Self {
        Self {
            stride: 19,
            timestamp: 0,
            flags: 4,
            pgn: 5,
            priority: 8,
            source: 9,
            destination: 10,
            payload: 11,
        }
    }
}

impl RecordLayout {
    /// Check that every field fits inside the record stride
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("timestamp", self.timestamp, TIMESTAMP_LEN),
            ("flags", self.flags, 1),
            ("pgn", self.pgn, PGN_LEN),
            ("priority", self.priority, 1),
            ("source", self.source, 1),
            ("destination", self.destination, 1),
            ("payload", self.payload, PAYLOAD_LEN),
        ];
        for (name, offset, len) in fields {
            if offset + len > self.stride {
                return Err(DecodeError::InvalidLayout(format!(
                    "{name} field at offset {offset} (width {len}) exceeds the {}-byte record",
                    self.stride
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout_is_valid() {
        assert!(RecordLayout::default().validate().is_ok());
    }

    #[test]
    fn test_out_of_bounds_field_rejected() {
        let layout = RecordLayout {
            payload: 12, // 12 + 8 > 19
            ..RecordLayout::default()
        };
        let err = layout.validate().unwrap_err();
        assert!(matches!(err, DecodeError::InvalidLayout(_)));
        assert!(err.to_string().contains("payload"));
    }

    #[test]
    fn test_alternate_layout_accepted() {
        // A hypothetical 24-byte record with the same fields shuffled around
        let layout = RecordLayout {
            stride: 24,
            timestamp: 20,
            flags: 0,
            pgn: 1,
            priority: 4,
            source: 5,
            destination: 6,
            payload: 7,
        };
        assert!(layout.validate().is_ok());
    }
}
