//! J1939 29-bit identifier handling
//!
//! The extended CAN identifier packs the J1939 addressing fields into one
//! 29-bit word:
//!
//! ```text
//!  28..26    25    24    23..16      15..8          7..0
//! priority  EDP   DP   PDU format  PDU specific  source address
//!          |------------- PGN (18 bits) ------|
//! ```
//!
//! PDU format below 240 means peer-to-peer (PDU1): the PDU-specific byte is
//! the destination address and is not part of the PGN. 240 and above means
//! broadcast (PDU2): the PDU-specific byte is the group extension and the
//! PGN covers it. All of the bit surgery lives in this one value type so
//! that callers never do identifier arithmetic themselves.

use crate::types::{DecodeError, Result};

/// Largest value of a 29-bit extended identifier
pub const MAX_RAW_ID: u32 = 0x1FFF_FFFF;
/// Largest valid Parameter Group Number (18 bits)
pub const MAX_PGN: u32 = 0x3_FFFF;
/// First PDU2 (broadcast) PDU-format value
pub const PDU2_FORMAT_START: u8 = 240;

/// A decomposed J1939 extended identifier
///
/// Construction always validates, and `from_raw`/`raw()` are exact
/// inverses: decomposing an identifier and recomposing it yields the same
/// 29 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct J1939Id {
    priority: u8,
    pgn: u32,
    source: u8,
    destination: Option<u8>,
}

impl J1939Id {
    /// Decompose a 29-bit identifier into its J1939 fields
    ///
    /// Fails if the value does not fit in 29 bits or if the reserved
    /// EDP/data-page bits are set (only data page 0 is valid here).
    pub fn from_raw(raw: u32) -> Result<Self> {
        if raw > MAX_RAW_ID {
            return Err(DecodeError::malformed(format!(
                "identifier 0x{raw:08X} does not fit in 29 bits"
            )));
        }
        let reserved = (raw >> 24) & 0x3;
        if reserved != 0 {
            return Err(DecodeError::malformed(format!(
                "EDP/data-page bits set in identifier 0x{raw:08X}"
            )));
        }
        let priority = ((raw >> 26) & 0x7) as u8;
        let pf = ((raw >> 16) & 0xFF) as u8;
        let ps = ((raw >> 8) & 0xFF) as u8;
        let source = (raw & 0xFF) as u8;
        let (pgn, destination) = if pf < PDU2_FORMAT_START {
            // peer-to-peer: PS is the destination, not part of the PGN
            ((pf as u32) << 8, Some(ps))
        } else {
            (((pf as u32) << 8) | ps as u32, None)
        };
        Ok(Self {
            priority,
            pgn,
            source,
            destination,
        })
    }

    /// Build an identifier from decomposed fields
    ///
    /// PDU1 PGNs (format < 240) must have a zero PDU-specific byte and carry
    /// their destination out-of-band; PDU2 PGNs must not carry one.
    pub fn from_fields(
        priority: u8,
        pgn: u32,
        source: u8,
        destination: Option<u8>,
    ) -> Result<Self> {
        if priority > 7 {
            return Err(DecodeError::malformed(format!(
                "priority {priority} out of range (0-7)"
            )));
        }
        if pgn > MAX_PGN {
            return Err(DecodeError::malformed(format!(
                "PGN 0x{pgn:X} exceeds 18 bits"
            )));
        }
        let pf = ((pgn >> 8) & 0xFF) as u8;
        if pf < PDU2_FORMAT_START {
            if pgn & 0xFF != 0 {
                return Err(DecodeError::malformed(format!(
                    "PDU1 PGN 0x{pgn:X} has a nonzero PDU-specific byte"
                )));
            }
            if destination.is_none() {
                return Err(DecodeError::malformed(format!(
                    "PDU1 PGN 0x{pgn:X} requires a destination address"
                )));
            }
        } else if destination.is_some() {
            return Err(DecodeError::malformed(format!(
                "broadcast PGN 0x{pgn:X} cannot carry a destination address"
            )));
        }
        Ok(Self {
            priority,
            pgn,
            source,
            destination,
        })
    }

    /// Recompose the 29-bit identifier, bit-for-bit
    pub fn raw(&self) -> u32 {
        let ps = match self.destination {
            Some(dest) => dest as u32,
            None => self.pgn & 0xFF,
        };
        ((self.priority as u32) << 26)
            | ((self.pgn & 0x3_FF00) << 8)
            | (ps << 8)
            | self.source as u32
    }

    /// Message priority (0 is highest)
    pub fn priority(&self) -> u8 {
        self.priority
    }

    /// Parameter Group Number
    pub fn pgn(&self) -> u32 {
        self.pgn
    }

    /// Source address of the transmitting node
    pub fn source(&self) -> u8 {
        self.source
    }

    /// Destination address; `None` for broadcast (PDU2) messages
    pub fn destination(&self) -> Option<u8> {
        self.destination
    }

    /// PDU format field (bits 16-23)
    pub fn pdu_format(&self) -> u8 {
        ((self.pgn >> 8) & 0xFF) as u8
    }

    /// PDU specific field (bits 8-15): destination for PDU1, group
    /// extension for PDU2
    pub fn pdu_specific(&self) -> u8 {
        match self.destination {
            Some(dest) => dest,
            None => (self.pgn & 0xFF) as u8,
        }
    }

    /// True for PDU2 (broadcast) messages
    pub fn is_broadcast(&self) -> bool {
        self.destination.is_none()
    }
}
