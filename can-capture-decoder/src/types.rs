//! Core types for the capture decoder library
//!
//! This module defines the types that flow through the decode pipeline and
//! the error taxonomy every stage reports through. The pipeline is a single
//! forward pass: records are framed, decoded into frames, paired with their
//! decomposed J1939 identifier and handed to the exporters. Nothing is
//! mutated after creation.

use crate::config::PAYLOAD_LEN;
use crate::j1939::J1939Id;

/// Result type for decoder operations
pub type Result<T> = std::result::Result<T, DecodeError>;

/// Errors that can occur while converting a capture
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The capture ended with a partial record. Terminal for the capture;
    /// frames decoded before it remain valid.
    #[error("truncated record at offset {offset}: {remaining} trailing bytes, record size is {stride}")]
    TruncatedRecord {
        offset: usize,
        remaining: usize,
        stride: usize,
    },

    /// A record failed field validation. Aborts the whole capture so that a
    /// parsing bug never produces a silently incomplete export.
    #[error("malformed frame in record {record} at offset {offset}: {reason}")]
    MalformedFrame {
        record: usize,
        offset: usize,
        reason: String,
    },

    /// An output encoding failed. Always fatal.
    #[error("output encoding failed: {0}")]
    Encoding(String),

    /// A record layout with out-of-bounds field offsets was supplied.
    #[error("invalid record layout: {0}")]
    InvalidLayout(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DecodeError {
    /// A malformed-frame error with no position attached yet.
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        DecodeError::MalformedFrame {
            record: 0,
            offset: 0,
            reason: reason.into(),
        }
    }

    /// Attach the originating record's index and byte offset.
    pub(crate) fn at(self, record: usize, offset: usize) -> Self {
        match self {
            DecodeError::MalformedFrame { reason, .. } => {
                DecodeError::MalformedFrame { record, offset, reason }
            }
            other => other,
        }
    }
}

/// One CAN frame decoded from a proprietary sniffer record
///
/// This is the frame as the sniffer saw it, before the identifier is
/// decomposed into its J1939 fields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodedFrame {
    /// Capture-relative timestamp in seconds
    pub timestamp: f64,
    /// The 29-bit extended CAN identifier rebuilt from the record
    pub raw_id: u32,
    /// True if the record was flagged as an extended (29-bit) frame
    pub is_extended: bool,
    /// True if the record was flagged as a remote frame
    pub is_remote: bool,
    /// True if the record is the echo of a message we transmitted
    pub echoed: bool,
    /// Declared payload length (0-8)
    pub data_length: u8,
    /// Payload region, zero-padded beyond `data_length`
    pub data: [u8; PAYLOAD_LEN],
}

impl DecodedFrame {
    /// The payload truncated to its declared length
    pub fn payload(&self) -> &[u8] {
        &self.data[..self.data_length as usize]
    }
}

/// A denormalized frame/identifier pair, ready for either export sink
///
/// Owned transiently per row; the exporters consume slices of these and
/// nothing is retained afterwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExportRow {
    pub frame: DecodedFrame,
    pub id: J1939Id,
}
