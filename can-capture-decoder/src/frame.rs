//! Sniffer record field decoding
//!
//! Interprets one fixed-size record into a [`DecodedFrame`]. The field
//! offsets come from the [`RecordLayout`] handed in at construction; see
//! `config` for the byte map. Decoding is side-effect-free and validates
//! every field it reads, so a malformed record is reported with its exact
//! position instead of leaking a wrong identifier downstream.

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::config::{
    RecordLayout, FLAG_ECHO, FLAG_EXTENDED_ID, FLAG_REMOTE, FLAG_RESERVED, PAYLOAD_LEN, PGN_LEN,
    TIMESTAMP_LEN,
};
use crate::j1939::{J1939Id, MAX_PGN, PDU2_FORMAT_START};
use crate::record::RawRecord;
use crate::types::{DecodeError, DecodedFrame, Result};

/// Decodes raw capture records into CAN frames
pub struct FrameDecoder {
    layout: RecordLayout,
}

impl FrameDecoder {
    /// Create a decoder for the given record layout
    ///
    /// Fails if the layout's field offsets do not fit inside its stride.
    pub fn new(layout: RecordLayout) -> Result<Self> {
        layout.validate()?;
        Ok(Self { layout })
    }

    /// The layout this decoder was built with
    pub fn layout(&self) -> &RecordLayout {
        &self.layout
    }

    /// Decode one record into a frame
    pub fn decode(&self, record: &RawRecord<'_>) -> Result<DecodedFrame> {
        self.decode_fields(record.bytes)
            .map_err(|e| e.at(record.index, record.offset))
    }

    fn decode_fields(&self, bytes: &[u8]) -> Result<DecodedFrame> {
        let l = &self.layout;
        debug_assert_eq!(bytes.len(), l.stride);

        let flags = bytes[l.flags];
        if flags & FLAG_RESERVED != 0 {
            return Err(DecodeError::malformed(format!(
                "reserved bit set in flag byte 0x{flags:02X}"
            )));
        }
        let data_length = flags >> 4;
        if data_length as usize > PAYLOAD_LEN {
            return Err(DecodeError::malformed(format!(
                "declared data length {data_length} exceeds {PAYLOAD_LEN} bytes"
            )));
        }

        let timestamp =
            BigEndian::read_f32(&bytes[l.timestamp..l.timestamp + TIMESTAMP_LEN]) as f64;
        let pgn_field = LittleEndian::read_u24(&bytes[l.pgn..l.pgn + PGN_LEN]);
        let priority = bytes[l.priority];
        let source = bytes[l.source];
        let destination = bytes[l.destination];

        let id = build_id(pgn_field, priority, source, destination)?;

        let mut data = [0u8; PAYLOAD_LEN];
        data.copy_from_slice(&bytes[l.payload..l.payload + PAYLOAD_LEN]);

        Ok(DecodedFrame {
            timestamp,
            raw_id: id.raw(),
            is_extended: flags & FLAG_EXTENDED_ID != 0,
            is_remote: flags & FLAG_REMOTE != 0,
            echoed: flags & FLAG_ECHO != 0,
            data_length,
            data,
        })
    }
}

/// Assemble the 29-bit identifier from the record's addressing fields
///
/// For peer-to-peer frames the record's destination byte is authoritative;
/// the PDU-specific slot of the record's PGN field is normalized away.
fn build_id(pgn_field: u32, priority: u8, source: u8, destination: u8) -> Result<J1939Id> {
    if pgn_field > MAX_PGN {
        return Err(DecodeError::malformed(format!(
            "PGN field 0x{pgn_field:X} exceeds 18 bits"
        )));
    }
    let pf = ((pgn_field >> 8) & 0xFF) as u8;
    if pf < PDU2_FORMAT_START {
        let ps = (pgn_field & 0xFF) as u8;
        if ps != 0 && ps != destination {
            log::trace!(
                "PDU1 record: PGN field PS byte 0x{ps:02X} disagrees with destination 0x{destination:02X}, using the destination"
            );
        }
        J1939Id::from_fields(priority, pgn_field & 0x3_FF00, source, Some(destination))
    } else {
        J1939Id::from_fields(priority, pgn_field, source, None)
    }
}
