//! Binary measurement export (ASAM MDF 4)
//!
//! Produces the channel-group shape the downstream Bus Logging decoder
//! matches its DBC dictionary against: a single `CAN_DataFrame` group with
//! a float64 time master and the per-frame bus fields. The identifier
//! channel is a plain 32-bit unsigned integer carrying the full 29-bit
//! extended ID — the id-matching logic only recognizes integer channels,
//! so it must never be written as a float or a bit-flagged value.
//!
//! The container is built fully in memory and only handed to the caller
//! after it finalizes, so a failed encode never leaves a corrupt file on
//! disk.

use mdf4_rs::writer::VecWriter;
use mdf4_rs::{DataType, DecodedValue, MdfWriter};

use crate::config::PAYLOAD_LEN;
use crate::types::{DecodeError, ExportRow, Result};

/// Name of the channel group the downstream decoder looks for
pub const CHANNEL_GROUP: &str = "CAN_DataFrame";

/// The source is a single-bus sniffer
const BUS_CHANNEL: u8 = 1;

fn enc(e: mdf4_rs::Error) -> DecodeError {
    DecodeError::Encoding(format!("MF4 write: {e:?}"))
}

/// Encodes the decoded stream into an MF4 measurement container
pub struct Mf4Exporter;

impl Mf4Exporter {
    /// Encode the rows into a finalized MF4 byte buffer, in input order
    pub fn encode(rows: &[ExportRow]) -> Result<Vec<u8>> {
        // upstream validation bounds the length at 8; re-check here because
        // an oversized payload would silently corrupt the record stride
        for (index, row) in rows.iter().enumerate() {
            if row.frame.data_length as usize > PAYLOAD_LEN {
                return Err(DecodeError::Encoding(format!(
                    "row {index}: payload length {} exceeds {PAYLOAD_LEN} bytes",
                    row.frame.data_length
                )));
            }
        }

        let mut writer = MdfWriter::from_writer(VecWriter::new());
        writer.init_mdf_file().map_err(enc)?;

        let cg = writer.add_channel_group(None, |_| {}).map_err(enc)?;
        writer
            .set_channel_group_name(&cg, CHANNEL_GROUP)
            .map_err(enc)?;

        let time_ch = writer
            .add_channel(&cg, None, |ch| {
                ch.data_type = DataType::FloatLE;
                ch.name = Some("t".to_string());
                ch.bit_count = 64;
            })
            .map_err(enc)?;
        writer.set_time_channel(&time_ch).map_err(enc)?;
        writer.set_channel_unit(&time_ch, "s").map_err(enc)?;

        let bus_ch = writer
            .add_channel(&cg, Some(&time_ch), |ch| {
                ch.data_type = DataType::UnsignedIntegerLE;
                ch.name = Some("CAN_DataFrame.BusChannel".to_string());
                ch.bit_count = 8;
            })
            .map_err(enc)?;

        // the id-matching acceptance criterion: unsigned integer, 32 bits
        let id_ch = writer
            .add_channel(&cg, Some(&bus_ch), |ch| {
                ch.data_type = DataType::UnsignedIntegerLE;
                ch.name = Some("CAN_DataFrame.ID".to_string());
                ch.bit_count = 32;
            })
            .map_err(enc)?;

        let ide_ch = writer
            .add_channel(&cg, Some(&id_ch), |ch| {
                ch.data_type = DataType::UnsignedIntegerLE;
                ch.name = Some("CAN_DataFrame.IDE".to_string());
                ch.bit_count = 8;
            })
            .map_err(enc)?;

        let dlc_ch = writer
            .add_channel(&cg, Some(&ide_ch), |ch| {
                ch.data_type = DataType::UnsignedIntegerLE;
                ch.name = Some("CAN_DataFrame.DLC".to_string());
                ch.bit_count = 8;
            })
            .map_err(enc)?;

        let len_ch = writer
            .add_channel(&cg, Some(&dlc_ch), |ch| {
                ch.data_type = DataType::UnsignedIntegerLE;
                ch.name = Some("CAN_DataFrame.DataLength".to_string());
                ch.bit_count = 8;
            })
            .map_err(enc)?;

        let dir_ch = writer
            .add_channel(&cg, Some(&len_ch), |ch| {
                ch.data_type = DataType::UnsignedIntegerLE;
                ch.name = Some("CAN_DataFrame.Dir".to_string());
                ch.bit_count = 8;
            })
            .map_err(enc)?;

        let edl_ch = writer
            .add_channel(&cg, Some(&dir_ch), |ch| {
                ch.data_type = DataType::UnsignedIntegerLE;
                ch.name = Some("CAN_DataFrame.EDL".to_string());
                ch.bit_count = 8;
            })
            .map_err(enc)?;

        let brs_ch = writer
            .add_channel(&cg, Some(&edl_ch), |ch| {
                ch.data_type = DataType::UnsignedIntegerLE;
                ch.name = Some("CAN_DataFrame.BRS".to_string());
                ch.bit_count = 8;
            })
            .map_err(enc)?;

        let mut prev_ch = brs_ch;
        for i in 0..PAYLOAD_LEN {
            prev_ch = writer
                .add_channel(&cg, Some(&prev_ch), |ch| {
                    ch.data_type = DataType::UnsignedIntegerLE;
                    ch.name = Some(format!("CAN_DataFrame.DataBytes_{i}"));
                    ch.bit_count = 8;
                })
                .map_err(enc)?;
        }

        writer.start_data_block_for_cg(&cg, 0).map_err(enc)?;

        for row in rows {
            let frame = &row.frame;
            let mut values = Vec::with_capacity(9 + PAYLOAD_LEN);
            values.push(DecodedValue::Float(frame.timestamp));
            values.push(DecodedValue::UnsignedInteger(BUS_CHANNEL as u64));
            values.push(DecodedValue::UnsignedInteger(frame.raw_id as u64));
            values.push(DecodedValue::UnsignedInteger(frame.is_extended as u64));
            values.push(DecodedValue::UnsignedInteger(frame.data_length as u64));
            values.push(DecodedValue::UnsignedInteger(frame.data_length as u64));
            values.push(DecodedValue::UnsignedInteger(frame.echoed as u64));
            // classic CAN only: no extended data length, no bit-rate switch
            values.push(DecodedValue::UnsignedInteger(0));
            values.push(DecodedValue::UnsignedInteger(0));
            for byte in frame.data {
                values.push(DecodedValue::UnsignedInteger(byte as u64));
            }
            writer.write_record(&cg, &values).map_err(enc)?;
        }

        writer.finish_data_block(&cg).map_err(enc)?;
        writer.finalize().map_err(enc)?;

        log::debug!("encoded {} frames into the measurement container", rows.len());
        Ok(writer.into_inner().into_inner())
    }
}
