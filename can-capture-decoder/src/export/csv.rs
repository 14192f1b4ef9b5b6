//! Delimited tabular export
//!
//! One `;`-separated row per decoded frame, columns and formats fixed, so
//! two runs over the same capture can be diffed when chasing a parsing
//! regression. Identifier fields are rendered as zero-padded upper-case hex
//! (open the file as text; spreadsheet tools will happily reinterpret hex
//! as decimals).

use std::collections::HashMap;
use std::io::{Read, Write};

use serde::ser::{Serialize, SerializeStruct, Serializer};

use crate::types::{DecodeError, ExportRow, Result};

/// Column names, in output order
const COLUMNS: [&str; 11] = [
    "Timestamp",
    "IDE",
    "ID",
    "Priority",
    "PGN",
    "PduFormat",
    "PduSpecific",
    "Source",
    "Destination",
    "DataLength",
    "DataBytes",
];

fn serialize_row_fields<S: SerializeStruct>(
    state: &mut S,
    row: &ExportRow,
) -> std::result::Result<(), S::Error> {
    state.serialize_field("Timestamp", &format!("{:.6}", row.frame.timestamp))?;
    state.serialize_field("IDE", &(row.frame.is_extended as u8))?;
    state.serialize_field("ID", &format!("{:08X}", row.frame.raw_id))?;
    state.serialize_field("Priority", &row.id.priority())?;
    state.serialize_field("PGN", &format!("{:05X}", row.id.pgn()))?;
    state.serialize_field("PduFormat", &format!("{:02X}", row.id.pdu_format()))?;
    state.serialize_field("PduSpecific", &format!("{:02X}", row.id.pdu_specific()))?;
    state.serialize_field("Source", &format!("{:02X}", row.id.source()))?;
    state.serialize_field(
        "Destination",
        &row.id.destination().map(|d| format!("{d:02X}")),
    )?;
    state.serialize_field("DataLength", &row.frame.data_length)?;
    // the full zero-padded payload region, fixed width
    state.serialize_field("DataBytes", &hex::encode_upper(row.frame.data))?;
    Ok(())
}

impl Serialize for ExportRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ExportRow", COLUMNS.len())?;
        serialize_row_fields(&mut state, self)?;
        state.end()
    }
}

struct LabeledRow<'a> {
    row: &'a ExportRow,
    label: &'a str,
}

impl Serialize for LabeledRow<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("LabeledRow", COLUMNS.len() + 1)?;
        serialize_row_fields(&mut state, self.row)?;
        state.serialize_field("PgnLabel", self.label)?;
        state.end()
    }
}

/// Human-readable parameter-group names, keyed by PGN
///
/// Loaded from a `;`-separated table with a header row and `PGN;label`
/// columns (PGN in decimal). Rows that do not parse are skipped.
#[derive(Debug, Clone, Default)]
pub struct PgnLabels {
    labels: HashMap<u32, String>,
}

impl PgnLabels {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut table = csv::ReaderBuilder::new()
            .delimiter(b';')
            .flexible(true)
            .from_reader(reader);
        let mut labels = HashMap::new();
        for record in table.records() {
            let record =
                record.map_err(|e| DecodeError::Encoding(format!("PGN label table: {e}")))?;
            let Some(pgn) = record.get(0).and_then(|s| s.trim().parse::<u32>().ok()) else {
                continue;
            };
            if let Some(label) = record.get(1) {
                labels.insert(pgn, label.trim().to_string());
            }
        }
        log::debug!("loaded {} PGN labels", labels.len());
        Ok(Self { labels })
    }

    pub fn get(&self, pgn: u32) -> Option<&str> {
        self.labels.get(&pgn).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Writes the decoded stream as a delimited table
#[derive(Debug, Clone, Default)]
pub struct CsvExporter {
    labels: Option<PgnLabels>,
}

impl CsvExporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a `PgnLabel` column resolved through the given table
    pub fn with_labels(mut self, labels: PgnLabels) -> Self {
        self.labels = Some(labels);
        self
    }

    /// Write the header plus one row per frame, in input order
    pub fn write<W: Write>(&self, rows: &[ExportRow], sink: W) -> Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b';')
            .has_headers(false)
            .from_writer(sink);

        let mut header: Vec<&str> = COLUMNS.to_vec();
        if self.labels.is_some() {
            header.push("PgnLabel");
        }
        writer
            .write_record(&header)
            .map_err(|e| DecodeError::Encoding(format!("CSV write: {e}")))?;

        for row in rows {
            let result = match &self.labels {
                Some(labels) => writer.serialize(LabeledRow {
                    row,
                    label: labels.get(row.id.pgn()).unwrap_or(""),
                }),
                None => writer.serialize(row),
            };
            result.map_err(|e| DecodeError::Encoding(format!("CSV write: {e}")))?;
        }
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::j1939::J1939Id;
    use crate::types::DecodedFrame;

    fn sample_rows() -> Vec<ExportRow> {
        let broadcast = ExportRow {
            frame: DecodedFrame {
                timestamp: 0.0,
                raw_id: 0x18F0_0417,
                is_extended: true,
                is_remote: false,
                echoed: false,
                data_length: 3,
                data: [0xDE, 0xAD, 0xBE, 0, 0, 0, 0, 0],
            },
            id: J1939Id::from_raw(0x18F0_0417).unwrap(),
        };
        let peer_to_peer = ExportRow {
            frame: DecodedFrame {
                timestamp: 1.25,
                raw_id: 0x0CEA_3205,
                is_extended: true,
                is_remote: false,
                echoed: false,
                data_length: 8,
                data: [1, 2, 3, 4, 5, 6, 7, 8],
            },
            id: J1939Id::from_raw(0x0CEA_3205).unwrap(),
        };
        vec![broadcast, peer_to_peer]
    }

    #[test]
    fn test_golden_output() {
        let mut out = Vec::new();
        CsvExporter::new().write(&sample_rows(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let expected = "\
Timestamp;IDE;ID;Priority;PGN;PduFormat;PduSpecific;Source;Destination;DataLength;DataBytes\n\
0.000000;1;18F00417;6;0F004;F0;04;17;;3;DEADBE0000000000\n\
1.250000;1;0CEA3205;3;0EA00;EA;32;05;32;8;0102030405060708\n";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_deterministic_across_runs() {
        let rows = sample_rows();
        let mut first = Vec::new();
        let mut second = Vec::new();
        CsvExporter::new().write(&rows, &mut first).unwrap();
        CsvExporter::new().write(&rows, &mut second).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_capture_still_writes_header() {
        let mut out = Vec::new();
        CsvExporter::new().write(&[], &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert!(text.starts_with("Timestamp;IDE;ID"));
    }

    #[test]
    fn test_pgn_label_column() {
        let table = "PGN;PGN label\n61444;Electronic Engine Controller 1\n59904;Request\n";
        let labels = PgnLabels::from_reader(table.as_bytes()).unwrap();
        assert_eq!(labels.len(), 2);
        assert_eq!(labels.get(61444), Some("Electronic Engine Controller 1"));

        let mut out = Vec::new();
        CsvExporter::new()
            .with_labels(labels)
            .write(&sample_rows(), &mut out)
            .unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert!(lines.next().unwrap().ends_with(";PgnLabel"));
        // 0xF004 = 61444 has a label, 0xEA00 = 59904 does too
        assert!(lines.next().unwrap().ends_with(";Electronic Engine Controller 1"));
        assert!(lines.next().unwrap().ends_with(";Request"));
    }

    #[test]
    fn test_row_count_matches_input() {
        let rows = sample_rows();
        let mut out = Vec::new();
        CsvExporter::new().write(&rows, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), rows.len() + 1);
    }
}
