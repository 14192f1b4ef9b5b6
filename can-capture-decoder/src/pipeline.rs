//! Capture conversion pipeline
//!
//! Orchestrates record framing, frame decoding, identifier decomposition
//! and the two export sinks over one capture. A capture is processed
//! single-threaded and strictly in record order; both sinks are built fully
//! in memory before anything touches the filesystem, so a fatal decode or
//! encode error leaves no partial output behind.

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::RecordLayout;
use crate::export::csv::{CsvExporter, PgnLabels};
use crate::export::mf4::Mf4Exporter;
use crate::frame::FrameDecoder;
use crate::j1939::J1939Id;
use crate::record::RecordReader;
use crate::types::{DecodeError, ExportRow, Result};

/// The decoded rows of a capture, plus whether it ended in a partial record
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeOutcome {
    pub rows: Vec<ExportRow>,
    pub truncated: bool,
}

/// What one capture conversion produced
#[derive(Debug, Clone)]
pub struct ConvertSummary {
    pub frames: usize,
    pub truncated: bool,
    pub csv_path: PathBuf,
    pub mf4_path: PathBuf,
}

/// Converts one capture into the tabular and measurement encodings
pub struct Pipeline {
    decoder: FrameDecoder,
    csv: CsvExporter,
}

impl Pipeline {
    /// Create a pipeline for the given record layout
    pub fn new(layout: RecordLayout) -> Result<Self> {
        Ok(Self {
            decoder: FrameDecoder::new(layout)?,
            csv: CsvExporter::new(),
        })
    }

    /// Resolve PGNs to human-readable names in the tabular export
    pub fn with_pgn_labels(mut self, labels: PgnLabels) -> Self {
        self.csv = CsvExporter::new().with_labels(labels);
        self
    }

    /// Lazily decoded rows of one capture, in record order
    pub fn rows<'a>(&'a self, capture: &'a [u8]) -> Rows<'a> {
        Rows {
            records: RecordReader::new(capture, self.decoder.layout().stride),
            decoder: &self.decoder,
        }
    }

    /// Decode a whole capture, aborting on the first error
    pub fn decode(&self, capture: &[u8]) -> Result<Vec<ExportRow>> {
        self.rows(capture).collect()
    }

    /// Decode a whole capture, tolerating a truncated trailing record
    ///
    /// Frames decoded before the truncation remain valid and are kept, with
    /// the outcome flagged. A malformed record still aborts the capture:
    /// skipping records would defeat the export's purpose as a parsing-bug
    /// detector.
    pub fn decode_flushing(&self, capture: &[u8]) -> Result<DecodeOutcome> {
        let mut rows = Vec::with_capacity(capture.len() / self.decoder.layout().stride);
        let mut truncated = false;
        for row in self.rows(capture) {
            match row {
                Ok(row) => rows.push(row),
                Err(DecodeError::TruncatedRecord { offset, remaining, .. }) => {
                    log::warn!(
                        "capture ends with {remaining} trailing bytes at offset {offset}; keeping {} decoded frames",
                        rows.len()
                    );
                    truncated = true;
                    break;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(DecodeOutcome { rows, truncated })
    }

    /// Convert one capture file into `<stem>.csv` and `<stem>.mf4` under
    /// `out_dir`
    ///
    /// All file handles are scoped to this call. Both encodings are built
    /// before either file is created; on any error nothing is written.
    pub fn convert_file(&self, capture_path: &Path, out_dir: &Path) -> Result<ConvertSummary> {
        log::info!("converting capture {:?}", capture_path);
        let capture = fs::read(capture_path)?;
        let outcome = self.decode_flushing(&capture)?;

        let mut csv_bytes = Vec::new();
        self.csv.write(&outcome.rows, &mut csv_bytes)?;
        let mf4_bytes = Mf4Exporter::encode(&outcome.rows)?;

        fs::create_dir_all(out_dir)?;
        let stem = capture_path
            .file_stem()
            .unwrap_or_else(|| OsStr::new("capture"));
        let csv_path = out_dir.join(stem).with_extension("csv");
        let mf4_path = out_dir.join(stem).with_extension("mf4");
        fs::write(&csv_path, &csv_bytes)?;
        fs::write(&mf4_path, &mf4_bytes)?;

        log::info!(
            "wrote {} frames to {:?} and {:?}",
            outcome.rows.len(),
            csv_path,
            mf4_path
        );
        Ok(ConvertSummary {
            frames: outcome.rows.len(),
            truncated: outcome.truncated,
            csv_path,
            mf4_path,
        })
    }
}

/// Iterator pairing each decoded frame with its decomposed identifier
pub struct Rows<'a> {
    records: RecordReader<'a>,
    decoder: &'a FrameDecoder,
}

impl Iterator for Rows<'_> {
    type Item = Result<ExportRow>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = match self.records.next()? {
            Ok(record) => record,
            Err(e) => return Some(Err(e)),
        };
        let frame = match self.decoder.decode(&record) {
            Ok(frame) => frame,
            Err(e) => return Some(Err(e)),
        };
        let id = match J1939Id::from_raw(frame.raw_id) {
            Ok(id) => id,
            Err(e) => return Some(Err(e.at(record.index, record.offset))),
        };
        log::trace!(
            "record {} at offset {}: id 0x{:08X}, PGN 0x{:05X}",
            record.index,
            record.offset,
            frame.raw_id,
            id.pgn()
        );
        Some(Ok(ExportRow { frame, id }))
    }
}
