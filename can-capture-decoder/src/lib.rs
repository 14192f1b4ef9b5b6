//! CAN Capture Decoder Library
//!
//! Converts raw captures from a Nexiq CAN sniffer into a delimited table
//! (for visual inspection and diffing) and an MF4 measurement container
//! (for DBC-driven signal extraction in downstream tools).
//!
//! # Architecture
//!
//! The library is a single forward pass over one capture:
//!
//! 1. [`record::RecordReader`] splits the byte stream into fixed-size records
//! 2. [`frame::FrameDecoder`] turns each record into a [`DecodedFrame`],
//!    rebuilding the 29-bit extended identifier from the sniffer's J1939
//!    addressing fields
//! 3. [`j1939::J1939Id`] decomposes the identifier (priority, PGN, PDU
//!    format/specific, source, destination) with PDU1/PDU2 handling
//! 4. [`export::CsvExporter`] and [`export::Mf4Exporter`] serialize the
//!    rows into the two sinks, preserving record order exactly
//!
//! The library does NOT decode application-layer signals — that is the job
//! of the downstream tool applying a DBC dictionary to the MF4 output. File
//! discovery, output naming and operator-facing reporting live in the CLI.
//!
//! # Example Usage
//!
//! ```no_run
//! use can_capture_decoder::{Pipeline, RecordLayout};
//!
//! let pipeline = Pipeline::new(RecordLayout::default()).unwrap();
//! let capture = std::fs::read("capture.bin").unwrap();
//!
//! for row in pipeline.rows(&capture) {
//!     match row {
//!         Ok(row) => println!(
//!             "t={:.6} PGN 0x{:05X} from 0x{:02X}",
//!             row.frame.timestamp,
//!             row.id.pgn(),
//!             row.id.source()
//!         ),
//!         Err(e) => eprintln!("Decode error: {}", e),
//!     }
//! }
//! ```

pub mod config;
pub mod export;
pub mod frame;
pub mod j1939;
pub mod pipeline;
pub mod record;
pub mod types;

// Re-export main types for convenience
pub use config::RecordLayout;
pub use export::{CsvExporter, Mf4Exporter, PgnLabels};
pub use frame::FrameDecoder;
pub use j1939::J1939Id;
pub use pipeline::{ConvertSummary, DecodeOutcome, Pipeline, Rows};
pub use record::{RawRecord, RecordReader};
pub use types::{DecodeError, DecodedFrame, ExportRow, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
