//! Export sinks for the decoded stream
//!
//! Two encodings of the same rows: a `;`-delimited table for eyeballing and
//! diffing, and an MF4 measurement container for the downstream DBC-driven
//! signal decoder. Both preserve input order exactly.

pub mod csv;
pub mod mf4;

pub use self::csv::{CsvExporter, PgnLabels};
pub use self::mf4::Mf4Exporter;
