//! CAN Capture Converter CLI
//!
//! Thin command surface over the can-capture-decoder library: finds capture
//! files, picks output names and reports results. All decoding and encoding
//! happens in the library; multiple captures are converted in parallel, one
//! pipeline pass per file.

use std::fs::{self, File};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use rayon::prelude::*;

use can_capture_decoder::{ConvertSummary, DecodeError, PgnLabels, Pipeline, RecordLayout};

mod config;

/// Convert raw CAN sniffer captures into CSV and MF4 files
#[derive(Parser, Debug)]
#[command(name = "can-capture-cli")]
#[command(about = "Convert raw CAN sniffer captures to CSV and MF4", long_about = None)]
#[command(version)]
struct Args {
    /// Capture files, or directories to scan for captures
    #[arg(value_name = "CAPTURE", required = true)]
    captures: Vec<PathBuf>,

    /// Output directory for the converted files
    #[arg(short, long, value_name = "DIR", default_value = "results")]
    out_dir: PathBuf,

    /// TOML file overriding the record layout
    #[arg(long, value_name = "FILE")]
    layout: Option<PathBuf>,

    /// `;`-separated table of PGN;label pairs for the PgnLabel column
    #[arg(long, value_name = "FILE")]
    pgn_labels: Option<PathBuf>,

    /// File extension matched when scanning directories
    #[arg(long, value_name = "EXT", default_value = "bin")]
    ext: String,

    /// Verbosity level (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);

    log::info!("CAN Capture CLI v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using decoder library v{}", can_capture_decoder::VERSION);

    let layout = match &args.layout {
        Some(path) => config::load_layout(path)?,
        None => RecordLayout::default(),
    };

    let mut pipeline = Pipeline::new(layout)?;
    if let Some(path) = &args.pgn_labels {
        let file =
            File::open(path).with_context(|| format!("opening PGN label table {path:?}"))?;
        pipeline = pipeline.with_pgn_labels(PgnLabels::from_reader(file)?);
    }

    let captures = collect_captures(&args.captures, &args.ext)?;
    if captures.is_empty() {
        anyhow::bail!("no capture files found");
    }
    log::info!("{} capture file(s) to convert", captures.len());

    let results: Vec<(PathBuf, std::result::Result<ConvertSummary, DecodeError>)> = captures
        .par_iter()
        .map(|path| (path.clone(), pipeline.convert_file(path, &args.out_dir)))
        .collect();

    let mut failed = 0usize;
    for (path, result) in &results {
        match result {
            Ok(summary) => {
                if summary.truncated {
                    log::warn!(
                        "{}: capture ended with a partial record, output holds the valid prefix",
                        path.display()
                    );
                }
                if !args.quiet {
                    println!(
                        "{}: {} frames -> {}, {}",
                        path.display(),
                        summary.frames,
                        summary.csv_path.display(),
                        summary.mf4_path.display()
                    );
                }
            }
            Err(e) => {
                failed += 1;
                eprintln!("{}: {}", path.display(), e);
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} capture(s) failed to convert", results.len());
    }
    Ok(())
}

/// Expand the command-line inputs into a sorted list of capture files
fn collect_captures(inputs: &[PathBuf], ext: &str) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            for entry in
                fs::read_dir(input).with_context(|| format!("reading directory {input:?}"))?
            {
                let path = entry?.path();
                let matches = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case(ext));
                if path.is_file() && matches {
                    files.push(path);
                }
            }
        } else {
            files.push(input.clone());
        }
    }
    files.sort();
    Ok(files)
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;
    use std::io::Write;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}
