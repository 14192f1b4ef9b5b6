//! Convert a capture file from the command line
//!
//! Usage: cargo run --example convert_capture -- <capture.bin> [out_dir]

use can_capture_decoder::{Pipeline, RecordLayout};
use std::path::PathBuf;

fn main() {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let Some(capture) = args.next().map(PathBuf::from) else {
        eprintln!("Usage: convert_capture <capture.bin> [out_dir]");
        std::process::exit(2);
    };
    let out_dir = args.next().map(PathBuf::from).unwrap_or_else(|| "results".into());

    let pipeline = Pipeline::new(RecordLayout::default()).expect("default layout is valid");
    match pipeline.convert_file(&capture, &out_dir) {
        Ok(summary) => {
            println!(
                "{} frames -> {}, {}",
                summary.frames,
                summary.csv_path.display(),
                summary.mf4_path.display()
            );
            if summary.truncated {
                println!("note: capture ended with a partial record");
            }
        }
        Err(e) => {
            eprintln!("conversion failed: {e}");
            std::process::exit(1);
        }
    }
}
