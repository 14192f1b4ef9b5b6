//! CLI configuration loading
//!
//! The record layout normally comes from the built-in default; a TOML file
//! can override it when a capture was produced by a different sniffer
//! firmware. Missing keys fall back to the default, so an override file
//! only needs the fields it changes.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use can_capture_decoder::RecordLayout;

/// Load and validate a record layout from a TOML file
pub fn load_layout(path: &Path) -> Result<RecordLayout> {
    let text =
        fs::read_to_string(path).with_context(|| format!("reading layout file {path:?}"))?;
    let layout: RecordLayout =
        toml::from_str(&text).with_context(|| format!("parsing layout file {path:?}"))?;
    layout
        .validate()
        .with_context(|| format!("validating layout file {path:?}"))?;
    log::debug!("record layout loaded from {:?}: {:?}", path, layout);
    Ok(layout)
}
