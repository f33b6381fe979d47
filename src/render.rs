//! Console output for the command line tool
use crate::{error::ExtractError, extract::Extraction};
use std::{io::Write, path::Path};

/// Print the line announcing which file is being read
///
/// # Errors
/// Fails if `out` cannot be written to
pub fn analyzing<W: Write>(out: &mut W, file: &Path) -> std::io::Result<()> {
    writeln!(out, "Analyzing {}...", file.display())
}

/// Print the outcome of an extraction, either the status line for why it stopped or every macro
/// found
///
/// # Errors
/// Fails if `out` cannot be written to
pub fn report<W: Write>(
    out: &mut W,
    extraction: &Extraction,
    hide_attributes: bool,
) -> std::io::Result<()> {
    match extraction.condition() {
        Some(e) if e.is_informational() => writeln!(out, "{e}.")?,
        Some(e @ ExtractError::Unexpected(_)) => writeln!(out, "{e}")?,
        Some(e) => writeln!(out, "Error: {e}.")?,
        None => writeln!(out, "VBA macros found, extracting...")?,
    }

    if extraction.is_empty() {
        writeln!(out, "No macros were extracted.")?;
        return Ok(());
    }

    writeln!(out)?;
    writeln!(out, "--- Extracted Macros ---")?;
    for (i, m) in extraction.macros().iter().enumerate() {
        writeln!(out)?;
        writeln!(out, "--- Macro #{} ---", i + 1)?;
        writeln!(out, "Stream Path: {}", m.stream_path())?;
        writeln!(out, "Module Stream: {}", m.module_stream())?;
        writeln!(out, "Module Name: {}", m.module_name())?;
        writeln!(out, "Module Kind: {} ({})", m.kind(), m.file_name())?;
        writeln!(out, "--- Code ---")?;
        if hide_attributes {
            writeln!(out, "{}", strip_attributes(m.source_text()))?;
        } else {
            writeln!(out, "{}", m.source_text())?;
        }
        writeln!(out, "--- End Code ---")?;
    }
    Ok(())
}

/// Drop the `Attribute VB_...` lines the VBA editor keeps at the top of each module
pub fn strip_attributes(source: &str) -> String {
    source
        .split_inclusive('\n')
        .filter(|line| !line.starts_with("Attribute VB_"))
        .collect()
}
