//! Output formatting utilities for the CLI.

use serde::Serialize;
use std::io::Write;

/// Writes one value as a single JSON line and flushes, so consumers see each
/// record as soon as it is produced.
pub fn write_json_line<T: Serialize, W: Write>(writer: &mut W, value: &T) -> anyhow::Result<()> {
    serde_json::to_writer(&mut *writer, value)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}
