// src/report.rs
//
// Per-frame CSV logs, one file per analysis. A header row names the
// columns; ratio columns are formatted to 4 decimal places so logs are
// directly comparable across runs.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub struct CsvLog {
    writer: BufWriter<File>,
}

impl CsvLog {
    pub fn create(path: &Path, header: &[&str]) -> Result<Self> {
        let file =
            File::create(path).with_context(|| format!("creating log {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "{}", header.join(","))?;
        Ok(Self { writer })
    }

    pub fn write_row(&mut self, fields: &[String]) -> Result<()> {
        writeln!(self.writer, "{}", fields.join(","))?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Fixed 4-decimal formatting for ratio columns.
pub fn format_ratio(ratio: f64) -> String {
    format!("{:.4}", ratio)
}
