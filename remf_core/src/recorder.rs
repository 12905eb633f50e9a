//! Result file writer: one header line, then one line per snapshot.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use eyre::WrapErr;

use crate::error::Result;
use crate::measured::MeasuredValues;

/// Appends snapshots to any writer, flushing after each line so a crash
/// loses at most the line being written.
pub struct ResultRecorder<W: Write> {
    out: W,
    lines: u64,
}

impl ResultRecorder<std::fs::File> {
    /// Create (or truncate) a results file and write the header.
    pub fn create(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)
            .wrap_err_with(|| format!("open results file {}", path.display()))?;
        Self::new(file)
    }
}

impl<W: Write> ResultRecorder<W> {
    pub fn new(mut out: W) -> Result<Self> {
        writeln!(out, "{}", MeasuredValues::header()).wrap_err("write results header")?;
        out.flush().wrap_err("flush results header")?;
        Ok(Self { out, lines: 0 })
    }

    pub fn record(&mut self, m: &MeasuredValues) -> Result<()> {
        writeln!(self.out, "{m}").wrap_err("write result line")?;
        self.out.flush().wrap_err("flush result line")?;
        self.lines += 1;
        Ok(())
    }

    /// Number of snapshot lines written so far.
    pub fn lines(&self) -> u64 {
        self.lines
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
