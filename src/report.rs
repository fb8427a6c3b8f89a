//! Run report: a header written before the merge, a footer with the counts after it.
//!
//! ```text
//! Command:
//!     $ nmatch a.txt b.txt
//! Started: 2024-05-01T10:00:00+00:00
//!
//! Input files:
//!     1 a.txt: 4
//!     2 b.txt: 4
//!
//! Output files:
//!     12
//!     NY: 2
//!     YN: 2
//!     YY: 2
//! ```
//!
//! The ruler line under `Output files:` holds the last digit of each input number,
//! lined up with the label characters.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::Serialize;

use crate::session::MatchSummary;

pub struct Report<W: Write> {
    out: W,
}

impl Report<BufWriter<File>> {
    /// Create the report file at `path`.
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path).with_context(|| format!("Failed to create report: {}", path.display()))?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> Report<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Write the invoked command and the start time.
    pub fn head(&mut self, command: &str, started: DateTime<Local>) -> io::Result<()> {
        writeln!(self.out, "Command:")?;
        writeln!(self.out, "\t$ {command}")?;
        writeln!(self.out, "Started: {}", started.to_rfc3339())?;
        self.out.flush()
    }

    /// Write the per-input and per-output counts.
    pub fn foot(&mut self, summary: &MatchSummary) -> io::Result<()> {
        writeln!(self.out)?;
        writeln!(self.out, "Input files:")?;
        let mut ruler = String::with_capacity(summary.inputs.len());
        for (i, input) in summary.inputs.iter().enumerate() {
            let number = i + 1;
            writeln!(self.out, "\t{number} {}: {}", input.name, input.lines_read)?;
            ruler.push(char::from(b'0' + (number % 10) as u8));
        }

        writeln!(self.out)?;
        writeln!(self.out, "Output files:")?;
        writeln!(self.out, "\t{ruler}")?;
        for output in &summary.outputs {
            if output.active {
                writeln!(self.out, "\t{}: {}", output.label, output.lines_written)?;
            } else {
                writeln!(self.out, "\t{}: {} (not selected)", output.label, output.lines_written)?;
            }
        }

        if !summary.violations.is_empty() {
            writeln!(self.out)?;
            writeln!(self.out, "Unsorted inputs (ignored from the offending line on):")?;
            for violation in &summary.violations {
                writeln!(self.out, "\t{violation}")?;
            }
        }
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

/// JSON form of a finished run.
#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    pub command: &'a str,
    pub started: String,
    pub finished: String,
    #[serde(flatten)]
    pub summary: &'a MatchSummary,
}

/// Write `summary` as pretty JSON to `path`.
pub fn write_json(path: &Path, command: &str, started: DateTime<Local>, summary: &MatchSummary) -> Result<()> {
    let report = JsonReport {
        command,
        started: started.to_rfc3339(),
        finished: Local::now().to_rfc3339(),
        summary,
    };
    let json = serde_json::to_string_pretty(&report)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write JSON report: {}", path.display()))?;
    Ok(())
}
