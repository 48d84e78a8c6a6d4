use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::acquisition::source::Sample;

/// Append-only CSV log of every accepted sample.
///
/// The file handle is acquired per append and released at end of scope: the
/// first accepted sample creates/truncates the file and writes the header,
/// every later one reopens in append mode. A crash mid-run therefore loses at
/// most the in-flight record and never corrupts earlier ones.
pub struct CsvRecorder {
    path: PathBuf,
    channel_columns: Vec<String>,
    records_written: u64,
}

impl CsvRecorder {
    pub fn new(path: impl Into<PathBuf>, channel_columns: Vec<String>) -> Self {
        Self {
            path: path.into(),
            channel_columns,
            records_written: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    /// Write one record, creating the file and header first if this is the
    /// first accepted sample of the run.
    pub fn append(&mut self, sample: &Sample) -> io::Result<()> {
        if self.records_written == 0 {
            let mut writer = BufWriter::new(File::create(&self.path)?);
            writeln!(writer, "Timestamp (seconds),{}", self.channel_columns.join(","))?;
            write_record(&mut writer, sample)?;
            writer.flush()?;
        } else {
            let file = OpenOptions::new().append(true).open(&self.path)?;
            let mut writer = BufWriter::new(file);
            write_record(&mut writer, sample)?;
            writer.flush()?;
        }
        self.records_written += 1;
        Ok(())
    }
}

/// One comma-separated row, every field to exactly 3 decimal places.
fn write_record<W: Write>(writer: &mut W, sample: &Sample) -> io::Result<()> {
    write!(writer, "{:.3}", sample.elapsed_secs)?;
    for value in &sample.values {
        write!(writer, ",{:.3}", value)?;
    }
    writeln!(writer)
}
