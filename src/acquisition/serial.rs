use std::io::{self, BufRead, BufReader};
use std::time::Duration;

use log::info;
use serialport::SerialPort;

use crate::acquisition::error::SourceError;
use crate::acquisition::source::SampleSource;

/// Parse one transport line as a finite decimal number.
///
/// Whitespace is stripped first; a blank line is `Empty`, anything that does
/// not parse as a finite float is `Malformed`. Both are recoverable.
pub fn parse_reading(line: &str) -> Result<f64, SourceError> {
    let text = line.trim();
    if text.is_empty() {
        return Err(SourceError::Empty);
    }
    match text.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(SourceError::Malformed(text.to_string())),
    }
}

/// Reads newline-terminated readings from one byte-oriented connection.
struct LineReader<R: BufRead> {
    reader: R,
    label: String,
}

impl<R: BufRead> LineReader<R> {
    fn new(reader: R, label: impl Into<String>) -> Self {
        Self {
            reader,
            label: label.into(),
        }
    }

    fn read_value(&mut self) -> Result<f64, SourceError> {
        let mut line = String::new();
        match self.reader.read_line(&mut line) {
            Ok(0) => Err(SourceError::Unavailable(format!(
                "{}: connection closed",
                self.label
            ))),
            Ok(_) => parse_reading(&line),
            // The per-read timeout expiring is a quiet tick, not a fault.
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Err(SourceError::Empty),
            Err(e) => Err(SourceError::Unavailable(format!("{}: {}", self.label, e))),
        }
    }
}

/// Transport-backed source: one serial connection per channel, one line per
/// reading, read in channel order each tick.
pub struct SerialSource {
    channels: Vec<LineReader<BufReader<Box<dyn SerialPort>>>>,
}

impl SerialSource {
    /// Open every configured port. Failure here is fatal-at-start: the caller
    /// reports the cause and aborts before any run begins.
    pub fn open(ports: &[String], baud: u32, timeout: Duration) -> Result<Self, SourceError> {
        let mut channels = Vec::with_capacity(ports.len());
        for name in ports {
            let port = serialport::new(name.as_str(), baud)
                .timeout(timeout)
                .open()
                .map_err(|e| {
                    SourceError::Unavailable(format!("could not open serial port {name}: {e}"))
                })?;
            info!("connected to {name} at {baud} baud");
            channels.push(LineReader::new(BufReader::new(port), name.clone()));
        }
        if channels.is_empty() {
            return Err(SourceError::Unavailable(
                "no serial ports configured".to_string(),
            ));
        }
        Ok(Self { channels })
    }
}

impl SampleSource for SerialSource {
    fn channel_count(&self) -> usize {
        self.channels.len()
    }

    fn next_reading(&mut self, _elapsed_secs: f64) -> Result<Vec<f64>, SourceError> {
        let mut values = Vec::with_capacity(self.channels.len());
        for channel in &mut self.channels {
            values.push(channel.read_value()?);
        }
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn numeric_lines_parse_after_whitespace_stripping() {
        assert_eq!(parse_reading("12.5\r\n").unwrap(), 12.5);
        assert_eq!(parse_reading("  -0.25 ").unwrap(), -0.25);
        assert_eq!(parse_reading("1e-3\n").unwrap(), 0.001);
    }

    #[test]
    fn blank_lines_are_empty_not_malformed() {
        assert!(matches!(parse_reading(""), Err(SourceError::Empty)));
        assert!(matches!(parse_reading("  \r\n"), Err(SourceError::Empty)));
    }

    #[test]
    fn garbage_and_non_finite_values_are_malformed() {
        assert!(matches!(
            parse_reading("hello"),
            Err(SourceError::Malformed(_))
        ));
        assert!(matches!(
            parse_reading("12.5.3"),
            Err(SourceError::Malformed(_))
        ));
        assert!(matches!(
            parse_reading("NaN"),
            Err(SourceError::Malformed(_))
        ));
        assert!(matches!(
            parse_reading("inf"),
            Err(SourceError::Malformed(_))
        ));
    }

    #[test]
    fn line_reader_walks_the_stream_one_line_per_call() {
        let mut reader = LineReader::new(Cursor::new("1.0\nbogus\n\n2.0\n"), "test");
        assert_eq!(reader.read_value().unwrap(), 1.0);
        assert!(matches!(
            reader.read_value(),
            Err(SourceError::Malformed(_))
        ));
        assert!(matches!(reader.read_value(), Err(SourceError::Empty)));
        assert_eq!(reader.read_value().unwrap(), 2.0);
        // End of stream reads as a closed connection.
        assert!(reader.read_value().unwrap_err().is_fatal());
    }
}
