use std::fs::File;
use std::path::Path;

use log::info;

use crate::acquisition::error::SourceError;
use crate::acquisition::source::SampleSource;

/// File-backed source: a pre-generated columnar signal consumed row-by-row in
/// order, one row per tick, columns never reordered.
pub struct ReplaySource {
    records: csv::StringRecordsIntoIter<File>,
    channel_count: usize,
    headers: Vec<String>,
}

impl ReplaySource {
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        let mut reader = csv::Reader::from_path(path).map_err(|e| {
            SourceError::Unavailable(format!("could not open replay file {}: {e}", path.display()))
        })?;
        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| SourceError::Unavailable(format!("unreadable replay header: {e}")))?
            .iter()
            .map(|h| h.to_string())
            .collect();
        if headers.len() < 2 {
            return Err(SourceError::Unavailable(format!(
                "replay file {} names {} column(s); at least two are required",
                path.display(),
                headers.len()
            )));
        }
        info!(
            "replaying {} ({} channels: {})",
            path.display(),
            headers.len(),
            headers.join(", ")
        );
        Ok(Self {
            channel_count: headers.len(),
            headers,
            records: reader.into_records(),
        })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }
}

impl SampleSource for ReplaySource {
    fn channel_count(&self) -> usize {
        self.channel_count
    }

    fn next_reading(&mut self, _elapsed_secs: f64) -> Result<Vec<f64>, SourceError> {
        let record = match self.records.next() {
            // Running out of rows ends the run early, like a disconnect.
            None => return Err(SourceError::Unavailable("replay file exhausted".into())),
            Some(Err(e)) => return Err(SourceError::Malformed(e.to_string())),
            Some(Ok(record)) => record,
        };
        if record.len() != self.channel_count {
            return Err(SourceError::Malformed(format!(
                "row has {} fields, expected {}",
                record.len(),
                self.channel_count
            )));
        }
        let mut values = Vec::with_capacity(self.channel_count);
        for field in record.iter() {
            values.push(crate::acquisition::serial::parse_reading(field)?);
        }
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    fn temp_file(name: &str, contents: &str) -> PathBuf {
        let path =
            std::env::temp_dir().join(format!("rigdaq_replay_{}_{}.csv", std::process::id(), name));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn rows_come_back_in_file_order_one_per_tick() {
        let path = temp_file(
            "order",
            "Load(kN),Deflection(mm)\n10.0,0.5\n10.5,0.4\n11.0,0.3\n",
        );
        let mut source = ReplaySource::open(&path).unwrap();
        assert_eq!(source.channel_count(), 2);
        assert_eq!(source.headers(), ["Load(kN)", "Deflection(mm)"]);
        assert_eq!(source.next_reading(0.0).unwrap(), vec![10.0, 0.5]);
        assert_eq!(source.next_reading(0.1).unwrap(), vec![10.5, 0.4]);
        assert_eq!(source.next_reading(0.2).unwrap(), vec![11.0, 0.3]);
        fs::remove_file(&path).ok();
    }

    #[test]
    fn exhaustion_is_fatal_like_a_disconnect() {
        let path = temp_file("eof", "Load(kN),Deflection(mm)\n1.0,2.0\n");
        let mut source = ReplaySource::open(&path).unwrap();
        source.next_reading(0.0).unwrap();
        assert!(source.next_reading(0.1).unwrap_err().is_fatal());
        fs::remove_file(&path).ok();
    }

    #[test]
    fn non_numeric_rows_are_malformed_not_fatal() {
        let path = temp_file("bad", "Load(kN),Deflection(mm)\nabc,2.0\n1.0,2.0\n");
        let mut source = ReplaySource::open(&path).unwrap();
        let err = source.next_reading(0.0).unwrap_err();
        assert!(!err.is_fatal());
        assert_eq!(source.next_reading(0.1).unwrap(), vec![1.0, 2.0]);
        fs::remove_file(&path).ok();
    }

    #[test]
    fn single_column_files_are_rejected_at_open() {
        let path = temp_file("narrow", "Load(kN)\n1.0\n");
        assert!(ReplaySource::open(&path).is_err());
        fs::remove_file(&path).ok();
    }

    #[test]
    fn missing_file_is_fatal_at_start() {
        let path = std::env::temp_dir().join("rigdaq_replay_does_not_exist.csv");
        assert!(ReplaySource::open(&path).is_err());
    }
}
