// src/acquisition/writer.rs
//! Per-channel CSV sink
//!
//! Rows are stamped with the host's wall clock at write time, not the device
//! epoch. The aggregator reads that first column as its time axis.

use crate::error::{ImuError, ImuResult, IoResultExt};
use crate::hal::types::{Payload, Sample, SensorKind};
use crate::utils::time::TimeProvider;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Column layout of a session file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowLayout {
    /// `timestamp,x_u,y_u,z_u`
    Raw,
    /// `time,diff_rss_u`
    Processed,
}

impl RowLayout {
    pub fn for_mode(raw_mode: bool) -> Self {
        if raw_mode {
            RowLayout::Raw
        } else {
            RowLayout::Processed
        }
    }

    /// Header record for `kind`
    pub fn header(&self, kind: SensorKind) -> Vec<String> {
        let unit = kind.unit();
        match self {
            RowLayout::Raw => vec![
                "timestamp".to_string(),
                format!("x_{unit}"),
                format!("y_{unit}"),
                format!("z_{unit}"),
            ],
            RowLayout::Processed => vec!["time".to_string(), format!("diff_rss_{unit}")],
        }
    }

    /// Value columns after the time column
    pub fn value_columns(&self) -> usize {
        match self {
            RowLayout::Raw => 3,
            RowLayout::Processed => 1,
        }
    }
}

/// Fields of one data row: write time to 3 decimals, each value to 4
pub fn row_fields(write_time: f64, payload: &Payload) -> Vec<String> {
    std::iter::once(format!("{:.3}", write_time))
        .chain(payload.as_slice().iter().map(|value| format!("{:.4}", value)))
        .collect()
}

/// CSV writer for one channel, flushed after every record
pub struct DataWriter {
    kind: SensorKind,
    layout: RowLayout,
    path: PathBuf,
    writer: Option<csv::Writer<File>>,
    clock: Arc<dyn TimeProvider>,
    rows_written: u64,
}

impl DataWriter {
    /// Create (truncating) the file and write the header record
    pub fn create(
        path: impl AsRef<Path>,
        kind: SensorKind,
        raw_mode: bool,
        clock: Arc<dyn TimeProvider>,
    ) -> ImuResult<Self> {
        let path = path.as_ref().to_path_buf();
        let layout = RowLayout::for_mode(raw_mode);
        let file = File::create(&path).with_path(&path)?;
        let mut writer = csv::Writer::from_writer(file);
        writer.write_record(layout.header(kind))?;
        writer.flush().with_path(&path)?;
        tracing::debug!(%kind, path = %path.display(), ?layout, "opened session file");

        Ok(Self {
            kind,
            layout,
            path,
            writer: Some(writer),
            clock,
            rows_written: 0,
        })
    }

    /// Append one row; it is on disk when this returns
    pub fn write_sample(&mut self, sample: &Sample) -> ImuResult<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or(ImuError::WriterClosed { kind: self.kind })?;
        writer.write_record(row_fields(self.clock.now_secs(), &sample.payload))?;
        writer.flush().with_path(&self.path)?;
        self.rows_written += 1;
        Ok(())
    }

    /// Flush and release the file. Later writes fail with `WriterClosed`.
    pub fn close(&mut self) -> ImuResult<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush().with_path(&self.path)?;
            tracing::debug!(kind = %self.kind, rows = self.rows_written, "closed session file");
        }
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.writer.is_none()
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    pub fn kind(&self) -> SensorKind {
        self.kind
    }

    pub fn layout(&self) -> RowLayout {
        self.layout
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for DataWriter {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!(kind = %self.kind, "failed to flush on drop: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::time::MockTimeProvider;

    #[test]
    fn test_headers() {
        assert_eq!(
            RowLayout::Raw.header(SensorKind::Accelerometer).join(","),
            "timestamp,x_(g/s),y_(g/s),z_(g/s)"
        );
        assert_eq!(
            RowLayout::Processed.header(SensorKind::Gyroscope).join(","),
            "time,diff_rss_(rad/s)"
        );
    }

    #[test]
    fn test_row_format() {
        assert_eq!(
            row_fields(1700000000.12345, &Payload::Vector([1.23456, -2.0, 0.001])),
            vec!["1700000000.123", "1.2346", "-2.0000", "0.0010"]
        );
        assert_eq!(row_fields(12.0, &Payload::Scalar(0.5)), vec!["12.000", "0.5000"]);
    }

    #[test]
    fn test_write_and_close() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("7_gyro_data.csv");
        let clock = Arc::new(MockTimeProvider::at_secs(1_700_000_000));

        let mut writer = DataWriter::create(&path, SensorKind::Gyroscope, false, clock.clone()).unwrap();
        writer
            .write_sample(&Sample {
                timestamp: 1.0,
                payload: Payload::Scalar(3.5),
            })
            .unwrap();
        clock.advance_millis(20);
        writer
            .write_sample(&Sample {
                timestamp: 2.0,
                payload: Payload::Scalar(-4.25),
            })
            .unwrap();
        writer.close().unwrap();
        writer.close().unwrap();

        let err = writer
            .write_sample(&Sample {
                timestamp: 3.0,
                payload: Payload::Scalar(1.0),
            })
            .unwrap_err();
        assert!(matches!(err, ImuError::WriterClosed { kind: SensorKind::Gyroscope }));
        assert_eq!(writer.rows_written(), 2);

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(
            lines,
            vec![
                "time,diff_rss_(rad/s)",
                "1700000000.000,3.5000",
                "1700000000.020,-4.2500",
            ]
        );
    }

    #[test]
    fn test_rows_visible_before_close() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("1_acc_data.csv");
        let clock = Arc::new(MockTimeProvider::at_secs(10));

        let mut writer = DataWriter::create(&path, SensorKind::Accelerometer, true, clock).unwrap();
        writer
            .write_sample(&Sample {
                timestamp: 0.0,
                payload: Payload::Vector([0.0, 0.0, 1.0]),
            })
            .unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            contents,
            "timestamp,x_(g/s),y_(g/s),z_(g/s)\n10.000,0.0000,0.0000,1.0000\n"
        );
    }

    #[test]
    fn test_create_in_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("1_acc_data.csv");
        let clock = Arc::new(MockTimeProvider::at_secs(0));
        let err = DataWriter::create(&path, SensorKind::Accelerometer, true, clock).err().unwrap();
        assert!(matches!(err, ImuError::Io { .. }));
    }
}
