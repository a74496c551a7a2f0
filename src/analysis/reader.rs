// src/analysis/reader.rs
//! Session CSV reader
//!
//! Accepts both layouts written by the ingestion pipeline: the first column is
//! the write time, followed by one processed value or an x/y/z triple.

use crate::error::{ImuError, ImuResult};
use crate::hal::types::{Payload, Sample};
use std::path::Path;

/// Read every data row of one channel file
pub fn read_samples(path: &Path) -> ImuResult<Vec<Sample>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let mut samples = Vec::new();
    for record in reader.records() {
        let record = record?;
        let line = record.position().map_or(0, |position| position.line());
        let malformed = |reason: String| ImuError::MalformedRow {
            path: path.to_path_buf(),
            line,
            reason,
        };

        let values = record
            .iter()
            .map(|field| {
                field
                    .parse::<f64>()
                    .map_err(|e| malformed(format!("{:?}: {}", field, e)))
            })
            .collect::<ImuResult<Vec<f64>>>()?;

        let sample = match values.as_slice() {
            [time, value] => Sample {
                timestamp: *time,
                payload: Payload::Scalar(*value),
            },
            [time, x, y, z] => Sample {
                timestamp: *time,
                payload: Payload::Vector([*x, *y, *z]),
            },
            other => return Err(malformed(format!("expected 2 or 4 columns, found {}", other.len()))),
        };
        samples.push(sample);
    }
    Ok(samples)
}
