// src/analysis/mod.rs
//! Offline session aggregation
//!
//! Turns a finished session's two CSV files into per-bin event densities and a
//! Deep / Light / Awake stage per bin. The time axis is the write time stored
//! in the first CSV column.

pub mod binning;
pub mod events;
pub mod reader;
pub mod stages;

pub use binning::{bin_counts, bin_events, cumulative_counts, probe_times, Bin};
pub use events::{detect_events, events_at_or_before, EventDetector};
pub use reader::read_samples;
pub use stages::{classify_bins, render_stages, Stage};

use crate::config::{AggregationSettings, ConfigError};
use crate::error::{ImuError, ImuResult};
use crate::hal::types::{Sample, SensorKind};
use crate::session::SessionPaths;
use serde::Serialize;

/// Event and bin summary of one channel
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelSummary {
    pub kind: SensorKind,
    pub samples: usize,
    pub events: usize,
    /// First and last sample time
    pub first: f64,
    pub last: f64,
    pub bins: Vec<Bin>,
}

impl ChannelSummary {
    pub fn counts(&self) -> Vec<u32> {
        self.bins.iter().map(|bin| bin.count).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub accelerometer: ChannelSummary,
    pub gyroscope: ChannelSummary,
    pub stages: Vec<Stage>,
}

impl SessionSummary {
    pub fn render(&self) -> String {
        render_stages(&self.stages)
    }
}

pub struct SessionAggregator {
    settings: AggregationSettings,
}

impl SessionAggregator {
    pub fn new(settings: AggregationSettings) -> ImuResult<Self> {
        let mut problems = Vec::new();
        if settings.bins == 0 {
            problems.push("aggregation.bins must be greater than 0".to_string());
        }
        if settings.probe_count < 2 {
            problems.push("aggregation.probe_count must be at least 2".to_string());
        }
        if !problems.is_empty() {
            return Err(ConfigError::Invalid(problems).into());
        }
        Ok(Self { settings })
    }

    pub fn settings(&self) -> &AggregationSettings {
        &self.settings
    }

    fn threshold(&self, kind: SensorKind) -> f64 {
        match kind {
            SensorKind::Accelerometer => self.settings.acc_event_threshold,
            SensorKind::Gyroscope => self.settings.gyro_event_threshold,
        }
    }

    /// Detect events and bin one channel
    pub fn summarize(&self, kind: SensorKind, samples: &[Sample]) -> ImuResult<ChannelSummary> {
        let (first, last) = match (samples.first(), samples.last()) {
            (Some(first), Some(last)) => (first.timestamp, last.timestamp),
            _ => return Err(ImuError::EmptyChannel { kind }),
        };
        let events = detect_events(samples, self.threshold(kind));
        let bins = bin_events(&events, first, last, self.settings.bins, self.settings.probe_count);
        tracing::debug!(%kind, samples = samples.len(), events = events.len(), "channel summarized");

        Ok(ChannelSummary {
            kind,
            samples: samples.len(),
            events: events.len(),
            first,
            last,
            bins,
        })
    }

    pub fn aggregate(&self, accel: &[Sample], gyro: &[Sample]) -> ImuResult<SessionSummary> {
        let accelerometer = self.summarize(SensorKind::Accelerometer, accel)?;
        let gyroscope = self.summarize(SensorKind::Gyroscope, gyro)?;
        let stages = classify_bins(&accelerometer.bins, &gyroscope.bins)?;
        Ok(SessionSummary {
            accelerometer,
            gyroscope,
            stages,
        })
    }

    /// Read both channel files of a session and aggregate them
    pub fn aggregate_files(&self, paths: &SessionPaths) -> ImuResult<SessionSummary> {
        let accel = read_samples(paths.path(SensorKind::Accelerometer))?;
        let gyro = read_samples(paths.path(SensorKind::Gyroscope))?;
        tracing::info!(
            session = paths.session_id(),
            accelerometer = accel.len(),
            gyroscope = gyro.len(),
            "aggregating session"
        );
        self.aggregate(&accel, &gyro)
    }
}
