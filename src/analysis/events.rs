// src/analysis/events.rs
//! Movement event detection

use crate::hal::types::Sample;

/// Accumulates absolute magnitude and emits an event each time the running
/// sum exceeds the threshold; the sum restarts from zero after every event.
#[derive(Debug, Clone)]
pub struct EventDetector {
    threshold: f64,
    accumulated: f64,
}

impl EventDetector {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            accumulated: 0.0,
        }
    }

    /// Feed one sample, returning its timestamp if it completed an event
    pub fn feed(&mut self, sample: &Sample) -> Option<f64> {
        self.accumulated += sample.payload.magnitude();
        if self.accumulated > self.threshold {
            self.accumulated = 0.0;
            Some(sample.timestamp)
        } else {
            None
        }
    }
}

/// Event timestamps of a whole channel, in sample order
pub fn detect_events(samples: &[Sample], threshold: f64) -> Vec<f64> {
    let mut detector = EventDetector::new(threshold);
    samples.iter().filter_map(|sample| detector.feed(sample)).collect()
}

/// Number of events at or before `time`; `events` must be ascending
pub fn events_at_or_before(events: &[f64], time: f64) -> usize {
    events.partition_point(|&event| event <= time)
}
