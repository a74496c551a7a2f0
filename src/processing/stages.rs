// src/processing/stages.rs
//! Software counterparts of the firmware processors
//!
//! Used by the simulated sensor so that processed-mode sessions produce the
//! same kind of sparse, thresholded scalar stream a real board would.

use crate::hal::types::{DeltaMode, Payload, StageRequest};
use std::collections::VecDeque;

/// A single streaming processor
pub trait Processor: Send {
    /// Feed one input; `None` means the stage emitted nothing
    fn process(&mut self, input: Payload) -> Option<Payload>;
}

/// Root-sum-square of the input components
#[derive(Debug, Default)]
pub struct Rss;

impl Processor for Rss {
    fn process(&mut self, input: Payload) -> Option<Payload> {
        Some(Payload::Scalar(input.magnitude()))
    }
}

/// Running mean over the last `window` scalar inputs
#[derive(Debug)]
pub struct MovingAverage {
    window: usize,
    history: VecDeque<f64>,
    sum: f64,
}

impl MovingAverage {
    pub fn new(window: u8) -> Self {
        let window = usize::from(window.max(1));
        Self {
            window,
            history: VecDeque::with_capacity(window),
            sum: 0.0,
        }
    }
}

impl Processor for MovingAverage {
    fn process(&mut self, input: Payload) -> Option<Payload> {
        let value = match input {
            Payload::Scalar(value) => value,
            vector => vector.magnitude(),
        };
        if self.history.len() == self.window {
            if let Some(oldest) = self.history.pop_front() {
                self.sum -= oldest;
            }
        }
        self.history.push_back(value);
        self.sum += value;
        Some(Payload::Scalar(self.sum / self.history.len() as f64))
    }
}

/// Emits only once the input moved at least `threshold` away from the last
/// emitted reference. The first input only seeds the reference.
#[derive(Debug)]
pub struct Delta {
    threshold: f64,
    mode: DeltaMode,
    reference: Option<f64>,
}

impl Delta {
    pub fn new(threshold: f32, mode: DeltaMode) -> Self {
        Self {
            threshold: f64::from(threshold),
            mode,
            reference: None,
        }
    }
}

impl Processor for Delta {
    fn process(&mut self, input: Payload) -> Option<Payload> {
        let value = match input {
            Payload::Scalar(value) => value,
            vector => vector.magnitude(),
        };
        let Some(reference) = self.reference else {
            self.reference = Some(value);
            return None;
        };
        let difference = value - reference;
        if difference.abs() < self.threshold {
            return None;
        }
        self.reference = Some(value);
        Some(Payload::Scalar(match self.mode {
            DeltaMode::Differential => difference,
            DeltaMode::Absolute => value,
        }))
    }
}

/// Processors applied in sequence; stops at the first stage that emits nothing
pub struct ProcessorChain {
    stages: Vec<Box<dyn Processor>>,
}

impl ProcessorChain {
    pub fn from_requests(requests: &[StageRequest]) -> Self {
        let stages = requests
            .iter()
            .map(|request| -> Box<dyn Processor> {
                match *request {
                    StageRequest::Rss => Box::new(Rss),
                    StageRequest::MovingAverage { window } => Box::new(MovingAverage::new(window)),
                    StageRequest::Delta { threshold, mode } => Box::new(Delta::new(threshold, mode)),
                }
            })
            .collect();
        Self { stages }
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn process(&mut self, input: Payload) -> Option<Payload> {
        self.stages
            .iter_mut()
            .try_fold(input, |value, stage| stage.process(value))
    }
}
