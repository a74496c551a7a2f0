// src/processing/chain.rs
//! On-device filter chain construction
//!
//! The firmware builds processors asynchronously: each creation request is
//! acknowledged later through a one-shot completion, possibly on another
//! thread. The builder turns that into a blocking, bounded wait per stage and
//! feeds each resulting handle into the next request.

use crate::config::constants::filters::*;
use crate::error::{ImuError, ImuResult};
use crate::hal::traits::SensorTransport;
use crate::hal::types::{DeltaMode, SensorKind, SignalHandle, StageRequest};
use crossbeam::channel::{self, RecvTimeoutError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Number of stages in every filter chain
pub const CHAIN_LENGTH: usize = 3;

/// Per-channel chain parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChainSpec {
    /// Moving-average window in samples
    pub window: u8,
    /// Minimum change before the delta stage emits
    pub threshold: f32,
    #[serde(default = "default_mode")]
    pub mode: DeltaMode,
}

fn default_mode() -> DeltaMode {
    DeltaMode::Differential
}

impl ChainSpec {
    pub fn accelerometer() -> Self {
        Self {
            window: DEFAULT_ACC_WINDOW,
            threshold: DEFAULT_ACC_DELTA_THRESHOLD,
            mode: DeltaMode::Differential,
        }
    }

    pub fn gyroscope() -> Self {
        Self {
            window: DEFAULT_GYRO_WINDOW,
            threshold: DEFAULT_GYRO_DELTA_THRESHOLD,
            mode: DeltaMode::Differential,
        }
    }

    /// Stage requests in build order: RSS, moving average, delta
    pub fn stages(&self) -> [StageRequest; CHAIN_LENGTH] {
        [
            StageRequest::Rss,
            StageRequest::MovingAverage { window: self.window },
            StageRequest::Delta {
                threshold: self.threshold,
                mode: self.mode,
            },
        ]
    }
}

/// One created processor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChainStage {
    pub request: StageRequest,
    pub input: SignalHandle,
    pub output: SignalHandle,
}

/// A fully built chain for one sensor
#[derive(Debug, Clone, PartialEq)]
pub struct FilterChain {
    kind: SensorKind,
    source: SignalHandle,
    stages: Vec<ChainStage>,
}

impl FilterChain {
    pub fn kind(&self) -> SensorKind {
        self.kind
    }

    /// Raw signal the chain is fed from
    pub fn source(&self) -> SignalHandle {
        self.source
    }

    pub fn stages(&self) -> &[ChainStage] {
        &self.stages
    }

    /// Handle to subscribe to
    pub fn output(&self) -> SignalHandle {
        self.stages.last().map_or(self.source, |stage| stage.output)
    }
}

/// Builds filter chains against a transport
pub struct FilterChainBuilder<'a> {
    transport: &'a dyn SensorTransport,
    stage_timeout: Duration,
}

impl<'a> FilterChainBuilder<'a> {
    pub fn new(transport: &'a dyn SensorTransport, stage_timeout: Duration) -> Self {
        Self {
            transport,
            stage_timeout,
        }
    }

    /// Build RSS -> moving average -> delta on top of `raw`
    pub fn build(&self, kind: SensorKind, raw: SignalHandle, spec: &ChainSpec) -> ImuResult<FilterChain> {
        let mut stages = Vec::with_capacity(CHAIN_LENGTH);
        let mut input = raw;

        for request in spec.stages() {
            let output = self.create_stage(kind, input, request)?;
            tracing::debug!(%kind, stage = request.name(), %input, %output, "created processor");
            stages.push(ChainStage {
                request,
                input,
                output,
            });
            input = output;
        }

        Ok(FilterChain {
            kind,
            source: raw,
            stages,
        })
    }

    fn create_stage(&self, kind: SensorKind, input: SignalHandle, request: StageRequest) -> ImuResult<SignalHandle> {
        let (tx, rx) = channel::bounded(1);
        self.transport.create_processor(
            input,
            request,
            Box::new(move |handle| {
                let _ = tx.try_send(handle);
            }),
        )?;

        match rx.recv_timeout(self.stage_timeout) {
            Ok(Some(handle)) => Ok(handle),
            Ok(None) | Err(RecvTimeoutError::Disconnected) => Err(ImuError::ChainStageRejected {
                kind,
                stage: request.name(),
            }),
            Err(RecvTimeoutError::Timeout) => Err(ImuError::ChainBuildTimeout {
                kind,
                stage: request.name(),
                timeout: self.stage_timeout,
            }),
        }
    }
}
