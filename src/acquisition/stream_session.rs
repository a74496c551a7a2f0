// src/acquisition/stream_session.rs
//! Device session lifecycle
//!
//! `Disconnected -> Connected -> Configured -> Subscribed -> Streaming -> Stopped`.
//! Device callbacks convert each reading into exactly one [`Sample`] and push it
//! into the channel's queue; a full queue blocks the callback.

use crate::acquisition::queue::{PushError, QueueProducer};
use crate::acquisition::shutdown::SamplingControl;
use crate::config::{DeviceSelection, FilterSettings};
use crate::error::{ImuError, ImuResult};
use crate::hal::catalog::Capability;
use crate::hal::device::{DeviceHandle, DeviceIdentity};
use crate::hal::traits::{SampleCallback, SensorTransport};
use crate::hal::types::{ConnectionParameters, Sample, SensorKind};
use crate::processing::chain::{FilterChain, FilterChainBuilder};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connected,
    Configured,
    Subscribed,
    Streaming,
    Stopped,
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Connected => "connected",
            SessionState::Configured => "configured",
            SessionState::Subscribed => "subscribed",
            SessionState::Streaming => "streaming",
            SessionState::Stopped => "stopped",
        }
    }
}

#[derive(Default)]
struct Channel {
    subscribed: bool,
    active: bool,
    raw_mode: bool,
    chain: Option<FilterChain>,
    samples: Arc<AtomicU64>,
}

pub struct StreamSession {
    device: DeviceHandle,
    filters: FilterSettings,
    state: SessionState,
    channels: [Channel; 2],
}

fn slot(kind: SensorKind) -> usize {
    match kind {
        SensorKind::Accelerometer => 0,
        SensorKind::Gyroscope => 1,
    }
}

impl StreamSession {
    pub fn new(transport: Arc<dyn SensorTransport>, filters: FilterSettings) -> Self {
        Self {
            device: DeviceHandle::new(transport),
            filters,
            state: SessionState::Disconnected,
            channels: Default::default(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn device(&self) -> &DeviceHandle {
        &self.device
    }

    pub fn connect(&mut self, params: &ConnectionParameters) -> ImuResult<DeviceIdentity> {
        if self.state == SessionState::Streaming {
            return Err(self.invalid("connect"));
        }
        let identity = self.device.connect(params)?;
        self.channels = Default::default();
        self.state = SessionState::Connected;
        Ok(identity)
    }

    /// Option sets of the connected board for one sensor
    pub fn capabilities(&self, kind: SensorKind) -> ImuResult<Capability> {
        self.device.capability(kind)
    }

    /// Resolve every index first, then write both configurations
    pub fn configure(&mut self, selection: &DeviceSelection) -> ImuResult<()> {
        match self.state {
            SessionState::Connected | SessionState::Configured | SessionState::Stopped => {}
            _ => return Err(self.invalid("configure")),
        }

        let accel = self
            .capabilities(SensorKind::Accelerometer)?
            .sensor_config(selection.acc_frequency, selection.acc_range)?;
        let gyro = self
            .capabilities(SensorKind::Gyroscope)?
            .sensor_config(selection.gyro_frequency, selection.gyro_range)?;

        self.device.write_config(SensorKind::Accelerometer, &accel)?;
        self.device.write_config(SensorKind::Gyroscope, &gyro)?;
        self.state = SessionState::Configured;
        tracing::info!(
            acc_frequency = selection.acc_frequency,
            acc_range = selection.acc_range,
            gyro_frequency = selection.gyro_frequency,
            gyro_range = selection.gyro_range,
            "device configured"
        );
        Ok(())
    }

    /// Route one sensor's output into `sink`.
    ///
    /// Processed mode builds the firmware chain and subscribes its output; raw
    /// mode subscribes the raw signal directly.
    pub fn subscribe(&mut self, kind: SensorKind, raw_mode: bool, sink: QueueProducer<Sample>) -> ImuResult<()> {
        if self.state == SessionState::Streaming {
            return Err(self.invalid("subscribe"));
        }
        let raw = self.device.signal(kind)?;
        if self.channels[slot(kind)].subscribed {
            return Err(self.invalid("subscribe twice"));
        }

        let (target, chain) = if raw_mode {
            (raw, None)
        } else {
            let spec = match kind {
                SensorKind::Accelerometer => &self.filters.accelerometer,
                SensorKind::Gyroscope => &self.filters.gyroscope,
            };
            let chain = FilterChainBuilder::new(self.device.transport(), self.filters.stage_timeout())
                .build(kind, raw, spec)?;
            (chain.output(), Some(chain))
        };

        let samples = Arc::clone(&self.channels[slot(kind)].samples);
        self.device
            .transport()
            .subscribe(target, sample_callback(kind, sink, samples))?;

        let channel = &mut self.channels[slot(kind)];
        channel.subscribed = true;
        channel.raw_mode = raw_mode;
        channel.chain = chain;
        self.state = SessionState::Subscribed;
        tracing::info!(%kind, raw_mode, signal = %target, "subscribed");
        Ok(())
    }

    /// Enable and start both sensors
    pub fn start(&mut self) -> ImuResult<()> {
        if self.state == SessionState::Streaming {
            return Err(self.invalid("start"));
        }
        for kind in SensorKind::ALL {
            if !self.channels[slot(kind)].subscribed {
                return Err(ImuError::NothingSubscribed { kind });
            }
        }

        let transport = self.device.transport();
        for kind in SensorKind::ALL {
            transport.enable_sampling(kind)?;
            transport.start(kind)?;
            self.channels[slot(kind)].active = true;
        }
        self.state = SessionState::Streaming;
        tracing::info!("streaming started");
        Ok(())
    }

    /// Stop active sensors, reset device processing and drop the chains.
    /// Calling it again is a no-op.
    pub fn stop(&mut self) -> ImuResult<()> {
        let touched = self.channels.iter().any(|c| c.active || c.subscribed);
        if !touched {
            if self.state == SessionState::Streaming {
                self.state = SessionState::Stopped;
            }
            return Ok(());
        }

        let mut first_error = None;
        let transport = self.device.transport();
        for kind in SensorKind::ALL {
            let channel = &mut self.channels[slot(kind)];
            if channel.active {
                let result = transport.stop(kind).and_then(|_| transport.disable_sampling(kind));
                if let Err(e) = result {
                    tracing::error!(%kind, "failed to stop sensor: {}", e);
                    first_error.get_or_insert(ImuError::from(e));
                }
                channel.active = false;
            }
            channel.subscribed = false;
            channel.chain = None;
        }
        if let Err(e) = transport.reset() {
            tracing::error!("failed to reset device: {}", e);
            first_error.get_or_insert(ImuError::from(e));
        }

        self.state = SessionState::Stopped;
        tracing::info!(
            accelerometer = self.samples_delivered(SensorKind::Accelerometer),
            gyroscope = self.samples_delivered(SensorKind::Gyroscope),
            "streaming stopped"
        );
        first_error.map_or(Ok(()), Err)
    }

    /// Stop if needed, reset the board and drop the link
    pub fn disconnect(&mut self) -> ImuResult<()> {
        let stopped = self.stop();
        self.device.disconnect()?;
        self.state = SessionState::Disconnected;
        stopped
    }

    /// Samples handed to the sink so far
    pub fn samples_delivered(&self, kind: SensorKind) -> u64 {
        self.channels[slot(kind)].samples.load(Ordering::Relaxed)
    }

    pub fn chain(&self, kind: SensorKind) -> Option<&FilterChain> {
        self.channels[slot(kind)].chain.as_ref()
    }

    pub fn is_raw(&self, kind: SensorKind) -> bool {
        self.channels[slot(kind)].raw_mode
    }

    fn invalid(&self, operation: &'static str) -> ImuError {
        ImuError::InvalidState {
            operation,
            state: self.state.name(),
        }
    }
}

impl SamplingControl for StreamSession {
    fn stop_sampling(&mut self) -> ImuResult<()> {
        self.stop()
    }
}

fn sample_callback(kind: SensorKind, sink: QueueProducer<Sample>, samples: Arc<AtomicU64>) -> SampleCallback {
    Box::new(move |reading| {
        let sample = Sample::from(reading);
        tracing::trace!(%kind, timestamp = sample.timestamp, payload = ?sample.payload, "sample");
        match sink.push(sample) {
            Ok(()) => {
                samples.fetch_add(1, Ordering::Relaxed);
            }
            Err(PushError::Closed(_)) => {
                tracing::debug!(%kind, "queue closed, dropping sample");
            }
            Err(e) => {
                tracing::warn!(%kind, "failed to enqueue sample: {}", e);
            }
        }
    })
}
