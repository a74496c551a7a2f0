//! Simulated wearable implementing [`SensorTransport`]
//!
//! Stands in for a BLE board in tests, benchmarks and the streaming binary.
//! Processor creation completes asynchronously on a helper thread, readings
//! are delivered from one streaming thread per sensor, and filter chains run
//! through the software stage models so processed-mode output looks like the
//! firmware's. Failure modes (refused link, rejected or lost processor
//! notifications, missing modules) are switched on through [`SimulatorConfig`].

use crate::config::constants::simulation::*;
use crate::hal::catalog::variants;
use crate::hal::traits::{ProcessorCompletion, SampleCallback, SensorTransport, TransportError};
use crate::hal::types::{
    ConnectionParameters, Payload, RawReading, SensorConfig, SensorKind, SignalHandle, StageRequest,
    VariantId,
};
use crate::processing::stages::ProcessorChain;
use crate::utils::time::{SystemTimeProvider, TimeProvider};
use clap::ValueEnum;
use crossbeam::channel::{self, select, Receiver, Sender};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

const FIRST_PROCESSOR_HANDLE: u64 = 16;

/// How much the simulated wearer moves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MotionProfile {
    /// Sensor noise only
    Still,
    /// Occasional short movements
    Restless,
    /// Frequent, strong movements
    Active,
}

impl MotionProfile {
    fn burst_probability(&self) -> f64 {
        match self {
            MotionProfile::Still => 0.0,
            MotionProfile::Restless => 0.005,
            MotionProfile::Active => 0.05,
        }
    }

    fn burst_amplitude(&self, kind: SensorKind) -> f64 {
        let scale = match self {
            MotionProfile::Still => 0.0,
            MotionProfile::Restless => 0.3,
            MotionProfile::Active => 1.0,
        };
        match kind {
            SensorKind::Accelerometer => scale,
            SensorKind::Gyroscope => scale * 150.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    pub address: String,
    /// `None` simulates a board without that module
    pub accel_variant: Option<VariantId>,
    pub gyro_variant: Option<VariantId>,
    pub sample_rate_hz: f64,
    pub motion: MotionProfile,
    pub seed: u64,
    /// Refuse the link
    pub fail_connect: bool,
    /// Accept processor requests but never report completion
    pub drop_completions: bool,
    /// Report every processor request as refused
    pub reject_processors: bool,
    pub completion_delay: Duration,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            accel_variant: Some(variants::ACC_BMI160),
            gyro_variant: Some(variants::GYRO_BMI160),
            sample_rate_hz: DEFAULT_SAMPLE_RATE_HZ,
            motion: MotionProfile::Restless,
            seed: DEFAULT_SEED,
            fail_connect: false,
            drop_completions: false,
            reject_processors: false,
            completion_delay: Duration::from_millis(DEFAULT_COMPLETION_DELAY_MS),
        }
    }
}

impl SimulatorConfig {
    /// A BMI270-based board
    pub fn bmi270() -> Self {
        Self {
            accel_variant: Some(variants::ACC_BMI270),
            gyro_variant: Some(variants::GYRO_BMI270),
            ..Self::default()
        }
    }
}

/// Everything the simulator was asked to do, in order
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCommand {
    SetConnectionParameters(ConnectionParameters),
    WriteConfig { kind: SensorKind, config: SensorConfig },
    CreateProcessor { source: SignalHandle, request: StageRequest },
    Subscribe(SignalHandle),
    EnableSampling(SensorKind),
    Start(SensorKind),
    Stop(SensorKind),
    DisableSampling(SensorKind),
    Reset,
    Disconnect,
}

struct Node {
    kind: SensorKind,
    stages: Vec<StageRequest>,
}

struct Subscription {
    kind: SensorKind,
    chain: Mutex<ProcessorChain>,
    callback: Arc<dyn Fn(RawReading) + Send + Sync>,
}

impl Subscription {
    fn deliver(&self, epoch: f64, value: Payload) -> bool {
        let output = self.chain.lock().process(value);
        match output {
            Some(value) => {
                (self.callback)(RawReading { epoch, value });
                true
            }
            None => false,
        }
    }
}

struct Stream {
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct State {
    connected: bool,
    connection: Option<ConnectionParameters>,
    commands: Vec<DeviceCommand>,
    next_handle: u64,
    nodes: HashMap<SignalHandle, Node>,
    subscriptions: Vec<Arc<Subscription>>,
    sampling: HashSet<SensorKind>,
    streams: HashMap<SensorKind, Stream>,
    lost_completions: Vec<ProcessorCompletion>,
}

impl State {
    fn ensure_connected(&self) -> Result<(), TransportError> {
        if self.connected {
            Ok(())
        } else {
            Err(TransportError::NotConnected)
        }
    }
}

/// Simulated sensor board
pub struct SimulatedSensor {
    config: SimulatorConfig,
    clock: Arc<dyn TimeProvider>,
    state: Mutex<State>,
    emitted: [Arc<AtomicU64>; 2],
}

fn raw_handle(kind: SensorKind) -> SignalHandle {
    match kind {
        SensorKind::Accelerometer => SignalHandle(1),
        SensorKind::Gyroscope => SignalHandle(2),
    }
}

fn slot(kind: SensorKind) -> usize {
    match kind {
        SensorKind::Accelerometer => 0,
        SensorKind::Gyroscope => 1,
    }
}

impl SimulatedSensor {
    pub fn new(config: SimulatorConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemTimeProvider))
    }

    pub fn with_clock(config: SimulatorConfig, clock: Arc<dyn TimeProvider>) -> Self {
        Self {
            config,
            clock,
            state: Mutex::new(State::default()),
            emitted: [Arc::new(AtomicU64::new(0)), Arc::new(AtomicU64::new(0))],
        }
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    pub fn commands(&self) -> Vec<DeviceCommand> {
        self.state.lock().commands.clone()
    }

    /// Number of configuration writes received
    pub fn config_writes(&self) -> usize {
        self.state
            .lock()
            .commands
            .iter()
            .filter(|command| matches!(command, DeviceCommand::WriteConfig { .. }))
            .count()
    }

    pub fn connection_parameters(&self) -> Option<ConnectionParameters> {
        self.state.lock().connection.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.state.lock().connected
    }

    pub fn is_streaming(&self, kind: SensorKind) -> bool {
        self.state.lock().streams.contains_key(&kind)
    }

    pub fn subscription_count(&self) -> usize {
        self.state.lock().subscriptions.len()
    }

    /// Completions accepted but never fired
    pub fn pending_completions(&self) -> usize {
        self.state.lock().lost_completions.len()
    }

    /// Readings handed to subscription callbacks so far
    pub fn emitted(&self, kind: SensorKind) -> u64 {
        self.emitted[slot(kind)].load(Ordering::Relaxed)
    }

    /// Push one reading through every subscription of `kind` right now.
    ///
    /// Returns how many callbacks fired. Lets tests produce exact sample
    /// sequences without a streaming thread.
    pub fn inject(&self, kind: SensorKind, value: Payload) -> usize {
        let subscriptions: Vec<_> = self
            .state
            .lock()
            .subscriptions
            .iter()
            .filter(|sub| sub.kind == kind)
            .cloned()
            .collect();
        let epoch = self.clock.now_secs();
        let delivered = subscriptions
            .iter()
            .filter(|sub| sub.deliver(epoch, value))
            .count();
        self.emitted[slot(kind)].fetch_add(delivered as u64, Ordering::Relaxed);
        delivered
    }

    fn variant(&self, kind: SensorKind) -> Option<VariantId> {
        match kind {
            SensorKind::Accelerometer => self.config.accel_variant,
            SensorKind::Gyroscope => self.config.gyro_variant,
        }
    }

    fn complete_later(&self, completion: ProcessorCompletion, handle: Option<SignalHandle>) -> Result<(), TransportError> {
        let delay = self.config.completion_delay;
        thread::Builder::new()
            .name("sim-completion".to_string())
            .spawn(move || {
                thread::sleep(delay);
                completion(handle);
            })
            .map(|_| ())
            .map_err(|e| TransportError::Rejected(e.to_string()))
    }

    fn spawn_stream(&self, kind: SensorKind, subscriptions: Vec<Arc<Subscription>>) -> Result<Stream, TransportError> {
        let (stop, stop_rx) = channel::bounded(1);
        let period = Duration::from_secs_f64(1.0 / self.config.sample_rate_hz.max(1.0));
        let generator = MotionGenerator::new(kind, self.config.motion, self.config.seed ^ slot(kind) as u64);
        let clock = Arc::clone(&self.clock);
        let emitted = Arc::clone(&self.emitted[slot(kind)]);

        let handle = thread::Builder::new()
            .name(format!("sim-{}", kind.short_name()))
            .spawn(move || run_stream(generator, subscriptions, period, stop_rx, clock, emitted))
            .map_err(|e| TransportError::Rejected(e.to_string()))?;
        Ok(Stream { stop, handle })
    }

    fn join_streams(streams: Vec<Stream>) {
        for stream in streams {
            drop(stream.stop);
            if stream.handle.join().is_err() {
                tracing::error!("simulated stream thread panicked");
            }
        }
    }
}

impl SensorTransport for SimulatedSensor {
    fn connect(&self) -> Result<(), TransportError> {
        if self.config.fail_connect {
            return Err(TransportError::LinkUnavailable(format!(
                "{} did not respond",
                self.config.address
            )));
        }
        let mut state = self.state.lock();
        state.connected = true;
        state.next_handle = state.next_handle.max(FIRST_PROCESSOR_HANDLE);
        for kind in SensorKind::ALL {
            if self.variant(kind).is_some() {
                state.nodes.insert(
                    raw_handle(kind),
                    Node {
                        kind,
                        stages: Vec::new(),
                    },
                );
            }
        }
        tracing::debug!(address = %self.config.address, "simulated link up");
        Ok(())
    }

    fn set_connection_parameters(&self, params: &ConnectionParameters) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        state.ensure_connected()?;
        state.connection = Some(params.clone());
        state.commands.push(DeviceCommand::SetConnectionParameters(params.clone()));
        Ok(())
    }

    fn lookup_variant(&self, kind: SensorKind) -> Option<VariantId> {
        self.variant(kind)
    }

    fn write_config(&self, kind: SensorKind, config: &SensorConfig) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        state.ensure_connected()?;
        if self.variant(kind).is_none() {
            return Err(TransportError::ModuleMissing { kind });
        }
        state.commands.push(DeviceCommand::WriteConfig { kind, config: *config });
        Ok(())
    }

    fn data_signal(&self, kind: SensorKind) -> Result<SignalHandle, TransportError> {
        self.state.lock().ensure_connected()?;
        if self.variant(kind).is_none() {
            return Err(TransportError::ModuleMissing { kind });
        }
        Ok(raw_handle(kind))
    }

    fn create_processor(
        &self,
        source: SignalHandle,
        request: StageRequest,
        completion: ProcessorCompletion,
    ) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        state.ensure_connected()?;
        let (kind, mut stages) = match state.nodes.get(&source) {
            Some(node) => (node.kind, node.stages.clone()),
            None => return Err(TransportError::UnknownSignal(source)),
        };
        state.commands.push(DeviceCommand::CreateProcessor { source, request });

        if self.config.drop_completions {
            state.lost_completions.push(completion);
            return Ok(());
        }
        if self.config.reject_processors {
            drop(state);
            return self.complete_later(completion, None);
        }

        let handle = SignalHandle(state.next_handle);
        state.next_handle += 1;
        stages.push(request);
        state.nodes.insert(handle, Node { kind, stages });
        drop(state);
        self.complete_later(completion, Some(handle))
    }

    fn subscribe(&self, signal: SignalHandle, callback: SampleCallback) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        state.ensure_connected()?;
        let subscription = match state.nodes.get(&signal) {
            Some(node) => Subscription {
                kind: node.kind,
                chain: Mutex::new(ProcessorChain::from_requests(&node.stages)),
                callback: Arc::from(callback),
            },
            None => return Err(TransportError::UnknownSignal(signal)),
        };
        state.subscriptions.push(Arc::new(subscription));
        state.commands.push(DeviceCommand::Subscribe(signal));
        Ok(())
    }

    fn enable_sampling(&self, kind: SensorKind) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        state.ensure_connected()?;
        state.sampling.insert(kind);
        state.commands.push(DeviceCommand::EnableSampling(kind));
        Ok(())
    }

    fn start(&self, kind: SensorKind) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        state.ensure_connected()?;
        if !state.sampling.contains(&kind) {
            return Err(TransportError::Rejected(format!("{} sampling is not enabled", kind)));
        }
        state.commands.push(DeviceCommand::Start(kind));
        if state.streams.contains_key(&kind) {
            return Ok(());
        }
        let subscriptions = state
            .subscriptions
            .iter()
            .filter(|sub| sub.kind == kind)
            .cloned()
            .collect();
        let stream = self.spawn_stream(kind, subscriptions)?;
        state.streams.insert(kind, stream);
        Ok(())
    }

    fn stop(&self, kind: SensorKind) -> Result<(), TransportError> {
        let stream = {
            let mut state = self.state.lock();
            state.ensure_connected()?;
            state.commands.push(DeviceCommand::Stop(kind));
            state.streams.remove(&kind)
        };
        Self::join_streams(stream.into_iter().collect());
        Ok(())
    }

    fn disable_sampling(&self, kind: SensorKind) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        state.ensure_connected()?;
        state.sampling.remove(&kind);
        state.commands.push(DeviceCommand::DisableSampling(kind));
        Ok(())
    }

    fn reset(&self) -> Result<(), TransportError> {
        let streams: Vec<Stream> = {
            let mut state = self.state.lock();
            state.ensure_connected()?;
            state.commands.push(DeviceCommand::Reset);
            state.subscriptions.clear();
            state.sampling.clear();
            state.lost_completions.clear();
            state.nodes.retain(|_, node| node.stages.is_empty());
            state.streams.drain().map(|(_, stream)| stream).collect()
        };
        Self::join_streams(streams);
        Ok(())
    }

    fn disconnect(&self) -> Result<(), TransportError> {
        let streams: Vec<Stream> = {
            let mut state = self.state.lock();
            if !state.connected {
                return Ok(());
            }
            state.commands.push(DeviceCommand::Disconnect);
            state.connected = false;
            state.subscriptions.clear();
            state.sampling.clear();
            state.nodes.clear();
            state.streams.drain().map(|(_, stream)| stream).collect()
        };
        Self::join_streams(streams);
        tracing::debug!(address = %self.config.address, "simulated link down");
        Ok(())
    }

    fn address(&self) -> String {
        self.config.address.clone()
    }
}

impl Drop for SimulatedSensor {
    fn drop(&mut self) {
        let streams = self.state.lock().streams.drain().map(|(_, stream)| stream).collect();
        Self::join_streams(streams);
    }
}

fn run_stream(
    mut generator: MotionGenerator,
    subscriptions: Vec<Arc<Subscription>>,
    period: Duration,
    stop: Receiver<()>,
    clock: Arc<dyn TimeProvider>,
    emitted: Arc<AtomicU64>,
) {
    let ticker = channel::tick(period);
    loop {
        let stopped = select! {
            recv(stop) -> _ => true,
            recv(ticker) -> _ => false,
        };
        if stopped {
            break;
        }
        let value = generator.next_reading();
        let epoch = clock.now_secs();
        let delivered = subscriptions
            .iter()
            .filter(|sub| sub.deliver(epoch, value))
            .count();
        emitted.fetch_add(delivered as u64, Ordering::Relaxed);
    }
}

/// Noise plus randomly timed movement bursts
struct MotionGenerator {
    kind: SensorKind,
    profile: MotionProfile,
    rng: StdRng,
    burst_left: u32,
    burst_amplitude: f64,
}

impl MotionGenerator {
    fn new(kind: SensorKind, profile: MotionProfile, seed: u64) -> Self {
        Self {
            kind,
            profile,
            rng: StdRng::seed_from_u64(seed),
            burst_left: 0,
            burst_amplitude: 0.0,
        }
    }

    fn next_reading(&mut self) -> Payload {
        if self.burst_left == 0 && self.rng.gen_bool(self.profile.burst_probability()) {
            self.burst_left = self.rng.gen_range(5..50);
            self.burst_amplitude = self.profile.burst_amplitude(self.kind) * self.rng.gen_range(0.5..1.5);
        }
        let motion = if self.burst_left > 0 {
            self.burst_left -= 1;
            self.burst_amplitude
        } else {
            0.0
        };

        let noise = match self.kind {
            SensorKind::Accelerometer => ACC_NOISE_G,
            SensorKind::Gyroscope => GYRO_NOISE_DPS,
        };
        let mut axis = |offset: f64| {
            offset + self.rng.gen_range(-noise..noise) + motion * self.rng.gen_range(-1.0..1.0)
        };
        match self.kind {
            SensorKind::Accelerometer => Payload::Vector([axis(0.0), axis(0.0), axis(GRAVITY_G)]),
            SensorKind::Gyroscope => Payload::Vector([axis(0.0), axis(0.0), axis(0.0)]),
        }
    }
}
