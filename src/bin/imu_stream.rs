use clap::Parser;
use crossbeam::channel;
use imu_core::acquisition::{IngestionPipeline, ShutdownCoordinator, StreamSession};
use imu_core::config::{ConfigLoader, SystemConfig};
use imu_core::hal::simulator::{MotionProfile, SimulatedSensor, SimulatorConfig};
use imu_core::hal::SensorKind;
use imu_core::session::SessionPaths;
use imu_core::utils::SystemTimeProvider;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Stream a wearable session into per-channel CSV files until interrupted
#[derive(Parser, Debug)]
#[command(name = "imu-stream", version, long_about = None)]
struct Args {
    /// Configuration file (defaults to discovery)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Root directory for session files
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Session id used in the file names
    #[arg(long, default_value_t = 1)]
    session_id: u64,

    /// Record raw x/y/z instead of the filtered scalar
    #[arg(long, default_value_t = false)]
    raw: bool,

    /// Queue capacity per channel
    #[arg(long)]
    max_queue_size: Option<usize>,

    /// Stop by itself after this many seconds
    #[arg(long)]
    duration_secs: Option<u64>,

    /// Simulated wearer activity
    #[arg(long, value_enum, default_value_t = MotionProfile::Restless)]
    motion: MotionProfile,
}

fn load_config(args: &Args) -> Result<SystemConfig, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => ConfigLoader::load_from_path(path)?,
        None => ConfigLoader::new().load_system_config()?,
    };
    if let Some(dir) = &args.data_dir {
        config.storage.data_dir = dir.clone();
    }
    if let Some(capacity) = args.max_queue_size {
        config.pipeline.queue_capacity = capacity;
    }
    if args.raw {
        config.device.raw_data = true;
    }
    config.validate()?;
    Ok(config)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;
    let raw_mode = config.device.raw_data;

    let mut simulator = SimulatorConfig {
        motion: args.motion,
        ..SimulatorConfig::default()
    };
    if !config.device.mac_address.is_empty() {
        simulator.address = config.device.mac_address.clone();
    }
    let sensor = Arc::new(SimulatedSensor::new(simulator));

    let mut session = StreamSession::new(sensor, config.filters.clone());
    session.connect(&config.connection)?;
    for kind in SensorKind::ALL {
        let capability = session.capabilities(kind)?;
        info!(%kind, model = capability.model, "sensor detected");
    }
    session.configure(&config.device)?;

    let paths = SessionPaths::new(&config.storage.data_dir, args.session_id);
    let pipeline = IngestionPipeline::open(&paths, raw_mode, &config.pipeline, Arc::new(SystemTimeProvider))?;
    for kind in SensorKind::ALL {
        session.subscribe(kind, raw_mode, pipeline.sink(kind))?;
    }

    let (interrupt_tx, interrupt_rx) = channel::bounded(1);
    ctrlc::set_handler(move || {
        info!("Shutdown signal received...");
        let _ = interrupt_tx.try_send(());
    })?;

    session.start()?;
    info!(
        accelerometer = %paths.path(SensorKind::Accelerometer).display(),
        gyroscope = %paths.path(SensorKind::Gyroscope).display(),
        "recording, press Ctrl-C to stop"
    );

    match args.duration_secs {
        Some(secs) => {
            let _ = interrupt_rx.recv_timeout(Duration::from_secs(secs));
        }
        None => {
            let _ = interrupt_rx.recv();
        }
    }

    let report = ShutdownCoordinator::from_settings(&config.pipeline).shutdown(&mut session, pipeline);
    for channel in &report.channels {
        if channel.samples_abandoned > 0 || !channel.drained {
            warn!(
                kind = %channel.kind,
                abandoned = channel.samples_abandoned,
                "channel did not drain completely"
            );
        }
        info!(kind = %channel.kind, rows = channel.rows_written, "channel closed");
    }
    if let Err(e) = session.disconnect() {
        error!("failed to disconnect: {}", e);
    }
    Ok(())
}
