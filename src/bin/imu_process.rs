use clap::Parser;
use imu_core::analysis::SessionAggregator;
use imu_core::config::{ConfigLoader, SystemConfig};
use imu_core::session::SessionPaths;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Aggregate a recorded session into sleep stages
#[derive(Parser, Debug)]
#[command(name = "imu-process", version, long_about = None)]
struct Args {
    /// Session id to process
    session_id: u64,

    /// Number of bins
    #[arg(long)]
    bins: Option<usize>,

    /// Root directory for session files
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Configuration file (defaults to discovery)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let mut config: SystemConfig = match &args.config {
        Some(path) => ConfigLoader::load_from_path(path)?,
        None => ConfigLoader::new().load_system_config()?,
    };
    if let Some(bins) = args.bins {
        config.aggregation.bins = bins;
    }
    if let Some(dir) = &args.data_dir {
        config.storage.data_dir = dir.clone();
    }

    let aggregator = SessionAggregator::new(config.aggregation)?;
    let paths = SessionPaths::new(&config.storage.data_dir, args.session_id);
    let summary = aggregator.aggregate_files(&paths)?;

    for channel in [&summary.accelerometer, &summary.gyroscope] {
        println!(
            "{}: {} samples, {} events, bins {:?}",
            channel.kind,
            channel.samples,
            channel.events,
            channel.counts()
        );
    }
    let levels: Vec<u8> = summary.stages.iter().map(|stage| stage.level()).collect();
    println!("stages: {:?}", levels);
    println!("{}", summary.render());
    Ok(())
}
