// src/config/constants.rs
//! System-wide configuration constants

/// Link and device constants
pub mod hal {
    pub const DEFAULT_MIN_CONN_INTERVAL_MS: f32 = 7.5;
    pub const DEFAULT_MAX_CONN_INTERVAL_MS: f32 = 7.5;
    pub const DEFAULT_CONN_LATENCY: u16 = 0;
    pub const DEFAULT_SUPERVISION_TIMEOUT_MS: u16 = 6000;

    /// Upper bound on the wait for one processor-creation notification
    pub const DEFAULT_CHAIN_STAGE_TIMEOUT_MS: u64 = 5000;
}

/// Default sensor selection (indices into the BMI160 option sets)
pub mod device {
    /// 50Hz
    pub const DEFAULT_ACC_FREQUENCY_INDEX: usize = 6;
    /// 8G
    pub const DEFAULT_ACC_RANGE_INDEX: usize = 2;
    /// 50Hz
    pub const DEFAULT_GYRO_FREQUENCY_INDEX: usize = 1;
    /// 1000dps
    pub const DEFAULT_GYRO_RANGE_INDEX: usize = 1;
}

/// Firmware filter chain defaults
pub mod filters {
    pub const DEFAULT_ACC_WINDOW: u8 = 5;
    pub const DEFAULT_ACC_DELTA_THRESHOLD: f32 = 0.01;
    pub const DEFAULT_GYRO_WINDOW: u8 = 5;
    pub const DEFAULT_GYRO_DELTA_THRESHOLD: f32 = 3.0;
}

/// Ingestion pipeline timing and sizing
pub mod pipeline {
    pub const DEFAULT_QUEUE_CAPACITY: usize = 25_000;
    pub const DEFAULT_POP_TIMEOUT_MS: u64 = 1000;
    pub const DEFAULT_IDLE_BACKOFF_MS: u64 = 2000;
    pub const DEFAULT_DRAIN_TIMEOUT_MS: u64 = 5000;
    pub const DEFAULT_WORKER_JOIN_TIMEOUT_MS: u64 = 1000;

    /// How often a blocked push re-checks whether the queue was closed
    pub const PUSH_POLL_INTERVAL_MS: u64 = 50;
}

/// Offline aggregation
pub mod aggregation {
    pub const DEFAULT_BINS: usize = 20;
    pub const DEFAULT_PROBE_COUNT: usize = 1000;
    pub const DEFAULT_ACC_EVENT_THRESHOLD: f64 = 10.0;
    pub const DEFAULT_GYRO_EVENT_THRESHOLD: f64 = 100.0;

    /// Bins at or below this count on either channel are deep sleep
    pub const DEEP_SLEEP_MAX_COUNT: u32 = 20;
    /// Bins at or below this count on both channels are light sleep
    pub const LIGHT_SLEEP_MAX_COUNT: u32 = 200;
}

/// On-disk layout
pub mod storage {
    pub const DEFAULT_DATA_DIR: &str = "data";
    pub const SESSIONS_DIR: &str = "sessions";
    pub const CONFIG_FILE_NAME: &str = "imu-core.toml";
    pub const CONFIG_ENV_VAR: &str = "IMU_CORE_CONFIG";
}

/// Simulated sensor
pub mod simulation {
    pub const DEFAULT_SAMPLE_RATE_HZ: f64 = 50.0;
    pub const DEFAULT_COMPLETION_DELAY_MS: u64 = 2;
    pub const DEFAULT_SEED: u64 = 0x5eed;
    pub const DEFAULT_ADDRESS: &str = "SIM:00:00:00:00:01";
    pub const GRAVITY_G: f64 = 1.0;
    /// Peak uniform sensor noise
    pub const ACC_NOISE_G: f64 = 0.005;
    pub const GYRO_NOISE_DPS: f64 = 0.5;
}
