use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

const NANOS_PER_SEC: f64 = 1_000_000_000.0;

/// Time provider trait for dependency injection and testing
pub trait TimeProvider: Send + Sync {
    fn now_nanos(&self) -> u64;

    /// Wall-clock seconds since the Unix epoch
    fn now_secs(&self) -> f64 {
        self.now_nanos() as f64 / NANOS_PER_SEC
    }
}

/// System time provider using actual system clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn now_nanos(&self) -> u64 {
        current_timestamp_nanos()
    }
}

/// Mock time provider for deterministic testing
#[derive(Debug)]
pub struct MockTimeProvider {
    current_time: AtomicU64,
}

impl MockTimeProvider {
    pub fn new(initial_time_nanos: u64) -> Self {
        Self {
            current_time: AtomicU64::new(initial_time_nanos),
        }
    }

    /// Start at a whole number of seconds
    pub fn at_secs(secs: u64) -> Self {
        Self::new(secs * 1_000_000_000)
    }

    pub fn advance_by(&self, nanos: u64) {
        self.current_time.fetch_add(nanos, Ordering::Relaxed);
    }

    pub fn advance_millis(&self, millis: u64) {
        self.advance_by(millis * 1_000_000);
    }

    pub fn set_time(&self, nanos: u64) {
        self.current_time.store(nanos, Ordering::Relaxed);
    }
}

impl TimeProvider for MockTimeProvider {
    fn now_nanos(&self) -> u64 {
        self.current_time.load(Ordering::Relaxed)
    }
}

pub fn current_timestamp_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}

pub fn current_timestamp_secs() -> f64 {
    current_timestamp_nanos() as f64 / NANOS_PER_SEC
}
