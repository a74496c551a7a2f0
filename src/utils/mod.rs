//! Common utilities shared by the pipeline and the aggregator

pub mod time;

pub use time::{
    current_timestamp_nanos,
    current_timestamp_secs,
    MockTimeProvider,
    SystemTimeProvider,
    TimeProvider,
};
