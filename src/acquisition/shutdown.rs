// src/acquisition/shutdown.rs
//! Ordered, bounded-time teardown of a streaming session
//!
//! Order: stop device sampling, close both queues, give each writer a bounded
//! window to drain, terminate the writers, then flush and close the files.
//! Every step runs even when an earlier one failed.

use crate::acquisition::pipeline::{ChannelPipeline, IngestionPipeline};
use crate::config::PipelineSettings;
use crate::error::ImuResult;
use crate::hal::types::SensorKind;
use std::thread;
use std::time::{Duration, Instant};

const DRAIN_POLL: Duration = Duration::from_millis(10);

/// Anything that can stop the device from producing samples
pub trait SamplingControl {
    fn stop_sampling(&mut self) -> ImuResult<()>;
}

/// Outcome for one channel
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelShutdown {
    pub kind: SensorKind,
    /// Writer reported idle with an empty queue within the drain budget
    pub drained: bool,
    /// Writer thread exited within the join budget
    pub joined: bool,
    pub rows_written: u64,
    /// Samples still queued after the writer was terminated
    pub samples_abandoned: usize,
    pub close_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShutdownReport {
    pub stop_error: Option<String>,
    pub channels: Vec<ChannelShutdown>,
    pub elapsed: Duration,
}

impl ShutdownReport {
    pub fn channel(&self, kind: SensorKind) -> Option<&ChannelShutdown> {
        self.channels.iter().find(|channel| channel.kind == kind)
    }

    /// Every queued sample reached its file and every step succeeded
    pub fn is_clean(&self) -> bool {
        self.stop_error.is_none()
            && self
                .channels
                .iter()
                .all(|c| c.drained && c.joined && c.samples_abandoned == 0 && c.close_error.is_none())
    }
}

/// Runs the teardown with fixed time budgets
#[derive(Debug, Clone, Copy)]
pub struct ShutdownCoordinator {
    drain_timeout: Duration,
    join_timeout: Duration,
}

impl ShutdownCoordinator {
    pub fn new(drain_timeout: Duration, join_timeout: Duration) -> Self {
        Self {
            drain_timeout,
            join_timeout,
        }
    }

    pub fn from_settings(settings: &PipelineSettings) -> Self {
        Self::new(settings.drain_timeout(), settings.worker_join_timeout())
    }

    /// Tear the session down. Worst case is bounded by two drain budgets plus
    /// two join budgets.
    pub fn shutdown(&self, sampling: &mut dyn SamplingControl, pipeline: IngestionPipeline) -> ShutdownReport {
        let started = Instant::now();
        tracing::info!("shutting down session");

        let stop_error = match sampling.stop_sampling() {
            Ok(()) => None,
            Err(e) => {
                tracing::error!("failed to stop sampling: {}", e);
                Some(e.to_string())
            }
        };

        let mut channels = pipeline.into_channels();
        for channel in &channels {
            channel.producer.close();
        }

        let drained: Vec<bool> = channels
            .iter()
            .map(|channel| {
                let drained = wait_drained(channel, self.drain_timeout);
                if !drained {
                    tracing::warn!(
                        kind = %channel.kind,
                        pending = channel.queued(),
                        budget = ?self.drain_timeout,
                        "queue not drained in time"
                    );
                }
                drained
            })
            .collect();

        let joined: Vec<bool> = channels
            .iter_mut()
            .map(|channel| channel.worker.terminate(self.join_timeout))
            .collect();

        let reports = channels
            .iter()
            .zip(drained)
            .zip(joined)
            .map(|((channel, drained), joined)| {
                let close_error = match channel.writer.try_lock_for(self.join_timeout) {
                    Some(mut writer) => writer.close().err().map(|e| e.to_string()),
                    None => Some("writer still busy".to_string()),
                };
                if let Some(reason) = &close_error {
                    tracing::error!(kind = %channel.kind, "failed to close writer: {}", reason);
                }
                ChannelShutdown {
                    kind: channel.kind,
                    drained,
                    joined,
                    rows_written: rows_written(channel),
                    samples_abandoned: channel.queued(),
                    close_error,
                }
            })
            .collect();

        let report = ShutdownReport {
            stop_error,
            channels: reports,
            elapsed: started.elapsed(),
        };
        tracing::info!(elapsed = ?report.elapsed, clean = report.is_clean(), "session shut down");
        report
    }
}

fn wait_drained(channel: &ChannelPipeline, budget: Duration) -> bool {
    let deadline = Instant::now() + budget;
    loop {
        if channel.is_drained() {
            return true;
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return false;
        }
        let step = remaining.min(DRAIN_POLL);
        if channel.idle.is_set() {
            // Stale idle flag, the worker has not picked up the latest items yet
            thread::sleep(step);
        } else {
            channel.idle.wait(step);
        }
    }
}

fn rows_written(channel: &ChannelPipeline) -> u64 {
    channel
        .writer
        .try_lock_for(DRAIN_POLL)
        .map_or(0, |writer| writer.rows_written())
}
