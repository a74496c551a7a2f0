// src/acquisition/consumer.rs
//! Writer worker: moves samples from a channel queue into its CSV file
//!
//! One named OS thread per channel. The thread never installs signal handlers,
//! so an interrupt only reaches the main thread and shutdown stays in the
//! coordinator's hands.

use crate::acquisition::queue::{IdleFlag, QueueConsumer};
use crate::acquisition::writer::DataWriter;
use crate::config::PipelineSettings;
use crate::error::{ImuError, ImuResult};
use crate::hal::types::{Sample, SensorKind};
use crossbeam::channel::{self, select, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Worker timing
#[derive(Debug, Clone, Copy)]
pub struct WorkerTiming {
    /// How long one pop waits before the worker counts the queue as empty
    pub pop_timeout: Duration,
    /// Pause after an empty pop
    pub idle_backoff: Duration,
}

impl From<&PipelineSettings> for WorkerTiming {
    fn from(settings: &PipelineSettings) -> Self {
        Self {
            pop_timeout: settings.pop_timeout(),
            idle_backoff: settings.idle_backoff(),
        }
    }
}

enum Step {
    Write(Sample),
    Empty,
    Terminate,
    Disconnected,
}

/// Handle to a running writer thread
pub struct ConsumerWorker {
    kind: SensorKind,
    handle: Option<JoinHandle<()>>,
    cancel: Option<Sender<()>>,
    finished: Receiver<()>,
}

impl ConsumerWorker {
    pub fn spawn(
        kind: SensorKind,
        queue: QueueConsumer<Sample>,
        writer: Arc<Mutex<DataWriter>>,
        idle: IdleFlag,
        timing: WorkerTiming,
    ) -> ImuResult<Self> {
        let (cancel_tx, cancel_rx) = channel::bounded::<()>(1);
        let (finished_tx, finished_rx) = channel::bounded::<()>(0);
        let name = format!("{}-writer", kind.short_name());

        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                let _finished = finished_tx;
                consume(kind, &queue, &writer, &idle, &cancel_rx, timing);
            })
            .map_err(|source| ImuError::WorkerSpawn { name, source })?;

        Ok(Self {
            kind,
            handle: Some(handle),
            cancel: Some(cancel_tx),
            finished: finished_rx,
        })
    }

    pub fn kind(&self) -> SensorKind {
        self.kind
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |handle| handle.is_finished())
    }

    /// Ask the worker to stop and wait up to `join_timeout` for it.
    ///
    /// Returns `false` if the thread was still busy when the budget ran out;
    /// it is then left detached.
    pub fn terminate(&mut self, join_timeout: Duration) -> bool {
        drop(self.cancel.take());
        let Some(handle) = self.handle.take() else {
            return true;
        };

        match self.finished.recv_timeout(join_timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if handle.join().is_err() {
                    tracing::error!(kind = %self.kind, "writer thread panicked");
                }
                true
            }
            Err(RecvTimeoutError::Timeout) => {
                tracing::warn!(kind = %self.kind, ?join_timeout, "writer thread did not exit, detaching");
                false
            }
        }
    }
}

impl Drop for ConsumerWorker {
    fn drop(&mut self) {
        // Dropping the cancel sender is enough to make the loop exit
        drop(self.cancel.take());
    }
}

fn consume(
    kind: SensorKind,
    queue: &QueueConsumer<Sample>,
    writer: &Mutex<DataWriter>,
    idle: &IdleFlag,
    cancel: &Receiver<()>,
    timing: WorkerTiming,
) {
    tracing::debug!(%kind, "writer started");

    loop {
        if queue.is_finished() {
            idle.set();
            tracing::debug!(%kind, "queue closed and drained");
            break;
        }

        let step = select! {
            recv(cancel) -> _ => Step::Terminate,
            recv(queue.receiver()) -> msg => match msg {
                Ok(sample) => Step::Write(sample),
                Err(_) => Step::Disconnected,
            },
            default(timing.pop_timeout) => Step::Empty,
        };

        match step {
            Step::Write(sample) => {
                idle.clear();
                if let Err(e) = writer.lock().write_sample(&sample) {
                    tracing::error!(%kind, "failed to write sample: {}", e);
                    if matches!(e, ImuError::WriterClosed { .. }) {
                        break;
                    }
                }
            }
            Step::Empty => {
                idle.set();
                if queue.is_closed() {
                    continue;
                }
                tracing::trace!(%kind, "queue empty, backing off");
                match cancel.recv_timeout(timing.idle_backoff) {
                    Err(RecvTimeoutError::Timeout) => {}
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            Step::Terminate => {
                tracing::debug!(%kind, pending = queue.len(), "writer terminated");
                break;
            }
            Step::Disconnected => {
                idle.set();
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::queue::bounded;
    use crate::hal::types::Payload;
    use crate::utils::time::MockTimeProvider;
    use std::time::Instant;

    fn timing() -> WorkerTiming {
        WorkerTiming {
            pop_timeout: Duration::from_millis(10),
            idle_backoff: Duration::from_millis(20),
        }
    }

    fn sample(value: f64) -> Sample {
        Sample {
            timestamp: 0.0,
            payload: Payload::Scalar(value),
        }
    }

    fn writer(dir: &tempfile::TempDir) -> Arc<Mutex<DataWriter>> {
        let clock = Arc::new(MockTimeProvider::at_secs(1));
        let writer = DataWriter::create(
            dir.path().join("1_acc_data.csv"),
            SensorKind::Accelerometer,
            false,
            clock,
        )
        .unwrap();
        Arc::new(Mutex::new(writer))
    }

    #[test]
    fn test_worker_drains_and_exits_after_close() {
        let dir = tempfile::tempdir().unwrap();
        let writer = writer(&dir);
        let idle = IdleFlag::new();
        let (tx, rx) = bounded(16).unwrap();

        let mut worker =
            ConsumerWorker::spawn(SensorKind::Accelerometer, rx, writer.clone(), idle.clone(), timing()).unwrap();
        for i in 0..5 {
            tx.push(sample(i as f64)).unwrap();
        }
        tx.close();

        assert!(idle.wait(Duration::from_secs(2)));
        let deadline = Instant::now() + Duration::from_secs(2);
        while !worker.is_finished() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(worker.is_finished());
        assert!(worker.terminate(Duration::from_secs(1)));
        assert_eq!(writer.lock().rows_written(), 5);
    }

    #[test]
    fn test_terminate_interrupts_backoff() {
        let dir = tempfile::tempdir().unwrap();
        let idle = IdleFlag::new();
        let (_tx, rx) = bounded::<Sample>(4).unwrap();
        let slow = WorkerTiming {
            pop_timeout: Duration::from_millis(5),
            idle_backoff: Duration::from_secs(30),
        };

        let mut worker = ConsumerWorker::spawn(SensorKind::Gyroscope, rx, writer(&dir), idle.clone(), slow).unwrap();
        assert!(idle.wait(Duration::from_secs(2)));

        let start = Instant::now();
        assert!(worker.terminate(Duration::from_secs(2)));
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_worker_thread_is_named() {
        let dir = tempfile::tempdir().unwrap();
        let (_tx, rx) = bounded::<Sample>(4).unwrap();
        let worker = ConsumerWorker::spawn(SensorKind::Gyroscope, rx, writer(&dir), IdleFlag::new(), timing()).unwrap();
        let name = worker.handle.as_ref().and_then(|h| h.thread().name().map(str::to_owned));
        assert_eq!(name.as_deref(), Some("gyro-writer"));
    }
}
