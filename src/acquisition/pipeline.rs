// src/acquisition/pipeline.rs
//! Queue + writer + worker wiring for both channels

use crate::acquisition::consumer::{ConsumerWorker, WorkerTiming};
use crate::acquisition::queue::{self, IdleFlag, QueueProducer};
use crate::acquisition::writer::DataWriter;
use crate::config::PipelineSettings;
use crate::error::ImuResult;
use crate::hal::types::{Sample, SensorKind};
use crate::session::SessionPaths;
use crate::utils::time::TimeProvider;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;

/// Everything that belongs to one channel's ingestion path
pub struct ChannelPipeline {
    pub(crate) kind: SensorKind,
    pub(crate) producer: QueueProducer<Sample>,
    pub(crate) worker: ConsumerWorker,
    pub(crate) writer: Arc<Mutex<DataWriter>>,
    pub(crate) idle: IdleFlag,
}

impl ChannelPipeline {
    pub fn open(
        kind: SensorKind,
        path: &Path,
        raw_mode: bool,
        settings: &PipelineSettings,
        clock: Arc<dyn TimeProvider>,
    ) -> ImuResult<Self> {
        let (producer, consumer) = queue::bounded(settings.queue_capacity)?;
        let writer = Arc::new(Mutex::new(DataWriter::create(path, kind, raw_mode, clock)?));
        let idle = IdleFlag::new();
        let worker = ConsumerWorker::spawn(
            kind,
            consumer,
            Arc::clone(&writer),
            idle.clone(),
            WorkerTiming::from(settings),
        )?;

        Ok(Self {
            kind,
            producer,
            worker,
            writer,
            idle,
        })
    }

    pub fn kind(&self) -> SensorKind {
        self.kind
    }

    /// Producer to hand to the device callback
    pub fn sink(&self) -> QueueProducer<Sample> {
        self.producer.clone()
    }

    pub fn queued(&self) -> usize {
        self.producer.len()
    }

    pub fn rows_written(&self) -> u64 {
        self.writer.lock().rows_written()
    }

    /// Worker idle and nothing queued
    pub fn is_drained(&self) -> bool {
        self.idle.is_set() && self.producer.is_empty()
    }
}

/// Both channel pipelines of one session
pub struct IngestionPipeline {
    channels: Vec<ChannelPipeline>,
}

impl IngestionPipeline {
    /// Create session files, queues and writer threads
    pub fn open(
        paths: &SessionPaths,
        raw_mode: bool,
        settings: &PipelineSettings,
        clock: Arc<dyn TimeProvider>,
    ) -> ImuResult<Self> {
        paths.ensure_dirs()?;
        let channels = SensorKind::ALL
            .iter()
            .map(|&kind| ChannelPipeline::open(kind, paths.path(kind), raw_mode, settings, Arc::clone(&clock)))
            .collect::<ImuResult<Vec<_>>>()?;

        tracing::info!(
            session = paths.session_id(),
            raw_mode,
            capacity = settings.queue_capacity,
            "ingestion pipeline started"
        );
        Ok(Self { channels })
    }

    pub fn channel(&self, kind: SensorKind) -> &ChannelPipeline {
        match kind {
            SensorKind::Accelerometer => &self.channels[0],
            SensorKind::Gyroscope => &self.channels[1],
        }
    }

    pub fn sink(&self, kind: SensorKind) -> QueueProducer<Sample> {
        self.channel(kind).sink()
    }

    pub fn channels(&self) -> &[ChannelPipeline] {
        &self.channels
    }

    pub(crate) fn into_channels(self) -> Vec<ChannelPipeline> {
        self.channels
    }
}
