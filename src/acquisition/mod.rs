// src/acquisition/mod.rs
//! Streaming session, ingestion queues, writer workers and shutdown

pub mod consumer;
pub mod pipeline;
pub mod queue;
pub mod shutdown;
pub mod stream_session;
pub mod writer;

pub use consumer::{ConsumerWorker, WorkerTiming};
pub use pipeline::{ChannelPipeline, IngestionPipeline};
pub use queue::{bounded, IdleFlag, PushError, QueueConsumer, QueueError, QueueProducer};
pub use shutdown::{ChannelShutdown, SamplingControl, ShutdownCoordinator, ShutdownReport};
pub use stream_session::{SessionState, StreamSession};
pub use writer::{row_fields, DataWriter, RowLayout};
