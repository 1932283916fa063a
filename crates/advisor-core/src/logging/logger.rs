use anyhow::Result;
use async_trait::async_trait;
use flume::{bounded, Receiver, Sender};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use super::types::ActivityLog;

/// Logger configuration
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Queue capacity (max logs in memory before records are dropped)
    pub queue_capacity: usize,

    /// Batch size per sink write
    pub batch_size: usize,

    /// Max wait time before flushing batch (milliseconds)
    pub batch_timeout_ms: u64,

    /// Number of worker tasks draining the queue
    pub worker_count: usize,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 10_000,
            batch_size: 100,
            batch_timeout_ms: 1000,
            worker_count: 2,
        }
    }
}

/// Destination for flushed activity batches
#[async_trait]
pub trait ActivitySink: Send + Sync {
    async fn write_batch(&self, batch: &[ActivityLog]) -> Result<usize>;
}

/// Emits every record as a structured tracing event
pub struct TracingSink;

#[async_trait]
impl ActivitySink for TracingSink {
    async fn write_batch(&self, batch: &[ActivityLog]) -> Result<usize> {
        for log in batch {
            info!(
                target: "advisor_core::activity",
                activity = log.activity_type.as_str(),
                status = log.activity_status.as_str(),
                session_id = log.session_id.as_deref().unwrap_or("-"),
                user_id = log.user_id.as_deref().unwrap_or("-"),
                processing_time_ms = log.processing_time_ms,
                llm_call_duration_ms = log.llm_call_duration_ms,
                input_tokens = log.input_tokens,
                output_tokens = log.output_tokens,
                quality_score = log.quality_score,
                affected_rows = log.affected_rows,
                error_type = log.error_type.as_deref(),
                "activity"
            );
        }
        Ok(batch.len())
    }
}

/// Async activity logger with queue mechanism.
/// Must be constructed inside a tokio runtime.
#[derive(Clone)]
pub struct ActivityLogger {
    sender: Sender<ActivityLog>,
}

impl ActivityLogger {
    /// Initialize logger with background workers
    pub fn new(sink: Arc<dyn ActivitySink>, config: LoggerConfig) -> Self {
        let (sender, receiver) = bounded(config.queue_capacity.max(1));

        info!(
            "Initializing ActivityLogger: queue={}, batch={}, timeout={}ms, workers={}",
            config.queue_capacity, config.batch_size, config.batch_timeout_ms, config.worker_count
        );

        for worker_id in 0..config.worker_count.max(1) {
            let sink = sink.clone();
            let receiver = receiver.clone();
            let config = config.clone();

            tokio::spawn(async move {
                Self::worker_loop(worker_id, sink, receiver, config).await;
            });
        }

        Self { sender }
    }

    /// Logger writing to the tracing subscriber with default settings
    pub fn tracing() -> Self {
        Self::new(Arc::new(TracingSink), LoggerConfig::default())
    }

    /// Log activity (non-blocking, fire-and-forget)
    pub fn log(&self, activity: ActivityLog) {
        if let Err(e) = self.sender.try_send(activity) {
            warn!("Failed to enqueue activity log (queue full?): {}", e);
        }
    }

    /// Worker loop - processes logs in batches
    async fn worker_loop(
        worker_id: usize,
        sink: Arc<dyn ActivitySink>,
        receiver: Receiver<ActivityLog>,
        config: LoggerConfig,
    ) {
        debug!("Activity worker {} started", worker_id);

        let batch_size = config.batch_size.max(1);
        let mut batch: Vec<ActivityLog> = Vec::with_capacity(batch_size);
        let batch_timeout = Duration::from_millis(config.batch_timeout_ms);

        loop {
            let deadline = tokio::time::Instant::now() + batch_timeout;

            while batch.len() < batch_size {
                match tokio::time::timeout_at(deadline, receiver.recv_async()).await {
                    Ok(Ok(log)) => batch.push(log),
                    Ok(Err(_)) => {
                        // Channel closed, flush and exit
                        if !batch.is_empty() {
                            Self::flush_batch(sink.as_ref(), &batch, worker_id).await;
                        }
                        debug!("Activity worker {} shutting down (channel closed)", worker_id);
                        return;
                    }
                    Err(_) => break,
                }
            }

            if !batch.is_empty() {
                Self::flush_batch(sink.as_ref(), &batch, worker_id).await;
                batch.clear();
            } else {
                sleep(Duration::from_millis(100)).await;
            }
        }
    }

    async fn flush_batch(sink: &dyn ActivitySink, batch: &[ActivityLog], worker_id: usize) {
        let start = std::time::Instant::now();

        match sink.write_batch(batch).await {
            Ok(written) => {
                debug!(
                    "Activity worker {} wrote {} logs in {:?}",
                    worker_id,
                    written,
                    start.elapsed()
                );
            }
            Err(e) => {
                error!("Activity worker {} failed to write batch: {}", worker_id, e);
            }
        }
    }

    /// Get queue statistics (for monitoring)
    pub fn queue_len(&self) -> usize {
        self.sender.len()
    }

    pub fn is_queue_full(&self) -> bool {
        self.sender.is_full()
    }
}
