use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use super::error::{AdvisorError, Result};
use crate::config::GenerationConfig;

/// Concurrency caps for calls to the generation backend
#[derive(Clone)]
pub struct Limiters {
    pub generation: Arc<Semaphore>,
    pub acquire_timeout: Duration,
}

impl Limiters {
    pub fn new(cfg: &GenerationConfig) -> Self {
        Self {
            generation: Arc::new(Semaphore::new(cfg.max_concurrency.max(1))),
            acquire_timeout: Duration::from_millis(cfg.acquire_timeout_ms.max(1)),
        }
    }

    pub async fn acquire_timed(
        sem: Arc<Semaphore>,
        acquire_timeout: Duration,
        op: &'static str,
    ) -> Result<(OwnedSemaphorePermit, Duration)> {
        let start = Instant::now();

        let permit = tokio::time::timeout(acquire_timeout, sem.acquire_owned())
            .await
            .map_err(|_| {
                AdvisorError::GenerationFailure(format!("limiter acquire timeout for op={}", op))
            })?
            .map_err(|_| AdvisorError::GenerationFailure(format!("limiter closed for op={}", op)))?;

        Ok((permit, start.elapsed()))
    }

    pub async fn acquire_generation(&self) -> Result<(OwnedSemaphorePermit, Duration)> {
        Self::acquire_timed(self.generation.clone(), self.acquire_timeout, "generate").await
    }
}
