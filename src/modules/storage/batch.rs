//! Batch upload policies.
//!
//! Pacing between uploads goes through a [`Pacer`] so that the schedule can be
//! observed in tests without sleeping. Retries are opt-in through
//! [`RetryPolicy`]; adapters themselves never retry.

use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use tracing::{debug, warn};

use super::provider::StorageProvider;
use super::types::{StorageUploadResult, UploadFile};

/// One file of a batch together with its destination key
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub file: UploadFile,
    pub key: String,
}

#[allow(dead_code)]
impl BatchItem {
    pub fn new(file: UploadFile, key: impl Into<String>) -> Self {
        Self {
            file,
            key: key.into(),
        }
    }
}

/// How a batch is spread over time
#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchPolicy {
    /// One upload at a time with a pause between consecutive items
    Serial { delay: Duration },
    /// Every upload in flight at once, no pacing
    Parallel,
}

/// Something that can wait for a given duration
#[async_trait]
pub trait Pacer: Send + Sync {
    async fn pause(&self, delay: Duration);
}

/// Wall-clock pacer backed by `tokio::time::sleep`
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioPacer;

#[async_trait]
impl Pacer for TokioPacer {
    async fn pause(&self, delay: Duration) {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

/// Upload `items` with the given policy.
///
/// Always yields exactly one result per item. Serial batches keep input order;
/// parallel batches also return results in input order, but the uploads
/// themselves complete in no particular order.
#[allow(dead_code)]
pub async fn upload_batch<P>(
    provider: &P,
    items: &[BatchItem],
    policy: BatchPolicy,
    pacer: &dyn Pacer,
) -> Vec<StorageUploadResult>
where
    P: StorageProvider + ?Sized,
{
    match policy {
        BatchPolicy::Serial { delay } => {
            let mut results = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                results.push(provider.upload(&item.file, &item.key).await);
                if index + 1 < items.len() {
                    pacer.pause(delay).await;
                }
            }
            results
        }
        BatchPolicy::Parallel => {
            join_all(
                items
                    .iter()
                    .map(|item| provider.upload(&item.file, &item.key)),
            )
            .await
        }
    }
}

/// Caller-side retry schedule for single uploads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_backoff: Duration,
    multiplier: u32,
}

impl RetryPolicy {
    pub const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_millis(300);
    pub const DEFAULT_MULTIPLIER: u32 = 2;

    pub fn new(max_attempts: u32, initial_backoff: Duration, multiplier: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_backoff,
            multiplier: multiplier.max(1),
        }
    }

    /// A single attempt, no retries
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO, 1)
    }

    /// `max_attempts` with the default exponential backoff
    pub fn attempts(max_attempts: u32) -> Self {
        Self::new(
            max_attempts,
            Self::DEFAULT_INITIAL_BACKOFF,
            Self::DEFAULT_MULTIPLIER,
        )
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Pauses taken before attempt 2, 3, ... (length `max_attempts - 1`)
    pub fn backoff_schedule(&self) -> Vec<Duration> {
        let mut delay = self.initial_backoff;
        (1..self.max_attempts)
            .map(|_| {
                let current = delay;
                delay = delay.saturating_mul(self.multiplier);
                current
            })
            .collect()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

/// Upload once, then retry according to `retry` while the result is a failure
pub async fn upload_with_retry<P>(
    provider: &P,
    file: &UploadFile,
    key: &str,
    retry: &RetryPolicy,
    pacer: &dyn Pacer,
) -> StorageUploadResult
where
    P: StorageProvider + ?Sized,
{
    let mut result = provider.upload(file, key).await;

    for (attempt, delay) in retry.backoff_schedule().into_iter().enumerate() {
        if result.success {
            break;
        }
        warn!(
            "Upload of '{}' to {} failed (attempt {}/{}): {}",
            key,
            provider.name(),
            attempt + 1,
            retry.max_attempts(),
            result.error.as_deref().unwrap_or("unknown error")
        );
        pacer.pause(delay).await;
        result = provider.upload(file, key).await;
    }

    debug!("Upload of '{}' finished: success={}", key, result.success);
    result
}
