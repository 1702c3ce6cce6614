use aws_sdk_dynamodb::types::WriteRequest;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::dead_letter::DeadLetterEntry;
use crate::error::{Error, Result};
use crate::item::{Item, put_requests};
use crate::retry::RetryPolicy;
use crate::store::TableStore;
use crate::throttle::RateGate;

/// Maximum requests per `BatchWriteItem` call
pub const BATCH_WRITE_SIZE: usize = 25;

/// Writes item collections to a table in throttled, retried batches of 25
///
/// Batches are submitted one after another. Requests the store leaves unprocessed are
/// resubmitted on their own with backoff; a batch whose retries run out is turned into a
/// [`DeadLetterEntry`] and the remaining batches still go out.
#[derive(Clone)]
pub struct BatchWriter {
    store: Arc<dyn TableStore>,
    retry: RetryPolicy,
}

impl fmt::Debug for BatchWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchWriter")
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl BatchWriter {
    /// Writer with the default retry policy
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self::with_retry(store, RetryPolicy::default())
    }

    /// Writer with a custom retry policy
    pub fn with_retry(store: Arc<dyn TableStore>, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    /// Retry policy applied to each batch
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Put every item into `destination`
    ///
    /// Waits `delay` before each batch. When `quiet` is set nothing is logged above debug
    /// level. Store failures never surface as `Err`: they come back as dead-letter entries.
    /// `Err` is only returned when an item cannot be turned into a write request.
    pub async fn write(
        &self,
        destination: &str,
        items: Vec<Item>,
        delay: Duration,
        quiet: bool,
    ) -> Result<Vec<DeadLetterEntry>> {
        let mut queue: VecDeque<WriteRequest> = put_requests(items)?.into();
        let gate = RateGate::new(delay);
        let mut dead_letters = Vec::new();

        while !queue.is_empty() {
            gate.wait().await;

            let take = queue.len().min(BATCH_WRITE_SIZE);
            let batch: Vec<WriteRequest> = queue.drain(..take).collect();

            if let Some(entry) = self.submit(destination, batch, quiet).await {
                if !quiet {
                    warn!(
                        destination,
                        requests = entry.len(),
                        error = %entry.error,
                        "batch failed after {} attempts, dead-lettered",
                        self.retry.max_attempts()
                    );
                }
                dead_letters.push(entry);
            }
        }

        Ok(dead_letters)
    }

    /// Submit one batch under the retry policy. Each attempt only resubmits what the
    /// previous attempt left unprocessed.
    async fn submit(
        &self,
        destination: &str,
        batch: Vec<WriteRequest>,
        quiet: bool,
    ) -> Option<DeadLetterEntry> {
        let pending = Mutex::new(batch);

        let outcome = self
            .retry
            .run(|attempt| {
                let pending = &pending;
                async move {
                    let requests = pending.lock().await.clone();

                    if attempt > 1 && !quiet {
                        warn!(
                            destination,
                            attempt,
                            requests = requests.len(),
                            "retrying batch write"
                        );
                    }

                    let mut result = self.store.write_batch(destination, requests).await?;
                    debug!(
                        destination,
                        attempt,
                        consumed_capacity = result.consumed_capacity.unwrap_or(0.0),
                        "wrote batch"
                    );

                    let unprocessed = result.take_unprocessed(destination);
                    if unprocessed.is_empty() {
                        return Ok(());
                    }

                    let count = unprocessed.len();
                    *pending.lock().await = unprocessed;

                    Err(Error::UnprocessedItems {
                        table: destination.to_string(),
                        count,
                    })
                }
            })
            .await;

        match outcome {
            Ok(()) => None,
            Err(error) => Some(DeadLetterEntry {
                destination: destination.to_string(),
                requests: pending.into_inner(),
                error,
            }),
        }
    }
}
