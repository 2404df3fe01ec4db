//! Batch scheduling over the full comment set.
//!
//! Comments are split into fixed-size batches. All comments of a batch are
//! resolved concurrently, each on its own task, so a panic in one comment's
//! pipeline is contained at the task boundary and counted as `neutral`.
//! A cooldown separates consecutive batches to stay under provider rate
//! limits; no cooldown follows the final batch.

use crate::aggregator::Aggregator;
use crate::pipeline::CommentPipeline;
use futures_util::future::join_all;
use sentiscope_core::{BatchConfig, Comment, ResolvedSentiment, SentimentError};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tokio_util::task::AbortOnDropHandle;
use tracing::{debug, error};

/// Result of driving the pipeline over a comment set.
#[derive(Debug)]
pub enum ScheduleOutcome {
    /// Every batch was processed.
    Completed {
        aggregator: Aggregator,
        /// Cooldown delays observed between batches.
        cooldowns: usize,
    },
    /// The run was cancelled before finishing.
    Cancelled {
        /// Batches fully processed before cancellation.
        completed_batches: usize,
    },
}

/// Fixed-size batch scheduler with an inter-batch cooldown.
#[derive(Debug, Clone)]
pub struct BatchScheduler {
    batch_size: usize,
    cooldown: Duration,
}

impl BatchScheduler {
    pub fn new(config: &BatchConfig) -> Self {
        Self {
            batch_size: config.size.max(1),
            cooldown: Duration::from_millis(config.cooldown_ms),
        }
    }

    #[must_use]
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Number of batches needed for `comments` comments.
    #[must_use]
    pub fn batch_count(&self, comments: usize) -> usize {
        comments.div_ceil(self.batch_size)
    }

    /// Resolve every comment, batch by batch.
    ///
    /// `on_batch(batch, batches)` is called with a 1-based batch index before
    /// each batch starts. Cancellation is honoured while a batch is in flight
    /// (its tasks are aborted) and during cooldowns. Dropping the returned
    /// future also aborts the batch in flight.
    pub async fn run<F>(
        &self,
        pipeline: &Arc<CommentPipeline>,
        comments: &[Comment],
        cancel: &CancellationToken,
        mut on_batch: F,
    ) -> ScheduleOutcome
    where
        F: FnMut(usize, usize) + Send,
    {
        let batches = self.batch_count(comments.len());
        let mut aggregator = Aggregator::with_capacity(comments.len());
        let mut cooldowns = 0;

        for (index, batch) in comments.chunks(self.batch_size).enumerate() {
            if cancel.is_cancelled() {
                return ScheduleOutcome::Cancelled {
                    completed_batches: index,
                };
            }
            on_batch(index + 1, batches);
            debug!(batch = index + 1, batches, size = batch.len(), "Processing batch");

            let handles: Vec<_> = batch
                .iter()
                .cloned()
                .map(|comment| {
                    let pipeline = Arc::clone(pipeline);
                    AbortOnDropHandle::new(tokio::spawn(async move {
                        pipeline.resolve(&comment).await
                    }))
                })
                .collect();

            // Dropping the join (cancellation, or this future being dropped)
            // aborts every task still running in the batch.
            let results = tokio::select! {
                results = join_all(handles) => results,
                _ = cancel.cancelled() => {
                    return ScheduleOutcome::Cancelled { completed_batches: index };
                }
            };

            for (offset, result) in results.into_iter().enumerate() {
                let resolved = result.unwrap_or_else(|join_error| {
                    let e = SentimentError::Pipeline(join_error.to_string());
                    error!(
                        comment = index * self.batch_size + offset,
                        error = %e,
                        "Comment pipeline failed unexpectedly, counting as neutral"
                    );
                    ResolvedSentiment::failure()
                });
                aggregator.record(resolved);
            }

            if index + 1 < batches {
                debug!(cooldown_ms = self.cooldown.as_millis() as u64, "Pausing between batches");
                tokio::select! {
                    _ = tokio::time::sleep(self.cooldown) => cooldowns += 1,
                    _ = cancel.cancelled() => {
                        return ScheduleOutcome::Cancelled { completed_batches: index + 1 };
                    }
                }
            }
        }

        ScheduleOutcome::Completed {
            aggregator,
            cooldowns,
        }
    }
}
