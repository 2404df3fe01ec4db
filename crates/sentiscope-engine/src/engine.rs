//! The sentiment aggregation engine.
//!
//! [`SentimentEngine::compute_distribution`] drives the batch scheduler over
//! a comment set and commits the resulting [`RunReport`]. Every run carries a
//! [`Generation`]; starting a run cancels the one in flight, and a run only
//! commits if its generation is still the latest when it finishes, so a slow
//! stale run can never overwrite a newer result.

use crate::client::HttpInferenceClient;
use crate::pipeline::CommentPipeline;
use crate::scheduler::{BatchScheduler, ScheduleOutcome};
use chrono::Utc;
use sentiscope_core::{
    fingerprint, Comment, EngineConfig, Generation, InferenceBackend, Result, RunId, RunReport,
    RunState, SentimentError,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Clears a run's bookkeeping however it ends, including when the
/// `compute_distribution` future is dropped mid-run.
struct RunGuard<'a> {
    engine: &'a SentimentEngine,
    generation: Generation,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.engine.release(self.generation.sequence);
        if self.engine.settle(self.generation) {
            warn!(generation = %self.generation, "Run abandoned before completion");
        }
    }
}

/// Comment sentiment aggregation engine.
pub struct SentimentEngine {
    backend_name: &'static str,
    pipeline: Arc<CommentPipeline>,
    scheduler: BatchScheduler,
    /// Sequence number of the most recently started run.
    sequence: AtomicU64,
    /// Cancellation handle of the run currently in flight.
    in_flight: Mutex<Option<(u64, CancellationToken)>>,
    latest: RwLock<Option<Arc<RunReport>>>,
    state: watch::Sender<RunState>,
    /// Parent of every run token.
    shutdown: CancellationToken,
}

impl SentimentEngine {
    /// Build an engine that talks to the configured HTTP endpoints.
    ///
    /// # Errors
    ///
    /// Returns [`SentimentError::Config`] if the configuration is invalid
    /// (e.g. no API token) or the HTTP client cannot be built.
    pub fn new(config: &EngineConfig) -> Result<Self> {
        config.validate()?;
        let backend = Arc::new(HttpInferenceClient::new(config)?);
        Ok(Self::with_backend(config, backend))
    }

    /// Build an engine on top of any [`InferenceBackend`].
    pub fn with_backend(config: &EngineConfig, backend: Arc<dyn InferenceBackend>) -> Self {
        let (state, _) = watch::channel(RunState::Idle);
        Self {
            backend_name: backend.name(),
            pipeline: Arc::new(CommentPipeline::new(backend, config)),
            scheduler: BatchScheduler::new(&config.batch),
            sequence: AtomicU64::new(0),
            in_flight: Mutex::new(None),
            latest: RwLock::new(None),
            state,
            shutdown: CancellationToken::new(),
        }
    }

    /// Resolve every comment and commit the distribution.
    ///
    /// The returned report always satisfies `distribution.total ==
    /// comments.len()`.
    ///
    /// # Errors
    ///
    /// - [`SentimentError::Superseded`] if a newer run started before this
    ///   one could commit; its result is discarded.
    /// - [`SentimentError::Pipeline`] if the engine is shutting down.
    pub async fn compute_distribution(&self, comments: &[Comment]) -> Result<RunReport> {
        if self.shutdown.is_cancelled() {
            return Err(SentimentError::Pipeline(
                "engine is shutting down".to_string(),
            ));
        }

        let run_id = RunId::new();
        let generation = Generation {
            sequence: self.sequence.fetch_add(1, Ordering::SeqCst) + 1,
            fingerprint: fingerprint(comments),
        };
        let cancel = self.shutdown.child_token();
        let previous = self
            .in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .replace((generation.sequence, cancel.clone()));
        if let Some((sequence, token)) = previous {
            debug!(superseded = sequence, %generation, "Cancelling in-flight run");
            token.cancel();
        }
        let _guard = RunGuard {
            engine: self,
            generation,
        };

        let batches = self.scheduler.batch_count(comments.len());
        info!(
            %run_id,
            %generation,
            comments = comments.len(),
            batches,
            "Starting sentiment run"
        );
        let started_at = Utc::now();
        self.publish(
            generation,
            RunState::Running {
                generation,
                batch: 0,
                batches,
            },
        );

        let outcome = self
            .scheduler
            .run(&self.pipeline, comments, &cancel, |batch, batches| {
                self.publish(
                    generation,
                    RunState::Running {
                        generation,
                        batch,
                        batches,
                    },
                );
            })
            .await;

        let (aggregator, cooldowns) = match outcome {
            ScheduleOutcome::Completed {
                aggregator,
                cooldowns,
            } => (aggregator, cooldowns),
            ScheduleOutcome::Cancelled { completed_batches } => {
                if self.shutdown.is_cancelled() {
                    warn!(%run_id, completed_batches, "Run cancelled by shutdown");
                    return Err(SentimentError::Pipeline(
                        "engine is shutting down".to_string(),
                    ));
                }
                warn!(%run_id, %generation, completed_batches, "Run superseded before completion");
                return Err(SentimentError::Superseded { generation });
            }
        };

        let (distribution, resolved, failed) = aggregator.into_parts();
        self.commit(RunReport {
            run_id,
            generation,
            distribution,
            resolved,
            failed,
            cooldowns,
            started_at,
            completed_at: Utc::now(),
        })
    }

    /// Store `report` as the latest result if its generation is still current.
    fn commit(&self, report: RunReport) -> Result<RunReport> {
        let mut latest = self.latest.write().unwrap_or_else(|e| e.into_inner());
        if self.sequence.load(Ordering::SeqCst) != report.generation.sequence {
            warn!(
                run_id = %report.run_id,
                generation = %report.generation,
                "Discarding stale run result"
            );
            return Err(SentimentError::Superseded {
                generation: report.generation,
            });
        }

        info!(
            run_id = %report.run_id,
            generation = %report.generation,
            total = report.distribution.total,
            failed = report.failed,
            "Sentiment run committed"
        );
        *latest = Some(Arc::new(report.clone()));
        self.state.send_replace(RunState::Idle);
        Ok(report)
    }

    /// Publish `state` unless a newer run has started.
    fn publish(&self, generation: Generation, state: RunState) {
        if self.sequence.load(Ordering::SeqCst) == generation.sequence {
            self.state.send_replace(state);
        }
    }

    /// Go back to `Idle` if the state still shows this run in flight.
    fn settle(&self, generation: Generation) -> bool {
        self.state.send_if_modified(|state| {
            let ours = matches!(
                state,
                RunState::Running { generation: g, .. } if *g == generation
            );
            if ours {
                *state = RunState::Idle;
            }
            ours
        })
    }

    fn release(&self, sequence: u64) {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if matches!(in_flight.as_ref(), Some((current, _)) if *current == sequence) {
            *in_flight = None;
        }
    }

    /// Latest committed report, if any run has completed.
    #[must_use]
    pub fn latest(&self) -> Option<Arc<RunReport>> {
        self.latest
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Current run state.
    #[must_use]
    pub fn state(&self) -> RunState {
        *self.state.borrow()
    }

    /// Watch run state transitions.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<RunState> {
        self.state.subscribe()
    }

    /// Cancel any in-flight run and refuse new ones.
    pub fn shutdown(&self) {
        info!("Sentiment engine shutting down");
        self.shutdown.cancel();
        self.state.send_replace(RunState::Idle);
    }

    /// Name of the inference backend in use.
    #[must_use]
    pub fn backend_name(&self) -> &'static str {
        self.backend_name
    }
}
