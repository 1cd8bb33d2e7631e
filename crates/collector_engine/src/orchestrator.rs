use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use collector_core::{
    BatchState, BatchSummary, Candidate, Effect, FailureCause, JobId, Msg, ResumeError,
    SelectionChoice,
};
use engine_logging::{engine_info, job_debug, job_info, job_warn};
use thiserror::Error;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::poll::{poll_collection, PollOutcome, PollSettings};
use crate::store::{Dispatched, JobStore};
use crate::{Collaborator, RemoteStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorSettings {
    pub poll: PollSettings,
    /// Pause between one job settling and the next one starting.
    pub inter_job_delay: Duration,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            poll: PollSettings::default(),
            inter_job_delay: Duration::from_millis(500),
        }
    }
}

/// Why a call to [`Orchestrator::submit_batch`] or
/// [`Orchestrator::resume_selection`] returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every job reached a terminal status.
    Finished(BatchSummary),
    /// A job needs a human to pick which entities to analyze.
    Paused {
        job_id: JobId,
        candidates: Vec<Candidate>,
        preselected: Vec<String>,
    },
    /// The batch was aborted; later jobs stay pending.
    Aborted(BatchSummary),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BatchError {
    #[error("a batch is already running or waiting for a selection")]
    Busy,
    #[error(transparent)]
    Resume(#[from] ResumeError),
}

enum Step {
    Settled,
    Paused {
        job_id: JobId,
        candidates: Vec<Candidate>,
        preselected: Vec<String>,
    },
}

/// Drives a batch of jobs strictly one at a time against a [`Collaborator`].
pub struct Orchestrator {
    collaborator: Arc<dyn Collaborator>,
    settings: OrchestratorSettings,
    store: JobStore,
    cancel: Mutex<CancellationToken>,
    run_lock: tokio::sync::Mutex<()>,
}

impl Orchestrator {
    pub fn new(collaborator: Arc<dyn Collaborator>, settings: OrchestratorSettings) -> Self {
        Self {
            collaborator,
            settings,
            store: JobStore::new(),
            cancel: Mutex::new(CancellationToken::new()),
            run_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn snapshot(&self) -> BatchState {
        self.store.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<BatchState> {
        self.store.subscribe()
    }

    /// Replace the batch with the URLs in `raw` and run it until it finishes,
    /// pauses for a selection, or is aborted.
    pub async fn submit_batch(&self, raw: &str) -> Result<RunOutcome, BatchError> {
        let _running = self.run_lock.try_lock().map_err(|_| BatchError::Busy)?;
        let dispatched = self
            .store
            .try_dispatch(Msg::Submitted(raw.to_string()), |state| {
                match state.paused_at() {
                    Some(_) => Err(BatchError::Busy),
                    None => Ok(()),
                }
            })?;
        *self.cancel.lock().unwrap_or_else(PoisonError::into_inner) = CancellationToken::new();

        let summary = dispatched.state.summary();
        engine_info!(
            "batch submitted: {} job(s), {} rejected as invalid",
            summary.total,
            summary.errors
        );
        Ok(self.run_from(0).await)
    }

    /// Resolve the pending selection for `job_id` and continue with the jobs
    /// after it.
    pub async fn resume_selection(
        &self,
        job_id: JobId,
        choice: SelectionChoice,
    ) -> Result<RunOutcome, BatchError> {
        let _running = self.run_lock.try_lock().map_err(|_| BatchError::Busy)?;
        let msg = match &choice {
            SelectionChoice::Confirm(entity_ids) => Msg::SelectionConfirmed {
                job_id,
                entity_ids: entity_ids.clone(),
            },
            SelectionChoice::Skip => Msg::SelectionSkipped { job_id },
        };
        let dispatched = self
            .store
            .try_dispatch(msg, |state| state.check_resume(job_id, &choice))?;
        match &choice {
            SelectionChoice::Confirm(entity_ids) => {
                job_info!(job_id, "selection confirmed: {} entities", entity_ids.len())
            }
            SelectionChoice::Skip => job_info!(job_id, "selection skipped"),
        }
        let resumed_at = dispatched.state.index_of(job_id).unwrap_or_default();

        if let Step::Paused {
            job_id,
            candidates,
            preselected,
        } = self.drive(dispatched).await
        {
            return Ok(RunOutcome::Paused {
                job_id,
                candidates,
                preselected,
            });
        }
        let next = resumed_at + 1;
        self.wait_between_jobs(next).await;
        Ok(self.run_from(next).await)
    }

    /// Stop the batch: in-flight waits end immediately and no further job
    /// starts. Safe to call from any task.
    pub fn abort(&self) {
        engine_info!("abort requested");
        self.store.dispatch(Msg::AbortRequested);
        self.token().cancel();
    }

    fn token(&self) -> CancellationToken {
        self.cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn run_from(&self, start: usize) -> RunOutcome {
        let mut from = start;
        loop {
            let state = self.store.snapshot();
            if state.is_aborted() {
                let summary = state.summary();
                engine_info!(
                    "batch aborted: {} completed, {} failed, {} never started",
                    summary.completed,
                    summary.errors,
                    summary.pending
                );
                return RunOutcome::Aborted(summary);
            }
            let Some(job_id) = state.next_pending(from).map(|job| job.id) else {
                let summary = state.summary();
                engine_info!(
                    "batch finished: {} of {} completed",
                    summary.completed,
                    summary.total
                );
                return RunOutcome::Finished(summary);
            };
            let index = state.index_of(job_id).unwrap_or(from);

            let started = self.store.dispatch(Msg::JobStarted { job_id });
            if let Step::Paused {
                job_id,
                candidates,
                preselected,
            } = self.drive(started).await
            {
                job_info!(job_id, "waiting for entity selection");
                return RunOutcome::Paused {
                    job_id,
                    candidates,
                    preselected,
                };
            }

            from = index + 1;
            self.wait_between_jobs(from).await;
        }
    }

    /// Execute effects until the job settles or asks for a selection. Each
    /// effect's result is fed back through the store, and the effects it
    /// yields are queued next.
    async fn drive(&self, dispatched: Dispatched) -> Step {
        let mut queue: VecDeque<Effect> = dispatched.effects.into();
        let mut state = dispatched.state;
        while let Some(effect) = queue.pop_front() {
            let msg = match effect {
                Effect::AwaitSelection {
                    job_id,
                    preselected,
                } => {
                    let candidates = state
                        .job(job_id)
                        .map(|job| job.candidates.clone())
                        .unwrap_or_default();
                    return Step::Paused {
                        job_id,
                        candidates,
                        preselected,
                    };
                }
                Effect::StartCollection {
                    job_id,
                    url,
                    video_id,
                } => self.start_collection(job_id, &url, video_id).await,
                Effect::PollCollection { job_id, video_id } => {
                    self.await_collection(job_id, &video_id).await
                }
                Effect::ExtractEntities { job_id, video_id } => {
                    self.extract_entities(job_id, &video_id).await
                }
                Effect::Analyze {
                    job_id,
                    video_id,
                    entity_ids,
                } => self.analyze(job_id, &video_id, &entity_ids).await,
            };
            let next = self.store.dispatch(msg);
            queue.extend(next.effects);
            state = next.state;
        }
        Step::Settled
    }

    async fn start_collection(&self, job_id: JobId, url: &str, video_id: String) -> Msg {
        job_info!(job_id, "starting collection for {}", url);
        match self.collaborator.start_collection(url).await {
            Ok(start) if start.status == RemoteStatus::Error => {
                let detail = start.message.unwrap_or_default();
                job_warn!(job_id, "collection rejected: {}", detail);
                Msg::JobFailed {
                    job_id,
                    cause: FailureCause::UpstreamReported(detail),
                }
            }
            Ok(start) => {
                let accepted = start.video_id.unwrap_or(video_id);
                job_debug!(job_id, "collection accepted as video {}", accepted);
                Msg::CollectionStarted {
                    job_id,
                    video_id: accepted,
                }
            }
            Err(err) => {
                job_warn!(job_id, "collection request failed: {}", err);
                Msg::JobFailed {
                    job_id,
                    cause: FailureCause::Transport(err.to_string()),
                }
            }
        }
    }

    async fn await_collection(&self, job_id: JobId, video_id: &str) -> Msg {
        let cancel = self.token();
        job_debug!(
            job_id,
            "polling video {} every {:?}",
            video_id,
            self.settings.poll.interval
        );
        let outcome = poll_collection(
            self.collaborator.as_ref(),
            video_id,
            self.settings.poll,
            &cancel,
        )
        .await;
        match outcome {
            PollOutcome::Completed {
                collected_count,
                message,
            } => {
                job_info!(job_id, "collected {} comments", collected_count);
                Msg::CollectionFinished {
                    job_id,
                    collected_count,
                    message,
                }
            }
            PollOutcome::UpstreamError { message } => {
                job_warn!(job_id, "collection failed upstream: {}", message);
                Msg::JobFailed {
                    job_id,
                    cause: FailureCause::UpstreamReported(message),
                }
            }
            PollOutcome::FetchFailed { last_error } => {
                job_warn!(job_id, "giving up on status polling: {}", last_error);
                Msg::JobFailed {
                    job_id,
                    cause: FailureCause::Transport("fetch failed".to_string()),
                }
            }
            PollOutcome::Aborted => Msg::JobFailed {
                job_id,
                cause: FailureCause::Cancelled,
            },
        }
    }

    async fn extract_entities(&self, job_id: JobId, video_id: &str) -> Msg {
        match self.collaborator.extract_entities(video_id).await {
            Ok(extraction) => {
                job_info!(
                    job_id,
                    "{} entities detected, {} unmatched names",
                    extraction.candidates.len(),
                    extraction.unmatched_names.len()
                );
                Msg::EntitiesExtracted {
                    job_id,
                    candidates: extraction.candidates.into_iter().map(Into::into).collect(),
                    unmatched_names: extraction.unmatched_names,
                }
            }
            Err(err) => {
                job_warn!(job_id, "entity extraction failed: {}", err);
                Msg::ExtractionFailed {
                    job_id,
                    reason: err.to_string(),
                }
            }
        }
    }

    async fn analyze(&self, job_id: JobId, video_id: &str, entity_ids: &[String]) -> Msg {
        match self.collaborator.analyze(video_id, entity_ids).await {
            Ok(()) => {
                job_info!(job_id, "analysis finished for {} entities", entity_ids.len());
                Msg::AnalysisFinished { job_id }
            }
            Err(err) => {
                job_warn!(job_id, "analysis failed: {}", err);
                Msg::AnalysisFailed {
                    job_id,
                    reason: err.to_string(),
                }
            }
        }
    }

    /// Sleep for the inter-job delay when another job is waiting, ending
    /// early on abort.
    async fn wait_between_jobs(&self, from: usize) {
        let state = self.store.snapshot();
        if state.is_aborted() || state.next_pending(from).is_none() {
            return;
        }
        let cancel = self.token();
        tokio::select! {
            _ = cancel.cancelled() => {}
            _ = tokio::time::sleep(self.settings.inter_job_delay) => {}
        }
    }
}
