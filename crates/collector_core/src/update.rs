use crate::policy::{decide, shortage_warning, EntityDecision, EXPECTED_ENTITY_COUNT};
use crate::{BatchState, Effect, FailureCause, JobId, JobStatus, Msg, SelectionChoice};

/// Pure update function: applies a message to state and returns any effects.
///
/// Messages that do not fit the job's current status are ignored. After an
/// abort, no job leaves `pending` and every step that would reach the network
/// fails the job as cancelled instead.
pub fn update(mut state: BatchState, msg: Msg) -> (BatchState, Vec<Effect>) {
    let touched = msg.job_id();
    let effects = match msg {
        Msg::Submitted(raw) => {
            state = BatchState::from_submission(&raw);
            Vec::new()
        }
        Msg::JobStarted { job_id } => start_job(&mut state, job_id),
        Msg::CollectionStarted { job_id, video_id } => {
            if !has_status(&state, job_id, JobStatus::Collecting) {
                return (state, Vec::new());
            }
            if let Some(job) = state.job_mut(job_id) {
                job.message = "collection in progress".to_string();
                job.video_id = Some(video_id.clone());
            }
            network_step(&mut state, Effect::PollCollection { job_id, video_id })
        }
        Msg::CollectionFinished {
            job_id,
            collected_count,
            message,
        } => {
            let Some(job) = state.job_mut(job_id) else {
                return (state, Vec::new());
            };
            let Some(video_id) = job.video_id.clone() else {
                return (state, Vec::new());
            };
            if !job.advance(
                JobStatus::Extracting,
                format!("collected {collected_count} comments; detecting entities"),
            ) {
                return (state, Vec::new());
            }
            job.collected_count = collected_count;
            job.collection_note = message.filter(|note| !note.trim().is_empty());
            network_step(&mut state, Effect::ExtractEntities { job_id, video_id })
        }
        Msg::EntitiesExtracted {
            job_id,
            candidates,
            unmatched_names,
        } => {
            if !has_status(&state, job_id, JobStatus::Extracting) {
                return (state, Vec::new());
            }
            let decision = decide(&candidates);
            if let Some(job) = state.job_mut(job_id) {
                job.candidates = candidates;
                job.unmatched_names = unmatched_names;
            }
            apply_decision(&mut state, job_id, decision)
        }
        Msg::ExtractionFailed { job_id, reason } => {
            if let Some(job) = state.job_mut(job_id) {
                if job.status == JobStatus::Extracting {
                    let collected = job.collected_count;
                    job.advance(
                        JobStatus::Completed,
                        format!("collected {collected} comments; entity extraction failed: {reason}"),
                    );
                }
            }
            Vec::new()
        }
        Msg::SelectionConfirmed { job_id, entity_ids } => {
            let choice = SelectionChoice::Confirm(entity_ids.clone());
            if state.check_resume(job_id, &choice).is_err() {
                return (state, Vec::new());
            }
            state.clear_pause();
            begin_analysis(&mut state, job_id, entity_ids)
        }
        Msg::SelectionSkipped { job_id } => {
            if state.check_resume(job_id, &SelectionChoice::Skip).is_err() {
                return (state, Vec::new());
            }
            state.clear_pause();
            if let Some(job) = state.job_mut(job_id) {
                let collected = job.collected_count;
                job.advance(
                    JobStatus::Completed,
                    format!("collected {collected} comments; selection skipped, analysis not run"),
                );
            }
            Vec::new()
        }
        Msg::AnalysisFinished { job_id } => {
            if let Some(job) = state.job_mut(job_id) {
                let analyzed = job.selected_entity_ids.len();
                let found = job.candidates.len();
                let mut message = format!(
                    "analyzed {analyzed} entities across {} comments",
                    job.collected_count
                );
                if found < EXPECTED_ENTITY_COUNT {
                    message.push_str(&shortage_warning(found));
                }
                if job.status == JobStatus::Analyzing {
                    job.advance(JobStatus::Completed, message);
                }
            }
            Vec::new()
        }
        Msg::AnalysisFailed { job_id, reason } => {
            if let Some(job) = state.job_mut(job_id) {
                if job.status == JobStatus::Analyzing {
                    let collected = job.collected_count;
                    job.advance(
                        JobStatus::Completed,
                        format!("collected {collected} comments; analysis failed: {reason}"),
                    );
                }
            }
            Vec::new()
        }
        Msg::JobFailed { job_id, cause } => {
            fail(&mut state, job_id, cause);
            Vec::new()
        }
        Msg::AbortRequested => {
            state.mark_aborted();
            if let Some(paused) = state.paused_job().map(|job| job.id) {
                fail(&mut state, paused, FailureCause::Cancelled);
                state.release_if_settled(paused);
            }
            Vec::new()
        }
    };

    if let Some(job_id) = touched {
        state.release_if_settled(job_id);
    }
    (state, effects)
}

impl Msg {
    pub fn job_id(&self) -> Option<JobId> {
        match self {
            Msg::Submitted(_) | Msg::AbortRequested => None,
            Msg::JobStarted { job_id }
            | Msg::CollectionStarted { job_id, .. }
            | Msg::CollectionFinished { job_id, .. }
            | Msg::EntitiesExtracted { job_id, .. }
            | Msg::ExtractionFailed { job_id, .. }
            | Msg::SelectionConfirmed { job_id, .. }
            | Msg::SelectionSkipped { job_id }
            | Msg::AnalysisFinished { job_id }
            | Msg::AnalysisFailed { job_id, .. }
            | Msg::JobFailed { job_id, .. } => Some(*job_id),
        }
    }
}

fn start_job(state: &mut BatchState, job_id: JobId) -> Vec<Effect> {
    if state.is_aborted() || state.paused_at().is_some() || state.active_job().is_some() {
        return Vec::new();
    }
    let Some(job) = state.job_mut(job_id) else {
        return Vec::new();
    };
    let Some(video_id) = job.video_id.clone() else {
        return Vec::new();
    };
    if !job.advance(JobStatus::Collecting, "collecting comments") {
        return Vec::new();
    }
    let url = job.source_url.clone();
    state.set_current(job_id);
    vec![Effect::StartCollection {
        job_id,
        url,
        video_id,
    }]
}

fn apply_decision(state: &mut BatchState, job_id: JobId, decision: EntityDecision) -> Vec<Effect> {
    match decision {
        EntityDecision::NoEntities => {
            if let Some(job) = state.job_mut(job_id) {
                let collected = job.collected_count;
                job.advance(
                    JobStatus::Completed,
                    format!("collected {collected} comments; no entities detected"),
                );
            }
            Vec::new()
        }
        EntityDecision::Proceed { entity_ids, .. } => begin_analysis(state, job_id, entity_ids),
        EntityDecision::Select { preselected } => {
            let Some(job) = state.job_mut(job_id) else {
                return Vec::new();
            };
            let found = job.candidates.len();
            job.selected_entity_ids = preselected.clone();
            job.advance(
                JobStatus::Selecting,
                format!("{found} entities detected; awaiting selection"),
            );
            state.pause_at(job_id);
            network_step(state, Effect::AwaitSelection { job_id, preselected })
        }
    }
}

fn begin_analysis(state: &mut BatchState, job_id: JobId, entity_ids: Vec<String>) -> Vec<Effect> {
    let Some(job) = state.job_mut(job_id) else {
        return Vec::new();
    };
    let Some(video_id) = job.video_id.clone() else {
        return Vec::new();
    };
    if !job.advance(
        JobStatus::Analyzing,
        format!("analyzing {} entities", entity_ids.len()),
    ) {
        return Vec::new();
    }
    job.selected_entity_ids = entity_ids.clone();
    network_step(
        state,
        Effect::Analyze {
            job_id,
            video_id,
            entity_ids,
        },
    )
}

/// Emit `effect` unless the batch was aborted, in which case the job stops
/// here as cancelled.
fn network_step(state: &mut BatchState, effect: Effect) -> Vec<Effect> {
    if state.is_aborted() {
        fail(state, effect.job_id(), FailureCause::Cancelled);
        return Vec::new();
    }
    vec![effect]
}

fn fail(state: &mut BatchState, job_id: JobId, cause: FailureCause) {
    let paused_here = state.paused_job().is_some_and(|job| job.id == job_id);
    let failed = state
        .job_mut(job_id)
        .is_some_and(|job| job.advance(JobStatus::Error, cause.to_string()));
    if failed && paused_here {
        state.clear_pause();
    }
}

fn has_status(state: &BatchState, job_id: JobId, status: JobStatus) -> bool {
    state.job(job_id).is_some_and(|job| job.status == status)
}
