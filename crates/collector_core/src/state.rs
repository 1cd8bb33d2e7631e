use thiserror::Error;

use crate::url::extract_video_id;
use crate::view_model::{BatchViewModel, JobRowView};
use crate::{FailureCause, Job, JobId, JobStatus};

/// The job record store's content: the ordered jobs plus loop bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BatchState {
    jobs: Vec<Job>,
    current_index: Option<usize>,
    paused_at: Option<usize>,
    aborted: bool,
}

/// A human decision for a job parked in `selecting`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionChoice {
    Confirm(Vec<String>),
    Skip,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResumeError {
    #[error("job {0} is not awaiting a selection")]
    NotPaused(JobId),
    #[error("at least one entity must be selected")]
    EmptySelection,
    #[error("entity {0} is not a candidate of this job")]
    UnknownEntity(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchSummary {
    pub total: usize,
    pub completed: usize,
    pub errors: usize,
    /// Jobs that never left `pending` (only non-zero after an abort).
    pub pending: usize,
    /// Jobs that reported at least one unmatched name.
    pub unmatched_jobs: usize,
}

impl BatchSummary {
    pub fn advisory(&self) -> Option<String> {
        (self.unmatched_jobs > 0).then(|| {
            format!(
                "{} job(s) mentioned names that could not be matched to a known entity",
                self.unmatched_jobs
            )
        })
    }
}

impl BatchState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a fresh batch from newline-delimited input. URLs without a
    /// recognizable video id fail immediately and never reach the network.
    pub(crate) fn from_submission(raw: &str) -> Self {
        let jobs = parse_lines(raw)
            .into_iter()
            .zip(1..)
            .map(|(url, id)| {
                let video_id = extract_video_id(&url);
                let invalid = video_id.is_none();
                let mut job = Job::new(id, url, video_id);
                if invalid {
                    job.advance(JobStatus::Error, FailureCause::InvalidInput.to_string());
                }
                job
            })
            .collect();
        Self {
            jobs,
            ..Self::default()
        }
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn job(&self, job_id: JobId) -> Option<&Job> {
        self.jobs.iter().find(|job| job.id == job_id)
    }

    pub fn index_of(&self, job_id: JobId) -> Option<usize> {
        self.jobs.iter().position(|job| job.id == job_id)
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    pub fn paused_at(&self) -> Option<usize> {
        self.paused_at
    }

    pub fn paused_job(&self) -> Option<&Job> {
        self.paused_at.and_then(|idx| self.jobs.get(idx))
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    pub fn active_job(&self) -> Option<&Job> {
        self.jobs.iter().find(|job| job.status.is_active())
    }

    /// First job at or after `from` still waiting to run.
    pub fn next_pending(&self, from: usize) -> Option<&Job> {
        self.jobs
            .iter()
            .skip(from)
            .find(|job| job.status == JobStatus::Pending)
    }

    /// Validate a resume request against the current pause.
    pub fn check_resume(
        &self,
        job_id: JobId,
        choice: &SelectionChoice,
    ) -> Result<(), ResumeError> {
        let job = self
            .paused_job()
            .filter(|job| job.id == job_id && job.status == JobStatus::Selecting)
            .ok_or(ResumeError::NotPaused(job_id))?;
        if let SelectionChoice::Confirm(ids) = choice {
            if ids.is_empty() {
                return Err(ResumeError::EmptySelection);
            }
            if let Some(unknown) = ids
                .iter()
                .find(|id| !job.candidates.iter().any(|c| &c.entity_id == *id))
            {
                return Err(ResumeError::UnknownEntity(unknown.clone()));
            }
        }
        Ok(())
    }

    pub fn summary(&self) -> BatchSummary {
        let count = |status: JobStatus| self.jobs.iter().filter(|j| j.status == status).count();
        BatchSummary {
            total: self.jobs.len(),
            completed: count(JobStatus::Completed),
            errors: count(JobStatus::Error),
            pending: count(JobStatus::Pending),
            unmatched_jobs: self
                .jobs
                .iter()
                .filter(|job| !job.unmatched_names.is_empty())
                .count(),
        }
    }

    pub fn view(&self) -> BatchViewModel {
        BatchViewModel {
            rows: self
                .jobs
                .iter()
                .map(|job| JobRowView {
                    job_id: job.id,
                    url: job.source_url.clone(),
                    status: job.status,
                    message: job.message.clone(),
                    collected_count: job.collected_count,
                    candidate_count: job.candidates.len(),
                    annotation: job.annotation(),
                })
                .collect(),
            paused_job: self.paused_job().map(|job| job.id),
            aborted: self.aborted,
            summary: self.summary(),
        }
    }

    pub(crate) fn job_mut(&mut self, job_id: JobId) -> Option<&mut Job> {
        self.jobs.iter_mut().find(|job| job.id == job_id)
    }

    pub(crate) fn set_current(&mut self, job_id: JobId) {
        self.current_index = self.index_of(job_id);
    }

    pub(crate) fn release_if_settled(&mut self, job_id: JobId) {
        let settled = self.job(job_id).is_some_and(|job| job.status.is_terminal());
        if settled && self.current_index == self.index_of(job_id) {
            self.current_index = None;
        }
    }

    pub(crate) fn pause_at(&mut self, job_id: JobId) {
        self.paused_at = self.index_of(job_id);
    }

    pub(crate) fn clear_pause(&mut self) {
        self.paused_at = None;
    }

    pub(crate) fn mark_aborted(&mut self) {
        self.aborted = true;
    }
}

fn parse_lines(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}
