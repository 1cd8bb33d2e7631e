use crate::{BatchSummary, JobId, JobStatus};

/// Render-ready projection of a batch snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BatchViewModel {
    pub rows: Vec<JobRowView>,
    pub paused_job: Option<JobId>,
    pub aborted: bool,
    pub summary: BatchSummary,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRowView {
    pub job_id: JobId,
    pub url: String,
    pub status: JobStatus,
    pub message: String,
    pub collected_count: u64,
    pub candidate_count: usize,
    pub annotation: Option<String>,
}
