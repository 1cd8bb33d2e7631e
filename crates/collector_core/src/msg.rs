use std::fmt;

use crate::{Candidate, JobId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// A new batch: one job per non-empty line. Replaces any previous batch.
    Submitted(String),
    /// The loop picked this job to run next.
    JobStarted { job_id: JobId },
    /// The collaborator accepted the collection request for this video.
    CollectionStarted { job_id: JobId, video_id: String },
    /// The status poller observed a successful end of collection.
    CollectionFinished {
        job_id: JobId,
        collected_count: u64,
        message: Option<String>,
    },
    /// Extraction returned its candidate list.
    EntitiesExtracted {
        job_id: JobId,
        candidates: Vec<Candidate>,
        unmatched_names: Vec<String>,
    },
    /// Extraction failed after collection succeeded (degraded completion).
    ExtractionFailed { job_id: JobId, reason: String },
    /// A human confirmed which entities of a paused job to analyze.
    SelectionConfirmed { job_id: JobId, entity_ids: Vec<String> },
    /// A human declined to analyze the paused job.
    SelectionSkipped { job_id: JobId },
    AnalysisFinished { job_id: JobId },
    /// Analysis failed after collection succeeded (degraded completion).
    AnalysisFailed { job_id: JobId, reason: String },
    /// The job cannot continue.
    JobFailed { job_id: JobId, cause: FailureCause },
    /// Stop starting new work for the rest of the batch.
    AbortRequested,
}

/// Why a job ended in `error`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureCause {
    /// Malformed source URL, detected before any network call.
    InvalidInput,
    /// Network or HTTP failure talking to the collaborator.
    Transport(String),
    /// The collaborator explicitly reported `status: error`.
    UpstreamReported(String),
    /// The cancellation token was observed at a suspension point.
    Cancelled,
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureCause::InvalidInput => write!(f, "invalid URL"),
            FailureCause::Transport(detail) => write!(f, "{detail}"),
            FailureCause::UpstreamReported(detail) if detail.is_empty() => {
                write!(f, "collection failed")
            }
            FailureCause::UpstreamReported(detail) => write!(f, "{detail}"),
            FailureCause::Cancelled => write!(f, "aborted"),
        }
    }
}
