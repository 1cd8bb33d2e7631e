use crate::JobId;

/// Work the engine must perform on behalf of the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    StartCollection {
        job_id: JobId,
        url: String,
        video_id: String,
    },
    PollCollection { job_id: JobId, video_id: String },
    ExtractEntities { job_id: JobId, video_id: String },
    Analyze {
        job_id: JobId,
        video_id: String,
        entity_ids: Vec<String>,
    },
    /// Suspend the batch until a human resolves the selection.
    AwaitSelection { job_id: JobId, preselected: Vec<String> },
}

impl Effect {
    pub fn job_id(&self) -> JobId {
        match self {
            Effect::StartCollection { job_id, .. }
            | Effect::PollCollection { job_id, .. }
            | Effect::ExtractEntities { job_id, .. }
            | Effect::Analyze { job_id, .. }
            | Effect::AwaitSelection { job_id, .. } => *job_id,
        }
    }
}
