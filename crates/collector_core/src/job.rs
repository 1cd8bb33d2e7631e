use std::fmt;

pub type JobId = u64;

/// Position of a job in the collect → extract → analyze pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum JobStatus {
    #[default]
    Pending,
    Collecting,
    Extracting,
    Selecting,
    Analyzing,
    Completed,
    Error,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Error)
    }

    /// Statuses that occupy the single processing slot.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            JobStatus::Collecting | JobStatus::Extracting | JobStatus::Analyzing
        )
    }

    /// Forward edges of the job state machine. Any non-terminal status may
    /// fall through to `Error`; terminal statuses never move.
    pub fn can_advance_to(self, next: JobStatus) -> bool {
        use JobStatus::*;
        if self.is_terminal() {
            return false;
        }
        if next == Error {
            return true;
        }
        matches!(
            (self, next),
            (Pending, Collecting)
                | (Collecting, Extracting)
                | (Extracting, Completed)
                | (Extracting, Analyzing)
                | (Extracting, Selecting)
                | (Selecting, Analyzing)
                | (Selecting, Completed)
                | (Analyzing, Completed)
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Collecting => "collecting",
            JobStatus::Extracting => "extracting",
            JobStatus::Selecting => "selecting",
            JobStatus::Analyzing => "analyzing",
            JobStatus::Completed => "completed",
            JobStatus::Error => "error",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// An entity detected during extraction that may be confirmed for analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub entity_id: String,
    pub display_name: String,
    /// Where the entity was detected (e.g. "title", "description").
    pub source: String,
}

impl Candidate {
    pub fn new(
        entity_id: impl Into<String>,
        display_name: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            entity_id: entity_id.into(),
            display_name: display_name.into(),
            source: source.into(),
        }
    }
}

/// One source URL's progress through the pipeline.
///
/// `id` and `source_url` are fixed at submission. `video_id` starts as the id
/// parsed from the URL and is replaced by the one the collaborator accepts
/// when collection starts, so every later call uses the same resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: JobId,
    pub source_url: String,
    pub video_id: Option<String>,
    pub status: JobStatus,
    pub message: String,
    pub collected_count: u64,
    /// Message the collaborator attached to the end of collection.
    pub collection_note: Option<String>,
    pub candidates: Vec<Candidate>,
    pub selected_entity_ids: Vec<String>,
    pub unmatched_names: Vec<String>,
}

impl Job {
    pub(crate) fn new(id: JobId, source_url: String, video_id: Option<String>) -> Self {
        Self {
            id,
            source_url,
            video_id,
            status: JobStatus::Pending,
            message: String::new(),
            collected_count: 0,
            collection_note: None,
            candidates: Vec::new(),
            selected_entity_ids: Vec::new(),
            unmatched_names: Vec::new(),
        }
    }

    /// Moves the job to `next` if the state machine allows it.
    ///
    /// Returns `false` and leaves the job untouched otherwise.
    pub(crate) fn advance(&mut self, next: JobStatus, message: impl Into<String>) -> bool {
        if !self.status.can_advance_to(next) {
            return false;
        }
        self.status = next;
        self.message = message.into();
        true
    }

    /// Informational note about names that could not be resolved.
    pub fn unmatched_annotation(&self) -> Option<String> {
        if self.unmatched_names.is_empty() {
            None
        } else {
            Some(format!("unmatched names: {}", self.unmatched_names.join(", ")))
        }
    }

    /// Everything worth showing next to the status message.
    pub fn annotation(&self) -> Option<String> {
        let notes: Vec<String> = self
            .collection_note
            .iter()
            .cloned()
            .chain(self.unmatched_annotation())
            .collect();
        (!notes.is_empty()).then(|| notes.join("; "))
    }

    pub fn candidate_ids(&self) -> Vec<String> {
        self.candidates
            .iter()
            .map(|candidate| candidate.entity_id.clone())
            .collect()
    }
}
