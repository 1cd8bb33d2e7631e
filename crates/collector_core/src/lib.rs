//! Collector core: pure batch state machine, entity-count policy and
//! view-model helpers. Nothing here performs I/O.
mod effect;
mod job;
mod msg;
mod policy;
mod state;
mod update;
mod url;
mod view_model;

pub use effect::Effect;
pub use job::{Candidate, Job, JobId, JobStatus};
pub use msg::{FailureCause, Msg};
pub use policy::{decide, EntityDecision, EXPECTED_ENTITY_COUNT};
pub use state::{BatchState, BatchSummary, ResumeError, SelectionChoice};
pub use update::update;
pub use url::extract_video_id;
pub use view_model::{BatchViewModel, JobRowView};
