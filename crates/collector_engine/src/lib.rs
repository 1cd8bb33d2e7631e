//! Collector engine: collaborator client, status polling and the batch
//! orchestrator that executes the core's effects.
mod client;
mod orchestrator;
mod poll;
mod store;
mod types;

pub use client::{ClientSettings, Collaborator, HttpCollaborator};
pub use orchestrator::{BatchError, Orchestrator, OrchestratorSettings, RunOutcome};
pub use poll::{poll_collection, PollOutcome, PollSettings};
pub use store::{Dispatched, JobStore};
pub use types::{
    CollaboratorError, CollectionStart, CollectionStatus, ExtractedEntity, Extraction,
    FailureKind, RemoteStatus,
};
