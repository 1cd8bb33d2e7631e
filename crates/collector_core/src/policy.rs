//! Entity-count policy: how many detected candidates decide the next branch.

use crate::Candidate;

/// Number of entities a video is expected to feature.
pub const EXPECTED_ENTITY_COUNT: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityDecision {
    /// Nothing detected; the job completes without analysis.
    NoEntities,
    /// Analyze every candidate. `shortage` is set when fewer than expected.
    Proceed { entity_ids: Vec<String>, shortage: bool },
    /// Too many candidates; ask a human. `preselected` holds the first
    /// [`EXPECTED_ENTITY_COUNT`] ids in list order.
    Select { preselected: Vec<String> },
}

pub fn decide(candidates: &[Candidate]) -> EntityDecision {
    let ids = candidates.iter().map(|c| c.entity_id.clone());
    match candidates.len() {
        0 => EntityDecision::NoEntities,
        n if n <= EXPECTED_ENTITY_COUNT => EntityDecision::Proceed {
            entity_ids: ids.collect(),
            shortage: n < EXPECTED_ENTITY_COUNT,
        },
        _ => EntityDecision::Select {
            preselected: ids.take(EXPECTED_ENTITY_COUNT).collect(),
        },
    }
}

pub(crate) fn shortage_warning(found: usize) -> String {
    format!(" (warning: only {found} of {EXPECTED_ENTITY_COUNT} expected entities detected)")
}
