use std::time::Duration;

use engine_logging::{engine_debug, engine_trace, engine_warn};
use tokio_util::sync::CancellationToken;

use crate::{Collaborator, CollaboratorError, RemoteStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// Fixed delay before every status query.
    pub interval: Duration,
    /// Consecutive transport failures tolerated before giving up.
    pub max_failures: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(2000),
            max_failures: 3,
        }
    }
}

/// How a poll for one collection ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Completed {
        collected_count: u64,
        message: Option<String>,
    },
    /// The collaborator itself reported `status: error`.
    UpstreamError { message: String },
    /// Too many consecutive transport failures.
    FetchFailed { last_error: CollaboratorError },
    /// The cancellation token fired while waiting.
    Aborted,
}

impl PollOutcome {
    pub fn collected_count(&self) -> u64 {
        match self {
            PollOutcome::Completed {
                collected_count, ..
            } => *collected_count,
            _ => 0,
        }
    }

    pub fn message(&self) -> String {
        match self {
            PollOutcome::Completed { message, .. } => message.clone().unwrap_or_default(),
            PollOutcome::UpstreamError { message } => message.clone(),
            PollOutcome::FetchFailed { .. } => "fetch failed".to_string(),
            PollOutcome::Aborted => "aborted".to_string(),
        }
    }
}

/// Query the collection status every `settings.interval` until it reaches a
/// terminal state, the failure budget runs out, or `cancel` fires.
///
/// The failure counter resets on every successful query. When the budget is
/// exhausted by a "not found" failure the record is taken to have finished
/// and been cleaned up, so the poll resolves as completed with no count.
pub async fn poll_collection(
    collaborator: &dyn Collaborator,
    video_id: &str,
    settings: PollSettings,
    cancel: &CancellationToken,
) -> PollOutcome {
    let mut failures = 0u32;
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return PollOutcome::Aborted,
            _ = tokio::time::sleep(settings.interval) => {}
        }

        engine_trace!("querying collection status for {}", video_id);
        match collaborator.collection_status(video_id).await {
            Ok(status) => {
                failures = 0;
                match status.status {
                    RemoteStatus::Completed => {
                        return PollOutcome::Completed {
                            collected_count: status.collected_count,
                            message: status.message,
                        }
                    }
                    RemoteStatus::Error => {
                        return PollOutcome::UpstreamError {
                            message: status.message.unwrap_or_default(),
                        }
                    }
                    RemoteStatus::Collecting => {
                        engine_debug!(
                            "video {} collecting: {}/{}",
                            video_id,
                            status.collected_count,
                            status
                                .total_count
                                .map_or_else(|| "?".to_string(), |total| total.to_string())
                        );
                    }
                }
            }
            Err(err) => {
                failures += 1;
                engine_warn!(
                    "status query for {} failed ({}/{}): {}",
                    video_id,
                    failures,
                    settings.max_failures,
                    err
                );
                if failures >= settings.max_failures {
                    if err.is_not_found() {
                        return PollOutcome::Completed {
                            collected_count: 0,
                            message: Some("collection record gone; assuming it finished".into()),
                        };
                    }
                    return PollOutcome::FetchFailed { last_error: err };
                }
            }
        }
    }
}
