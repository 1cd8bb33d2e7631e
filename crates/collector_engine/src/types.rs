use std::fmt;

use collector_core::Candidate;
use serde::{Deserialize, Serialize};

/// Status vocabulary shared by the collect endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteStatus {
    Collecting,
    Completed,
    Error,
}

/// Reply to a start-collection request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CollectionStart {
    pub status: RemoteStatus,
    #[serde(default)]
    pub video_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Reply to a collection status query.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CollectionStatus {
    pub status: RemoteStatus,
    #[serde(default, rename = "collected_comments")]
    pub collected_count: u64,
    #[serde(default, rename = "total_comments")]
    pub total_count: Option<u64>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExtractedEntity {
    #[serde(rename = "tiger_id")]
    pub entity_id: String,
    pub display_name: String,
    #[serde(default)]
    pub source: String,
}

impl From<ExtractedEntity> for Candidate {
    fn from(entity: ExtractedEntity) -> Self {
        Candidate::new(entity.entity_id, entity.display_name, entity.source)
    }
}

/// Reply to an extraction request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Extraction {
    #[serde(default, rename = "found_tigers")]
    pub candidates: Vec<ExtractedEntity>,
    #[serde(default)]
    pub unmatched_names: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct CollectRequest<'a> {
    pub video_url: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct AnalyzeRequest<'a> {
    pub video_id: &'a str,
    #[serde(rename = "tiger_ids")]
    pub entity_ids: &'a [String],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollaboratorError {
    pub kind: FailureKind,
    pub message: String,
}

impl CollaboratorError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == FailureKind::NotFound
    }
}

impl fmt::Display for CollaboratorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}: {}", self.kind, self.message)
        }
    }
}

impl std::error::Error for CollaboratorError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    NotFound,
    HttpStatus(u16),
    Timeout,
    Network,
    Decode,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::NotFound => write!(f, "not found"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Decode => write!(f, "invalid response body"),
        }
    }
}
