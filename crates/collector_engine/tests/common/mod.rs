//! Scripted in-memory collaborator shared by the engine tests.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, Once};

use collector_core::extract_video_id;
use collector_engine::{
    Collaborator, CollaboratorError, CollectionStart, CollectionStatus, ExtractedEntity,
    Extraction, FailureKind, RemoteStatus,
};

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(engine_logging::initialize_for_tests);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Start(String),
    Status(String),
    Extract(String),
    Analyze(String, Vec<String>),
}

pub fn status(status: RemoteStatus, collected: u64) -> Result<CollectionStatus, CollaboratorError> {
    Ok(CollectionStatus {
        status,
        collected_count: collected,
        total_count: None,
        message: None,
    })
}

pub fn failure(kind: FailureKind) -> CollaboratorError {
    CollaboratorError::new(kind, "scripted failure")
}

pub fn entities(n: usize) -> Vec<ExtractedEntity> {
    (1..=n)
        .map(|i| ExtractedEntity {
            entity_id: format!("t{i}"),
            display_name: format!("Tiger {i}"),
            source: "title".to_string(),
        })
        .collect()
}

pub fn ids(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|id| id.to_string()).collect()
}

/// Canned replies for one video. Status replies are consumed in order and
/// the last one repeats forever.
#[derive(Debug, Clone)]
pub struct VideoScript {
    pub start: Result<CollectionStart, CollaboratorError>,
    pub statuses: VecDeque<Result<CollectionStatus, CollaboratorError>>,
    pub extraction: Result<Extraction, CollaboratorError>,
    pub analysis: Result<(), CollaboratorError>,
}

impl VideoScript {
    /// Collection finishes on the second poll with `collected` comments and
    /// extraction finds `found` entities.
    pub fn finishing(video_id: &str, collected: u64, found: usize) -> Self {
        Self {
            start: Ok(CollectionStart {
                status: RemoteStatus::Collecting,
                video_id: Some(video_id.to_string()),
                message: Some("Collection started".to_string()),
            }),
            statuses: VecDeque::from(vec![
                status(RemoteStatus::Collecting, collected / 2),
                status(RemoteStatus::Completed, collected),
            ]),
            extraction: Ok(Extraction {
                candidates: entities(found),
                unmatched_names: Vec::new(),
            }),
            analysis: Ok(()),
        }
    }

    pub fn with_statuses(
        mut self,
        statuses: Vec<Result<CollectionStatus, CollaboratorError>>,
    ) -> Self {
        self.statuses = statuses.into();
        self
    }

    pub fn with_start(mut self, start: Result<CollectionStart, CollaboratorError>) -> Self {
        self.start = start;
        self
    }

    pub fn with_extraction(mut self, extraction: Result<Extraction, CollaboratorError>) -> Self {
        self.extraction = extraction;
        self
    }

    pub fn with_analysis(mut self, analysis: Result<(), CollaboratorError>) -> Self {
        self.analysis = analysis;
        self
    }
}

#[derive(Debug, Default)]
pub struct ScriptedCollaborator {
    scripts: Mutex<HashMap<String, VideoScript>>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedCollaborator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, video_id: &str, script: VideoScript) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(video_id.to_string(), script);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn status_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, Call::Status(_)))
            .count()
    }

    pub fn analyze_calls(&self) -> Vec<(String, Vec<String>)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Analyze(video_id, entity_ids) => Some((video_id, entity_ids)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn script<T>(
        &self,
        video_id: &str,
        read: impl FnOnce(&mut VideoScript) -> Result<T, CollaboratorError>,
    ) -> Result<T, CollaboratorError> {
        let mut scripts = self.scripts.lock().unwrap();
        match scripts.get_mut(video_id) {
            Some(script) => read(script),
            None => Err(failure(FailureKind::NotFound)),
        }
    }
}

#[async_trait::async_trait]
impl Collaborator for ScriptedCollaborator {
    async fn start_collection(&self, url: &str) -> Result<CollectionStart, CollaboratorError> {
        self.record(Call::Start(url.to_string()));
        let video_id = extract_video_id(url).unwrap_or_default();
        self.script(&video_id, |script| script.start.clone())
    }

    async fn collection_status(
        &self,
        video_id: &str,
    ) -> Result<CollectionStatus, CollaboratorError> {
        self.record(Call::Status(video_id.to_string()));
        self.script(video_id, |script| {
            if script.statuses.len() > 1 {
                script
                    .statuses
                    .pop_front()
                    .unwrap_or_else(|| Err(failure(FailureKind::Network)))
            } else {
                script
                    .statuses
                    .front()
                    .cloned()
                    .unwrap_or_else(|| Err(failure(FailureKind::Network)))
            }
        })
    }

    async fn extract_entities(&self, video_id: &str) -> Result<Extraction, CollaboratorError> {
        self.record(Call::Extract(video_id.to_string()));
        self.script(video_id, |script| script.extraction.clone())
    }

    async fn analyze(
        &self,
        video_id: &str,
        entity_ids: &[String],
    ) -> Result<(), CollaboratorError> {
        self.record(Call::Analyze(video_id.to_string(), entity_ids.to_vec()));
        self.script(video_id, |script| script.analysis.clone())
    }
}
