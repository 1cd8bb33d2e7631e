mod common;

use std::sync::Arc;

use collector_core::{JobStatus, ResumeError, SelectionChoice};
use collector_engine::{
    BatchError, Collaborator, CollectionStart, FailureKind, Orchestrator, OrchestratorSettings,
    RemoteStatus, RunOutcome,
};
use common::{failure, ids, init_logging, status, Call, ScriptedCollaborator, VideoScript};
use pretty_assertions::assert_eq;

const EXAMPLE_BATCH: &str = "https://x/watch?v=AAA\nnot a url\nhttps://x/watch?v=BBB\n";

fn orchestrator(fake: &Arc<ScriptedCollaborator>) -> Orchestrator {
    let collaborator: Arc<dyn Collaborator> = fake.clone();
    Orchestrator::new(collaborator, OrchestratorSettings::default())
}

fn example_collaborator() -> Arc<ScriptedCollaborator> {
    Arc::new(
        ScriptedCollaborator::new()
            .with("AAA", VideoScript::finishing("AAA", 12, 2))
            .with("BBB", VideoScript::finishing("BBB", 30, 7)),
    )
}

async fn run_until_paused(orchestrator: &Orchestrator) -> u64 {
    match orchestrator.submit_batch(EXAMPLE_BATCH).await {
        Ok(RunOutcome::Paused {
            job_id,
            candidates,
            preselected,
        }) => {
            assert_eq!(candidates.len(), 7);
            assert_eq!(preselected, ids(&["t1", "t2", "t3", "t4", "t5"]));
            job_id
        }
        other => panic!("expected a pause, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn example_batch_pauses_on_the_crowded_job() {
    init_logging();
    let fake = example_collaborator();
    let orchestrator = orchestrator(&fake);

    let paused = run_until_paused(&orchestrator).await;
    assert_eq!(paused, 3);

    let state = orchestrator.snapshot();
    let statuses: Vec<_> = state.jobs().iter().map(|job| job.status).collect();
    assert_eq!(
        statuses,
        vec![JobStatus::Completed, JobStatus::Error, JobStatus::Selecting]
    );
    assert!(state.jobs()[0].message.contains("warning: only 2 of 5"));
    assert_eq!(state.jobs()[1].message, "invalid URL");
    assert_eq!(state.paused_at(), Some(2));
    assert_eq!(
        fake.analyze_calls(),
        vec![("AAA".to_string(), ids(&["t1", "t2"]))]
    );
}

#[tokio::test(start_paused = true)]
async fn confirmed_subset_is_analyzed_and_batch_finishes() {
    init_logging();
    let fake = example_collaborator();
    let orchestrator = orchestrator(&fake);
    let paused = run_until_paused(&orchestrator).await;

    let outcome = orchestrator
        .resume_selection(paused, SelectionChoice::Confirm(ids(&["t1", "t3"])))
        .await
        .expect("resume accepted");

    let RunOutcome::Finished(summary) = outcome else {
        panic!("expected the batch to finish, got {outcome:?}");
    };
    assert_eq!(summary.total, 3);
    assert_eq!(summary.completed, 2);
    assert_eq!(summary.errors, 1);
    assert_eq!(
        fake.analyze_calls(),
        vec![
            ("AAA".to_string(), ids(&["t1", "t2"])),
            ("BBB".to_string(), ids(&["t1", "t3"])),
        ]
    );
    let state = orchestrator.snapshot();
    assert_eq!(state.paused_at(), None);
    assert_eq!(state.jobs()[2].selected_entity_ids, ids(&["t1", "t3"]));
}

#[tokio::test(start_paused = true)]
async fn skipped_selection_completes_without_analysis() {
    init_logging();
    let fake = example_collaborator();
    let orchestrator = orchestrator(&fake);
    let paused = run_until_paused(&orchestrator).await;

    let outcome = orchestrator
        .resume_selection(paused, SelectionChoice::Skip)
        .await
        .expect("resume accepted");

    assert!(matches!(outcome, RunOutcome::Finished(_)));
    let job = orchestrator.snapshot().jobs()[2].clone();
    assert_eq!(job.status, JobStatus::Completed);
    assert!(job.message.contains("selection skipped"));
    assert_eq!(fake.analyze_calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn invalid_resumes_are_rejected_and_keep_the_pause() {
    init_logging();
    let fake = example_collaborator();
    let orchestrator = orchestrator(&fake);
    let paused = run_until_paused(&orchestrator).await;

    let wrong_job = orchestrator
        .resume_selection(1, SelectionChoice::Skip)
        .await;
    assert_eq!(wrong_job, Err(BatchError::Resume(ResumeError::NotPaused(1))));

    let empty = orchestrator
        .resume_selection(paused, SelectionChoice::Confirm(Vec::new()))
        .await;
    assert_eq!(empty, Err(BatchError::Resume(ResumeError::EmptySelection)));

    let unknown = orchestrator
        .resume_selection(paused, SelectionChoice::Confirm(ids(&["t99"])))
        .await;
    assert_eq!(
        unknown,
        Err(BatchError::Resume(ResumeError::UnknownEntity("t99".to_string())))
    );

    assert_eq!(orchestrator.snapshot().paused_at(), Some(2));
    assert_eq!(
        orchestrator.submit_batch("https://x/watch?v=CCC").await,
        Err(BatchError::Busy)
    );
}

#[tokio::test(start_paused = true)]
async fn second_resume_of_the_same_pause_is_rejected() {
    init_logging();
    let fake = example_collaborator();
    let orchestrator = orchestrator(&fake);
    let paused = run_until_paused(&orchestrator).await;

    orchestrator
        .resume_selection(paused, SelectionChoice::Skip)
        .await
        .expect("first resume accepted");
    let again = orchestrator
        .resume_selection(paused, SelectionChoice::Skip)
        .await;

    assert_eq!(again, Err(BatchError::Resume(ResumeError::NotPaused(paused))));
}

#[tokio::test(start_paused = true)]
async fn no_entities_means_no_analysis_call() {
    init_logging();
    let fake = Arc::new(
        ScriptedCollaborator::new().with("AAA", VideoScript::finishing("AAA", 8, 0)),
    );
    let orchestrator = orchestrator(&fake);

    let outcome = orchestrator
        .submit_batch("https://youtu.be/AAA")
        .await
        .expect("batch accepted");

    assert!(matches!(outcome, RunOutcome::Finished(_)));
    assert!(fake.analyze_calls().is_empty());
    let job = orchestrator.snapshot().jobs()[0].clone();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.collected_count, 8);
}

#[tokio::test(start_paused = true)]
async fn jobs_run_strictly_in_input_order() {
    init_logging();
    let fake = Arc::new(
        ScriptedCollaborator::new()
            .with("CCC", VideoScript::finishing("CCC", 4, 1))
            .with("AAA", VideoScript::finishing("AAA", 4, 1))
            .with("BBB", VideoScript::finishing("BBB", 4, 1)),
    );
    let orchestrator = orchestrator(&fake);

    orchestrator
        .submit_batch("https://x/watch?v=CCC\nhttps://x/watch?v=AAA\nhttps://x/watch?v=BBB")
        .await
        .expect("batch accepted");

    let videos: Vec<String> = fake
        .calls()
        .into_iter()
        .map(|call| match call {
            Call::Start(url) => url.rsplit('=').next().unwrap_or_default().to_string(),
            Call::Status(video) | Call::Extract(video) | Call::Analyze(video, _) => video,
        })
        .collect();
    let mut runs = videos.clone();
    runs.dedup();
    assert_eq!(runs, vec!["CCC", "AAA", "BBB"]);
    assert_eq!(videos.len(), 3 * 5);
}

#[tokio::test(start_paused = true)]
async fn job_failures_do_not_stop_the_batch() {
    init_logging();
    let rejected = VideoScript::finishing("AAA", 0, 0).with_start(Ok(CollectionStart {
        status: RemoteStatus::Error,
        video_id: None,
        message: Some("quota exceeded".to_string()),
    }));
    let unreachable = VideoScript::finishing("BBB", 0, 0)
        .with_statuses(vec![Err(failure(FailureKind::Network))]);
    let degraded = VideoScript::finishing("CCC", 20, 3)
        .with_extraction(Err(failure(FailureKind::HttpStatus(500))));
    let analysis_down = VideoScript::finishing("DDD", 20, 3)
        .with_analysis(Err(failure(FailureKind::Timeout)));
    let fake = Arc::new(
        ScriptedCollaborator::new()
            .with("AAA", rejected)
            .with("BBB", unreachable)
            .with("CCC", degraded)
            .with("DDD", analysis_down),
    );
    let orchestrator = orchestrator(&fake);

    let outcome = orchestrator
        .submit_batch(
            "https://x/watch?v=AAA\nhttps://x/watch?v=BBB\nhttps://x/watch?v=CCC\nhttps://x/watch?v=DDD",
        )
        .await
        .expect("batch accepted");

    let RunOutcome::Finished(summary) = outcome else {
        panic!("expected the batch to finish, got {outcome:?}");
    };
    assert_eq!(summary.errors, 2);
    assert_eq!(summary.completed, 2);
    let jobs = orchestrator.snapshot().jobs().to_vec();
    assert_eq!(jobs[0].message, "quota exceeded");
    assert_eq!(jobs[1].message, "fetch failed");
    assert!(jobs[2].message.contains("entity extraction failed"));
    assert!(jobs[3].message.contains("analysis failed"));
    assert_eq!(fake.analyze_calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn abort_during_collection_stops_the_batch() {
    init_logging();
    let endless = VideoScript::finishing("AAA", 0, 0)
        .with_statuses(vec![status(RemoteStatus::Collecting, 1)]);
    let fake = Arc::new(
        ScriptedCollaborator::new()
            .with("AAA", endless)
            .with("BBB", VideoScript::finishing("BBB", 4, 1)),
    );
    let orchestrator = Arc::new(orchestrator(&fake));
    let mut updates = orchestrator.subscribe();

    let runner = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move {
            orchestrator
                .submit_batch("https://x/watch?v=AAA\nhttps://x/watch?v=BBB")
                .await
        })
    };
    updates
        .wait_for(|state| {
            state
                .jobs()
                .first()
                .is_some_and(|job| job.status == JobStatus::Collecting)
        })
        .await
        .expect("store alive");

    assert_eq!(
        orchestrator.submit_batch("https://x/watch?v=CCC").await,
        Err(BatchError::Busy)
    );
    orchestrator.abort();
    let outcome = runner.await.expect("runner joined").expect("batch accepted");

    let RunOutcome::Aborted(summary) = outcome else {
        panic!("expected an aborted batch, got {outcome:?}");
    };
    assert_eq!(summary.errors, 1);
    assert_eq!(summary.pending, 1);
    let jobs = orchestrator.snapshot().jobs().to_vec();
    assert_eq!(jobs[0].status, JobStatus::Error);
    assert_eq!(jobs[0].message, "aborted");
    assert_eq!(jobs[1].status, JobStatus::Pending);
    assert!(!fake.calls().contains(&Call::Start("https://x/watch?v=BBB".to_string())));
}

#[tokio::test(start_paused = true)]
async fn abort_while_paused_cancels_the_selection() {
    init_logging();
    let fake = example_collaborator();
    let orchestrator = orchestrator(&fake);
    let paused = run_until_paused(&orchestrator).await;

    orchestrator.abort();

    let state = orchestrator.snapshot();
    assert_eq!(state.paused_at(), None);
    assert_eq!(state.jobs()[2].status, JobStatus::Error);
    assert_eq!(
        orchestrator
            .resume_selection(paused, SelectionChoice::Skip)
            .await,
        Err(BatchError::Resume(ResumeError::NotPaused(paused)))
    );
    assert!(matches!(
        orchestrator
            .submit_batch("https://x/watch?v=AAA")
            .await,
        Ok(RunOutcome::Finished(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn renamed_video_is_used_for_every_later_call() {
    init_logging();
    let accepted = Ok(CollectionStart {
        status: RemoteStatus::Collecting,
        video_id: Some("canonical".to_string()),
        message: None,
    });
    // Only start-collection may be served under the id parsed from the URL.
    let local = VideoScript::finishing("AAA", 5, 1)
        .with_start(accepted)
        .with_statuses(vec![Err(failure(FailureKind::Network))])
        .with_extraction(Err(failure(FailureKind::NotFound)))
        .with_analysis(Err(failure(FailureKind::NotFound)));
    let fake = Arc::new(
        ScriptedCollaborator::new()
            .with("AAA", local)
            .with("canonical", VideoScript::finishing("canonical", 5, 1)),
    );
    let orchestrator = orchestrator(&fake);

    let outcome = orchestrator
        .submit_batch("https://x/watch?v=AAA")
        .await
        .expect("batch accepted");

    assert!(matches!(outcome, RunOutcome::Finished(_)));
    assert_eq!(
        fake.calls(),
        vec![
            Call::Start("https://x/watch?v=AAA".to_string()),
            Call::Status("canonical".to_string()),
            Call::Status("canonical".to_string()),
            Call::Extract("canonical".to_string()),
            Call::Analyze("canonical".to_string(), ids(&["t1"])),
        ]
    );
    let job = orchestrator.snapshot().jobs()[0].clone();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.video_id.as_deref(), Some("canonical"));
}

#[tokio::test(start_paused = true)]
async fn vanished_collection_record_is_noted_on_the_job() {
    init_logging();
    let vanished = VideoScript::finishing("AAA", 0, 0)
        .with_statuses(vec![Err(failure(FailureKind::NotFound))]);
    let fake = Arc::new(ScriptedCollaborator::new().with("AAA", vanished));
    let orchestrator = orchestrator(&fake);

    orchestrator
        .submit_batch("https://youtu.be/AAA")
        .await
        .expect("batch accepted");

    let row = orchestrator.snapshot().view().rows[0].clone();
    assert_eq!(row.status, JobStatus::Completed);
    assert_eq!(row.collected_count, 0);
    assert_eq!(
        row.annotation.as_deref(),
        Some("collection record gone; assuming it finished")
    );
}
