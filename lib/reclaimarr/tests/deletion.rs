mod support;

use std::path::PathBuf;
use std::sync::Arc;

use assert_matches::assert_matches;
use reclaimarr::{
    backup::BackupBatch, error::LifecycleError, gate::OperationKind, rules::PolicyConfig,
    AnalysisOutcome, LifecycleEngine, MovieId, SeriesId, SeriesStatus,
};
use shared::{
    catalog::RawItem,
    decision::DecisionSet,
    deletion::{DeletionRequest, DeletionStep, ItemStatus, StepOutcome},
    library::ItemId,
};
use support::*;

fn old_movie(id: &str, title: &str) -> RawItem {
    let mut movie = raw_movie(id, title, 2010);
    movie.added_at = years_ago(8.0);
    movie
}

fn old_show(id: &str, title: &str) -> RawItem {
    let mut show = raw_show(id, title, 2, 0);
    show.added_at = years_ago(8.0);
    show
}

async fn analysed(fakes: &Fakes, dir: &std::path::Path) -> (LifecycleEngine, Arc<DecisionSet>) {
    let engine = LifecycleEngine::new(fakes.services(), PolicyConfig::default(), settings(dir));
    let set = match engine.run_analysis_at(now()).await.unwrap() {
        AnalysisOutcome::Completed(set) => set,
        AnalysisOutcome::Skipped { .. } => panic!("analysis skipped"),
    };
    (engine, set)
}

fn request(set: &DecisionSet, ids: &[&str]) -> DeletionRequest {
    DeletionRequest {
        decision_set_version: set.version,
        item_ids: ids.iter().map(|id| ItemId::from(*id)).collect(),
        confirmation: set.confirmation.clone(),
    }
}

#[tokio::test]
async fn approved_items_go_through_every_step() {
    let dir = tempfile::tempdir().unwrap();
    let fakes = Fakes::new(FakeMediaServer::new(vec![
        old_movie("1", "Alpha"),
        old_show("2", "Beta"),
    ]))
    .with_movies(FakeMovieTracker::with_movies(&[(7, "Alpha", 2010)]))
    .with_shows(FakeShowTracker::with_series(&[(9, "Beta", SeriesStatus::Ended)]));
    let (engine, set) = analysed(&fakes, dir.path()).await;
    assert_eq!(set.items.len(), 2);

    let result = engine
        .execute_deletion(&request(&set, &["1", "2"]))
        .await
        .unwrap();

    assert!(result.is_complete_success());
    assert_eq!(result.summary.success, 2);
    for item in &result.per_item {
        assert_eq!(item.status, ItemStatus::Success);
        assert_eq!(item.steps.len(), 4);
        assert!(item.steps.iter().all(|report| report.outcome.is_done()));
        assert!(item.error.is_none());
    }
    assert_eq!(fakes.server.removed(), vec![ItemId::from("1"), ItemId::from("2")]);
    assert_eq!(fakes.fs.deleted().len(), 3);
    assert_eq!(
        *fakes.movies.as_ref().unwrap().unmonitored.lock().unwrap(),
        vec![MovieId(7)]
    );
    assert_eq!(
        *fakes.shows.as_ref().unwrap().unmonitored.lock().unwrap(),
        vec![SeriesId(9)]
    );

    let pruned = fakes.fs.pruned.lock().unwrap().clone();
    assert!(pruned
        .iter()
        .all(|(start, root)| start.starts_with(root) && start != root));
    assert!(pruned.contains(&(
        PathBuf::from("/media/tv/Beta/Season 01"),
        PathBuf::from("/media/tv")
    )));

    let backup = result.backup_ref.expect("backup taken");
    let records = BackupBatch::at(&backup).read_all().await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].item.id.as_str(), "1");
}

#[tokio::test]
async fn empty_request_has_no_side_effects() {
    let dir = tempfile::tempdir().unwrap();
    let fakes = Fakes::new(FakeMediaServer::new(vec![old_movie("1", "Alpha")]));
    let (engine, set) = analysed(&fakes, dir.path()).await;

    let result = engine.execute_deletion(&request(&set, &[])).await.unwrap();
    assert!(result.per_item.is_empty());
    assert!(result.backup_ref.is_none());
    assert!(fakes.server.removed().is_empty());
    assert!(fakes.fs.deleted().is_empty());
    assert!(!engine.is_consumed(set.version).await);

    // The set is still usable afterwards.
    let result = engine.execute_deletion(&request(&set, &["1"])).await.unwrap();
    assert_eq!(result.summary.success, 1);
}

#[tokio::test]
async fn file_failure_after_catalog_removal_is_partial() {
    let dir = tempfile::tempdir().unwrap();
    let failing = "/media/movies/Alpha (2010)/Alpha.1.mkv";
    let fakes = Fakes::new(FakeMediaServer::new(vec![
        old_movie("1", "Alpha"),
        old_movie("2", "Beta"),
    ]))
    .with_fs(FakeFilesystem::failing_on(&[failing]));
    let (engine, set) = analysed(&fakes, dir.path()).await;

    let result = engine
        .execute_deletion(&request(&set, &["1", "2"]))
        .await
        .unwrap();

    let alpha = &result.per_item[0];
    assert_eq!(alpha.status, ItemStatus::Partial);
    assert!(alpha.outcome_of(DeletionStep::CatalogRemoval).unwrap().is_done());
    assert_matches!(
        alpha.outcome_of(DeletionStep::FileDeletion),
        Some(StepOutcome::Failed(_))
    );
    assert!(alpha.error.as_deref().unwrap().contains("permission denied"));

    let beta = &result.per_item[1];
    assert_eq!(beta.status, ItemStatus::Success);
    assert_eq!(result.summary.partial, 1);
    assert_eq!(result.summary.success, 1);
    assert!(result.summary.to_string().contains("no rollback"));
}

#[tokio::test]
async fn failed_catalog_and_files_is_failed() {
    let dir = tempfile::tempdir().unwrap();
    let server = FakeMediaServer {
        failing_removals: ["1".to_string()].into(),
        ..FakeMediaServer::new(vec![old_movie("1", "Alpha")])
    };
    let fakes = Fakes::new(server).with_fs(FakeFilesystem::failing_on(&[
        "/media/movies/Alpha (2010)/Alpha.1.mkv",
    ]));
    let (engine, set) = analysed(&fakes, dir.path()).await;

    let result = engine.execute_deletion(&request(&set, &["1"])).await.unwrap();
    assert_eq!(result.per_item[0].status, ItemStatus::Failed);
    assert_eq!(result.summary.failed, 1);
}

fn episode(show: &str, ep: u32) -> PathBuf {
    PathBuf::from(format!("/media/tv/{show}/Season 01/{show} S01E{ep:02}.mkv"))
}

#[tokio::test]
async fn every_file_is_tried_when_one_fails() {
    let dir = tempfile::tempdir().unwrap();
    let mut show = raw_show("2", "Beta", 3, 0);
    show.added_at = years_ago(8.0);
    let first = episode("Beta", 1);
    let fakes = Fakes::new(FakeMediaServer::new(vec![show]))
        .with_fs(FakeFilesystem::failing_on(&[first.to_str().unwrap()]));
    let (engine, set) = analysed(&fakes, dir.path()).await;

    let result = engine.execute_deletion(&request(&set, &["2"])).await.unwrap();

    assert_eq!(
        fakes.fs.attempted(),
        vec![first, episode("Beta", 2), episode("Beta", 3)]
    );
    assert_eq!(fakes.fs.deleted(), vec![episode("Beta", 2), episode("Beta", 3)]);

    let beta = &result.per_item[0];
    assert_eq!(beta.status, ItemStatus::Partial);
    assert!(beta.outcome_of(DeletionStep::CatalogRemoval).unwrap().is_done());
    assert_matches!(
        beta.outcome_of(DeletionStep::FileDeletion),
        Some(StepOutcome::Failed(message)) if message.contains("1 of 3 files")
    );
}

#[tokio::test]
async fn catalog_failure_with_some_files_gone_is_partial() {
    let dir = tempfile::tempdir().unwrap();
    let mut show = raw_show("2", "Beta", 2, 0);
    show.added_at = years_ago(8.0);
    let second = episode("Beta", 2);
    let server = FakeMediaServer {
        failing_removals: ["2".to_string()].into(),
        ..FakeMediaServer::new(vec![show])
    };
    let fakes =
        Fakes::new(server).with_fs(FakeFilesystem::failing_on(&[second.to_str().unwrap()]));
    let (engine, set) = analysed(&fakes, dir.path()).await;

    let result = engine.execute_deletion(&request(&set, &["2"])).await.unwrap();

    assert_eq!(fakes.fs.attempted().len(), 2);
    assert_eq!(fakes.fs.deleted(), vec![episode("Beta", 1)]);
    let beta = &result.per_item[0];
    assert_matches!(
        beta.outcome_of(DeletionStep::CatalogRemoval),
        Some(StepOutcome::Failed(_))
    );
    assert_eq!(beta.status, ItemStatus::Partial);
    assert_eq!(result.summary.partial, 1);
    assert_eq!(result.summary.failed, 0);
}

#[tokio::test]
async fn unmonitor_problems_do_not_change_status() {
    let dir = tempfile::tempdir().unwrap();
    let tracker = FakeMovieTracker {
        failing: true,
        ..FakeMovieTracker::with_movies(&[(7, "Alpha", 2010)])
    };
    let fakes = Fakes::new(FakeMediaServer::new(vec![
        old_movie("1", "Alpha"),
        old_movie("2", "Unknown"),
    ]))
    .with_movies(tracker);
    let (engine, set) = analysed(&fakes, dir.path()).await;

    let result = engine
        .execute_deletion(&request(&set, &["1", "2"]))
        .await
        .unwrap();
    assert!(result.is_complete_success());
    assert_matches!(
        result.per_item[0].outcome_of(DeletionStep::Unmonitor),
        Some(StepOutcome::Failed(_))
    );
    assert_matches!(
        result.per_item[1].outcome_of(DeletionStep::Unmonitor),
        Some(StepOutcome::Skipped(_))
    );
}

#[tokio::test]
async fn backup_failure_stops_the_item() {
    let dir = tempfile::tempdir().unwrap();
    let fakes = Fakes::new(FakeMediaServer::new(vec![old_movie("1", "Alpha")]));
    let mut settings = settings(dir.path());
    // A regular file where the backup directory should be.
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, b"x").unwrap();
    settings.backup_dir = blocker;
    let engine = LifecycleEngine::new(fakes.services(), PolicyConfig::default(), settings);
    let set = engine
        .run_analysis_at(now())
        .await
        .unwrap()
        .decision_set()
        .cloned()
        .unwrap();

    let result = engine.execute_deletion(&request(&set, &["1"])).await.unwrap();
    let item = &result.per_item[0];
    assert_eq!(item.status, ItemStatus::Failed);
    assert_eq!(item.steps.len(), 1);
    assert_eq!(item.steps[0].step, DeletionStep::Backup);
    assert!(fakes.server.removed().is_empty());
    assert!(fakes.fs.deleted().is_empty());
    assert!(result.backup_ref.is_none());
}

#[tokio::test]
async fn duplicate_and_unknown_ids() {
    let dir = tempfile::tempdir().unwrap();
    let fakes = Fakes::new(FakeMediaServer::new(vec![old_movie("1", "Alpha")]));
    let (engine, set) = analysed(&fakes, dir.path()).await;

    let result = engine
        .execute_deletion(&request(&set, &["1", "1", "404"]))
        .await
        .unwrap();
    assert_eq!(result.per_item.len(), 2);
    assert_eq!(result.per_item[0].status, ItemStatus::Success);
    assert_eq!(result.per_item[1].id.as_str(), "404");
    assert_eq!(result.per_item[1].status, ItemStatus::Failed);
    assert!(result.per_item[1].steps.is_empty());
    assert_eq!(fakes.server.removed(), vec![ItemId::from("1")]);
}

#[tokio::test]
async fn requests_are_validated_before_anything_happens() {
    let dir = tempfile::tempdir().unwrap();
    let fakes = Fakes::new(FakeMediaServer::new(vec![old_movie("1", "Alpha")]));
    let (engine, first) = analysed(&fakes, dir.path()).await;

    let mut wrong_token = request(&first, &["1"]);
    wrong_token.confirmation = "0000000000000000".into();
    assert_matches!(
        engine.execute_deletion(&wrong_token).await,
        Err(LifecycleError::RequestRejected(_))
    );

    let second = engine
        .run_analysis_at(now())
        .await
        .unwrap()
        .decision_set()
        .cloned()
        .unwrap();
    assert_matches!(
        engine.execute_deletion(&request(&first, &["1"])).await,
        Err(LifecycleError::RequestRejected(_))
    );
    assert!(fakes.server.removed().is_empty());

    engine
        .execute_deletion(&request(&second, &["1"]))
        .await
        .unwrap();
    assert_matches!(
        engine.execute_deletion(&request(&second, &["1"])).await,
        Err(LifecycleError::RequestRejected(_))
    );
    assert_eq!(fakes.server.removed().len(), 1);
}

#[tokio::test]
async fn consumption_survives_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let fakes = Fakes::new(FakeMediaServer::new(vec![old_movie("1", "Alpha")]));
    let (engine, set) = analysed(&fakes, dir.path()).await;
    engine.execute_deletion(&request(&set, &["1"])).await.unwrap();

    let restarted = LifecycleEngine::new(
        fakes.services(),
        PolicyConfig::default(),
        settings(dir.path()),
    );
    restarted.restore().await.unwrap();
    assert!(restarted.is_consumed(set.version).await);
    assert_matches!(
        restarted.execute_deletion(&request(&set, &["1"])).await,
        Err(LifecycleError::RequestRejected(_))
    );
}

#[tokio::test]
async fn deletion_while_analysing_is_busy() {
    let dir = tempfile::tempdir().unwrap();
    let fakes = Fakes::new(FakeMediaServer::new(vec![old_movie("1", "Alpha")]));
    let (engine, set) = analysed(&fakes, dir.path()).await;

    let _analysis = engine.gate().try_acquire(OperationKind::Analysis).unwrap();
    assert_matches!(
        engine.execute_deletion(&request(&set, &["1"])).await,
        Err(LifecycleError::Busy {
            requested: OperationKind::Deletion,
            running: OperationKind::Analysis
        })
    );
    assert!(engine.run_analysis_at(now()).await.unwrap().is_skipped());
}
