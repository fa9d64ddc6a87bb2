//! Full generate → train → evaluate → decide runs with scripted collaborators.

mod common;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use common::{FakeBehavior, FakeProcess, ScriptedGeneration, ScriptedResponder, GOOD_RESPONSE};
use selfedit_core::{
    cancellation, CandidateGenerator, CandidateStatus, DefaultPrompts, Evaluator,
    LifecycleManager, SandboxTrainer, SelfEditPipeline,
};
use selfedit_state::{CandidateStore, FsCandidateStore};

struct Setup {
    _dir: tempfile::TempDir,
    root: PathBuf,
    store: Arc<FsCandidateStore>,
}

fn setup() -> Setup {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().to_path_buf();
    let store = Arc::new(
        FsCandidateStore::new(root.join("candidates"), root.join("artifacts")).unwrap(),
    );
    Setup {
        _dir: dir,
        root,
        store,
    }
}

fn write_validation(root: &Path) -> PathBuf {
    let path = root.join("validation.jsonl");
    std::fs::write(
        &path,
        concat!(
            r#"{"prompt": "q-long", "completion": "a b c d e f g h i j"}"#,
            "\n",
            r#"{"prompt": "q-short", "completion": "alpha beta"}"#,
            "\n"
        ),
    )
    .unwrap();
    path
}

fn pipeline(
    s: &Setup,
    n: usize,
    behavior: FakeBehavior,
    validation: PathBuf,
) -> SelfEditPipeline {
    let generator = CandidateGenerator::new(
        Arc::new(ScriptedGeneration::always(GOOD_RESPONSE, n)),
        Arc::new(DefaultPrompts),
        s.store.clone(),
    );
    let trainer = SandboxTrainer::new(
        s.store.clone(),
        Arc::new(FakeProcess::new(behavior)),
        s.root.join("artifacts"),
    );
    // 7 of 10 tokens and 1 of 2 tokens: (0.7 + 0.5) / 2 = 0.6
    let responder = Arc::new(ScriptedResponder::new(&[
        ("q-long", "a b c d e f g"),
        ("q-short", "alpha"),
    ]));
    let evaluator = Evaluator::new(responder, Arc::new(DefaultPrompts), validation);
    SelfEditPipeline::new(
        generator,
        trainer,
        evaluator,
        LifecycleManager::new(s.store.clone()),
    )
}

#[tokio::test]
async fn average_on_pass_threshold_is_accepted() {
    let s = setup();
    let validation = write_validation(&s.root);
    let report = pipeline(&s, 2, FakeBehavior::Succeed, validation)
        .run("Improve SEAL explanation quality", 2)
        .await
        .unwrap();

    assert_eq!(report.outcomes.len(), 2);
    assert_eq!(report.count(CandidateStatus::Accepted), 2);
    assert_eq!(report.failures(), 0);
    assert!(report.finished_at >= report.started_at);

    for outcome in &report.outcomes {
        assert_eq!(outcome.avg, Some(0.6));

        let stored = s.store.get_candidate(&outcome.candidate_id).await.unwrap();
        assert_eq!(stored.status, CandidateStatus::Accepted);
        let eval = stored.eval.unwrap();
        assert!(eval.pass_threshold);
        assert!(!eval.require_human);
        assert_eq!(eval.results.len(), 2);
        assert!((eval.results[0].score - 0.7).abs() < 1e-12);
        assert_eq!(eval.results[1].score, 0.5);

        let artifacts = s.root.join("artifacts");
        let id = &outcome.candidate_id;
        assert!(artifacts.join(format!("{id}_train.jsonl")).is_file());
        assert!(artifacts.join(format!("{id}_lora")).is_dir());
        assert!(artifacts.join(format!("{id}_eval.json")).is_file());
    }
}

#[tokio::test]
async fn failed_training_is_recorded_and_others_continue() {
    let s = setup();
    let validation = write_validation(&s.root);
    let report = pipeline(&s, 2, FakeBehavior::Exit(1), validation)
        .run("task", 2)
        .await
        .unwrap();

    assert_eq!(report.outcomes.len(), 2);
    assert_eq!(report.count(CandidateStatus::Rejected), 2);
    assert_eq!(report.failures(), 2);
    for outcome in &report.outcomes {
        assert!(outcome.avg.is_none());
        assert!(outcome.error.as_deref().unwrap().contains("exit code 1"));
        assert!(!s
            .root
            .join("artifacts")
            .join(format!("{}_eval.json", outcome.candidate_id))
            .exists());
    }
}

#[tokio::test]
async fn missing_validation_set_leaves_candidates_evaluating() {
    let s = setup();
    let report = pipeline(&s, 1, FakeBehavior::Succeed, s.root.join("nope.jsonl"))
        .run("task", 1)
        .await
        .unwrap();

    let outcome = &report.outcomes[0];
    assert_eq!(outcome.status, CandidateStatus::Evaluating);
    assert!(outcome.error.is_some());
    assert_eq!(
        s.store
            .get_candidate(&outcome.candidate_id)
            .await
            .unwrap()
            .status,
        CandidateStatus::Evaluating
    );
}

#[tokio::test]
async fn cancelled_run_leaves_candidates_generated() {
    let s = setup();
    let validation = write_validation(&s.root);
    let (handle, signal) = cancellation();
    handle.cancel();

    let report = pipeline(&s, 2, FakeBehavior::Succeed, validation)
        .run_with_cancel("task", 2, signal)
        .await
        .unwrap();

    assert_eq!(report.count(CandidateStatus::Generated), 2);
    assert_eq!(report.failures(), 2);
    for cand in s.store.list_candidates().await.unwrap() {
        assert_eq!(cand.status, CandidateStatus::Generated);
    }
}

#[tokio::test]
async fn generation_failure_aborts_the_run() {
    let s = setup();
    let validation = write_validation(&s.root);
    // Script holds one response but two are requested.
    let result = pipeline(&s, 1, FakeBehavior::Succeed, validation)
        .run("task", 2)
        .await;

    assert!(result.is_err());
    assert_eq!(s.store.list_candidates().await.unwrap().len(), 1);
}
