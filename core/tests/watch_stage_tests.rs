// tests/watch_stage_tests.rs
mod common;

use std::sync::Arc;

use common::*;
use hookworm::{HookwormError, Pipeline, PipelineBuilder, WatchPolicy, WatchStage};
use serde_json::json;
use serial_test::serial;

fn watch_pipeline(alerter: Arc<RecordingAlerter>, recorder: Arc<RecordingStage>) -> Pipeline {
  let policy = WatchPolicy::new(["^master$"], ["^docs/", r"\.md$"]).unwrap();
  let watch = WatchStage::new(policy, alerter).with_hostname("ci.example.org");
  PipelineBuilder::new(hookworm::HandlerConfig::default())
    .with_stage(Arc::new(watch))
    .with_stage(recorder)
    .build()
    .unwrap()
}

fn push_payload(git_ref: &str, modified: &[&str]) -> Vec<u8> {
  serde_json::to_vec(&json!({
    "ref": git_ref,
    "commits": [{"id": "c0ffee", "message": "Touch files", "modified": modified}],
    "head_commit": {
      "id": "c0ffee",
      "url": "https://github.com/acme/widgets/commit/c0ffee",
      "message": "Touch files",
      "author": {"name": "Sam Doe", "email": "sam@example.org"},
      "modified": modified,
    },
    "repository": {"name": "widgets", "url": "https://github.com/acme/widgets", "owner": {"name": "acme"}},
  }))
  .unwrap()
}

#[tokio::test]
#[serial]
async fn test_watched_path_on_watched_branch_alerts() {
  setup_tracing();
  let alerter = RecordingAlerter::new();
  let recorder = RecordingStage::new();
  let pipeline = watch_pipeline(alerter.clone(), recorder.clone());

  let payload = push_payload("refs/heads/master", &["docs/setup.txt", "src/lib.rs"]);
  let output = pipeline.handle_github(payload.clone()).await.unwrap();

  // The payload itself is never changed.
  assert_eq!(output, payload);
  assert_eq!(recorder.seen.lock().len(), 1);

  let alerts = alerter.alerts.lock().clone();
  assert_eq!(alerts.len(), 1);
  let alert = &alerts[0];
  assert_eq!(alert.repo, "acme/widgets");
  assert_eq!(alert.git_ref, "refs/heads/master");
  assert_eq!(alert.head_commit_id, "c0ffee");
  assert_eq!(alert.author, "Sam Doe");
  assert_eq!(alert.hostname, "ci.example.org");
  assert_eq!(alert.watched_branches, vec!["^master$"]);
  assert!(alert.matched_paths.iter().all(|p| p == "docs/setup.txt"));
}

#[tokio::test]
#[serial]
async fn test_unwatched_branch_or_path_does_not_alert() {
  setup_tracing();
  let alerter = RecordingAlerter::new();
  let recorder = RecordingStage::new();
  let pipeline = watch_pipeline(alerter.clone(), recorder.clone());

  pipeline
    .handle_github(push_payload("refs/heads/feature", &["docs/setup.txt"]))
    .await
    .unwrap();
  pipeline
    .handle_github(push_payload("refs/heads/master", &["src/lib.rs"]))
    .await
    .unwrap();

  assert_eq!(alerter.count(), 0);
  assert_eq!(recorder.seen.lock().len(), 2);
}

#[tokio::test]
#[serial]
async fn test_pull_request_merge_does_not_alert() {
  setup_tracing();
  let alerter = RecordingAlerter::new();
  let pipeline = watch_pipeline(alerter.clone(), RecordingStage::new());

  let merge = json!({"id": "m1", "message": "Merge pull request #7 from acme/docs", "modified": ["README.md"]});
  let payload = serde_json::to_vec(&json!({
    "ref": "refs/heads/master",
    "commits": [{"id": "a1", "message": "Docs", "modified": ["docs/a.md"]}, merge.clone()],
    "head_commit": merge,
  }))
  .unwrap();

  pipeline.handle_github(payload).await.unwrap();
  assert_eq!(alerter.count(), 0);
}

#[tokio::test]
#[serial]
async fn test_travis_and_unparseable_payloads_pass_through() {
  setup_tracing();
  let alerter = RecordingAlerter::new();
  let recorder = RecordingStage::new();
  let pipeline = watch_pipeline(alerter.clone(), recorder.clone());

  let travis = push_payload("refs/heads/master", &["docs/a.md"]);
  assert_eq!(pipeline.handle_travis(travis.clone()).await.unwrap(), travis);
  assert_eq!(pipeline.handle_github(b"not json".to_vec()).await.unwrap(), b"not json");

  assert_eq!(alerter.count(), 0);
  assert_eq!(recorder.seen_payloads().len(), 2);
}

#[tokio::test]
#[serial]
async fn test_failed_alert_halts_the_chain() {
  setup_tracing();
  let recorder = RecordingStage::new();
  let pipeline = watch_pipeline(RecordingAlerter::failing(), recorder.clone());

  let err = pipeline
    .handle_github(push_payload("refs/heads/master", &["docs/a.md"]))
    .await
    .unwrap_err();
  assert!(matches!(err, HookwormError::AlertFailed { .. }));
  assert!(recorder.seen.lock().is_empty());
}
