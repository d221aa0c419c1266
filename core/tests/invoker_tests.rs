// tests/invoker_tests.rs
mod common;

use std::time::{Duration, Instant};

use common::*;
use hookworm::command::invoker;
use hookworm::{ExecutableDescriptor, FailureCause, HookwormError, InvocationStatus, Verb};
use serial_test::serial;

fn bash(path: std::path::PathBuf, timeout: Duration) -> ExecutableDescriptor {
  ExecutableDescriptor::new("bash", path, timeout)
}

#[tokio::test]
#[serial]
async fn test_success_returns_stdout() {
  setup_tracing();
  let worms = WormDir::new();
  let script = worms.handler("00-wrap.sh", "printf '['; cat; printf ']'");

  let result = invoker::handle(&bash(script, Duration::from_secs(5)), Verb::Github, b"body").await;
  assert_eq!(result.status, InvocationStatus::Success);
  assert_eq!(result.output, b"[body]");
}

#[tokio::test]
#[serial]
async fn test_exit_78_is_noop_with_input_as_output() {
  setup_tracing();
  let worms = WormDir::new();
  let script = worms.handler("00-no.sh", "printf 'nope'; exit 78");

  let result = invoker::handle(&bash(script, Duration::from_secs(5)), Verb::Travis, b"keep me").await;
  assert_eq!(result.status, InvocationStatus::Noop);
  assert_eq!(result.output, b"keep me");
}

#[tokio::test]
#[serial]
async fn test_nonzero_exit_is_failure() {
  setup_tracing();
  let worms = WormDir::new();
  let script = worms.handler("00-two.sh", "exit 2");

  let result = invoker::handle(&bash(script, Duration::from_secs(5)), Verb::Github, b"{}").await;
  assert_eq!(result.status, InvocationStatus::Failure(FailureCause::NonZeroExit(Some(2))));
  assert!(result.is_failure());
}

#[tokio::test]
#[serial]
async fn test_missing_interpreter_is_launch_error() {
  setup_tracing();
  let worms = WormDir::new();
  let script = worms.handler("00-any.sh", "cat");
  let descriptor = ExecutableDescriptor::new("hookworm-no-such-interpreter", script, Duration::from_secs(5));

  let result = invoker::handle(&descriptor, Verb::Github, b"{}").await;
  assert!(matches!(
    result.status,
    InvocationStatus::Failure(FailureCause::LaunchError(_))
  ));
}

#[tokio::test]
#[serial]
async fn test_configure_passes_config_on_stdin() {
  setup_tracing();
  let worms = WormDir::new();
  let script = worms.raw(
    "00-conf.sh",
    "#!/usr/bin/env bash\n[ \"$1\" = \"configure\" ] || exit 9\ncat\n",
  );

  let result = invoker::configure(&bash(script, Duration::from_secs(5)), br#"{"debug":true}"#).await;
  assert_eq!(result.status, InvocationStatus::Success);
  assert_eq!(result.output, br#"{"debug":true}"#);
}

#[tokio::test]
#[serial]
async fn test_stderr_is_not_part_of_output() {
  setup_tracing();
  let worms = WormDir::new();
  let script = worms.handler("00-noisy.sh", "echo 'diagnostics' >&2; printf 'clean'");

  let result = invoker::handle(&bash(script, Duration::from_secs(5)), Verb::Github, b"").await;
  assert_eq!(result.output, b"clean");
}

#[tokio::test]
#[serial]
async fn test_large_payload_does_not_deadlock() {
  setup_tracing();
  let worms = WormDir::new();
  let script = worms.handler("00-echo.sh", "cat");
  let payload = vec![b'x'; 4 * 1024 * 1024];

  let result = invoker::handle(&bash(script, Duration::from_secs(20)), Verb::Github, &payload).await;
  assert_eq!(result.status, InvocationStatus::Success);
  assert_eq!(result.output.len(), payload.len());
}

#[tokio::test]
#[serial]
async fn test_timeout_kills_slow_handler() {
  setup_tracing();
  let worms = WormDir::new();
  let pid_file = worms.working_dir().join("pid");
  let script = worms.handler(
    "00-slow.sh",
    &format!("echo $$ > '{}'; exec sleep 5", pid_file.display()),
  );

  let started = Instant::now();
  let result = invoker::handle(&bash(script, Duration::from_secs(1)), Verb::Github, b"{}").await;
  let elapsed = started.elapsed();

  assert_eq!(
    result.status,
    InvocationStatus::Failure(FailureCause::Timeout(Duration::from_secs(1)))
  );
  assert!(elapsed >= Duration::from_millis(900), "returned too early: {:?}", elapsed);
  assert!(elapsed < Duration::from_secs(3), "timeout not enforced: {:?}", elapsed);

  #[cfg(target_os = "linux")]
  {
    let pid: u32 = std::fs::read_to_string(&pid_file).unwrap().trim().parse().unwrap();
    assert!(!process_alive(pid), "handler process {} survived its timeout", pid);
  }
}

#[tokio::test]
#[serial]
async fn test_pipeline_reports_timeout() {
  setup_tracing();
  let worms = WormDir::new();
  worms.handler("00-slow.sh", "exec sleep 5");
  let pipeline = worms.build_with_timeout(Duration::from_secs(1));

  let started = Instant::now();
  let err = pipeline.handle_github(b"{}".to_vec()).await.unwrap_err();
  assert!(started.elapsed() < Duration::from_secs(3));

  assert!(matches!(err, HookwormError::InvocationFailed { .. }));
  assert_eq!(err.failure_cause(), Some(&FailureCause::Timeout(Duration::from_secs(1))));
  assert_eq!(err.last_good_payload(), Some(&b"{}"[..]));
}

#[tokio::test]
#[serial]
async fn test_unbounded_timeout_still_runs_handler() {
  setup_tracing();
  let worms = WormDir::new();
  worms.handler("00-echo.sh", "cat");
  let config = hookworm::HandlerConfig {
    worm_timeout: u64::MAX,
    ..worms.config()
  };
  let pipeline = hookworm::Pipeline::from_config(&config).unwrap();

  let output = pipeline.handle_github(b"hi".to_vec()).await.unwrap();
  assert_eq!(output, b"hi");
}
