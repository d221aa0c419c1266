// hookworm/src/command/invoker.rs

//! Runs a single handler invocation: spawn, feed stdin, race the process against
//! its timeout, and classify the exit status.

use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{event, instrument, Level};

use crate::command::descriptor::ExecutableDescriptor;
use crate::core::control::{FailureCause, InvocationResult, Verb, EXIT_NOOP};

/// Environment variable through which a child learns the scratch working directory.
pub const WORKING_DIR_ENV: &str = "HOOKWORM_WORKING_DIR";

/// Stand-in deadline distance for timeouts too large to add to the clock.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Runs `<handler> configure` with the serialized configuration on stdin.
pub async fn configure(descriptor: &ExecutableDescriptor, config: &[u8]) -> InvocationResult {
  run(descriptor, &["configure"], config).await
}

/// Runs `<handler> handle <verb>` with the payload on stdin.
pub async fn handle(descriptor: &ExecutableDescriptor, verb: Verb, payload: &[u8]) -> InvocationResult {
  run(descriptor, &["handle", verb.as_str()], payload).await
}

/// Spawns `<interpreter> <file_path> <args...>`, writes `input` to its stdin and
/// waits for it, bounded by `descriptor.timeout`.
///
/// On timeout the child is killed and reaped before this returns. The child's stderr
/// is inherited, so handler diagnostics land on the server's own stderr.
#[instrument(
  name = "invoker::run",
  skip(descriptor, input),
  fields(
    handler = %descriptor.name(),
    interpreter = %descriptor.interpreter,
    timeout = ?descriptor.timeout,
    input_len = input.len(),
  )
)]
pub async fn run(descriptor: &ExecutableDescriptor, args: &[&str], input: &[u8]) -> InvocationResult {
  let started = Instant::now();
  let deadline = deadline_after(descriptor.timeout);

  let mut cmd = Command::new(&descriptor.interpreter);
  cmd
    .arg(&descriptor.file_path)
    .args(args)
    .stdin(Stdio::piped())
    .stdout(Stdio::piped())
    .stderr(Stdio::inherit())
    .kill_on_drop(true);

  if let Some(dir) = &descriptor.working_dir {
    cmd.current_dir(dir).env(WORKING_DIR_ENV, dir);
  }

  let mut child = match cmd.spawn() {
    Ok(child) => child,
    Err(e) => {
      event!(Level::ERROR, error = %e, "Handler could not be launched.");
      return InvocationResult::failure(Vec::new(), FailureCause::LaunchError(e.to_string()));
    }
  };

  // Feed stdin and drain stdout on their own tasks so a child that writes before it
  // has read all of its input cannot deadlock against us.
  let stdin_task: Option<JoinHandle<()>> = child.stdin.take().map(|mut stdin| {
    let input = input.to_vec();
    tokio::spawn(async move {
      if let Err(e) = stdin.write_all(&input).await {
        // The child may exit or close stdin without reading everything.
        event!(Level::TRACE, error = %e, "Handler stopped reading stdin early.");
      }
      // `stdin` is dropped here, closing the pipe.
    })
  });
  let stdout_task: Option<JoinHandle<Vec<u8>>> = child.stdout.take().map(|mut stdout| {
    tokio::spawn(async move {
      let mut buf = Vec::new();
      if let Err(e) = stdout.read_to_end(&mut buf).await {
        event!(Level::WARN, error = %e, "Failed reading handler stdout.");
      }
      buf
    })
  });

  let waited: Option<std::io::Result<ExitStatus>> = tokio::select! {
    status = child.wait() => Some(status),
    _ = tokio::time::sleep_until(deadline) => None,
  };

  let status = match waited {
    Some(Ok(status)) => status,
    Some(Err(e)) => {
      event!(Level::ERROR, error = %e, "Waiting on handler failed.");
      abort_io(stdin_task, stdout_task);
      return InvocationResult::failure(Vec::new(), FailureCause::LaunchError(e.to_string()));
    }
    None => {
      event!(Level::ERROR, "Handler timed out, killing it.");
      // `kill` sends SIGKILL and then waits, so the child is reaped before we return.
      if let Err(e) = child.kill().await {
        event!(Level::WARN, error = %e, "Killing timed-out handler failed.");
      }
      abort_io(stdin_task, stdout_task);
      return InvocationResult::failure(Vec::new(), FailureCause::Timeout(descriptor.timeout));
    }
  };

  if let Some(task) = stdin_task {
    let _ = task.await;
  }

  // A grandchild can keep stdout open after the handler itself exited; the drain is
  // still bounded by the same deadline.
  let output = match stdout_task {
    Some(mut task) => match tokio::time::timeout_at(deadline, &mut task).await {
      Ok(Ok(buf)) => buf,
      Ok(Err(join_err)) => {
        event!(Level::WARN, error = %join_err, "Handler stdout reader did not complete.");
        Vec::new()
      }
      Err(_elapsed) => {
        event!(Level::ERROR, "Handler stdout stayed open past the timeout.");
        task.abort();
        return InvocationResult::failure(Vec::new(), FailureCause::Timeout(descriptor.timeout));
      }
    },
    None => Vec::new(),
  };

  let result = classify(status, output, input);
  event!(
    Level::DEBUG,
    exit_code = ?status.code(),
    elapsed_ms = started.elapsed().as_millis() as u64,
    output_len = result.output.len(),
    "Handler finished."
  );
  result
}

/// `now + timeout`, saturating at a far-future instant instead of overflowing.
fn deadline_after(timeout: Duration) -> tokio::time::Instant {
  let now = tokio::time::Instant::now();
  now
    .checked_add(timeout)
    .unwrap_or_else(|| now + FAR_FUTURE)
}

/// Maps an exit status onto the handler protocol.
fn classify(status: ExitStatus, stdout: Vec<u8>, input: &[u8]) -> InvocationResult {
  if status.success() {
    return InvocationResult::success(stdout);
  }
  match status.code() {
    Some(EXIT_NOOP) => InvocationResult::noop(input),
    code => InvocationResult::failure(stdout, FailureCause::NonZeroExit(code)),
  }
}

fn abort_io(stdin_task: Option<JoinHandle<()>>, stdout_task: Option<JoinHandle<Vec<u8>>>) {
  if let Some(task) = stdin_task {
    task.abort();
  }
  if let Some(task) = stdout_task {
    task.abort();
  }
}
