// tests/common/mod.rs
#![allow(dead_code)] // Allow unused code in this common test module

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hookworm::core::handler::continue_chain;
use hookworm::core::link::NextLink;
use hookworm::{Alert, Alerter, Handler, HandlerConfig, HookwormResult, Pipeline, PipelineBuilder, Verb};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use tempfile::TempDir;
use tracing::Level;

// --- Helper for Tracing Setup (call once per test run if needed) ---
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

/// Every script starts with this: `configure` consumes its config and succeeds, so
/// bodies only deal with `handle <verb>`.
const SCRIPT_PRELUDE: &str = r#"#!/usr/bin/env bash
if [ "$1" = "configure" ]; then
  cat > /dev/null
  exit 0
fi
"#;

/// A throwaway worm directory plus a scratch working directory.
pub struct WormDir {
  worm: TempDir,
  work: TempDir,
}

impl WormDir {
  pub fn new() -> Self {
    Self {
      worm: tempfile::tempdir().expect("worm dir"),
      work: tempfile::tempdir().expect("working dir"),
    }
  }

  pub fn path(&self) -> &Path {
    self.worm.path()
  }

  pub fn working_dir(&self) -> &Path {
    self.work.path()
  }

  /// Writes a bash handler whose `handle` branch runs `body`.
  pub fn handler(&self, name: &str, body: &str) -> PathBuf {
    self.raw(name, &format!("{SCRIPT_PRELUDE}{body}\n"))
  }

  /// Writes `contents` verbatim.
  pub fn raw(&self, name: &str, contents: &str) -> PathBuf {
    let path = self.worm.path().join(name);
    std::fs::write(&path, contents).expect("write handler");
    path
  }

  pub fn config(&self) -> HandlerConfig {
    HandlerConfig {
      worm_dir: Some(self.worm.path().to_path_buf()),
      working_dir: Some(self.work.path().to_path_buf()),
      ..HandlerConfig::default()
    }
  }

  pub fn build(&self) -> Pipeline {
    PipelineBuilder::new(self.config()).build().expect("pipeline builds")
  }

  pub fn build_with_timeout(&self, timeout: Duration) -> Pipeline {
    PipelineBuilder::new(self.config())
      .timeout(timeout)
      .build()
      .expect("pipeline builds")
  }
}

// --- Common built-in stages ---

/// Records every payload it sees and forwards it unchanged.
#[derive(Default)]
pub struct RecordingStage {
  pub seen: Mutex<Vec<(Verb, Vec<u8>)>>,
  next: NextLink,
}

impl RecordingStage {
  pub fn new() -> Arc<Self> {
    Arc::new(Self::default())
  }

  pub fn seen_payloads(&self) -> Vec<String> {
    self
      .seen
      .lock()
      .iter()
      .map(|(_, p)| String::from_utf8_lossy(p).into_owned())
      .collect()
  }
}

#[async_trait]
impl Handler for RecordingStage {
  fn name(&self) -> &str {
    "recorder"
  }

  async fn handle(&self, verb: Verb, payload: Vec<u8>) -> HookwormResult<Vec<u8>> {
    self.seen.lock().push((verb, payload.clone()));
    continue_chain(self.next(), verb, payload).await
  }

  fn set_next(&self, next: Arc<dyn Handler>) -> HookwormResult<()> {
    self.next.set("recorder", next)
  }

  fn next(&self) -> Option<Arc<dyn Handler>> {
    self.next.get()
  }
}

/// Collects alerts instead of delivering them; optionally refuses them all.
#[derive(Default)]
pub struct RecordingAlerter {
  pub alerts: Mutex<Vec<Alert>>,
  pub fail: bool,
}

impl RecordingAlerter {
  pub fn new() -> Arc<Self> {
    Arc::new(Self::default())
  }

  pub fn failing() -> Arc<Self> {
    Arc::new(Self {
      alerts: Mutex::new(Vec::new()),
      fail: true,
    })
  }

  pub fn count(&self) -> usize {
    self.alerts.lock().len()
  }
}

#[async_trait]
impl Alerter for RecordingAlerter {
  async fn alert(&self, alert: &Alert) -> anyhow::Result<()> {
    if self.fail {
      anyhow::bail!("alert sink unavailable");
    }
    self.alerts.lock().push(alert.clone());
    Ok(())
  }
}

pub fn as_text(output: &[u8]) -> String {
  String::from_utf8_lossy(output).into_owned()
}

/// Whether `pid` still names a live (non-zombie) process.
#[cfg(target_os = "linux")]
pub fn process_alive(pid: u32) -> bool {
  match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
    // Field 3 is the state; `Z` is a zombie and `X` is dead.
    Ok(stat) => stat
      .rsplit_once(')')
      .and_then(|(_, rest)| rest.split_whitespace().next())
      .is_some_and(|state| state != "Z" && state != "X"),
    Err(_) => false,
  }
}
