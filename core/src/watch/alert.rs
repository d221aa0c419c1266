// hookworm/src/watch/alert.rs
use async_trait::async_trait;
use tracing::{event, Level};

/// Everything an alert sink needs to tell someone a watched path changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Alert {
  pub repo: String,
  pub git_ref: String,
  pub head_commit_id: String,
  pub head_commit_url: String,
  pub author: String,
  pub message: String,
  pub matched_paths: Vec<String>,
  pub watched_branches: Vec<String>,
  pub hostname: String,
}

/// Where the watch stage sends its alerts.
#[async_trait]
pub trait Alerter: Send + Sync {
  async fn alert(&self, alert: &Alert) -> anyhow::Result<()>;
}

/// Writes alerts to the log at WARN.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAlerter;

#[async_trait]
impl Alerter for LogAlerter {
  async fn alert(&self, alert: &Alert) -> anyhow::Result<()> {
    event!(
      Level::WARN,
      repo = %alert.repo,
      git_ref = %alert.git_ref,
      head_commit = %alert.head_commit_id,
      author = %alert.author,
      hostname = %alert.hostname,
      matched_paths = ?alert.matched_paths,
      "Watched path changed on a watched branch: {}",
      alert.message
    );
    Ok(())
  }
}
