// hookworm/src/watch/stage.rs

//! A built-in stage that raises an alert when a push to a watched branch touches a
//! watched path. It never changes the payload.

use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;
use tracing::{event, instrument, Level};

use crate::core::control::Verb;
use crate::core::handler::{continue_chain, Handler};
use crate::core::link::NextLink;
use crate::error::{HookwormError, HookwormResult};
use crate::watch::alert::{Alert, Alerter};
use crate::watch::push_event::PushEvent;

pub const WATCH_STAGE_NAME: &str = "watch";

/// Fallback when the host name is not known.
pub const DEFAULT_HOSTNAME: &str = "somewhere.local";

fn compile_all<I, S>(patterns: I) -> HookwormResult<Vec<Regex>>
where
  I: IntoIterator<Item = S>,
  S: AsRef<str>,
{
  patterns
    .into_iter()
    .map(|p| {
      let pattern = p.as_ref();
      Regex::new(pattern).map_err(|source| HookwormError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
      })
    })
    .collect()
}

/// What the policy makes of a push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
  BranchNotWatched,
  PullRequestMerge,
  NoWatchedPaths,
  Alert { matched_paths: Vec<String> },
}

/// Which branches and paths are watched.
///
/// Branch patterns are matched against the ref with any `refs/heads/` prefix removed.
/// With no path patterns every push to a watched branch alerts.
#[derive(Debug, Clone)]
pub struct WatchPolicy {
  branches: Vec<Regex>,
  paths: Vec<Regex>,
}

impl WatchPolicy {
  pub fn new<B, P, S1, S2>(branches: B, paths: P) -> HookwormResult<Self>
  where
    B: IntoIterator<Item = S1>,
    P: IntoIterator<Item = S2>,
    S1: AsRef<str>,
    S2: AsRef<str>,
  {
    Ok(Self {
      branches: compile_all(branches)?,
      paths: compile_all(paths)?,
    })
  }

  pub fn branch_patterns(&self) -> Vec<String> {
    self.branches.iter().map(|re| re.as_str().to_string()).collect()
  }

  pub fn is_watched_branch(&self, git_ref: &str) -> bool {
    let branch = git_ref.strip_prefix("refs/heads/").unwrap_or(git_ref);
    self.branches.iter().any(|re| re.is_match(branch))
  }

  /// The subset of `paths` matching at least one path pattern.
  pub fn matching_paths(&self, paths: &[String]) -> Vec<String> {
    if self.paths.is_empty() {
      return paths.to_vec();
    }
    paths
      .iter()
      .filter(|path| self.paths.iter().any(|re| re.is_match(path)))
      .cloned()
      .collect()
  }

  pub fn evaluate(&self, event: &PushEvent) -> Verdict {
    if !self.is_watched_branch(&event.git_ref) {
      return Verdict::BranchNotWatched;
    }
    if event.is_pull_request_merge() {
      return Verdict::PullRequestMerge;
    }
    let matched_paths = self.matching_paths(&event.paths());
    if matched_paths.is_empty() && !self.paths.is_empty() {
      return Verdict::NoWatchedPaths;
    }
    Verdict::Alert { matched_paths }
  }
}

/// Built-in stage applying a `WatchPolicy` to GitHub push payloads.
///
/// Travis payloads and payloads that do not decode as a push event are forwarded
/// untouched. A failed alert halts the chain.
pub struct WatchStage {
  policy: WatchPolicy,
  alerter: Arc<dyn Alerter>,
  hostname: String,
  next: NextLink,
}

impl WatchStage {
  pub fn new(policy: WatchPolicy, alerter: Arc<dyn Alerter>) -> Self {
    Self {
      policy,
      alerter,
      hostname: DEFAULT_HOSTNAME.to_string(),
      next: NextLink::new(),
    }
  }

  pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
    self.hostname = hostname.into();
    self
  }

  pub fn policy(&self) -> &WatchPolicy {
    &self.policy
  }

  fn build_alert(&self, event: &PushEvent, matched_paths: Vec<String>) -> Alert {
    let head = event.head_commit.clone().unwrap_or_default();
    Alert {
      repo: event.repo_full_name(),
      git_ref: event.git_ref.clone(),
      head_commit_id: head.id,
      head_commit_url: head.url,
      author: head.author.name,
      message: head.message,
      matched_paths,
      watched_branches: self.policy.branch_patterns(),
      hostname: self.hostname.clone(),
    }
  }

  async fn inspect(&self, payload: &[u8]) -> HookwormResult<()> {
    let push = match PushEvent::from_slice(payload) {
      Ok(push) => push,
      Err(e) => {
        event!(Level::WARN, error = %e, "Payload is not a push event; not inspecting it.");
        return Ok(());
      }
    };

    match self.policy.evaluate(&push) {
      Verdict::Alert { matched_paths } => {
        let alert = self.build_alert(&push, matched_paths);
        self
          .alerter
          .alert(&alert)
          .await
          .map_err(|source| HookwormError::AlertFailed { source })?;
        event!(Level::INFO, repo = %alert.repo, "Watch alert sent.");
      }
      verdict => event!(Level::DEBUG, ?verdict, git_ref = %push.git_ref, "No watch alert."),
    }
    Ok(())
  }
}

#[async_trait]
impl Handler for WatchStage {
  fn name(&self) -> &str {
    WATCH_STAGE_NAME
  }

  #[instrument(name = "WatchStage::handle", skip_all, fields(%verb))]
  async fn handle(&self, verb: Verb, payload: Vec<u8>) -> HookwormResult<Vec<u8>> {
    if verb == Verb::Github {
      self.inspect(&payload).await?;
    }
    continue_chain(self.next(), verb, payload).await
  }

  fn set_next(&self, next: Arc<dyn Handler>) -> HookwormResult<()> {
    self.next.set(WATCH_STAGE_NAME, next)
  }

  fn next(&self) -> Option<Arc<dyn Handler>> {
    self.next.get()
  }
}

impl std::fmt::Debug for WatchStage {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("WatchStage")
      .field("policy", &self.policy)
      .field("hostname", &self.hostname)
      .field("next", &self.next)
      .finish()
  }
}
