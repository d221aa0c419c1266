// hookworm/src/pipeline/definition.rs

//! Contains the `Pipeline` struct: the arena that owns every stage of a chain and the
//! entry points the inbound layer calls.

use std::sync::Arc;

use tracing::{event, instrument, Level};

use crate::core::control::{InvocationStatus, Verb};
use crate::core::handler::Handler;
use crate::error::HookwormResult;
use crate::pipeline::stage::PipelineStage;
use crate::pipeline::top::TopStage;

/// A built handler chain.
///
/// The pipeline owns every stage for its whole lifetime. Stages are linked once, in
/// order, when the pipeline is assembled and the topology is read-only afterwards, so
/// a `Pipeline` (usually behind an `Arc`) can serve any number of concurrent requests.
pub struct Pipeline {
  head: Arc<TopStage>,
  /// Every stage after the head, in execution order.
  stages: Vec<Arc<dyn Handler>>,
  /// The subset of `stages` backed by executables, for eager configuration.
  subprocess_stages: Vec<Arc<PipelineStage>>,
}

impl Pipeline {
  /// A pipeline consisting of the sentinel head only.
  pub fn empty() -> Self {
    Self {
      head: Arc::new(TopStage::new()),
      stages: Vec::new(),
      subprocess_stages: Vec::new(),
    }
  }

  /// Links `subprocess_stages` followed by `builtin_stages` behind a fresh head.
  pub(crate) fn assemble(
    subprocess_stages: Vec<Arc<PipelineStage>>,
    builtin_stages: Vec<Arc<dyn Handler>>,
  ) -> HookwormResult<Self> {
    let head = Arc::new(TopStage::new());

    let mut stages: Vec<Arc<dyn Handler>> = Vec::with_capacity(subprocess_stages.len() + builtin_stages.len());
    stages.extend(subprocess_stages.iter().map(|s| s.clone() as Arc<dyn Handler>));
    stages.extend(builtin_stages);

    let mut current: Arc<dyn Handler> = head.clone();
    for stage in &stages {
      current.set_next(stage.clone())?;
      current = stage.clone();
    }

    Ok(Self {
      head,
      stages,
      subprocess_stages,
    })
  }

  /// The chain's entry point.
  pub fn head(&self) -> Arc<dyn Handler> {
    self.head.clone()
  }

  /// Stage names in execution order, excluding the head.
  pub fn stage_names(&self) -> Vec<String> {
    self.stages.iter().map(|s| s.name().to_string()).collect()
  }

  pub fn subprocess_stages(&self) -> &[Arc<PipelineStage>] {
    &self.subprocess_stages
  }

  pub fn len(&self) -> usize {
    self.stages.len()
  }

  pub fn is_empty(&self) -> bool {
    self.stages.is_empty()
  }

  /// Runs the configuration handshake for every subprocess stage up front, in order.
  ///
  /// Failures are logged and do not stop the remaining stages from being configured.
  /// Returns the number of stages whose handshake failed.
  #[instrument(name = "Pipeline::configure_all", skip_all, fields(num_stages = self.subprocess_stages.len()))]
  pub async fn configure_all(&self) -> usize {
    let mut failed = 0;
    for stage in &self.subprocess_stages {
      if let InvocationStatus::Failure(_) = stage.configure().await.status {
        failed += 1;
      }
    }
    event!(Level::INFO, failed, "Pipeline configuration finished.");
    failed
  }

  /// Sends `payload` down the chain and returns the last stage's output.
  #[instrument(
    name = "Pipeline::handle",
    skip_all,
    fields(%verb, num_stages = self.stages.len(), payload_len = payload.len()),
    err(Display)
  )]
  pub async fn handle(&self, verb: Verb, payload: Vec<u8>) -> HookwormResult<Vec<u8>> {
    event!(Level::DEBUG, "Pipeline traversal starting.");
    let output = self.head.handle(verb, payload).await?;
    event!(Level::DEBUG, output_len = output.len(), "Pipeline traversal completed.");
    Ok(output)
  }

  pub async fn handle_github(&self, payload: Vec<u8>) -> HookwormResult<Vec<u8>> {
    self.handle(Verb::Github, payload).await
  }

  pub async fn handle_travis(&self, payload: Vec<u8>) -> HookwormResult<Vec<u8>> {
    self.handle(Verb::Travis, payload).await
  }
}

impl Default for Pipeline {
  fn default() -> Self {
    Self::empty()
  }
}

impl std::fmt::Debug for Pipeline {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Pipeline").field("stages", &self.stage_names()).finish()
  }
}
