// hookworm/src/pipeline/stage.rs

//! The subprocess-backed stage: bridges one `ExecutableDescriptor` into the
//! `Handler` contract.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{event, instrument, Level};

use crate::command::descriptor::ExecutableDescriptor;
use crate::command::invoker;
use crate::core::control::{InvocationResult, InvocationStatus, Verb};
use crate::core::handler::{continue_chain, Handler};
use crate::core::link::NextLink;
use crate::error::{HookwormError, HookwormResult};

/// A stage backed by an external handler executable.
///
/// The stage configures itself lazily: the first request to reach it runs
/// `<handler> configure` before `<handler> handle <verb>`. Two requests racing on an
/// unconfigured stage may both run the handshake; handlers are expected to make
/// `configure` idempotent.
pub struct PipelineStage {
  name: String,
  descriptor: ExecutableDescriptor,
  /// Serialized `HandlerConfig`, shared by every stage of the pipeline.
  config: Arc<[u8]>,
  configured: AtomicBool,
  next: NextLink,
}

impl PipelineStage {
  pub fn new(descriptor: ExecutableDescriptor, config: Arc<[u8]>) -> Self {
    Self {
      name: descriptor.name(),
      descriptor,
      config,
      configured: AtomicBool::new(false),
      next: NextLink::new(),
    }
  }

  pub fn descriptor(&self) -> &ExecutableDescriptor {
    &self.descriptor
  }

  /// Whether the configuration handshake has been attempted.
  pub fn is_configured(&self) -> bool {
    self.configured.load(Ordering::Acquire)
  }

  /// Runs the configuration handshake.
  ///
  /// A failed handshake is logged and otherwise ignored: the stage stays in the chain
  /// and still attempts to handle payloads. Either way the stage counts as configured
  /// afterwards and is not re-configured by later requests.
  #[instrument(name = "PipelineStage::configure", skip_all, fields(stage = %self.name))]
  pub async fn configure(&self) -> InvocationResult {
    let result = invoker::configure(&self.descriptor, &self.config).await;
    match &result.status {
      InvocationStatus::Success => event!(Level::DEBUG, "Handler configured."),
      InvocationStatus::Noop => event!(Level::DEBUG, "Handler declined configuration."),
      InvocationStatus::Failure(cause) => {
        event!(Level::WARN, %cause, "Handler configuration failed; keeping it in the pipeline.")
      }
    }
    self.configured.store(true, Ordering::Release);
    result
  }

  async fn ensure_configured(&self) {
    if !self.is_configured() {
      self.configure().await;
    }
  }
}

#[async_trait]
impl Handler for PipelineStage {
  fn name(&self) -> &str {
    &self.name
  }

  #[instrument(name = "PipelineStage::handle", skip_all, fields(stage = %self.name, %verb))]
  async fn handle(&self, verb: Verb, payload: Vec<u8>) -> HookwormResult<Vec<u8>> {
    self.ensure_configured().await;

    let result = invoker::handle(&self.descriptor, verb, &payload).await;
    let output = match result.status {
      InvocationStatus::Success => result.output,
      InvocationStatus::Noop => {
        event!(Level::DEBUG, "Handler declined the payload; passing input through.");
        // The invoker already hands the input back for a decline.
        result.output
      }
      InvocationStatus::Failure(cause) => {
        event!(Level::ERROR, %cause, "Handler failed; halting the pipeline.");
        return Err(HookwormError::InvocationFailed {
          stage: self.name.clone(),
          verb,
          cause,
          last_good: payload,
        });
      }
    };

    continue_chain(self.next(), verb, output).await
  }

  fn set_next(&self, next: Arc<dyn Handler>) -> HookwormResult<()> {
    self.next.set(&self.name, next)
  }

  fn next(&self) -> Option<Arc<dyn Handler>> {
    self.next.get()
  }
}

impl std::fmt::Debug for PipelineStage {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("PipelineStage")
      .field("name", &self.name)
      .field("descriptor", &self.descriptor)
      .field("configured", &self.is_configured())
      .field("next", &self.next)
      .finish()
  }
}
