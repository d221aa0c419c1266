// hookworm/src/core/handler.rs

//! Defines the `Handler` trait: the chain-of-responsibility contract every stage
//! implements, whether it is backed by an external executable or built in.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{event, Level};

use crate::core::control::Verb;
use crate::error::HookwormResult;

/// One link in the handler chain.
///
/// A handler receives the raw payload, may transform it, and decides whether the
/// chain continues. Implementations that continue hand their output to
/// [`Handler::next`]; the value returned from the head of the chain is therefore
/// the output of the last stage that ran.
///
/// Returning `Err` halts the chain: no later stage sees the payload. A failing
/// subprocess stage reports the payload it was given in the error
/// (`HookwormError::last_good_payload`); stdout from the failed run is discarded.
#[async_trait]
pub trait Handler: Send + Sync {
  /// Short name used in logs and errors (for subprocess stages, the file name).
  fn name(&self) -> &str;

  /// Handles `payload` for `verb` and continues the chain as appropriate.
  async fn handle(&self, verb: Verb, payload: Vec<u8>) -> HookwormResult<Vec<u8>>;

  /// Links the next handler. A handler is linked at most once.
  fn set_next(&self, next: Arc<dyn Handler>) -> HookwormResult<()>;

  fn next(&self) -> Option<Arc<dyn Handler>>;

  async fn handle_github(&self, payload: Vec<u8>) -> HookwormResult<Vec<u8>> {
    self.handle(Verb::Github, payload).await
  }

  async fn handle_travis(&self, payload: Vec<u8>) -> HookwormResult<Vec<u8>> {
    self.handle(Verb::Travis, payload).await
  }
}

/// Hands `payload` to `next` if there is one, otherwise ends the chain with it.
pub async fn continue_chain(
  next: Option<Arc<dyn Handler>>,
  verb: Verb,
  payload: Vec<u8>,
) -> HookwormResult<Vec<u8>> {
  match next {
    Some(next_handler) => {
      event!(Level::TRACE, next = %next_handler.name(), %verb, "Passing payload to next handler.");
      next_handler.handle(verb, payload).await
    }
    None => Ok(payload),
  }
}
