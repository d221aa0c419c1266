// hookworm/src/pipeline/top.rs
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{event, Level};

use crate::core::control::Verb;
use crate::core::handler::Handler;
use crate::core::link::NextLink;
use crate::error::HookwormResult;

pub const TOP_STAGE_NAME: &str = "top";

/// The sentinel at the head of every pipeline. Has no executable; it only forwards,
/// so even a pipeline built from an empty directory has a defined traversal.
#[derive(Debug, Default)]
pub struct TopStage {
  next: NextLink,
}

impl TopStage {
  pub fn new() -> Self {
    Self::default()
  }
}

#[async_trait]
impl Handler for TopStage {
  fn name(&self) -> &str {
    TOP_STAGE_NAME
  }

  async fn handle(&self, verb: Verb, payload: Vec<u8>) -> HookwormResult<Vec<u8>> {
    match self.next() {
      Some(next) => next.handle(verb, payload).await,
      None => {
        event!(Level::WARN, %verb, "No next handler; returning payload unchanged.");
        Ok(payload)
      }
    }
  }

  fn set_next(&self, next: Arc<dyn Handler>) -> HookwormResult<()> {
    self.next.set(TOP_STAGE_NAME, next)
  }

  fn next(&self) -> Option<Arc<dyn Handler>> {
    self.next.get()
  }
}
