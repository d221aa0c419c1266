// hookworm/src/core/link.rs
use std::sync::Arc;

use parking_lot::RwLock;

use crate::core::handler::Handler;
use crate::error::{HookwormError, HookwormResult};

/// The forward edge from one stage to the next.
///
/// The slot is written once while the pipeline is being linked and only read
/// afterwards, so traversals take the read lock and never contend with each other.
/// A second `set` is rejected, which keeps the chain acyclic.
#[derive(Default)]
pub struct NextLink(RwLock<Option<Arc<dyn Handler>>>);

impl NextLink {
  pub fn new() -> Self {
    NextLink(RwLock::new(None))
  }

  /// Links `next`. Fails if this slot was already linked.
  pub fn set(&self, owner: &str, next: Arc<dyn Handler>) -> HookwormResult<()> {
    let mut slot = self.0.write();
    if slot.is_some() {
      return Err(HookwormError::AlreadyLinked {
        stage: owner.to_string(),
      });
    }
    *slot = Some(next);
    Ok(())
  }

  /// A clone of the linked handler, if any. The guard is released before returning,
  /// so the result can be held across `.await` points.
  pub fn get(&self) -> Option<Arc<dyn Handler>> {
    self.0.read().clone()
  }
}

impl std::fmt::Debug for NextLink {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self.0.read().as_ref() {
      Some(next) => write!(f, "NextLink(-> {})", next.name()),
      None => f.write_str("NextLink(<end>)"),
    }
  }
}
