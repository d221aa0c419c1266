// hookworm/src/error.rs
use std::path::PathBuf;

use anyhow::Error as AnyhowError;
use thiserror::Error;

use crate::core::control::{FailureCause, Verb};

#[derive(Debug, Error)]
pub enum HookwormError {
  /// The worm directory could not be opened or listed. Fatal at startup.
  #[error("Worm directory '{}' could not be read: {source}", path.display())]
  WormDirUnreadable {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// A stage's subprocess failed for the current request. Halts the traversal.
  /// `last_good` is the payload the failing stage was given: the output of the last
  /// stage that succeeded, or the original request body.
  #[error("Handler '{stage}' failed while handling a {verb} payload: {cause}")]
  InvocationFailed {
    stage: String,
    verb: Verb,
    #[source]
    cause: FailureCause,
    last_good: Vec<u8>,
  },

  #[error("Stage '{stage}' is already linked to a next handler")]
  AlreadyLinked { stage: String },

  #[error("Invalid watch pattern '{pattern}': {source}")]
  InvalidPattern {
    pattern: String,
    #[source]
    source: regex::Error,
  },

  #[error("Handler configuration could not be encoded: {0}")]
  ConfigEncoding(#[from] serde_json::Error),

  #[error("Alert delivery failed. Source: {source}")]
  AlertFailed {
    #[source]
    source: AnyhowError,
  },

  #[error("Unknown payload verb: {0:?}")]
  UnknownVerb(String),

  #[error("Error in built-in stage or external operation. Source: {source}")]
  HandlerError {
    #[source]
    source: AnyhowError,
  },
}

impl HookwormError {
  /// The last payload known good before a subprocess stage failed.
  pub fn last_good_payload(&self) -> Option<&[u8]> {
    match self {
      HookwormError::InvocationFailed { last_good, .. } => Some(last_good),
      _ => None,
    }
  }

  /// The failure cause when this error came out of a subprocess stage.
  pub fn failure_cause(&self) -> Option<&FailureCause> {
    match self {
      HookwormError::InvocationFailed { cause, .. } => Some(cause),
      _ => None,
    }
  }
}

impl From<AnyhowError> for HookwormError {
  fn from(err: AnyhowError) -> Self {
    // Unwrap one level if the anyhow error is just carrying one of ours.
    match err.downcast::<HookwormError>() {
      Ok(inner) => inner,
      Err(source) => HookwormError::HandlerError { source },
    }
  }
}

pub type HookwormResult<T, E = HookwormError> = std::result::Result<T, E>;
