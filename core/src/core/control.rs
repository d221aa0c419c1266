// hookworm/src/core/control.rs

//! Protocol vocabulary shared by the invoker and the stages: payload verbs, the
//! reserved "decline" exit status, and the outcome of a single invocation.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::error::HookwormError;

/// Exit status a handler uses to say "not applicable to me". The stage's input is
/// forwarded unchanged and the stage becomes invisible for that request.
pub const EXIT_NOOP: i32 = 78;

/// The payload kind handed to a handler invocation as `handle <verb>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
  Github,
  Travis,
}

impl Verb {
  pub fn as_str(&self) -> &'static str {
    match self {
      Verb::Github => "github",
      Verb::Travis => "travis",
    }
  }
}

impl fmt::Display for Verb {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Verb {
  type Err = HookwormError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "github" => Ok(Verb::Github),
      "travis" => Ok(Verb::Travis),
      _ => Err(HookwormError::UnknownVerb(s.to_string())),
    }
  }
}

/// Why an invocation counts as a hard failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FailureCause {
  /// The process exited with a status other than 0 or 78. `None` when it was
  /// terminated by a signal and has no exit code.
  #[error("exited with status {}", .0.map_or_else(|| "<signal>".to_string(), |c| c.to_string()))]
  NonZeroExit(Option<i32>),

  #[error("could not be launched: {0}")]
  LaunchError(String),

  #[error("timed out after {0:?} and was killed")]
  Timeout(Duration),
}

/// Classification of a finished invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvocationStatus {
  Success,
  Noop,
  Failure(FailureCause),
}

/// What one subprocess invocation produced.
///
/// For `Success` the output is the captured stdout; for `Noop` it is the input the
/// invocation was given; for `Failure` it is whatever stdout was captured (possibly
/// nothing) and must not be trusted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationResult {
  pub output: Vec<u8>,
  pub status: InvocationStatus,
}

impl InvocationResult {
  pub fn success(output: Vec<u8>) -> Self {
    Self {
      output,
      status: InvocationStatus::Success,
    }
  }

  pub fn noop(input: &[u8]) -> Self {
    Self {
      output: input.to_vec(),
      status: InvocationStatus::Noop,
    }
  }

  pub fn failure(output: Vec<u8>, cause: FailureCause) -> Self {
    Self {
      output,
      status: InvocationStatus::Failure(cause),
    }
  }

  pub fn is_failure(&self) -> bool {
    matches!(self.status, InvocationStatus::Failure(_))
  }
}
