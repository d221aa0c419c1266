// hookworm/src/core/config.rs

//! The configuration bag handed to every handler during the `configure` handshake.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::HookwormResult;

pub const DEFAULT_GITHUB_PATH: &str = "/github";
pub const DEFAULT_TRAVIS_PATH: &str = "/travis";
pub const DEFAULT_SERVER_ADDRESS: &str = ":9988";
pub const DEFAULT_WORM_TIMEOUT_SECS: u64 = 30;

/// Configuration shared by the whole pipeline.
///
/// Produced by whatever bootstraps the server and read-only to the pipeline. It is
/// serialized to JSON once and written to each handler's stdin on `configure`, so
/// the field names are part of the handler protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandlerConfig {
  pub debug: bool,
  pub github_path: String,
  pub server_address: String,
  pub server_pid_file: Option<PathBuf>,
  pub static_dir: Option<PathBuf>,
  pub travis_path: String,
  pub working_dir: Option<PathBuf>,
  pub worm_dir: Option<PathBuf>,
  /// Per-invocation timeout, in seconds.
  pub worm_timeout: u64,
  pub worm_flags: WormFlags,
  pub version: String,
}

impl Default for HandlerConfig {
  fn default() -> Self {
    Self {
      debug: false,
      github_path: DEFAULT_GITHUB_PATH.to_string(),
      server_address: DEFAULT_SERVER_ADDRESS.to_string(),
      server_pid_file: None,
      static_dir: None,
      travis_path: DEFAULT_TRAVIS_PATH.to_string(),
      working_dir: None,
      worm_dir: None,
      worm_timeout: DEFAULT_WORM_TIMEOUT_SECS,
      worm_flags: WormFlags::default(),
      version: format!("hookworm {}", env!("CARGO_PKG_VERSION")),
    }
  }
}

impl HandlerConfig {
  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.worm_timeout)
  }

  /// The JSON document written to a handler's stdin on `configure`.
  pub fn to_json_bytes(&self) -> HookwormResult<Vec<u8>> {
    Ok(serde_json::to_vec(self)?)
  }
}

/// A single worm flag value: flags parsed from `yes`/`no`-style words become booleans,
/// everything else stays text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlagValue {
  Bool(bool),
  Text(String),
}

impl FlagValue {
  fn parse(raw: &str) -> Self {
    match raw.to_ascii_lowercase().as_str() {
      "true" | "yes" | "on" => FlagValue::Bool(true),
      "false" | "no" | "off" => FlagValue::Bool(false),
      _ => FlagValue::Text(raw.to_string()),
    }
  }

  pub fn as_bool(&self) -> Option<bool> {
    match self {
      FlagValue::Bool(b) => Some(*b),
      FlagValue::Text(_) => None,
    }
  }

  pub fn as_str(&self) -> Option<&str> {
    match self {
      FlagValue::Text(s) => Some(s),
      FlagValue::Bool(_) => None,
    }
  }
}

impl fmt::Display for FlagValue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      FlagValue::Bool(b) => write!(f, "{}", b),
      FlagValue::Text(s) => f.write_str(s),
    }
  }
}

/// Free-form `key=value` settings passed through to handlers untouched.
///
/// Parsed from strings like `"syslog=yes; owner=ops; dry-run"`: pieces are separated by
/// `;`, a bare key means `true`, and blank pieces are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WormFlags(BTreeMap<String, FlagValue>);

impl WormFlags {
  pub fn new() -> Self {
    Self::default()
  }

  /// Merges every `key=value` piece of `raw` into the map. Later keys win.
  pub fn set(&mut self, raw: &str) {
    for piece in raw.split(';') {
      let piece = piece.trim();
      if piece.is_empty() {
        continue;
      }
      match piece.split_once('=') {
        Some((key, value)) => {
          let key = key.trim();
          if key.is_empty() {
            continue;
          }
          self.0.insert(key.to_string(), FlagValue::parse(value.trim()));
        }
        None => {
          self.0.insert(piece.to_string(), FlagValue::Bool(true));
        }
      }
    }
  }

  pub fn get(&self, key: &str) -> Option<&FlagValue> {
    self.0.get(key)
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }
}

impl fmt::Display for WormFlags {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (key, value) in &self.0 {
      write!(f, "{}={};", key, value)?;
    }
    Ok(())
  }
}
