// runner/src/config.rs

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use hookworm::core::config::{DEFAULT_GITHUB_PATH, DEFAULT_SERVER_ADDRESS, DEFAULT_TRAVIS_PATH, DEFAULT_WORM_TIMEOUT_SECS};
use hookworm::watch::stage::DEFAULT_HOSTNAME;
use hookworm::{HandlerConfig, Verb, WormFlags};

/// Send one webhook payload through a hookworm pipeline.
///
/// The payload is read from stdin (or `--payload`) and the pipeline's output is
/// written to stdout.
#[derive(Debug, Clone, Parser)]
#[command(name = "hookworm", version, about)]
pub struct Cli {
  /// Worm directory holding the handler executables.
  #[arg(short = 'W', long, env = "HOOKWORM_WORM_DIR")]
  pub worm_dir: Option<PathBuf>,

  /// Timeout for each handler invocation, in seconds.
  #[arg(short = 'T', long = "timeout", env = "HOOKWORM_HANDLER_TIMEOUT", default_value_t = DEFAULT_WORM_TIMEOUT_SECS)]
  pub worm_timeout: u64,

  /// Scratch directory handlers run in. A temporary one is used when unset.
  #[arg(short = 'D', long, env = "HOOKWORM_WORKING_DIR")]
  pub working_dir: Option<PathBuf>,

  #[arg(short, long, env = "HOOKWORM_DEBUG")]
  pub debug: bool,

  #[arg(long, env = "HOOKWORM_GITHUB_PATH", default_value = DEFAULT_GITHUB_PATH)]
  pub github_path: String,

  #[arg(long, env = "HOOKWORM_TRAVIS_PATH", default_value = DEFAULT_TRAVIS_PATH)]
  pub travis_path: String,

  #[arg(short = 'a', long = "addr", env = "HOOKWORM_ADDR", default_value = DEFAULT_SERVER_ADDRESS)]
  pub server_address: String,

  #[arg(short = 'S', long, env = "HOOKWORM_STATIC_DIR")]
  pub static_dir: Option<PathBuf>,

  #[arg(short = 'P', long = "pid-file", env = "HOOKWORM_PID_FILE")]
  pub server_pid_file: Option<PathBuf>,

  /// Worm flags as `key=value; key2=value2`.
  #[arg(long = "worm-flags", env = "HOOKWORM_WORM_FLAGS")]
  pub worm_flags_env: Option<String>,

  /// Read the payload from this file instead of stdin.
  #[arg(long)]
  pub payload: Option<PathBuf>,

  /// Print the stage order and exit.
  #[arg(long)]
  pub list: bool,

  /// Branch pattern for the watch stage; repeatable.
  #[arg(long = "watch-branch")]
  pub watch_branches: Vec<String>,

  /// Path pattern for the watch stage; repeatable.
  #[arg(long = "watch-path")]
  pub watch_paths: Vec<String>,

  /// Payload kind: `github` or `travis`.
  #[arg(required_unless_present = "list")]
  pub verb: Option<Verb>,

  /// Extra worm flags as `key=value`.
  pub extra_flags: Vec<String>,
}

impl Cli {
  pub fn worm_flags(&self) -> WormFlags {
    let mut flags = WormFlags::new();
    if let Some(raw) = &self.worm_flags_env {
      flags.set(raw);
    }
    for raw in &self.extra_flags {
      flags.set(raw);
    }
    flags
  }

  /// The configuration every handler receives. `working_dir` is the one actually in use.
  pub fn handler_config(&self, working_dir: &Path) -> HandlerConfig {
    HandlerConfig {
      debug: self.debug,
      github_path: self.github_path.clone(),
      server_address: self.server_address.clone(),
      server_pid_file: self.server_pid_file.clone(),
      static_dir: self.static_dir.clone(),
      travis_path: self.travis_path.clone(),
      working_dir: Some(working_dir.to_path_buf()),
      worm_dir: self.worm_dir.clone(),
      worm_timeout: self.worm_timeout,
      worm_flags: self.worm_flags(),
      ..HandlerConfig::default()
    }
  }

  pub fn watching(&self) -> bool {
    !self.watch_branches.is_empty()
  }
}

/// Fails unless a file can be created in `dir`.
pub fn ensure_writable(dir: &Path) -> Result<()> {
  tempfile::tempfile_in(dir)
    .map(drop)
    .with_context(|| format!("Working directory '{}' is not writable", dir.display()))
}

/// The system host name, as reported by the kernel.
#[cfg(unix)]
pub fn hostname() -> String {
  match nix::unistd::gethostname() {
    Ok(name) if !name.is_empty() => name.to_string_lossy().into_owned(),
    Ok(_) => DEFAULT_HOSTNAME.to_string(),
    Err(e) => {
      tracing::warn!(error = %e, "Host name lookup failed; using {}.", DEFAULT_HOSTNAME);
      DEFAULT_HOSTNAME.to_string()
    }
  }
}

#[cfg(not(unix))]
pub fn hostname() -> String {
  DEFAULT_HOSTNAME.to_string()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_verb_and_trailing_flags() {
    let cli = Cli::try_parse_from(["hookworm", "-W", "/w", "-T", "5", "github", "owner=ops", "dry-run"]).unwrap();
    assert_eq!(cli.verb, Some(Verb::Github));
    assert_eq!(cli.worm_timeout, 5);

    let config = cli.handler_config(Path::new("/tmp/work"));
    assert_eq!(config.worm_dir.as_deref(), Some(Path::new("/w")));
    assert_eq!(config.worm_flags.get("owner").and_then(|v| v.as_str()), Some("ops"));
    assert_eq!(config.worm_flags.get("dry-run").and_then(|v| v.as_bool()), Some(true));
  }

  #[test]
  fn verb_is_optional_only_for_list() {
    assert!(Cli::try_parse_from(["hookworm", "--list"]).is_ok());
    assert!(Cli::try_parse_from(["hookworm"]).is_err());
    assert!(Cli::try_parse_from(["hookworm", "gitlab"]).is_err());
  }

  #[cfg(unix)]
  #[test]
  fn hostname_comes_from_the_system_not_the_environment() {
    let expected = nix::unistd::gethostname().unwrap().to_string_lossy().into_owned();

    let saved = std::env::var_os("HOSTNAME");
    std::env::set_var("HOSTNAME", "not-the-real-host.invalid");
    let seen_with_env = hostname();
    std::env::remove_var("HOSTNAME");
    let seen_without_env = hostname();
    if let Some(value) = saved {
      std::env::set_var("HOSTNAME", value);
    }

    assert_eq!(seen_with_env, expected);
    assert_eq!(seen_without_env, expected);
    assert_ne!(seen_without_env, "not-the-real-host.invalid");
  }

  #[test]
  fn writable_check() {
    let dir = tempfile::tempdir().unwrap();
    assert!(ensure_writable(dir.path()).is_ok());
    assert!(ensure_writable(&dir.path().join("missing")).is_err());
  }
}
