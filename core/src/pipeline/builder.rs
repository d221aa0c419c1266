// hookworm/src/pipeline/builder.rs

//! Discovers handler executables in the worm directory and assembles them, plus any
//! built-in stages, into a `Pipeline`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{event, instrument, Level};

use crate::command::descriptor::ExecutableDescriptor;
use crate::core::config::HandlerConfig;
use crate::core::handler::Handler;
use crate::error::{HookwormError, HookwormResult};
use crate::pipeline::definition::Pipeline;
use crate::pipeline::stage::PipelineStage;

/// Lists the candidate handler files in `dir`: dot-files are dropped and the rest are
/// sorted by name, which is the order they will run in.
pub fn discover_handlers(dir: &Path) -> HookwormResult<Vec<PathBuf>> {
  let unreadable = |source| HookwormError::WormDirUnreadable {
    path: dir.to_path_buf(),
    source,
  };

  let mut names = Vec::new();
  for entry in std::fs::read_dir(dir).map_err(unreadable)? {
    let name = entry.map_err(unreadable)?.file_name();
    if name.to_string_lossy().starts_with('.') {
      event!(Level::TRACE, name = ?name, "Skipping hidden entry.");
      continue;
    }
    names.push(name);
  }
  names.sort();

  Ok(names.into_iter().map(|name| dir.join(name)).collect())
}

/// Builder for a `Pipeline`.
///
/// ```no_run
/// # use hookworm::{HandlerConfig, PipelineBuilder};
/// let cfg = HandlerConfig {
///   worm_dir: Some("/etc/hookworm/worm.d".into()),
///   ..HandlerConfig::default()
/// };
/// let pipeline = PipelineBuilder::new(cfg).build()?;
/// # Ok::<(), hookworm::HookwormError>(())
/// ```
pub struct PipelineBuilder {
  config: HandlerConfig,
  worm_dir: Option<PathBuf>,
  timeout: Duration,
  builtin_stages: Vec<Arc<dyn Handler>>,
}

impl PipelineBuilder {
  /// Starts from `config`; the worm directory and timeout default to the config's.
  pub fn new(config: HandlerConfig) -> Self {
    Self {
      worm_dir: config.worm_dir.clone(),
      timeout: config.timeout(),
      config,
      builtin_stages: Vec::new(),
    }
  }

  pub fn worm_dir(mut self, dir: impl Into<PathBuf>) -> Self {
    self.worm_dir = Some(dir.into());
    self
  }

  /// Per-invocation timeout for every subprocess stage.
  pub fn timeout(mut self, timeout: Duration) -> Self {
    self.timeout = timeout;
    self
  }

  /// Appends a built-in stage. Built-in stages run after all subprocess stages, in
  /// the order they were added.
  pub fn with_stage(mut self, stage: Arc<dyn Handler>) -> Self {
    self.builtin_stages.push(stage);
    self
  }

  /// Scans the worm directory (if any) and links the chain.
  ///
  /// Fails only if the directory cannot be read. Files without a known interpreter
  /// are skipped with a warning.
  #[instrument(
    name = "PipelineBuilder::build",
    skip_all,
    fields(worm_dir = ?self.worm_dir, timeout = ?self.timeout),
    err(Display)
  )]
  pub fn build(self) -> HookwormResult<Pipeline> {
    let config_json: Arc<[u8]> = self.config.to_json_bytes()?.into();

    let mut subprocess_stages = Vec::new();
    match &self.worm_dir {
      Some(dir) => {
        for path in discover_handlers(dir)? {
          let descriptor = match ExecutableDescriptor::for_file(&path, self.timeout) {
            Some(d) => d.with_working_dir(self.config.working_dir.clone()),
            None => {
              event!(Level::WARN, path = %path.display(), "No interpreter for handler file, skipping.");
              continue;
            }
          };
          event!(
            Level::DEBUG,
            path = %path.display(),
            interpreter = %descriptor.interpreter,
            "Adding handler stage."
          );
          subprocess_stages.push(Arc::new(PipelineStage::new(descriptor, config_json.clone())));
        }
      }
      None => event!(Level::DEBUG, "No worm directory configured."),
    }

    let pipeline = Pipeline::assemble(subprocess_stages, self.builtin_stages)?;

    event!(Level::INFO, num_stages = pipeline.len(), "Pipeline built.");
    if self.config.debug {
      for name in pipeline.stage_names() {
        event!(Level::INFO, "   ---> {}", name);
      }
    }
    Ok(pipeline)
  }
}

impl Pipeline {
  /// Builds the pipeline described by `config` with no built-in stages.
  pub fn from_config(config: &HandlerConfig) -> HookwormResult<Pipeline> {
    PipelineBuilder::new(config.clone()).build()
  }
}
