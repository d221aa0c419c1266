// hookworm/src/command/descriptor.rs

//! Describes how to launch one handler executable.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// File extension to interpreter. Fixed; operators choose a handler's interpreter by
/// naming the file accordingly.
const INTERPRETERS: &[(&str, &str)] = &[
  ("js", "node"),
  ("pl", "perl"),
  ("py", "python"),
  ("rb", "ruby"),
  ("sh", "bash"),
];

/// Looks up the interpreter for `path` by its extension.
pub fn interpreter_for(path: &Path) -> Option<&'static str> {
  let ext = path.extension()?.to_str()?;
  INTERPRETERS
    .iter()
    .find(|(known, _)| *known == ext)
    .map(|(_, interpreter)| *interpreter)
}

/// An immutable recipe for invoking one handler: `<interpreter> <file_path> <args...>`
/// with a wall-clock limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutableDescriptor {
  pub interpreter: String,
  pub file_path: PathBuf,
  pub timeout: Duration,
  /// Scratch directory the child runs in; also exported as `HOOKWORM_WORKING_DIR`.
  pub working_dir: Option<PathBuf>,
}

impl ExecutableDescriptor {
  pub fn new(interpreter: impl Into<String>, file_path: impl Into<PathBuf>, timeout: Duration) -> Self {
    Self {
      interpreter: interpreter.into(),
      file_path: file_path.into(),
      timeout,
      working_dir: None,
    }
  }

  /// Builds a descriptor from the file's extension, or `None` if no interpreter
  /// is known for it.
  pub fn for_file(file_path: impl Into<PathBuf>, timeout: Duration) -> Option<Self> {
    let file_path = file_path.into();
    let interpreter = interpreter_for(&file_path)?;
    Some(Self::new(interpreter, file_path, timeout))
  }

  pub fn with_working_dir(mut self, working_dir: Option<PathBuf>) -> Self {
    self.working_dir = working_dir;
    self
  }

  /// The handler's file name, used to identify the stage in logs and errors.
  pub fn name(&self) -> String {
    self
      .file_path
      .file_name()
      .map(|n| n.to_string_lossy().into_owned())
      .unwrap_or_else(|| self.file_path.display().to_string())
  }
}
