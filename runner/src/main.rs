// runner/src/main.rs

mod config;

use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use hookworm::{LogAlerter, PipelineBuilder, WatchPolicy, WatchStage};
use tempfile::TempDir;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::config::Cli;

#[tokio::main]
async fn main() -> ExitCode {
  dotenvy::dotenv().ok(); // Load .env file if present
  let cli = Cli::parse();

  // Logs go to stderr; stdout carries the pipeline's output.
  let default_level = if cli.debug { Level::DEBUG } else { Level::INFO };
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(EnvFilter::builder().with_default_directive(default_level.into()).from_env_lossy())
    .init();

  match run(cli).await {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      tracing::error!(error = %format!("{e:#}"), "hookworm failed.");
      ExitCode::FAILURE
    }
  }
}

async fn run(cli: Cli) -> Result<()> {
  // Keep the guard alive for the whole run so the scratch directory outlives every handler.
  let (working_dir, _scratch): (PathBuf, Option<TempDir>) = match &cli.working_dir {
    Some(dir) => {
      config::ensure_writable(dir)?;
      (dir.clone(), None)
    }
    None => {
      let scratch = tempfile::Builder::new()
        .prefix("hookworm-working-dir-")
        .tempdir()
        .context("Failed to create a temporary working directory")?;
      (scratch.path().to_path_buf(), Some(scratch))
    }
  };
  tracing::debug!(working_dir = %working_dir.display(), "Using working directory.");

  let handler_config = cli.handler_config(&working_dir);
  let mut builder = PipelineBuilder::new(handler_config);
  if cli.watching() {
    let policy = WatchPolicy::new(&cli.watch_branches, &cli.watch_paths)?;
    let watch = WatchStage::new(policy, Arc::new(LogAlerter)).with_hostname(config::hostname());
    builder = builder.with_stage(Arc::new(watch));
  }
  let pipeline = builder.build()?;

  if cli.list {
    let mut stdout = std::io::stdout().lock();
    for name in pipeline.stage_names() {
      writeln!(stdout, "{name}")?;
    }
    return Ok(());
  }

  let Some(verb) = cli.verb else {
    bail!("A payload verb (github or travis) is required");
  };

  let payload = read_payload(cli.payload.as_ref())?;
  if payload.is_empty() {
    bail!("Empty payload");
  }

  let failed = pipeline.configure_all().await;
  if failed > 0 {
    tracing::warn!(failed, "Some handlers failed to configure; they stay in the pipeline.");
  }

  let output = pipeline
    .handle(verb, payload)
    .await
    .with_context(|| format!("Pipeline failed for {verb} payload"))?;

  let mut stdout = std::io::stdout().lock();
  stdout.write_all(&output)?;
  stdout.flush()?;
  Ok(())
}

fn read_payload(path: Option<&PathBuf>) -> Result<Vec<u8>> {
  match path {
    Some(path) => std::fs::read(path).with_context(|| format!("Failed to read payload from '{}'", path.display())),
    None => {
      let mut buf = Vec::new();
      std::io::stdin()
        .lock()
        .read_to_end(&mut buf)
        .context("Failed to read payload from stdin")?;
      Ok(buf)
    }
  }
}
