// core/examples/worm_dir_pipeline.rs

use std::sync::Arc;

use hookworm::{HandlerConfig, LogAlerter, PipelineBuilder, WatchPolicy, WatchStage};
use tracing::info;

// 1. A handler script: uppercases github payloads and declines travis ones.
const SHOUT_HANDLER: &str = r#"#!/usr/bin/env bash
case "$1" in
  configure) cat > /dev/null ;;
  handle)
    if [ "$2" = "travis" ]; then exit 78; fi
    tr '[:lower:]' '[:upper:]'
    ;;
esac
"#;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();

  info!("--- Worm Directory Pipeline Example ---");

  // 2. Lay out a worm directory. Dot-files are ignored; the rest run in name order.
  let worm_dir = tempfile::tempdir()?;
  std::fs::write(worm_dir.path().join("00-shout.sh"), SHOUT_HANDLER)?;
  std::fs::write(worm_dir.path().join(".disabled.sh"), "exit 1")?;

  let config = HandlerConfig {
    debug: true,
    worm_dir: Some(worm_dir.path().to_path_buf()),
    worm_timeout: 5,
    ..HandlerConfig::default()
  };

  // 3. Build the chain, with a watch stage after the handlers.
  let watch = WatchStage::new(WatchPolicy::new(["^master$"], ["^docs/"])?, Arc::new(LogAlerter));
  let pipeline = PipelineBuilder::new(config).with_stage(Arc::new(watch)).build()?;
  info!(stages = ?pipeline.stage_names(), "Pipeline ready.");

  // 4. Send payloads through.
  let github = br#"{"ref":"refs/heads/master","head_commit":{"message":"hello"}}"#.to_vec();
  let out = pipeline.handle_github(github).await?;
  info!("github -> {}", String::from_utf8_lossy(&out));

  let travis = br#"{"state":"passed"}"#.to_vec();
  let out = pipeline.handle_travis(travis).await?;
  info!("travis -> {}", String::from_utf8_lossy(&out));

  Ok(())
}
