// src/lib.rs

//! Hookworm: an async webhook handler pipeline.
//!
//! Incoming payloads (GitHub pushes, Travis build notifications) are sent through a
//! chain of stages. Most stages are external executables discovered in a "worm
//! directory"; each one:
//!  - is run by the interpreter matching its extension (`.sh` runs under `bash`, etc.),
//!  - is configured once with `<handler> configure`, receiving the config as JSON,
//!  - handles payloads with `<handler> handle <github|travis>`, payload on stdin,
//!  - answers on stdout and signals with its exit code: `0` to continue with its
//!    output, `78` to decline and pass its input through unchanged, anything else
//!    to halt the chain.
//!
//! Built-in stages such as the [`WatchStage`] implement the same [`Handler`] contract
//! and run after the subprocess stages.

pub mod command;
pub mod core;
pub mod error;
pub mod pipeline;
pub mod watch;

// --- Re-exports for the Public API ---

pub use crate::core::config::{FlagValue, HandlerConfig, WormFlags};
pub use crate::core::control::{FailureCause, InvocationResult, InvocationStatus, Verb, EXIT_NOOP};
pub use crate::core::handler::Handler;

pub use crate::command::descriptor::ExecutableDescriptor;

pub use crate::pipeline::builder::PipelineBuilder;
pub use crate::pipeline::definition::Pipeline;
pub use crate::pipeline::stage::PipelineStage;
pub use crate::pipeline::top::TopStage;

pub use crate::watch::{Alert, Alerter, LogAlerter, WatchPolicy, WatchStage};

pub use crate::error::{HookwormError, HookwormResult};

/*
    Request flow:
    1. `PipelineBuilder::new(config).build()` scans the worm directory and links
       top -> handler stages (sorted by file name) -> built-in stages.
    2. Optionally `pipeline.configure_all().await` runs every handshake up front;
       otherwise each stage configures itself on its first request.
    3. `pipeline.handle(verb, payload).await` returns the last stage's output, or the
       error of the stage that halted the chain.
*/
