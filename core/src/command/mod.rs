// hookworm/src/command/mod.rs

//! Launching handler executables: the descriptor saying how to run one, and the
//! invoker that runs it under the handler protocol.

pub mod descriptor;
pub mod invoker;

pub use descriptor::{interpreter_for, ExecutableDescriptor};
