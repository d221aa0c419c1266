pub mod config;
pub mod control;
pub mod handler;
pub mod link;

// Re-export key types for easier access from other hookworm modules (and lib.rs)
pub use config::{FlagValue, HandlerConfig, WormFlags};
pub use control::{FailureCause, InvocationResult, InvocationStatus, Verb, EXIT_NOOP};
pub use handler::Handler;
pub use link::NextLink;
