// hookworm/src/watch/mod.rs

//! The built-in watch stage: alerts when pushes to watched branches touch watched
//! paths.

pub mod alert;
pub mod push_event;
pub mod stage;

pub use alert::{Alert, Alerter, LogAlerter};
pub use push_event::PushEvent;
pub use stage::{Verdict, WatchPolicy, WatchStage};
