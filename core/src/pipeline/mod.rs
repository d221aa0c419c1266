// hookworm/src/pipeline/mod.rs

//! Defines the `Pipeline` arena, its stages, and the builder that discovers handler
//! executables and links them into a chain.

pub mod builder;
pub mod definition;
pub mod stage;
pub mod top;

// Re-export the main Pipeline struct
pub use builder::PipelineBuilder;
pub use definition::Pipeline;
pub use stage::PipelineStage;
pub use top::TopStage;
