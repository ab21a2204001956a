//! forkline - branching record pipelines
//!
//! Handlers transform JSON records one at a time. Composed with [`series`],
//! [`branch`] and [`parallel`], a single input record can fan out into many
//! independent lineages, each producing its own output.

pub mod cli;
pub mod core;
pub mod execution;

// Re-export commonly used types
pub use crate::core::{
    Context, Eventual, Extensions, HandlerFault, HandlerResult, Input, Outcome, PipelineConfig,
    PipelineError, Record, Variables,
};
pub use crate::core::handler::{
    handler_async, handler_fn, handler_ref, Handler, HandlerRef, IntoHandlers,
};
pub use execution::{branch, parallel, series, Branch, Parallel, Pipeline, RecordStream, Series, Standalone};
