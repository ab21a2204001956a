//! Core domain models
//!
//! Records, handler outcomes, the per-lineage context and the declarative
//! recipe layer built on top of them.

pub mod condition;
pub mod config;
pub mod context;
pub mod error;
pub mod extensions;
pub mod handler;
pub mod input;
pub mod outcome;
pub mod record;
pub mod step;

pub use config::PipelineConfig;
pub use context::Context;
pub use error::{HandlerFault, PipelineError};
pub use extensions::Extensions;
pub use input::Input;
pub use outcome::{Eventual, HandlerResult, Outcome};
pub use record::Record;
pub use step::Variables;
