//! Pipeline execution engine

pub mod compose;
pub mod engine;
pub mod entry;

pub use compose::{branch, parallel, series, Branch, Parallel, Series};
pub use engine::Lineage;
pub use entry::{Pipeline, RecordStream, Standalone};
