//! Error types for pipeline runs

use crate::core::{handler::HandlerRef, record::Record};
use std::fmt;
use thiserror::Error;

/// Error types surfaced by entry points
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Only object inputs are allowed, got '{found}'")]
    InvalidInput { found: &'static str },

    #[error(transparent)]
    Handler(#[from] HandlerFault),
}

impl PipelineError {
    /// The handler fault, if this is one
    pub fn as_fault(&self) -> Option<&HandlerFault> {
        match self {
            PipelineError::Handler(fault) => Some(fault),
            PipelineError::InvalidInput { .. } => None,
        }
    }
}

/// A handler raised while running.
///
/// Carries the record as it stood when the handler failed and, when a single
/// handler can be blamed, that handler.
#[derive(Debug, Error)]
pub struct HandlerFault {
    #[source]
    pub cause: anyhow::Error,
    pub record: Record,
    pub handler: Option<HandlerRef>,
}

impl HandlerFault {
    pub fn new(cause: anyhow::Error, record: Record, handler: Option<HandlerRef>) -> Self {
        Self {
            cause,
            record,
            handler,
        }
    }

    /// Name of the failing handler, if one is attributed
    pub fn handler_name(&self) -> Option<&str> {
        self.handler.as_ref().map(|h| h.name())
    }
}

impl fmt::Display for HandlerFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.handler_name() {
            Some(name) => write!(f, "Handler '{}' failed: {}", name, self.cause),
            None => write!(f, "Handler failed: {}", self.cause),
        }
    }
}
