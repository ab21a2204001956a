//! Handler outcomes
//!
//! A handler reports what should happen to its lineage through an
//! [`Outcome`]. Returning several outcomes at once ([`HandlerResult::Sequence`])
//! forks the lineage: the first element applies to the current lineage, each
//! further element spawns a new one.

use crate::core::record::Record;
use futures::future::BoxFuture;
use serde_json::Value;
use std::fmt;
use std::future::Future;

/// What a handler asks the engine to do with its lineage
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Keep going; the record was changed in place or not at all
    Continue,
    /// Deep-merge the partial record onto the current one
    Merge(Record),
    /// Use this record as-is, discarding the current one
    Replace(Record),
    /// End the lineage now, producing its current record
    Stop,
    /// End the lineage now without producing anything
    Abort,
}

impl From<bool> for Outcome {
    fn from(finished: bool) -> Self {
        if finished {
            Outcome::Stop
        } else {
            Outcome::Abort
        }
    }
}

impl From<()> for Outcome {
    fn from(_: ()) -> Self {
        Outcome::Continue
    }
}

impl From<Record> for Outcome {
    fn from(partial: Record) -> Self {
        Outcome::Merge(partial)
    }
}

impl From<Value> for Outcome {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(partial) => Outcome::Merge(partial),
            Value::Bool(finished) => finished.into(),
            _ => Outcome::Continue,
        }
    }
}

/// An outcome that may still be computing
pub enum Eventual {
    Ready(Outcome),
    Pending(BoxFuture<'static, anyhow::Result<Outcome>>),
}

impl Eventual {
    /// Wrap a future resolving to an outcome
    pub fn pending<F>(future: F) -> Self
    where
        F: Future<Output = anyhow::Result<Outcome>> + Send + 'static,
    {
        Eventual::Pending(Box::pin(future))
    }

    pub async fn resolve(self) -> anyhow::Result<Outcome> {
        match self {
            Eventual::Ready(outcome) => Ok(outcome),
            Eventual::Pending(future) => future.await,
        }
    }
}

impl fmt::Debug for Eventual {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Eventual::Ready(outcome) => f.debug_tuple("Ready").field(outcome).finish(),
            Eventual::Pending(_) => f.write_str("Pending"),
        }
    }
}

impl From<Outcome> for Eventual {
    fn from(outcome: Outcome) -> Self {
        Eventual::Ready(outcome)
    }
}

impl From<bool> for Eventual {
    fn from(finished: bool) -> Self {
        Eventual::Ready(finished.into())
    }
}

impl From<Record> for Eventual {
    fn from(partial: Record) -> Self {
        Eventual::Ready(Outcome::Merge(partial))
    }
}

impl From<Value> for Eventual {
    fn from(value: Value) -> Self {
        Eventual::Ready(value.into())
    }
}

/// Everything a handler can return
#[derive(Debug)]
pub enum HandlerResult {
    Single(Outcome),
    /// Primary outcome first, then one new lineage per further element.
    /// An empty sequence ends the lineage without output.
    Sequence(Vec<Eventual>),
}

impl HandlerResult {
    /// The outcomes as a sequence, a single outcome becoming a one-element one
    pub fn into_sequence(self) -> Vec<Eventual> {
        match self {
            HandlerResult::Single(outcome) => vec![Eventual::Ready(outcome)],
            HandlerResult::Sequence(outcomes) => outcomes,
        }
    }
}

impl From<Outcome> for HandlerResult {
    fn from(outcome: Outcome) -> Self {
        HandlerResult::Single(outcome)
    }
}

impl From<bool> for HandlerResult {
    fn from(finished: bool) -> Self {
        HandlerResult::Single(finished.into())
    }
}

impl From<()> for HandlerResult {
    fn from(_: ()) -> Self {
        HandlerResult::Single(Outcome::Continue)
    }
}

impl From<Record> for HandlerResult {
    fn from(partial: Record) -> Self {
        HandlerResult::Single(Outcome::Merge(partial))
    }
}

impl From<Value> for HandlerResult {
    fn from(value: Value) -> Self {
        match value {
            Value::Array(items) => {
                HandlerResult::Sequence(items.into_iter().map(Eventual::from).collect())
            }
            other => HandlerResult::Single(other.into()),
        }
    }
}

impl From<Vec<Outcome>> for HandlerResult {
    fn from(outcomes: Vec<Outcome>) -> Self {
        HandlerResult::Sequence(outcomes.into_iter().map(Eventual::Ready).collect())
    }
}

impl From<Vec<Eventual>> for HandlerResult {
    fn from(outcomes: Vec<Eventual>) -> Self {
        HandlerResult::Sequence(outcomes)
    }
}
