//! Composition operators: series, branch and parallel
//!
//! Each operator works two ways. Queued inside a running lineage it acts as a
//! [`Handler`] and reshapes that lineage; run on its own through
//! [`Standalone`] it starts fresh root lineages for every input record.

use crate::core::{
    context::Context,
    error::{HandlerFault, PipelineError},
    extensions::Extensions,
    handler::{Handler, HandlerRef, IntoHandlers},
    outcome::{HandlerResult, Outcome},
    record::{changes, deep_merge, Record},
};
use crate::execution::{engine::Lineage, entry::Standalone};
use async_trait::async_trait;
use futures::future::try_join_all;
use std::sync::Arc;
use tracing::debug;

/// Run handlers one after another
#[derive(Clone)]
pub struct Series {
    handlers: Arc<[HandlerRef]>,
}

impl Series {
    pub fn new(handlers: impl IntoHandlers) -> Self {
        Self {
            handlers: handlers.into_handlers().into(),
        }
    }

    pub fn handlers(&self) -> &[HandlerRef] {
        &self.handlers
    }
}

#[async_trait]
impl Handler for Series {
    /// Splice the handlers onto the front of the enclosing queue
    async fn call(&self, _record: &mut Record, ctx: &Context) -> anyhow::Result<HandlerResult> {
        ctx.next(self.handlers.to_vec());
        Ok(Outcome::Continue.into())
    }

    fn name(&self) -> &str {
        "series"
    }
}

#[async_trait]
impl Standalone for Series {
    async fn run_record(
        &self,
        record: Record,
        extensions: &Extensions,
    ) -> Result<Vec<Record>, PipelineError> {
        Lineage::new(record, self.handlers.iter().cloned(), extensions.clone())
            .consume()
            .await
    }
}

/// Fork the record: every handler continues on its own lineage
#[derive(Clone)]
pub struct Branch {
    handlers: Arc<[HandlerRef]>,
}

impl Branch {
    pub fn new(handlers: impl IntoHandlers) -> Self {
        Self {
            handlers: handlers.into_handlers().into(),
        }
    }

    pub fn handlers(&self) -> &[HandlerRef] {
        &self.handlers
    }
}

#[async_trait]
impl Handler for Branch {
    /// The current lineage runs the first handler next; every other handler
    /// gets a new lineage seeded with a copy of the record and the queue as it
    /// stands now.
    async fn call(&self, record: &mut Record, ctx: &Context) -> anyhow::Result<HandlerResult> {
        for handler in self.handlers.iter().skip(1) {
            ctx.fork(record.clone(), handler.clone());
        }
        if let Some(first) = self.handlers.first() {
            ctx.next(first.clone());
        }
        debug!("Branched into {} lineage(s)", self.handlers.len());
        Ok(Outcome::Continue.into())
    }

    fn name(&self) -> &str {
        "branch"
    }
}

#[async_trait]
impl Standalone for Branch {
    async fn run_record(
        &self,
        record: Record,
        extensions: &Extensions,
    ) -> Result<Vec<Record>, PipelineError> {
        let mut output = Vec::new();
        for handler in self.handlers.iter() {
            let lineage = Lineage::new(record.clone(), [handler.clone()], extensions.clone());
            output.extend(lineage.consume().await?);
        }
        Ok(output)
    }
}

/// Run handlers concurrently against the same record.
///
/// Every handler sees the record as it was before the step; none observes
/// another's writes. Once all are done, their effects are applied in handler
/// order: in-place edits (writes and removals) first, then the primary
/// outcome. Only the first element of a sequence result counts; the rest are
/// dropped.
///
/// A [`Context::rebase`] from any handler replaces the record before the
/// edits are applied. Nesting a [`Branch`] inside a parallel step has no
/// defined result.
#[derive(Clone)]
pub struct Parallel {
    handlers: Arc<[HandlerRef]>,
}

impl Parallel {
    pub fn new(handlers: impl IntoHandlers) -> Self {
        Self {
            handlers: handlers.into_handlers().into(),
        }
    }

    pub fn handlers(&self) -> &[HandlerRef] {
        &self.handlers
    }

    /// Invoke all handlers, then fold their effects onto `record`.
    ///
    /// Returns `Abort` as soon as any primary outcome is `Abort` (nothing is
    /// applied), otherwise `Stop` if any handler stopped, else `Continue`.
    async fn fold(&self, record: &mut Record, ctx: &Context) -> anyhow::Result<Outcome> {
        let before = record.clone();
        let mut views: Vec<Record> = self.handlers.iter().map(|_| before.clone()).collect();

        let results = try_join_all(
            self.handlers
                .iter()
                .zip(views.iter_mut())
                .map(|(handler, view)| handler.call(view, ctx)),
        )
        .await?;

        let mut primaries = Vec::with_capacity(results.len());
        for result in results {
            let primary = match result.into_sequence().into_iter().next() {
                Some(eventual) => eventual.resolve().await?,
                None => Outcome::Continue,
            };
            if matches!(primary, Outcome::Abort) {
                debug!("Parallel step aborted its lineage");
                return Ok(Outcome::Abort);
            }
            primaries.push(primary);
        }

        if let Some(rebased) = ctx.take_rebase() {
            *record = rebased;
        }

        let mut stop = false;
        for (view, primary) in views.iter().zip(primaries) {
            changes(&before, view).apply(record);
            match primary {
                Outcome::Merge(partial) => deep_merge(record, partial),
                Outcome::Replace(replacement) => *record = replacement,
                Outcome::Stop => stop = true,
                Outcome::Continue | Outcome::Abort => {}
            }
        }

        Ok(if stop { Outcome::Stop } else { Outcome::Continue })
    }
}

#[async_trait]
impl Handler for Parallel {
    async fn call(&self, record: &mut Record, ctx: &Context) -> anyhow::Result<HandlerResult> {
        Ok(self.fold(record, ctx).await?.into())
    }

    fn name(&self) -> &str {
        "parallel"
    }
}

#[async_trait]
impl Standalone for Parallel {
    async fn run_record(
        &self,
        record: Record,
        extensions: &Extensions,
    ) -> Result<Vec<Record>, PipelineError> {
        let mut lineage = Lineage::new(record, Vec::new(), extensions.clone());
        let outcome = match self.fold(&mut lineage.record, &lineage.context).await {
            Ok(outcome) => outcome,
            Err(cause) => {
                // several handlers ran at once, so none is blamed
                return Err(HandlerFault::new(cause, lineage.record.clone(), None).into());
            }
        };

        match outcome {
            Outcome::Abort => lineage.conclude(false, Vec::new()).await,
            Outcome::Stop => lineage.conclude(true, Vec::new()).await,
            _ => lineage.consume().await,
        }
    }
}

pub fn series(handlers: impl IntoHandlers) -> Series {
    Series::new(handlers)
}

pub fn branch(handlers: impl IntoHandlers) -> Branch {
    Branch::new(handlers)
}

pub fn parallel(handlers: impl IntoHandlers) -> Parallel {
    Parallel::new(handlers)
}

#[doc(hidden)]
#[macro_export]
macro_rules! __handlers {
    ($($handler:expr),* $(,)?) => {{
        #[allow(unused_mut)]
        let mut handlers: ::std::vec::Vec<$crate::HandlerRef> = ::std::vec::Vec::new();
        $( handlers.extend($crate::IntoHandlers::into_handlers($handler)); )*
        handlers
    }};
}

/// Build a [`Series`] from handlers or handler collections
#[macro_export]
macro_rules! series {
    ($($handler:expr),* $(,)?) => {
        $crate::Series::new($crate::__handlers!($($handler),*))
    };
}

/// Build a [`Branch`] from handlers or handler collections
#[macro_export]
macro_rules! branch {
    ($($handler:expr),* $(,)?) => {
        $crate::Branch::new($crate::__handlers!($($handler),*))
    };
}

/// Build a [`Parallel`] from handlers or handler collections
#[macro_export]
macro_rules! parallel {
    ($($handler:expr),* $(,)?) => {
        $crate::Parallel::new($crate::__handlers!($($handler),*))
    };
}
