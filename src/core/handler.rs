//! Handler trait and closure adapters

use crate::core::{
    context::Context,
    extensions::Extensions,
    outcome::HandlerResult,
    record::Record,
};
use async_trait::async_trait;
use std::borrow::Cow;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

/// A unit of work run against one lineage's record.
///
/// The record may be changed in place; the returned [`HandlerResult`] tells
/// the engine how to continue. `ctx` gives access to the lineage's queue and
/// the shared extensions.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn call(&self, record: &mut Record, ctx: &Context) -> anyhow::Result<HandlerResult>;

    /// Name used in logs and fault reports
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Shared handle to a handler
pub type HandlerRef = Arc<dyn Handler>;

impl fmt::Debug for dyn Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler").field("name", &self.name()).finish()
    }
}

/// Anything that can be flattened into a list of handlers
pub trait IntoHandlers {
    fn into_handlers(self) -> Vec<HandlerRef>;
}

impl<H: Handler + 'static> IntoHandlers for H {
    fn into_handlers(self) -> Vec<HandlerRef> {
        vec![Arc::new(self)]
    }
}

impl IntoHandlers for HandlerRef {
    fn into_handlers(self) -> Vec<HandlerRef> {
        vec![self]
    }
}

impl IntoHandlers for Vec<HandlerRef> {
    fn into_handlers(self) -> Vec<HandlerRef> {
        self
    }
}

impl IntoHandlers for &[HandlerRef] {
    fn into_handlers(self) -> Vec<HandlerRef> {
        self.to_vec()
    }
}

/// Wrap a handler into a [`HandlerRef`]
pub fn handler_ref<H: Handler + 'static>(handler: H) -> HandlerRef {
    Arc::new(handler)
}

/// Handler backed by a synchronous closure with in-place record access
pub struct FnHandler<F, R> {
    name: Cow<'static, str>,
    f: F,
    _result: PhantomData<fn() -> R>,
}

/// Build a handler from a closure over `(&mut Record, &Context)`
///
/// ```
/// use forkline::{handler_fn, Outcome};
///
/// let tag = handler_fn(|record, _ctx| {
///     record.insert("seen".into(), true.into());
///     Ok(Outcome::Continue)
/// });
/// ```
pub fn handler_fn<F, R>(f: F) -> FnHandler<F, R>
where
    F: Fn(&mut Record, &Context) -> anyhow::Result<R> + Send + Sync,
    R: Into<HandlerResult>,
{
    FnHandler {
        name: Cow::Borrowed("fn"),
        f,
        _result: PhantomData,
    }
}

impl<F, R> FnHandler<F, R> {
    pub fn named(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = name.into();
        self
    }
}

#[async_trait]
impl<F, R> Handler for FnHandler<F, R>
where
    F: Fn(&mut Record, &Context) -> anyhow::Result<R> + Send + Sync,
    R: Into<HandlerResult>,
{
    async fn call(&self, record: &mut Record, ctx: &Context) -> anyhow::Result<HandlerResult> {
        (self.f)(record, ctx).map(Into::into)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Handler backed by an async closure.
///
/// The closure receives its own copy of the record plus the shared extensions,
/// so changes have to be reported through the returned outcome.
pub struct AsyncFnHandler<F, Fut, R> {
    name: Cow<'static, str>,
    f: F,
    _future: PhantomData<fn() -> (Fut, R)>,
}

/// Build a handler from an async closure over `(Record, Extensions)`
pub fn handler_async<F, Fut, R>(f: F) -> AsyncFnHandler<F, Fut, R>
where
    F: Fn(Record, Extensions) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<R>> + Send,
    R: Into<HandlerResult>,
{
    AsyncFnHandler {
        name: Cow::Borrowed("async fn"),
        f,
        _future: PhantomData,
    }
}

impl<F, Fut, R> AsyncFnHandler<F, Fut, R> {
    pub fn named(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = name.into();
        self
    }
}

#[async_trait]
impl<F, Fut, R> Handler for AsyncFnHandler<F, Fut, R>
where
    F: Fn(Record, Extensions) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<R>> + Send,
    R: Into<HandlerResult>,
{
    async fn call(&self, record: &mut Record, ctx: &Context) -> anyhow::Result<HandlerResult> {
        let result = (self.f)(record.clone(), ctx.extensions().clone()).await?;
        Ok(result.into())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
