//! Standalone entry points: run a pipeline over inputs, eagerly or lazily

use crate::core::{
    error::PipelineError,
    extensions::Extensions,
    handler::{HandlerRef, IntoHandlers},
    input::Input,
    record::{into_record, Record},
};
use crate::execution::engine::Lineage;
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use std::sync::Arc;
use tracing::{debug, error, info};
use uuid::Uuid;

/// Output of [`Standalone::stream`]
pub type RecordStream = BoxStream<'static, Result<Record, PipelineError>>;

/// Something that turns input records into output records on its own.
///
/// Implementors only say how one validated record is processed; batching,
/// validation and streaming come for free.
#[async_trait]
pub trait Standalone: Send + Sync {
    /// Process one input record through fresh root lineages
    async fn run_record(
        &self,
        record: Record,
        extensions: &Extensions,
    ) -> Result<Vec<Record>, PipelineError>;

    /// Extensions shared by every record of one call
    fn extensions(&self) -> Extensions {
        Extensions::new()
    }

    /// Process every input record and collect all outputs in order.
    ///
    /// Stops at the first invalid input or handler fault.
    async fn run<I>(&self, input: I) -> Result<Vec<Record>, PipelineError>
    where
        I: Into<Input> + Send,
    {
        let run_id = Uuid::new_v4();
        let extensions = self.extensions();
        let mut source = input.into().into_stream();
        let mut output = Vec::new();
        let mut consumed = 0usize;

        info!("Starting run {}", run_id);
        while let Some(value) = source.next().await {
            let record = into_record(value)?;
            consumed += 1;
            output.extend(self.run_record(record, &extensions).await?);
        }
        info!(
            "Run {} processed {} record(s) into {} output(s)",
            run_id,
            consumed,
            output.len()
        );

        Ok(output)
    }

    /// Process inputs lazily.
    ///
    /// Each pull processes input records until one yields output, so records
    /// that produce nothing never surface as empty reads. The stream ends
    /// when the input is exhausted, or right after yielding an error.
    fn stream<I>(&self, input: I) -> RecordStream
    where
        Self: Clone + Sized + 'static,
        I: Into<Input>,
    {
        let run_id = Uuid::new_v4();
        let entry = self.clone();
        let extensions = self.extensions();
        let source = input.into().into_stream();
        debug!("Opening stream {}", run_id);

        stream::unfold(Some((source, entry, extensions)), move |state| async move {
            let Some((mut source, entry, extensions)) = state else {
                return None;
            };

            loop {
                let Some(value) = source.next().await else {
                    debug!("Stream {} exhausted", run_id);
                    return None;
                };

                let processed = match into_record(value) {
                    Ok(record) => entry.run_record(record, &extensions).await,
                    Err(err) => Err(err),
                };

                match processed {
                    Ok(records) if records.is_empty() => continue,
                    Ok(records) => {
                        let chunk: Vec<_> = records.into_iter().map(Ok).collect();
                        return Some((chunk, Some((source, entry, extensions))));
                    }
                    Err(err) => {
                        error!("Stream {} failed: {}", run_id, err);
                        return Some((vec![Err(err)], None));
                    }
                }
            }
        })
        .flat_map(stream::iter)
        .boxed()
    }
}

/// A handler (or handlers) wrapped as a standalone pipeline.
///
/// Every input record starts one root lineage whose queue holds the wrapped
/// handlers.
#[derive(Clone)]
pub struct Pipeline {
    handlers: Arc<[HandlerRef]>,
    extensions: Option<Extensions>,
}

impl Pipeline {
    /// Each call to `run` or `stream` gets its own fresh extensions
    pub fn new(handlers: impl IntoHandlers) -> Self {
        Self {
            handlers: handlers.into_handlers().into(),
            extensions: None,
        }
    }

    /// Every call shares the given extensions
    pub fn with_extensions(handlers: impl IntoHandlers, extensions: Extensions) -> Self {
        Self {
            handlers: handlers.into_handlers().into(),
            extensions: Some(extensions),
        }
    }
}

#[async_trait]
impl Standalone for Pipeline {
    async fn run_record(
        &self,
        record: Record,
        extensions: &Extensions,
    ) -> Result<Vec<Record>, PipelineError> {
        Lineage::new(record, self.handlers.iter().cloned(), extensions.clone())
            .consume()
            .await
    }

    fn extensions(&self) -> Extensions {
        self.extensions.clone().unwrap_or_default()
    }
}
