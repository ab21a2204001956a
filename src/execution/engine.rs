//! Branch-tree engine - drains one lineage's queue and collects its outputs

use crate::core::{
    context::Context,
    error::{HandlerFault, PipelineError},
    extensions::Extensions,
    handler::HandlerRef,
    outcome::Outcome,
    record::{deep_merge, Record},
};
use futures::future::{BoxFuture, FutureExt};
use tracing::{debug, warn};

/// One execution path: a record, its pending handlers and the lineages
/// spawned from it
pub struct Lineage {
    pub(crate) record: Record,
    pub(crate) context: Context,
}

impl Lineage {
    pub fn new(
        record: Record,
        queue: impl IntoIterator<Item = HandlerRef>,
        extensions: Extensions,
    ) -> Self {
        Self {
            record,
            context: Context::new(queue, extensions),
        }
    }

    /// Run the queue to completion, then every child, depth first.
    ///
    /// Outputs are ordered: snapshots taken by `Stop` secondary outcomes,
    /// this lineage's own record (unless it aborted), then each child's
    /// outputs, newest child first.
    pub fn consume(self) -> BoxFuture<'static, Result<Vec<Record>, PipelineError>> {
        async move {
            let mut lineage = self;
            let mut output = Vec::new();
            let produced = lineage.drain(&mut output).await?;
            lineage.conclude(produced, output).await
        }
        .boxed()
    }

    /// Push this lineage's own record (if `produced`) and consume its children
    pub(crate) async fn conclude(
        self,
        produced: bool,
        mut output: Vec<Record>,
    ) -> Result<Vec<Record>, PipelineError> {
        let Lineage { record, context } = self;
        if produced {
            output.push(record);
        } else {
            debug!("Lineage terminated without output");
        }

        let children = context.take_children();
        if !children.is_empty() {
            debug!("Consuming {} child lineage(s)", children.len());
        }
        for child in children {
            output.extend(child.consume().await?);
        }

        Ok(output)
    }

    /// Run queued handlers until the queue empties or a handler ends the
    /// lineage. Returns whether the lineage still produces its record.
    async fn drain(&mut self, output: &mut Vec<Record>) -> Result<bool, PipelineError> {
        while let Some(handler) = self.context.dequeue() {
            // children spawned by secondary outcomes continue from here
            let remaining = self.context.queued();

            debug!("Invoking handler: {}", handler.name());
            let result = match handler.call(&mut self.record, &self.context).await {
                Ok(result) => result,
                Err(cause) => return Err(self.fault(cause, &handler)),
            };

            if let Some(record) = self.context.take_rebase() {
                debug!("Handler {} rebased the record", handler.name());
                self.record = record;
            }

            let mut outcomes = result.into_sequence().into_iter();
            let Some(primary) = outcomes.next() else {
                return Ok(false);
            };
            let primary = match primary.resolve().await {
                Ok(outcome) => outcome,
                Err(cause) => return Err(self.fault(cause, &handler)),
            };

            for secondary in outcomes {
                let outcome = match secondary.resolve().await {
                    Ok(outcome) => outcome,
                    Err(cause) => return Err(self.fault(cause, &handler)),
                };
                self.spawn_secondary(outcome, &remaining, output);
            }

            match primary {
                Outcome::Merge(partial) => deep_merge(&mut self.record, partial),
                Outcome::Replace(record) => self.record = record,
                Outcome::Stop => {
                    debug!("Handler {} stopped its lineage", handler.name());
                    return Ok(true);
                }
                Outcome::Abort => {
                    debug!("Handler {} aborted its lineage", handler.name());
                    return Ok(false);
                }
                Outcome::Continue => {}
            }
        }

        Ok(true)
    }

    fn spawn_secondary(&self, outcome: Outcome, queue: &[HandlerRef], output: &mut Vec<Record>) {
        match outcome {
            Outcome::Abort => {}
            Outcome::Stop => output.push(self.record.clone()),
            Outcome::Merge(partial) => {
                let mut record = self.record.clone();
                deep_merge(&mut record, partial);
                self.context.spawn(record, queue.to_vec());
            }
            Outcome::Replace(record) => self.context.spawn(record, queue.to_vec()),
            Outcome::Continue => self.context.spawn(self.record.clone(), queue.to_vec()),
        }
    }

    fn fault(&self, cause: anyhow::Error, handler: &HandlerRef) -> PipelineError {
        warn!("Handler {} failed: {:#}", handler.name(), cause);
        HandlerFault::new(cause, self.record.clone(), Some(handler.clone())).into()
    }

    #[cfg(test)]
    pub(crate) fn queue_names(&self) -> Vec<String> {
        self.context
            .queued()
            .iter()
            .map(|h| h.name().to_string())
            .collect()
    }
}
