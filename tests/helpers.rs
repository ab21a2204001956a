//! Test utility functions for forkline
#![allow(dead_code)]

use forkline::{
    handler_fn, handler_ref, HandlerRef, Input, PipelineError, Record, Standalone,
};
use futures::StreamExt;
use serde_json::Value;

/// Build a record from a JSON object literal
pub fn record(value: Value) -> Record {
    value.as_object().cloned().expect("fixture must be a JSON object")
}

/// Handler that writes one field in place
pub fn set(field: &'static str, value: Value) -> HandlerRef {
    handler_ref(
        handler_fn(move |rec, _| {
            rec.insert(field.to_string(), value.clone());
            Ok(())
        })
        .named(format!("set {}", field)),
    )
}

/// Handler that always returns the same value as its result
pub fn returns(value: Value) -> HandlerRef {
    handler_ref(handler_fn(move |_, _| Ok(value.clone())))
}

/// Handler that appends `suffix` to a string field in place
pub fn append(field: &'static str, suffix: &'static str) -> HandlerRef {
    handler_ref(handler_fn(move |rec, _| {
        let current = rec
            .get(field)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        rec.insert(field.to_string(), Value::String(current + suffix));
        Ok(())
    }))
}

/// Handler that fails with `message`
pub fn failing(name: &'static str, message: &'static str) -> HandlerRef {
    handler_ref(handler_fn(move |_, _| Err::<(), _>(anyhow::anyhow!(message))).named(name))
}

/// Run an entry point and return its outputs as JSON values
pub async fn outputs<S: Standalone>(entry: &S, input: impl Into<Input> + Send) -> Vec<Value> {
    entry
        .run(input)
        .await
        .expect("run should succeed")
        .into_iter()
        .map(Value::Object)
        .collect()
}

/// Drain a stream, keeping every item
pub async fn drain_stream<S>(entry: &S, input: impl Into<Input>) -> Vec<Result<Value, PipelineError>>
where
    S: Standalone + Clone + 'static,
{
    entry
        .stream(input)
        .map(|item| item.map(Value::Object))
        .collect()
        .await
}
