//! Inputs accepted by entry points

use crate::core::record::Record;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use serde_json::Value;
use std::fmt;

/// One record, a batch of records, or an asynchronous source of records.
///
/// Values are validated one by one as they are pulled, so a batch fails at
/// its first non-object item.
pub enum Input {
    Single(Value),
    Batch(Vec<Value>),
    Stream(BoxStream<'static, Value>),
}

impl Input {
    pub fn from_stream<S>(source: S) -> Self
    where
        S: Stream<Item = Value> + Send + 'static,
    {
        Input::Stream(source.boxed())
    }

    pub(crate) fn into_stream(self) -> BoxStream<'static, Value> {
        match self {
            Input::Single(value) => stream::once(async move { value }).boxed(),
            Input::Batch(values) => stream::iter(values).boxed(),
            Input::Stream(source) => source,
        }
    }
}

impl From<Value> for Input {
    fn from(value: Value) -> Self {
        match value {
            Value::Array(values) => Input::Batch(values),
            other => Input::Single(other),
        }
    }
}

impl From<Record> for Input {
    fn from(record: Record) -> Self {
        Input::Single(Value::Object(record))
    }
}

impl From<&Record> for Input {
    fn from(record: &Record) -> Self {
        Input::Single(Value::Object(record.clone()))
    }
}

impl From<Vec<Value>> for Input {
    fn from(values: Vec<Value>) -> Self {
        Input::Batch(values)
    }
}

impl From<Vec<Record>> for Input {
    fn from(records: Vec<Record>) -> Self {
        Input::Batch(records.into_iter().map(Value::Object).collect())
    }
}

impl fmt::Debug for Input {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Input::Single(value) => f.debug_tuple("Single").field(value).finish(),
            Input::Batch(values) => f.debug_tuple("Batch").field(&values.len()).finish(),
            Input::Stream(_) => f.write_str("Stream"),
        }
    }
}
