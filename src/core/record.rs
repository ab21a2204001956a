//! Record model and the clone/merge primitives the engine relies on

use crate::core::error::PipelineError;
use serde_json::{Map, Value};

/// A schema-free key-value record
pub type Record = Map<String, Value>;

/// Keys that merge never writes, whatever the source holds
const GUARDED_KEYS: [&str; 3] = ["__proto__", "constructor", "prototype"];

/// Accept a value as a record, rejecting anything that is not an object
pub fn into_record(value: Value) -> Result<Record, PipelineError> {
    match value {
        Value::Object(record) => Ok(record),
        other => Err(PipelineError::InvalidInput {
            found: type_name(&other),
        }),
    }
}

/// JSON type name of a value, as reported in input validation faults
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Recursively merge `source` into `target`.
///
/// Object-valued fields present on both sides are merged field by field;
/// every other source field overwrites the target's. Fields the source
/// doesn't mention are left alone.
pub fn deep_merge(target: &mut Record, source: Record) {
    for (key, value) in source {
        if GUARDED_KEYS.contains(&key.as_str()) {
            continue;
        }
        match value {
            Value::Object(incoming) => match target.get_mut(&key) {
                Some(Value::Object(existing)) => deep_merge(existing, incoming),
                _ => {
                    target.insert(key, Value::Object(incoming));
                }
            },
            other => {
                target.insert(key, other);
            }
        }
    }
}

/// In-place edits one copy of a record made relative to another
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Changes {
    removed: Vec<String>,
    written: Record,
    nested: Vec<(String, Changes)>,
}

impl Changes {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.written.is_empty() && self.nested.is_empty()
    }

    /// Replay the edits onto `target`: removals, then overwrites, then
    /// nested objects field by field.
    pub fn apply(self, target: &mut Record) {
        for key in self.removed {
            target.remove(&key);
        }
        for (key, value) in self.written {
            target.insert(key, value);
        }
        for (key, nested) in self.nested {
            match target.get_mut(&key) {
                Some(Value::Object(existing)) => nested.apply(existing),
                _ => {
                    let mut fresh = Record::new();
                    nested.apply(&mut fresh);
                    target.insert(key, Value::Object(fresh));
                }
            }
        }
    }
}

/// Diff `after` against `before`. Objects present on both sides are
/// compared field by field, so removals inside them are kept too.
pub fn changes(before: &Record, after: &Record) -> Changes {
    let mut delta = Changes::default();
    for key in before.keys() {
        if !after.contains_key(key) {
            delta.removed.push(key.clone());
        }
    }
    for (key, value) in after {
        match (before.get(key), value) {
            (Some(old), new) if old == new => {}
            (Some(Value::Object(old)), Value::Object(new)) => {
                delta.nested.push((key.clone(), changes(old, new)));
            }
            _ => {
                delta.written.insert(key.clone(), value.clone());
            }
        }
    }
    delta
}

/// Look up a dotted field path (`user.email`)
pub fn field<'a>(record: &'a Record, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let first = segments.next()?;
    let mut current = record.get(first)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Remove a dotted field path, returning the removed value
pub fn remove_field(record: &mut Record, path: &str) -> Option<Value> {
    match path.split_once('.') {
        None => record.remove(path),
        Some((head, rest)) => match record.get_mut(head) {
            Some(Value::Object(nested)) => remove_field(nested, rest),
            _ => None,
        },
    }
}
