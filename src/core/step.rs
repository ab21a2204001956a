//! Built-in recipe steps

use crate::core::{
    condition::FieldMatch,
    context::Context,
    handler::{Handler, HandlerRef},
    outcome::{HandlerResult, Outcome},
    record::{field, remove_field, Record},
};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

/// Template variables, looked up from the extensions at run time
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Variables(pub HashMap<String, String>);

impl Variables {
    pub fn new(values: HashMap<String, String>) -> Self {
        Self(values)
    }

    /// Replace variables in the form {{ variable_name }}
    pub fn render(&self, template: &str) -> String {
        let mut rendered = template.to_string();
        for (key, value) in &self.0 {
            let placeholder = format!("{{{{ {} }}}}", key);
            rendered = rendered.replace(&placeholder, value);
        }
        rendered
    }

    /// Render every string inside a JSON value
    pub fn render_value(&self, value: &Value) -> Value {
        match value {
            Value::String(s) => Value::String(self.render(s)),
            Value::Array(items) => Value::Array(items.iter().map(|v| self.render_value(v)).collect()),
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), self.render_value(v)))
                    .collect(),
            ),
            other => other.clone(),
        }
    }
}

/// What a step does to the record it receives
#[derive(Debug, Clone)]
pub enum StepAction {
    /// Merge fields; string values are rendered with [`Variables`]
    Set(Record),
    /// Delete dotted field paths in place
    Remove(Vec<String>),
    /// Swap the record for a fixed one
    Replace(Record),
    /// Drop the lineage unless the condition holds
    Filter(FieldMatch),
    /// Finish the lineage early when the condition holds
    FinishIf(FieldMatch),
    /// One lineage per element of an array field
    Split { field: String, into: Option<String> },
    /// A composite built from nested steps
    Nested(HandlerRef),
}

/// A named built-in step
#[derive(Debug, Clone)]
pub struct Step {
    pub name: String,
    pub action: StepAction,
}

impl Step {
    pub fn new(name: impl Into<String>, action: StepAction) -> Self {
        Self {
            name: name.into(),
            action,
        }
    }

    fn split(record: &Record, path: &str, into: Option<&str>) -> HandlerResult {
        let Some(Value::Array(items)) = field(record, path) else {
            return Outcome::Continue.into();
        };
        let target = into.unwrap_or(path);
        items
            .iter()
            .map(|item| Outcome::Merge(nest(target, item.clone())))
            .collect::<Vec<_>>()
            .into()
    }
}

#[async_trait]
impl Handler for Step {
    async fn call(&self, record: &mut Record, ctx: &Context) -> anyhow::Result<HandlerResult> {
        let result = match &self.action {
            StepAction::Set(values) => {
                let partial = match ctx.extensions().get::<Variables>() {
                    Some(vars) => values
                        .iter()
                        .map(|(k, v)| (k.clone(), vars.render_value(v)))
                        .collect(),
                    None => values.clone(),
                };
                Outcome::Merge(partial).into()
            }
            StepAction::Remove(paths) => {
                for path in paths {
                    remove_field(record, path);
                }
                Outcome::Continue.into()
            }
            StepAction::Replace(replacement) => ctx.detached(replacement.clone()).into(),
            StepAction::Filter(rule) => {
                if rule.matches(record) {
                    Outcome::Continue.into()
                } else {
                    debug!("Step {} filtered out a record", self.name);
                    Outcome::Abort.into()
                }
            }
            StepAction::FinishIf(rule) => {
                if rule.matches(record) {
                    Outcome::Stop.into()
                } else {
                    Outcome::Continue.into()
                }
            }
            StepAction::Split { field, into } => Self::split(record, field, into.as_deref()),
            StepAction::Nested(inner) => return inner.call(record, ctx).await,
        };
        Ok(result)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Build `{ a: { b: value } }` from the path `a.b`
fn nest(path: &str, value: Value) -> Record {
    let mut segments = path.rsplit('.');
    let mut current = value;
    let mut record = Record::new();
    if let Some(last) = segments.next() {
        record.insert(last.to_string(), current);
    }
    for segment in segments {
        current = Value::Object(std::mem::take(&mut record));
        record.insert(segment.to_string(), current);
    }
    record
}
