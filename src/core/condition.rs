//! Field conditions used by recipe steps

use crate::core::record::{field, Record};
use regex::Regex;
use serde_json::Value;

/// Pattern for matching a field's text (not serializable due to Regex)
#[derive(Debug, Clone)]
pub enum ConditionPattern {
    /// Simple string contains match
    Simple(String),
    /// Regular expression match
    Regex(Regex),
}

impl ConditionPattern {
    /// Compile a pattern; an invalid regex falls back to a plain substring
    pub fn new(pattern: &str, use_regex: bool) -> Self {
        if use_regex {
            match Regex::new(pattern) {
                Ok(regex) => ConditionPattern::Regex(regex),
                Err(_) => ConditionPattern::Simple(pattern.to_string()),
            }
        } else {
            ConditionPattern::Simple(pattern.to_string())
        }
    }

    /// Check if the pattern matches the given text
    pub fn matches(&self, text: &str) -> bool {
        match self {
            ConditionPattern::Simple(pattern) => text.contains(pattern),
            ConditionPattern::Regex(regex) => regex.is_match(text),
        }
    }
}

/// A pattern tested against one (dotted) field of a record
#[derive(Debug, Clone)]
pub struct FieldMatch {
    pub field: String,
    pub pattern: ConditionPattern,
}

impl FieldMatch {
    pub fn new(field: impl Into<String>, pattern: ConditionPattern) -> Self {
        Self {
            field: field.into(),
            pattern,
        }
    }

    /// Strings are matched as-is, other values by their JSON text.
    /// A missing field never matches.
    pub fn matches(&self, record: &Record) -> bool {
        match field(record, &self.field) {
            None => false,
            Some(Value::String(text)) => self.pattern.matches(text),
            Some(other) => self.pattern.matches(&other.to_string()),
        }
    }
}
