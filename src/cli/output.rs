//! CLI output formatting

use crate::core::{error::PipelineError, record::Record};
use console::Emoji;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");

/// One output record as a JSON line
pub fn format_record(record: &Record) -> serde_json::Result<String> {
    serde_json::to_string(record)
}

/// Describe a failed run, including the record a handler failed on
pub fn format_fault(err: &PipelineError) -> String {
    match err.as_fault() {
        Some(fault) => {
            let step = fault.handler_name().unwrap_or("parallel step");
            let record = serde_json::to_string(&fault.record).unwrap_or_default();
            format!(
                "  {} {}: {:#}\n  {} {}",
                style("step").dim(),
                style(step).red(),
                fault.cause,
                style("record").dim(),
                style(format_output(&record, 200)).dim()
            )
        }
        None => format!("  {}", style(err).red()),
    }
}

/// Truncate long output to `max_chars` characters
pub fn format_output(output: &str, max_chars: usize) -> String {
    let total = output.chars().count();
    if total <= max_chars {
        output.to_string()
    } else {
        let truncated: String = output.chars().take(max_chars).collect();
        format!("{}... ({} more chars)", truncated, total - max_chars)
    }
}
