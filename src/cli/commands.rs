//! CLI command definitions

use anyhow::{Context, Result};
use clap::Args;
use serde_json::Value;

/// Run a recipe
#[derive(Debug, Args, Clone)]
pub struct RunCommand {
    /// Path to recipe YAML file
    #[arg(short, long)]
    pub file: String,

    /// JSON lines input file (stdin when omitted)
    #[arg(short, long)]
    pub input: Option<String>,

    /// Variable overrides (key=value)
    #[arg(long = "var", value_parser = parse_key_value)]
    pub variable: Vec<(String, String)>,

    /// Write each output as soon as it is produced
    #[arg(long)]
    pub stream: bool,
}

/// Validate a recipe
#[derive(Debug, Args, Clone)]
pub struct ValidateCommand {
    /// Path to recipe YAML file
    #[arg(short, long)]
    pub file: String,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Parse key=value pairs
pub fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let parts: Vec<&str> = s.splitn(2, '=').collect();
    if parts.len() != 2 {
        return Err(format!("Invalid key=value pair: {}", s));
    }
    Ok((parts[0].to_string(), parts[1].to_string()))
}

/// Parse one JSON value per non-blank line
pub fn parse_json_lines(content: &str) -> Result<Vec<Value>> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line).with_context(|| format!("Invalid JSON on line {}", i + 1))
        })
        .collect()
}
