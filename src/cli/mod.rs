//! Command-line interface

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use commands::{RunCommand, ValidateCommand};
use std::ffi::OsString;

/// Run JSON records through branching pipeline recipes
#[derive(Debug, Parser, Clone)]
#[command(name = "forkline")]
#[command(version)]
#[command(about = "Run JSON records through branching pipeline recipes", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run a recipe over JSON lines
    Run(RunCommand),

    /// Validate a recipe
    Validate(ValidateCommand),
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }
}
