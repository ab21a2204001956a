use anyhow::{Context, Result};
use forkline::cli::commands::{parse_json_lines, RunCommand, ValidateCommand};
use forkline::cli::output::*;
use forkline::cli::{Cli, Command};
use forkline::{Input, PipelineConfig, PipelineError, Standalone};
use futures::stream::{self, StreamExt};
use serde_json::Value;
use std::collections::HashMap;
use tokio::io::AsyncReadExt;
use tracing::{error, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // stdout carries records, so logs go to stderr
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    match &cli.command {
        Command::Run(cmd) => run_pipeline(cmd).await?,
        Command::Validate(cmd) => validate_pipeline(cmd)?,
    }

    Ok(())
}

async fn run_pipeline(cmd: &RunCommand) -> Result<()> {
    let config = PipelineConfig::from_file(&cmd.file).context("Failed to load recipe")?;

    eprintln!("{} Loaded recipe: {}", INFO, style(&config.name).bold());

    let overrides: HashMap<String, String> = cmd.variable.iter().cloned().collect();
    for (key, value) in &cmd.variable {
        eprintln!(
            "{} Variable override: {} = {}",
            INFO,
            style(key).cyan(),
            style(value).dim()
        );
    }

    let values = read_input(cmd.input.as_deref()).await?;
    let inputs = values.len();
    let pipeline = config.to_pipeline(&overrides)?;

    eprintln!("{} Running {} input record(s)", ROCKET, style(inputs).cyan());

    let result = if cmd.stream {
        stream_records(&pipeline, values).await
    } else {
        match pipeline.run(values).await {
            Ok(records) => {
                for record in &records {
                    println!("{}", format_record(record)?);
                }
                Ok(records.len())
            }
            Err(err) => Err(err),
        }
    };

    match result {
        Ok(produced) => {
            eprintln!(
                "\n{} {} produced {} record(s) from {} input(s)",
                CHECK,
                style(&config.name).bold(),
                style(produced).cyan(),
                inputs
            );
        }
        Err(err) => {
            eprintln!(
                "\n{} {} {}",
                CROSS,
                style(&config.name).bold(),
                style("failed").red()
            );
            eprintln!("{}", format_fault(&err));
            error!("{}", err);
            std::process::exit(1);
        }
    }

    Ok(())
}

/// Write outputs as they are produced; earlier outputs survive a later fault
async fn stream_records(
    pipeline: &forkline::Pipeline,
    values: Vec<Value>,
) -> Result<usize, PipelineError> {
    let mut outputs = pipeline.stream(Input::from_stream(stream::iter(values)));
    let mut produced = 0;

    while let Some(item) = outputs.next().await {
        let record = item?;
        match format_record(&record) {
            Ok(line) => println!("{}", line),
            Err(err) => error!("Failed to encode output record: {}", err),
        }
        produced += 1;
    }

    Ok(produced)
}

async fn read_input(path: Option<&str>) -> Result<Vec<Value>> {
    let content = match path {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read input {}", path))?,
        None => {
            let mut buffer = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buffer)
                .await
                .context("Failed to read stdin")?;
            buffer
        }
    };
    parse_json_lines(&content)
}

fn validate_pipeline(cmd: &ValidateCommand) -> Result<()> {
    println!("{} Validating recipe...", INFO);

    let result = PipelineConfig::from_file(&cmd.file);

    match result {
        Ok(config) => {
            println!("{} Recipe is valid!", CHECK);
            println!("  Name: {}", style(&config.name).bold());
            if let Some(description) = &config.description {
                println!("  Description: {}", style(description).dim());
            }
            println!("  Steps: {}", style(config.step_count()).cyan());
            println!("  Variables: {}", style(config.variables.len()).cyan());

            if cmd.json {
                let json = serde_json::to_string_pretty(&config)?;
                println!("\n{}", json);
            }
            Ok(())
        }
        Err(e) => {
            println!("{} Validation failed:", CROSS);
            println!("  {}", style(format!("{:#}", e)).red());
            std::process::exit(1);
        }
    }
}
