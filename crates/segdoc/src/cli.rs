//! Command-line interface.

use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use crate::app::batch::{RunOptions, RunReport, run_combine, run_split};
use crate::infra::config::Config;

/// Split Python sources into bare code and docstrings, and combine them back.
#[derive(Parser, Debug)]
#[command(name = "segdoc", author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file to use instead of ./.segmentedrc
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Split Python files into bare code and docstrings
    Split(TargetArgs),
    /// Combine bare code and docstring files
    Combine(TargetArgs),
    /// Print a shell completion script
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug)]
pub struct TargetArgs {
    /// Source file or directory
    pub source: PathBuf,

    /// Output directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Process directories recursively
    #[arg(short, long)]
    pub recursive: bool,

    /// Perform a dry run without making changes
    #[arg(long)]
    pub dry_run: bool,
}

impl TargetArgs {
    fn options(&self, config: &Config) -> RunOptions {
        let mut opts = RunOptions::from_config(config, &self.source);
        if let Some(output) = &self.output {
            opts.output = output.clone();
        }
        opts.recursive |= self.recursive;
        opts.dry_run |= self.dry_run;
        opts
    }
}

/// Execute a parsed command line.
pub fn run(cli: Cli) -> Result<()> {
    if let Commands::Completions { shell } = cli.command {
        clap_complete::generate(shell, &mut Cli::command(), "segdoc", &mut io::stdout());
        return Ok(());
    }

    let config = load_config(cli.config.as_deref()).context("configuration error")?;
    tracing::debug!("verbose mode enabled");

    match &cli.command {
        Commands::Split(args) => {
            let report = run_split(&args.options(&config))?;
            summarize("split", &report);
        }
        Commands::Combine(args) => {
            let report = run_combine(&args.options(&config))?;
            summarize("combine", &report);
        }
        Commands::Completions { .. } => {}
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    Ok(config)
}

fn summarize(operation: &str, report: &RunReport) {
    tracing::info!(
        operation,
        processed = report.processed.len(),
        skipped = report.skipped.len(),
        failed = report.failed.len(),
        mismatches = report.mismatches,
        "run finished"
    );
    if report.has_failures() {
        tracing::warn!(failed = report.failed.len(), "some files could not be processed");
    }
}
