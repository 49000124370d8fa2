//! Batch driver running split/combine over files and directories.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

use crate::app::combine::combine_files;
use crate::app::scan::{Scanner, ScannerConfig, stem_without_suffix};
use crate::app::split::split_file;
use crate::infra::config::Config;

/// Runtime options for one batch run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    pub source: PathBuf,
    pub output: PathBuf,
    pub recursive: bool,
    pub dry_run: bool,
    pub barecode_extension: String,
    pub docstring_extension: String,
}

impl RunOptions {
    /// Build options for `source` from configuration defaults.
    pub fn from_config(config: &Config, source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            output: PathBuf::from(&config.output_folder),
            recursive: config.recursion,
            dry_run: config.dry_run,
            barecode_extension: config.barecode_extension.clone(),
            docstring_extension: config.docstring_extension.clone(),
        }
    }
}

/// Per-run outcome summary.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Files written (or that would be written in a dry run).
    pub processed: Vec<PathBuf>,
    /// Candidates skipped because a counterpart file is missing.
    pub skipped: Vec<PathBuf>,
    /// Candidates whose operation failed, with the error message.
    pub failed: Vec<(PathBuf, String)>,
    pub mismatches: usize,
}

impl RunReport {
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}

/// Split one file, or every Python file under a directory.
///
/// A single-file failure is returned as an error. In directory mode failures are
/// logged and recorded while the remaining files are processed.
pub fn run_split(opts: &RunOptions) -> Result<RunReport> {
    let mut report = RunReport::default();
    let source = &opts.source;

    if source.is_file() {
        split_one(source, opts, &mut report)
            .with_context(|| format!("error splitting file {}", source.display()))?;
        return Ok(report);
    }
    if !source.is_dir() {
        bail!("{} is not a valid file or directory", source.display());
    }

    let cfg = ScannerConfig::sources(
        source.clone(),
        &opts.barecode_extension,
        &opts.docstring_extension,
    )
    .with_recursion(opts.recursive);
    for file in Scanner::new().scan(&cfg)? {
        if let Err(err) = split_one(&file, opts, &mut report) {
            tracing::error!(path = %file.display(), error = %err, "error splitting file");
            report.failed.push((file, format!("{err:#}")));
        }
    }
    Ok(report)
}

fn split_one(file: &Path, opts: &RunOptions, report: &mut RunReport) -> Result<()> {
    let output_dir = mirrored_dir(file, &opts.source, &opts.output);
    if opts.dry_run {
        tracing::info!(path = %file.display(), output = %output_dir.display(), "dry run: would split file");
        report.processed.push(file.to_path_buf());
        return Ok(());
    }

    let artifacts = split_file(
        file,
        &output_dir,
        &opts.barecode_extension,
        &opts.docstring_extension,
    )?;
    report.mismatches += artifacts.mismatches.len();
    report.processed.push(file.to_path_buf());
    Ok(())
}

/// Combine every bare code file under a directory with its docstring sibling.
pub fn run_combine(opts: &RunOptions) -> Result<RunReport> {
    let source = &opts.source;
    if !source.is_dir() {
        bail!("{} is not a valid directory", source.display());
    }

    let mut report = RunReport::default();
    let cfg = ScannerConfig::barecode(source.clone(), &opts.barecode_extension)
        .with_recursion(opts.recursive);

    for barecode in Scanner::new().scan(&cfg)? {
        let Some(stem) = stem_without_suffix(&barecode, &opts.barecode_extension) else {
            continue;
        };
        let docstring = barecode.with_file_name(format!("{stem}{}", opts.docstring_extension));
        if !docstring.exists() {
            tracing::warn!(path = %barecode.display(), "docstring file not found");
            report.skipped.push(barecode);
            continue;
        }

        let output = mirrored_dir(&barecode, source, &opts.output).join(format!("{stem}.py"));
        if opts.dry_run {
            tracing::info!(
                barecode = %barecode.display(),
                docstring = %docstring.display(),
                output = %output.display(),
                "dry run: would combine files"
            );
            report.processed.push(output);
            continue;
        }

        match combine_files(&barecode, &docstring, &output) {
            Ok(combined) => {
                report.mismatches += combined.mismatches.len();
                report.processed.push(output);
            }
            Err(err) => {
                tracing::error!(path = %barecode.display(), error = %err, "error combining files");
                report.failed.push((barecode, err.to_string()));
            }
        }
    }
    Ok(report)
}

/// Output directory for `file`, keeping its position relative to `root`.
fn mirrored_dir(file: &Path, root: &Path, output: &Path) -> PathBuf {
    let parent = file.parent().unwrap_or(Path::new(""));
    match parent.strip_prefix(root) {
        Ok(relative) if root.is_dir() => output.join(relative),
        _ => output.to_path_buf(),
    }
}
