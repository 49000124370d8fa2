//! Candidate file discovery for batch split/combine runs.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::{DirEntry, WalkBuilder};

const SEGDOC_IGNORE: &str = ".segdocignore";

/// What a scan is looking for.
#[derive(Debug, Clone)]
pub struct ScannerConfig {
    pub root: PathBuf,
    pub recursive: bool,
    /// File name globs a candidate must match.
    pub include: Vec<String>,
    /// File name suffixes that disqualify a candidate.
    pub exclude_suffixes: Vec<String>,
}

impl ScannerConfig {
    /// Python sources eligible for splitting, skipping files that are already split
    /// outputs.
    pub fn sources(root: PathBuf, barecode_ext: &str, docstring_ext: &str) -> Self {
        Self {
            root,
            recursive: false,
            include: vec!["*.py".into()],
            exclude_suffixes: vec![barecode_ext.to_owned(), docstring_ext.to_owned()],
        }
    }

    /// Bare code files eligible for combining.
    pub fn barecode(root: PathBuf, barecode_ext: &str) -> Self {
        Self {
            root,
            recursive: false,
            include: vec![format!("*{barecode_ext}")],
            exclude_suffixes: Vec::new(),
        }
    }

    pub fn with_recursion(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }
}

/// Walks a directory respecting ignore rules and yields matching files in path order.
#[derive(Debug, Default)]
pub struct Scanner;

impl Scanner {
    pub fn new() -> Self {
        Self
    }

    pub fn scan(&self, cfg: &ScannerConfig) -> Result<Vec<PathBuf>> {
        let matcher = build_matcher(&cfg.include)?;

        let mut builder = WalkBuilder::new(&cfg.root);
        builder
            .git_ignore(true)
            .hidden(true)
            .add_custom_ignore_filename(SEGDOC_IGNORE);
        if !cfg.recursive {
            builder.max_depth(Some(1));
        }

        let mut files = Vec::new();
        for result in builder.build() {
            match result {
                Ok(entry) => {
                    if is_candidate(&entry, &matcher, cfg) {
                        files.push(entry.into_path());
                    }
                }
                Err(err) => {
                    tracing::warn!(error = %err, "scanner error");
                }
            }
        }

        files.sort();
        Ok(files)
    }
}

fn is_candidate(entry: &DirEntry, matcher: &GlobSet, cfg: &ScannerConfig) -> bool {
    if !entry.file_type().is_some_and(|kind| kind.is_file()) {
        return false;
    }
    let Some(name) = entry.path().file_name().and_then(|name| name.to_str()) else {
        return false;
    };
    matcher.is_match(name)
        && !cfg
            .exclude_suffixes
            .iter()
            .any(|suffix| !suffix.is_empty() && name.ends_with(suffix.as_str()))
}

fn build_matcher(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).with_context(|| format!("invalid file pattern '{pattern}'"))?;
        builder.add(glob);
    }
    builder.build().context("failed to build file matcher")
}

/// Strip `suffix` from the file name of `path`, returning the remaining stem.
pub fn stem_without_suffix<'a>(path: &'a Path, suffix: &str) -> Option<&'a str> {
    path.file_name()?
        .to_str()?
        .strip_suffix(suffix)
        .filter(|stem| !stem.is_empty())
}
