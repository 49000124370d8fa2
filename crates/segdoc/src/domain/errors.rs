//! Domain-specific errors.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Source text that does not parse as Python.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid syntax at line {line}, column {column}")]
    Syntax { line: usize, column: usize },
    #[error("failed to load Python grammar: {0}")]
    Grammar(String),
    #[error("parser produced no syntax tree")]
    NoTree,
}

/// Failures splitting a source file into bare code and docstrings.
#[derive(Debug, Error)]
pub enum SplitError {
    #[error("error reading input file {path}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("error parsing Python source {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },
    #[error("error saving output file {path}")]
    FileSave {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Failures combining bare code and docstring files.
#[derive(Debug, Error)]
pub enum CombineError {
    #[error("error reading input file {path}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: ReadFailure,
    },
    #[error("error saving output file {path}")]
    FileSave {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Why an input to the combiner could not be read.
#[derive(Debug, Error)]
pub enum ReadFailure {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("invalid documentation map: {0}")]
    Decode(#[from] serde_json::Error),
}
