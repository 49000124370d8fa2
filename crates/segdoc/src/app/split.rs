//! Splitting Python sources into bare code and a documentation map.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::errors::{ParseError, SplitError};
use crate::domain::model::{ConstructKind, DefinitionNode, DocumentationMap, MODULE_KEY, Mismatch};
use crate::infra::python::{Definition, Docstring, PythonParser, Span, SyntaxNode};

/// Result of splitting one source text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitOutput {
    pub bare_code: String,
    pub documentation: DocumentationMap,
    /// Every definition visited, in depth-first order, module first.
    pub definitions: Vec<DefinitionNode>,
    pub mismatches: Vec<Mismatch>,
}

/// Paths written by [`split_file`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitArtifacts {
    pub barecode_path: PathBuf,
    pub docstring_path: PathBuf,
    pub mismatches: Vec<Mismatch>,
}

/// Split `source` into code without docstrings and the docstrings keyed by name.
pub fn split(source: &str) -> Result<SplitOutput, ParseError> {
    let tree = PythonParser::new()?.parse(source)?;

    let mut collector = Collector::default();
    collector.visit(&tree);

    let bare_code = strip_docstrings(source, &collector.spans);
    tracing::debug!(
        definitions = collector.definitions.len(),
        removed = collector.spans.len(),
        "split source"
    );

    Ok(SplitOutput {
        bare_code,
        documentation: collector.documentation,
        definitions: collector.definitions,
        mismatches: collector.mismatches,
    })
}

/// Split the file at `input` and write `<stem><barecode_ext>` and
/// `<stem><docstring_ext>` into `output_dir`.
///
/// The bare code file is written first; if saving the docstring file fails the bare
/// code file stays on disk.
pub fn split_file(
    input: &Path,
    output_dir: &Path,
    barecode_ext: &str,
    docstring_ext: &str,
) -> Result<SplitArtifacts, SplitError> {
    tracing::info!(path = %input.display(), "splitting file");

    let source = fs::read_to_string(input).map_err(|source| {
        tracing::error!(path = %input.display(), error = %source, "error reading input file");
        SplitError::FileRead {
            path: input.to_path_buf(),
            source,
        }
    })?;

    let output = split(&source).map_err(|source| {
        tracing::error!(path = %input.display(), error = %source, "error parsing Python source");
        SplitError::Parse {
            path: input.to_path_buf(),
            source,
        }
    })?;
    for mismatch in &output.mismatches {
        tracing::warn!(path = %input.display(), "{mismatch}");
    }

    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let barecode_path = output_dir.join(format!("{stem}{barecode_ext}"));
    let docstring_path = output_dir.join(format!("{stem}{docstring_ext}"));

    let json = output
        .documentation
        .to_json()
        .map_err(|err| std::io::Error::other(err.to_string()))
        .map_err(|source| SplitError::FileSave {
            path: docstring_path.clone(),
            source,
        })?;

    save(&barecode_path, &output.bare_code)?;
    tracing::info!(path = %barecode_path.display(), "bare code saved");
    save(&docstring_path, &json)?;
    tracing::info!(path = %docstring_path.display(), "docstrings saved");

    Ok(SplitArtifacts {
        barecode_path,
        docstring_path,
        mismatches: output.mismatches,
    })
}

fn save(path: &Path, contents: &str) -> Result<(), SplitError> {
    let write = || -> std::io::Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, contents)
    };
    write().map_err(|source| {
        tracing::error!(path = %path.display(), error = %source, "error saving output file");
        SplitError::FileSave {
            path: path.to_path_buf(),
            source,
        }
    })
}

#[derive(Default)]
struct Collector {
    documentation: DocumentationMap,
    definitions: Vec<DefinitionNode>,
    mismatches: Vec<Mismatch>,
    spans: Vec<Span>,
}

impl Collector {
    fn visit(&mut self, node: &SyntaxNode) {
        match node {
            SyntaxNode::Module { docstring, body } => {
                self.record(MODULE_KEY, ConstructKind::Module, 0, docstring.as_ref());
                self.visit_all(body);
            }
            SyntaxNode::ClassDef(definition) => {
                self.record_definition(definition, ConstructKind::ClassDef);
            }
            SyntaxNode::FunctionDef {
                definition,
                is_async,
            } => {
                let kind = if *is_async {
                    ConstructKind::AsyncFunctionDef
                } else {
                    ConstructKind::FunctionDef
                };
                self.record_definition(definition, kind);
            }
            SyntaxNode::Other { body } => self.visit_all(body),
        }
    }

    fn visit_all(&mut self, nodes: &[SyntaxNode]) {
        for node in nodes {
            self.visit(node);
        }
    }

    fn record_definition(&mut self, definition: &Definition, kind: ConstructKind) {
        self.record(
            &definition.name,
            kind,
            definition.indent,
            definition.docstring.as_ref(),
        );
        self.visit_all(&definition.body);
    }

    fn record(&mut self, name: &str, kind: ConstructKind, indent: usize, docstring: Option<&Docstring>) {
        let node = DefinitionNode {
            name: name.to_owned(),
            kind,
            indent,
            docstring: docstring.map(|doc| doc.text.clone()),
        };
        if let Some(doc) = docstring {
            self.spans.push(doc.span);
        }
        if !self.documentation.insert(name, node.documentation()) {
            self.mismatches.push(Mismatch::DuplicateName {
                name: name.to_owned(),
            });
        }
        self.definitions.push(node);
    }
}

enum LineEdit {
    Drop,
    Replace(String),
}

/// Remove the lines occupied by docstring statements, keeping every other line.
///
/// A docstring sharing its line with preceding code is left in place. Whatever
/// follows a docstring (a comment, or statements after `;`) is kept at the
/// docstring's indentation.
fn strip_docstrings(source: &str, spans: &[Span]) -> String {
    let lines: Vec<&str> = source.split('\n').collect();
    let mut edits: HashMap<usize, LineEdit> = HashMap::new();

    for span in spans {
        let (Some(first), Some(last)) = (lines.get(span.start_row), lines.get(span.end_row)) else {
            continue;
        };
        let Some(before) = first.get(..span.start_column) else {
            continue;
        };
        let Some(after) = last.get(span.end_column..) else {
            continue;
        };
        if !before.trim().is_empty() {
            continue;
        }

        let trailing = after.trim();
        let trailing = match trailing.strip_prefix(';') {
            Some(rest) => rest.trim_start(),
            None if trailing.is_empty() || trailing.starts_with('#') => trailing,
            None => continue,
        };
        let last_edit = if trailing.is_empty() {
            LineEdit::Drop
        } else {
            let line_break = if after.ends_with('\r') { "\r" } else { "" };
            LineEdit::Replace(format!("{before}{trailing}{line_break}"))
        };

        for row in span.start_row..span.end_row {
            edits.insert(row, LineEdit::Drop);
        }
        edits.insert(span.end_row, last_edit);
    }

    let kept: Vec<&str> = lines
        .iter()
        .enumerate()
        .filter_map(|(row, line)| match edits.get(&row) {
            Some(LineEdit::Drop) => None,
            Some(LineEdit::Replace(text)) => Some(text.as_str()),
            None => Some(*line),
        })
        .collect();
    kept.join("\n")
}
