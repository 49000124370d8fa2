//! Python parsing on top of tree-sitter.
//!
//! The concrete syntax tree is lowered into [`SyntaxNode`], a small tagged tree that
//! only keeps what the splitter needs: definitions, their docstrings, and the
//! statements that may contain further definitions.

use tree_sitter::{Language, Node, Parser, Point};

use crate::domain::errors::ParseError;
use crate::infra::literal;

/// Lowered Python syntax tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyntaxNode {
    Module {
        docstring: Option<Docstring>,
        body: Vec<SyntaxNode>,
    },
    ClassDef(Definition),
    FunctionDef {
        definition: Definition,
        is_async: bool,
    },
    /// Any other compound statement that contains definitions.
    Other { body: Vec<SyntaxNode> },
}

/// A class or function definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Definition {
    pub name: String,
    /// Byte column of the `def`/`class` keyword line.
    pub indent: usize,
    pub docstring: Option<Docstring>,
    pub body: Vec<SyntaxNode>,
}

/// Leading string statement of a module, class, or function body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Docstring {
    /// Decoded and cleaned text.
    pub text: String,
    pub span: Span,
}

/// Zero-based row/byte-column range of a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start_row: usize,
    pub start_column: usize,
    pub end_row: usize,
    pub end_column: usize,
}

impl Span {
    fn of(node: Node) -> Self {
        let start = node.start_position();
        let end = node.end_position();
        Self {
            start_row: start.row,
            start_column: start.column,
            end_row: end.row,
            end_column: end.column,
        }
    }
}

/// Reusable tree-sitter parser configured for Python.
pub struct PythonParser {
    parser: Parser,
}

impl PythonParser {
    pub fn new() -> Result<Self, ParseError> {
        let language: Language = tree_sitter_python::LANGUAGE.into();
        let mut parser = Parser::new();
        parser
            .set_language(&language)
            .map_err(|err| ParseError::Grammar(err.to_string()))?;
        Ok(Self { parser })
    }

    /// Parse `source` into a [`SyntaxNode::Module`].
    ///
    /// Any syntax error or missing token reported by tree-sitter fails the whole parse,
    /// as does indentation Python would reject.
    pub fn parse(&mut self, source: &str) -> Result<SyntaxNode, ParseError> {
        let tree = self.parser.parse(source, None).ok_or(ParseError::NoTree)?;
        let root = tree.root_node();

        if root.has_error() {
            return Err(syntax_error(first_error(root).unwrap_or(root).start_position()));
        }
        check_indentation(root)?;

        Ok(SyntaxNode::Module {
            docstring: leading_docstring(root, source),
            body: lower_children(root, source),
        })
    }
}

fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    let children: Vec<_> = node.children(&mut cursor).collect();
    children.into_iter().find_map(first_error)
}

fn syntax_error(at: Point) -> ParseError {
    ParseError::Syntax {
        line: at.row + 1,
        column: at.column + 1,
    }
}

/// Reject indentation tree-sitter tolerates: module statements must start at column
/// 0, and every block needs statements sharing one column deeper than its header.
fn check_indentation(root: Node) -> Result<(), ParseError> {
    check_statements(root, None)?;

    let mut cursor = root.walk();
    let mut pending = vec![root];
    while let Some(node) = pending.pop() {
        if node.kind() == "block" {
            let header = node.parent().unwrap_or(node).start_position();
            check_statements(node, Some(header))?;
        }
        pending.extend(node.named_children(&mut cursor));
    }
    Ok(())
}

fn check_statements(container: Node, header: Option<Point>) -> Result<(), ParseError> {
    let mut cursor = container.walk();
    let statements: Vec<_> = container
        .named_children(&mut cursor)
        .filter(|child| !matches!(child.kind(), "comment" | "line_continuation"))
        .collect();
    if statements.is_empty() {
        return match header {
            Some(at) => Err(syntax_error(at)),
            None => Ok(()),
        };
    }

    let header_row = header.map(|at| at.row);
    let mut column = if header.is_none() { Some(0) } else { None };
    let mut previous_row: Option<usize> = None;

    for statement in statements {
        let start = statement.start_position();
        // Statements after `;` or on the header line do not start a logical line.
        let starts_line = previous_row.is_none_or(|row| start.row > row)
            && Some(start.row) != header_row;
        previous_row = Some(last_row(statement));
        if !starts_line {
            continue;
        }

        match column {
            Some(expected) if expected != start.column => return Err(syntax_error(start)),
            Some(_) => {}
            None => {
                if header.is_some_and(|at| start.column <= at.column) {
                    return Err(syntax_error(start));
                }
                column = Some(start.column);
            }
        }
    }
    Ok(())
}

fn last_row(node: Node) -> usize {
    let (start, end) = (node.start_position(), node.end_position());
    if end.column == 0 && end.row > start.row {
        end.row - 1
    } else {
        end.row
    }
}

fn lower_children(node: Node, source: &str) -> Vec<SyntaxNode> {
    let mut cursor = node.walk();
    let children: Vec<_> = node.named_children(&mut cursor).collect();
    children
        .into_iter()
        .filter_map(|child| lower(child, source))
        .collect()
}

fn lower(node: Node, source: &str) -> Option<SyntaxNode> {
    match node.kind() {
        "class_definition" => lower_definition(node, source).map(SyntaxNode::ClassDef),
        "function_definition" => {
            let is_async = node.child(0).is_some_and(|first| first.kind() == "async");
            lower_definition(node, source).map(|definition| SyntaxNode::FunctionDef {
                definition,
                is_async,
            })
        }
        "decorated_definition" => node
            .child_by_field_name("definition")
            .and_then(|inner| lower(inner, source)),
        "comment" | "string" | "expression_statement" | "import_statement"
        | "import_from_statement" => None,
        _ => {
            let body: Vec<_> = lower_children(node, source)
                .into_iter()
                .flat_map(|child| match child {
                    SyntaxNode::Other { body } => body,
                    definition => vec![definition],
                })
                .collect();
            (!body.is_empty()).then_some(SyntaxNode::Other { body })
        }
    }
}

fn lower_definition(node: Node, source: &str) -> Option<Definition> {
    let name = node.child_by_field_name("name")?;
    let body = node.child_by_field_name("body");

    Some(Definition {
        name: source[name.byte_range()].to_owned(),
        indent: node.start_position().column,
        docstring: body.and_then(|block| leading_docstring(block, source)),
        body: body
            .map(|block| lower_children(block, source))
            .unwrap_or_default(),
    })
}

/// Docstring of a module or block: its first statement, when that statement is a
/// lone string literal.
fn leading_docstring(block: Node, source: &str) -> Option<Docstring> {
    let mut cursor = block.walk();
    let first = block
        .named_children(&mut cursor)
        .find(|child| child.kind() != "comment")?;
    if first.kind() != "expression_statement" || first.named_child_count() != 1 {
        return None;
    }

    let expr = first.named_child(0)?;
    let raw = match expr.kind() {
        "string" => literal::decode(&source[expr.byte_range()])?,
        "concatenated_string" => {
            let mut parts_cursor = expr.walk();
            let parts: Vec<_> = expr
                .named_children(&mut parts_cursor)
                .filter(|part| part.kind() == "string")
                .collect();
            let mut joined = String::new();
            for part in parts {
                joined.push_str(&literal::decode(&source[part.byte_range()])?);
            }
            joined
        }
        _ => return None,
    };

    Some(Docstring {
        text: literal::clean(&raw),
        span: Span::of(first),
    })
}
