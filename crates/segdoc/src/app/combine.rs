//! Reinserting docstrings into bare code.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::errors::{CombineError, ReadFailure};
use crate::domain::model::{DocumentationMap, MODULE_KEY, Mismatch};
use crate::infra::literal;

static HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:async[ \t]+def|def|class)[ \t]+([^\s(:\[]+)").expect("valid header pattern")
});
static ENCODING_DECLARATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[ \t\f]*#.*?coding[:=]").expect("valid encoding pattern"));

/// Result of combining bare code with its documentation map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CombineOutput {
    pub code: String,
    pub mismatches: Vec<Mismatch>,
}

/// Insert docstrings from `documentation` below the matching headers of `bare_code`.
///
/// Never fails: headers without documentation and documentation without headers are
/// reported as [`Mismatch`]es and otherwise skipped.
pub fn combine(bare_code: &str, documentation: &DocumentationMap) -> CombineOutput {
    let line_ending = if bare_code.contains("\r\n") { "\r\n" } else { "\n" };
    let lines: Vec<&str> = bare_code.lines().collect();

    let mut output: Vec<String> = Vec::with_capacity(lines.len() + documentation.len() * 2);
    let mut mismatches = Vec::new();
    let mut used: HashSet<String> = HashSet::new();
    let mut rest = lines.as_slice();

    if let Some(text) = documentation.get(MODULE_KEY) {
        let preamble = preamble_len(&lines);
        output.extend(lines[..preamble].iter().map(|line| line.to_string()));
        output.extend(render_docstring(text, ""));
        output.push(String::new());
        rest = &lines[preamble..];
        tracing::debug!("module docstring inserted");
    }

    let mut scanner = LineScanner::default();
    let mut pending: Option<Header> = None;

    for (offset, line) in rest.iter().enumerate() {
        let line_no = lines.len() - rest.len() + offset + 1;

        if pending.is_none() && scanner.at_statement_start() {
            pending = parse_header(line, line_no);
        }

        let last = scanner.feed(line);
        output.push(line.to_string());

        let header_closed = scanner.at_statement_start() && last != Some('\\');
        if !header_closed {
            continue;
        }
        let Some(header) = pending.take() else {
            continue;
        };

        let documented = documentation
            .get(&header.name)
            .filter(|_| header.name != MODULE_KEY);
        let Some(text) = documented else {
            tracing::warn!(name = %header.name, line = header.line, "docstring not found");
            mismatches.push(Mismatch::MissingDocumentation {
                name: header.name,
                line: header.line,
            });
            continue;
        };
        used.insert(header.name.clone());

        if last != Some(':') {
            tracing::warn!(name = %header.name, line = header.line, "inline body, docstring skipped");
            mismatches.push(Mismatch::InlineBody {
                name: header.name,
                line: header.line,
            });
            continue;
        }

        let indent = body_indent(&header.prefix, &rest[offset + 1..]);
        output.extend(render_docstring(text, &indent));
        tracing::debug!(name = %header.name, "docstring inserted");
    }

    for key in documentation.keys() {
        if key != MODULE_KEY && !used.contains(key) {
            tracing::warn!(name = %key, "docstring has no matching definition");
            mismatches.push(Mismatch::UnmatchedKey {
                name: key.to_owned(),
            });
        }
    }

    let mut code = output.join(line_ending).trim_end().to_owned();
    code.push_str(line_ending);
    CombineOutput { code, mismatches }
}

/// Read `barecode` and `docstring` files, combine them, and write `output`.
pub fn combine_files(
    barecode: &Path,
    docstring: &Path,
    output: &Path,
) -> Result<CombineOutput, CombineError> {
    tracing::info!(
        barecode = %barecode.display(),
        docstring = %docstring.display(),
        "combining files"
    );

    let bare_code = read(barecode)?;
    let documentation = DocumentationMap::from_json(&read(docstring)?).map_err(|err| {
        tracing::error!(path = %docstring.display(), error = %err, "error parsing docstring file");
        CombineError::FileRead {
            path: docstring.to_path_buf(),
            source: ReadFailure::Decode(err),
        }
    })?;

    let combined = combine(&bare_code, &documentation);

    let write = || -> std::io::Result<()> {
        if let Some(parent) = output.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(output, &combined.code)
    };
    write().map_err(|source| {
        tracing::error!(path = %output.display(), error = %source, "error saving output file");
        CombineError::FileSave {
            path: output.to_path_buf(),
            source,
        }
    })?;
    tracing::info!(path = %output.display(), "combined code saved");

    Ok(combined)
}

fn read(path: &Path) -> Result<String, CombineError> {
    fs::read_to_string(path).map_err(|err| {
        tracing::error!(path = %path.display(), error = %err, "error reading input file");
        CombineError::FileRead {
            path: path.to_path_buf(),
            source: ReadFailure::Io(err),
        }
    })
}

/// Render `text` as a `"""`-delimited block, each line starting with `indent`.
///
/// Continuation lines keep their indentation relative to each other; the closing
/// quotes of a multi-line block get their own line.
pub fn render_docstring(text: &str, indent: &str) -> Vec<String> {
    let escaped = literal::escape(text.trim());
    let mut lines = escaped.split('\n');
    let first = lines.next().unwrap_or_default();
    let continuation: Vec<&str> = lines.collect();

    if continuation.is_empty() {
        return vec![format!("{indent}\"\"\"{first}\"\"\"")];
    }

    let margin = continuation
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start_matches([' ', '\t']).len())
        .min()
        .unwrap_or(0);

    let mut block = Vec::with_capacity(continuation.len() + 2);
    block.push(format!("{indent}\"\"\"{first}"));
    for line in continuation {
        if line.trim().is_empty() {
            block.push(String::new());
        } else {
            block.push(format!("{indent}{}", &line[margin..]));
        }
    }
    block.push(format!("{indent}\"\"\""));
    block
}

/// Leading lines that must stay ahead of the module docstring: a shebang and an
/// encoding declaration on the first two lines.
fn preamble_len(lines: &[&str]) -> usize {
    let mut count = 0;
    if lines.first().is_some_and(|line| line.starts_with("#!")) {
        count = 1;
    }
    if lines
        .get(count)
        .is_some_and(|line| count < 2 && ENCODING_DECLARATION.is_match(line))
    {
        count += 1;
    }
    count
}

struct Header {
    name: String,
    /// Leading whitespace of the header line.
    prefix: String,
    line: usize,
}

/// Indentation of the body following a header: the first code line's when it is
/// nested under the header, otherwise the header's plus one level.
fn body_indent(prefix: &str, following: &[&str]) -> String {
    let body = following.iter().find(|line| {
        let text = line.trim();
        !text.is_empty() && !text.starts_with('#')
    });
    if let Some(line) = body {
        let indent = &line[..line.len() - line.trim_start().len()];
        if indent.len() > prefix.len() && indent.starts_with(prefix) {
            return indent.to_owned();
        }
    }
    let unit = if prefix.ends_with('\t') { "\t" } else { "    " };
    format!("{prefix}{unit}")
}

fn parse_header(line: &str, line_no: usize) -> Option<Header> {
    let stripped = line.trim_start();
    let name = HEADER.captures(stripped)?.get(1)?.as_str();
    Some(Header {
        name: name.to_owned(),
        prefix: line[..line.len() - stripped.len()].to_owned(),
        line: line_no,
    })
}

/// Tracks string and bracket state across lines so that headers are only
/// recognized at statement starts.
#[derive(Debug, Default)]
struct LineScanner {
    open_string: Option<(char, bool)>,
    depth: usize,
}

impl LineScanner {
    fn at_statement_start(&self) -> bool {
        self.open_string.is_none() && self.depth == 0
    }

    /// Consume one line, returning the last significant character outside
    /// comments.
    fn feed(&mut self, line: &str) -> Option<char> {
        let chars: Vec<char> = line.chars().collect();
        let mut last = None;
        let mut idx = 0;

        while idx < chars.len() {
            let c = chars[idx];

            if let Some((quote, triple)) = self.open_string {
                if c == '\\' {
                    idx += 2;
                    continue;
                }
                let closes = c == quote
                    && (!triple
                        || (chars.get(idx + 1) == Some(&quote)
                            && chars.get(idx + 2) == Some(&quote)));
                if closes {
                    self.open_string = None;
                    last = Some(quote);
                    idx += if triple { 3 } else { 1 };
                } else {
                    idx += 1;
                }
                continue;
            }

            match c {
                '#' => break,
                '"' | '\'' => {
                    let triple = chars.get(idx + 1) == Some(&c) && chars.get(idx + 2) == Some(&c);
                    self.open_string = Some((c, triple));
                    idx += if triple { 3 } else { 1 };
                    continue;
                }
                '(' | '[' | '{' => self.depth += 1,
                ')' | ']' | '}' => self.depth = self.depth.saturating_sub(1),
                _ => {}
            }
            if !c.is_whitespace() {
                last = Some(c);
            }
            idx += 1;
        }

        if let Some((_, false)) = self.open_string
            && !line.trim_end().ends_with('\\')
        {
            self.open_string = None;
        }
        last
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: &[(&str, &str)]) -> DocumentationMap {
        entries.iter().copied().collect()
    }

    #[test]
    fn reinserts_module_and_function_docstrings() {
        let output = combine("\ndef f():\n    pass\n", &map(&[("module", "Mod."), ("f", "F.")]));
        assert_eq!(output.code, "\"\"\"Mod.\"\"\"\n\n\ndef f():\n    \"\"\"F.\"\"\"\n    pass\n");
        assert!(output.mismatches.is_empty());
    }

    #[test]
    fn nested_methods_use_header_indentation() {
        let bare = "def func():\n    pass\n\nclass TestClass:\n    \n    def method(self):\n        return True";
        let docs = map(&[
            ("module", "Module docstring."),
            ("func", "Function docstring."),
            ("TestClass", "Class docstring."),
            ("method", "Method docstring."),
        ]);
        let output = combine(bare, &docs);
        let expected = concat!(
            "\"\"\"Module docstring.\"\"\"\n",
            "\n",
            "def func():\n",
            "    \"\"\"Function docstring.\"\"\"\n",
            "    pass\n",
            "\n",
            "class TestClass:\n",
            "    \"\"\"Class docstring.\"\"\"\n",
            "    \n",
            "    def method(self):\n",
            "        \"\"\"Method docstring.\"\"\"\n",
            "        return True\n",
        );
        assert_eq!(output.code, expected);
        assert!(output.mismatches.is_empty());
    }

    #[test]
    fn missing_entry_is_reported_not_raised() {
        let output = combine("def func():\n    pass", &map(&[("other_func", "Orphan.")]));
        assert_eq!(output.code, "def func():\n    pass\n");
        assert_eq!(
            output.mismatches,
            [
                Mismatch::MissingDocumentation {
                    name: "func".into(),
                    line: 1
                },
                Mismatch::UnmatchedKey {
                    name: "other_func".into()
                },
            ]
        );
    }

    #[test]
    fn multiline_headers_get_docstring_after_the_colon() {
        let bare = "def build(\n    name: str,\n    size: int = (1),\n) -> dict:\n    return {}\n";
        let output = combine(bare, &map(&[("build", "Build it.")]));
        assert_eq!(
            output.code,
            "def build(\n    name: str,\n    size: int = (1),\n) -> dict:\n    \"\"\"Build it.\"\"\"\n    return {}\n"
        );
    }

    #[test]
    fn inline_bodies_are_skipped() {
        let output = combine("class Empty: pass\n", &map(&[("Empty", "Nothing here.")]));
        assert_eq!(output.code, "class Empty: pass\n");
        assert_eq!(
            output.mismatches,
            [Mismatch::InlineBody {
                name: "Empty".into(),
                line: 1
            }]
        );
    }

    #[test]
    fn headers_inside_strings_are_ignored() {
        let bare = "TEMPLATE = \"\"\"\ndef fake():\n\"\"\"\n\nasync def real():\n    pass\n";
        let output = combine(bare, &map(&[("real", "Real."), ("fake", "Fake.")]));
        assert_eq!(
            output.code,
            "TEMPLATE = \"\"\"\ndef fake():\n\"\"\"\n\nasync def real():\n    \"\"\"Real.\"\"\"\n    pass\n"
        );
        assert_eq!(
            output.mismatches,
            [Mismatch::UnmatchedKey {
                name: "fake".into()
            }]
        );
    }

    #[test]
    fn module_docstring_follows_shebang_and_encoding() {
        let bare = "#!/usr/bin/env python\n# -*- coding: utf-8 -*-\nimport sys\n";
        let output = combine(bare, &map(&[("module", "Tool.")]));
        assert_eq!(
            output.code,
            "#!/usr/bin/env python\n# -*- coding: utf-8 -*-\n\"\"\"Tool.\"\"\"\n\nimport sys\n"
        );
    }

    #[test]
    fn renders_multiline_docstrings_as_blocks() {
        assert_eq!(
            render_docstring("Summary.\n\nDetails:\n    indented", "    "),
            [
                "    \"\"\"Summary.",
                "",
                "    Details:",
                "        indented",
                "    \"\"\"",
            ]
        );
    }

    #[test]
    fn blocks_follow_the_body_indentation() {
        let output = combine("def f():\n\tpass\n", &map(&[("f", "Doc.")]));
        assert_eq!(output.code, "def f():\n\t\"\"\"Doc.\"\"\"\n\tpass\n");

        let output = combine(
            "class A:\n\tdef m(self):\n\t\treturn 1\n",
            &map(&[("A", "A."), ("m", "M.\nMore.")]),
        );
        assert_eq!(
            output.code,
            "class A:\n\t\"\"\"A.\"\"\"\n\tdef m(self):\n\t\t\"\"\"M.\n\t\tMore.\n\t\t\"\"\"\n\t\treturn 1\n"
        );

        let output = combine("def f():\n  # note\n  return 1\n", &map(&[("f", "F.")]));
        assert_eq!(output.code, "def f():\n  \"\"\"F.\"\"\"\n  # note\n  return 1\n");

        let output = combine("\tdef g():\n\ndef h():\n    pass\n", &map(&[("g", "G.")]));
        assert!(output.code.starts_with("\tdef g():\n\t\t\"\"\"G.\"\"\"\n"));
    }

    #[test]
    fn keeps_crlf_line_endings() {
        let output = combine("def f():\r\n    pass\r\n", &map(&[("f", "F.")]));
        assert_eq!(output.code, "def f():\r\n    \"\"\"F.\"\"\"\r\n    pass\r\n");
    }

    #[test]
    fn combine_files_round_trips_through_disk() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let barecode = temp.path().join("test_input.bare.py");
        let docstring = temp.path().join("test_input.doc.py");
        let output = temp.path().join("out/test_output.py");
        fs::write(&barecode, "def func():\n    pass")?;
        fs::write(&docstring, r#"{"func": "Function docstring."}"#)?;

        combine_files(&barecode, &docstring, &output)?;
        assert_eq!(
            fs::read_to_string(&output)?,
            "def func():\n    \"\"\"Function docstring.\"\"\"\n    pass\n"
        );
        Ok(())
    }

    #[test]
    fn combine_files_reports_typed_errors() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let barecode = temp.path().join("a.bare.py");
        let docstring = temp.path().join("a.doc.py");
        let output = temp.path().join("a.py");

        assert!(matches!(
            combine_files(&barecode, &docstring, &output),
            Err(CombineError::FileRead { .. })
        ));

        fs::write(&barecode, "def func():\n    pass")?;
        fs::write(&docstring, "This is not a valid mapping")?;
        assert!(matches!(
            combine_files(&barecode, &docstring, &output),
            Err(CombineError::FileRead {
                source: ReadFailure::Decode(_),
                ..
            })
        ));

        fs::write(&docstring, r#"{"func": "Function docstring."}"#)?;
        fs::create_dir(&output)?;
        assert!(matches!(
            combine_files(&barecode, &docstring, &output),
            Err(CombineError::FileSave { .. })
        ));
        Ok(())
    }
}
