use std::fs;

use insta::assert_snapshot;
use segdoc::domain::model::MODULE_KEY;
use segdoc::{DocumentationMap, combine, combine_files, split, split_file};

const SAMPLE: &str = r#""""Utilities for greeting."""

import os


class Greeter:
    """Greets people.

    Keeps a default name.
    """

    default = os.environ.get("USER", "world")

    def greet(self, name=None):
        """Return a greeting."""
        return f"Hello, {name or self.default}!"

    @staticmethod
    def shout(text):
        return text.upper()


async def main():
    '''Entry point.'''
    print(Greeter().greet())
"#;

fn statements(code: &str) -> Vec<&str> {
    code.lines().filter(|line| !line.trim().is_empty()).collect()
}

#[test]
fn combine_after_split_preserves_docstrings_and_statements() {
    let first = split(SAMPLE).expect("sample parses");
    let combined = combine(&first.bare_code, &first.documentation);
    assert!(combined.mismatches.is_empty(), "{:?}", combined.mismatches);

    let again = split(&combined.code).expect("combined output parses");
    assert_eq!(again.documentation, first.documentation);
    assert_eq!(statements(&again.bare_code), statements(&first.bare_code));
}

#[test]
fn every_definition_has_a_documentation_entry() {
    let output = split(SAMPLE).unwrap();
    let names: Vec<&str> = output.documentation.keys().collect();
    assert_eq!(names, [MODULE_KEY, "Greeter", "greet", "shout", "main"]);
    assert!(output.documentation.len() >= output.definitions.len());
    assert_eq!(
        output.documentation.get("shout"),
        Some("<placeholder> Add documentation for FunctionDef")
    );
    assert_eq!(
        output.documentation.get("Greeter"),
        Some("Greets people.\n\nKeeps a default name.")
    );
}

#[test]
fn combined_sample_renders_blocks_in_place() {
    let first = split(SAMPLE).unwrap();
    let combined = combine(&first.bare_code, &first.documentation);
    assert_snapshot!(combined.code, @r#"
"""Utilities for greeting."""


import os


class Greeter:
    """Greets people.

    Keeps a default name.
    """

    default = os.environ.get("USER", "world")

    def greet(self, name=None):
        """Return a greeting."""
        return f"Hello, {name or self.default}!"

    @staticmethod
    def shout(text):
        """<placeholder> Add documentation for FunctionDef"""
        return text.upper()


async def main():
    """Entry point."""
    print(Greeter().greet())
"#);
}

#[test]
fn files_round_trip_through_disk() -> anyhow::Result<()> {
    let temp = tempfile::tempdir()?;
    let input = temp.path().join("scenario.py");
    fs::write(&input, "\"\"\"Mod.\"\"\"\n\ndef f():\n    \"\"\"F.\"\"\"\n    pass\n")?;

    let segmented = temp.path().join("segmented");
    let artifacts = split_file(&input, &segmented, ".barecode.py", ".docstring.py")?;
    assert_eq!(fs::read_to_string(&artifacts.barecode_path)?, "\ndef f():\n    pass\n");

    let map = DocumentationMap::from_json(&fs::read_to_string(&artifacts.docstring_path)?)?;
    assert_eq!(map.iter().collect::<Vec<_>>(), [("module", "Mod."), ("f", "F.")]);

    let restored = temp.path().join("restored/scenario.py");
    let combined = combine_files(&artifacts.barecode_path, &artifacts.docstring_path, &restored)?;
    assert!(combined.mismatches.is_empty());
    assert_snapshot!(fs::read_to_string(&restored)?, @r#"
"""Mod."""


def f():
    """F."""
    pass
"#);
    Ok(())
}

#[test]
fn partial_maps_warn_instead_of_failing() {
    let docs: DocumentationMap = [("module", "Mod."), ("ghost", "Nobody home.")]
        .into_iter()
        .collect();
    let combined = combine("def f():\n    pass\n", &docs);
    assert_eq!(combined.code, "\"\"\"Mod.\"\"\"\n\ndef f():\n    pass\n");
    let names: Vec<&str> = combined.mismatches.iter().map(|m| m.name()).collect();
    assert_eq!(names, ["f", "ghost"]);
}

#[test]
fn docstring_followed_by_statement_is_inserted_once() {
    let source = "def f():\n    \"\"\"D.\"\"\"; x = 1\n    return x\n";
    let first = split(source).unwrap();
    let combined = combine(&first.bare_code, &first.documentation);
    assert!(
        combined
            .code
            .ends_with("\n\ndef f():\n    \"\"\"D.\"\"\"\n    x = 1\n    return x\n"),
        "{:?}",
        combined.code
    );
    assert_eq!(combined.code.matches("D.").count(), 1);
}

#[test]
fn tab_indented_sources_round_trip() {
    let source = "class Tabs:\n\t\"\"\"Tabbed.\"\"\"\n\n\tdef run(self):\n\t\t\"\"\"Run.\"\"\"\n\t\treturn 1\n";
    let first = split(source).unwrap();
    let combined = combine(&first.bare_code, &first.documentation);
    let mismatched = combined.code.lines().any(|line| line.starts_with(" \t") || line.starts_with("    \""));
    assert!(!mismatched, "{:?}", combined.code);

    let again = split(&combined.code).unwrap();
    assert_eq!(again.documentation, first.documentation);
    assert_eq!(statements(&again.bare_code), statements(&first.bare_code));
}
