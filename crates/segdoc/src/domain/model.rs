//! Domain models for definitions, documentation maps, and mismatches.

use std::collections::HashMap;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Key reserved for the file-level docstring.
pub const MODULE_KEY: &str = "module";

/// Kind of construct a docstring can be attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstructKind {
    Module,
    ClassDef,
    FunctionDef,
    AsyncFunctionDef,
}

impl ConstructKind {
    /// Name used when synthesizing placeholder documentation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConstructKind::Module => "Module",
            ConstructKind::ClassDef => "ClassDef",
            ConstructKind::FunctionDef => "FunctionDef",
            ConstructKind::AsyncFunctionDef => "AsyncFunctionDef",
        }
    }

    /// Placeholder recorded for definitions without a docstring.
    pub fn placeholder(&self) -> String {
        format!("<placeholder> Add documentation for {}", self.as_str())
    }
}

impl fmt::Display for ConstructKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A module, class, or function found while splitting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinitionNode {
    pub name: String,
    pub kind: ConstructKind,
    /// Column of the header; always 0 for the module.
    pub indent: usize,
    pub docstring: Option<String>,
}

impl DefinitionNode {
    /// Documentation recorded for this definition, falling back to a placeholder.
    pub fn documentation(&self) -> String {
        match self.docstring.as_deref() {
            Some(text) if !text.is_empty() => text.to_owned(),
            _ => self.kind.placeholder(),
        }
    }
}

/// Name-keyed docstrings in insertion order.
///
/// Serializes as a flat JSON object. The first insertion of a name wins; later
/// inserts with the same name are rejected so callers can report the collision.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentationMap {
    entries: Vec<(String, String)>,
    index: HashMap<String, usize>,
}

impl DocumentationMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `text` under `name`. Returns `false` when the name is already taken.
    pub fn insert(&mut self, name: impl Into<String>, text: impl Into<String>) -> bool {
        let name = name.into();
        if self.index.contains_key(&name) {
            return false;
        }
        self.index.insert(name.clone(), self.entries.len());
        self.entries.push((name, text.into()));
        true
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.index
            .get(name)
            .map(|&slot| self.entries[slot].1.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, text)| (name.as_str(), text.as_str()))
    }

    /// Render the map as the pretty-printed JSON stored in docstring files.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Parse a docstring file's contents.
    pub fn from_json(contents: &str) -> serde_json::Result<Self> {
        serde_json::from_str(contents)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for DocumentationMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (name, text) in iter {
            map.insert(name, text);
        }
        map
    }
}

impl Serialize for DocumentationMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, text) in &self.entries {
            map.serialize_entry(name, text)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for DocumentationMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct MapVisitor;

        impl<'de> Visitor<'de> for MapVisitor {
            type Value = DocumentationMap;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object mapping definition names to docstrings")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut map = DocumentationMap::new();
                while let Some((name, text)) = access.next_entry::<String, String>()? {
                    map.insert(name, text);
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(MapVisitor)
    }
}

/// Recoverable disagreement between bare code and documentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mismatch {
    /// A header has no entry in the documentation map.
    MissingDocumentation { name: String, line: usize },
    /// A documentation entry matched no header.
    UnmatchedKey { name: String },
    /// A header keeps its body on the same line, leaving no room for a block.
    InlineBody { name: String, line: usize },
    /// A later definition reused a name already recorded while splitting.
    DuplicateName { name: String },
}

impl Mismatch {
    pub fn name(&self) -> &str {
        match self {
            Mismatch::MissingDocumentation { name, .. }
            | Mismatch::UnmatchedKey { name }
            | Mismatch::InlineBody { name, .. }
            | Mismatch::DuplicateName { name } => name,
        }
    }
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mismatch::MissingDocumentation { name, line } => {
                write!(f, "docstring not found for '{name}' (line {line})")
            }
            Mismatch::UnmatchedKey { name } => {
                write!(f, "docstring for '{name}' has no matching definition")
            }
            Mismatch::InlineBody { name, line } => {
                write!(f, "'{name}' has an inline body on line {line}; docstring not inserted")
            }
            Mismatch::DuplicateName { name } => {
                write!(f, "definition name '{name}' appears more than once; keeping the first")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_insert_wins() {
        let mut map = DocumentationMap::new();
        assert!(map.insert("method", "First."));
        assert!(!map.insert("method", "Second."));
        assert_eq!(map.get("method"), Some("First."));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn json_keeps_insertion_order() {
        let map: DocumentationMap = [("module", "Mod."), ("zeta", "Z."), ("alpha", "A.")]
            .into_iter()
            .collect();
        let json = map.to_json().unwrap();
        let module_at = json.find("\"module\"").unwrap();
        let zeta_at = json.find("\"zeta\"").unwrap();
        let alpha_at = json.find("\"alpha\"").unwrap();
        assert!(module_at < zeta_at && zeta_at < alpha_at);

        let parsed = DocumentationMap::from_json(&json).unwrap();
        assert_eq!(parsed, map);
        assert_eq!(parsed.keys().collect::<Vec<_>>(), ["module", "zeta", "alpha"]);
    }

    #[test]
    fn rejects_non_string_values() {
        assert!(DocumentationMap::from_json(r#"{"f": 3}"#).is_err());
        assert!(DocumentationMap::from_json(r#"["f", "g"]"#).is_err());
        assert!(DocumentationMap::from_json("This is not a mapping").is_err());
    }

    #[test]
    fn empty_docstring_falls_back_to_placeholder() {
        let node = DefinitionNode {
            name: "Thing".into(),
            kind: ConstructKind::ClassDef,
            indent: 0,
            docstring: Some(String::new()),
        };
        assert_eq!(node.documentation(), "<placeholder> Add documentation for ClassDef");
    }
}
