// Tag records, hierarchical keys and symbol storage

pub mod ctags;
pub mod db;
pub mod schema;
pub mod store;

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Separates the object node from the symbol name in a database key.
pub const KEY_ELEMENT_SEP: char = ':';

/// Separates object instances inside the node part of a key.
pub const NODE_SEP: char = '/';

/// Node prefix of the top-level file.
pub const ROOT_NODE: &str = "root";

/// Errors raised by the storage side of the index.
///
/// Parsing itself never fails; these only come from persisting or
/// exporting a database.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("No index found at {0}")]
    MissingIndex(PathBuf),
}

pub type Result<T> = std::result::Result<T, IndexError>;

/// Symbol kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    None,
    Const,
    Pub,
    Pri,
    Object,
    Var,
    Dat,
    EnumConst,
}

impl SymbolKind {
    /// Kinds that can appear in a stored tag.
    pub const TAGGED: [SymbolKind; 7] = [
        SymbolKind::Const,
        SymbolKind::EnumConst,
        SymbolKind::Pub,
        SymbolKind::Pri,
        SymbolKind::Object,
        SymbolKind::Var,
        SymbolKind::Dat,
    ];

    /// Single-character letter written into field 4 of a tag record.
    pub fn letter(&self) -> char {
        match self {
            SymbolKind::None => 'n',
            SymbolKind::Const => 'c',
            SymbolKind::Pub => 'f',
            SymbolKind::Pri => 'p',
            SymbolKind::Object => 'o',
            SymbolKind::Var => 'v',
            SymbolKind::Dat => 'x',
            SymbolKind::EnumConst => 'e',
        }
    }

    pub fn from_letter(letter: char) -> Option<Self> {
        Self::TAGGED.into_iter().find(|k| k.letter() == letter)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::None => "none",
            SymbolKind::Const => "constant",
            SymbolKind::Pub => "public",
            SymbolKind::Pri => "private",
            SymbolKind::Object => "obj",
            SymbolKind::Var => "var",
            SymbolKind::Dat => "dat",
            SymbolKind::EnumConst => "enum",
        }
    }

    /// Plural label used when listing a kind.
    pub fn description(&self) -> &'static str {
        match self {
            SymbolKind::None => "none",
            SymbolKind::Const => "constants",
            SymbolKind::Pub => "methods",
            SymbolKind::Pri => "functions",
            SymbolKind::Object => "objects",
            SymbolKind::Var => "variables",
            SymbolKind::Dat => "dat",
            SymbolKind::EnumConst => "enumerations",
        }
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// One discovered symbol: `name \t sourceFile \t originalLine \t kindLetter`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRecord {
    pub name: String,
    pub file: String,
    pub line: String,
    pub kind: SymbolKind,
}

impl TagRecord {
    pub fn new(name: impl Into<String>, file: impl Into<String>, line: impl Into<String>, kind: SymbolKind) -> Self {
        Self {
            name: name.into(),
            file: file.into(),
            line: line.into(),
            kind,
        }
    }

    /// Parse the tab-separated form. Anything other than four fields with a
    /// known kind letter is rejected.
    #[cfg(test)]
    pub fn parse(value: &str) -> Option<Self> {
        let mut fields = value.split('\t');
        let name = fields.next()?;
        let file = fields.next()?;
        let line = fields.next()?;
        let letter = fields.next()?;
        if fields.next().is_some() {
            return None;
        }

        let mut chars = letter.chars();
        let kind = SymbolKind::from_letter(chars.next()?)?;
        if chars.next().is_some() {
            return None;
        }

        Some(Self::new(name, file, line, kind))
    }

    /// `kindLetter \t originalLine`, the form handed to editors.
    pub fn display_form(&self) -> String {
        format!("{}\t{}", self.kind.letter(), self.line)
    }

    /// `kindLetter \t name`, used where several tags share one source line.
    pub fn display_name(&self) -> String {
        format!("{}\t{}", self.kind.letter(), self.name)
    }
}

impl fmt::Display for TagRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}\t{}\t{}", self.name, self.file, self.line, self.kind.letter())
    }
}

/// `node:name`
pub fn symbol_key(node: &str, name: &str) -> String {
    format!("{}{}{}", node, KEY_ELEMENT_SEP, name)
}

/// Node of an object instance declared inside `parent`.
pub fn child_node(parent: &str, instance: &str) -> String {
    format!("{}{}{}", parent, NODE_SEP, instance)
}

/// Object instance rows are keyed `…/name:name`.
pub fn is_object_key(key: &str) -> bool {
    let last = key.rsplit(NODE_SEP).next().unwrap_or(key);
    match last.split_once(KEY_ELEMENT_SEP) {
        Some((left, right)) => !left.is_empty() && left == right,
        None => false,
    }
}

/// Instance name and referenced file of an `OBJECT` tag.
///
/// The file is the first quoted string of the original line, with `.spin`
/// appended when the reference omits it.
pub fn object_info(tag: &TagRecord) -> Option<(String, String)> {
    let name = tag.name.trim().to_string();

    let (_, rest) = tag.line.split_once('"')?;
    let (file, _) = rest.split_once('"')?;
    let mut file = file.trim().to_string();
    if file.is_empty() {
        return None;
    }
    if !file.to_lowercase().contains(".spin") {
        file.push_str(".spin");
    }

    Some((name, file))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_record_round_trip() {
        let tag = TagRecord::new("MAX", "top.spin", "MAX = 100", SymbolKind::Const);
        let text = tag.to_string();
        assert_eq!(text, "MAX\ttop.spin\tMAX = 100\tc");
        assert_eq!(text.matches('\t').count(), 3);
        assert_eq!(TagRecord::parse(&text), Some(tag));
    }

    #[test]
    fn test_tag_record_rejects_malformed() {
        assert!(TagRecord::parse("a\tb\tc").is_none());
        assert!(TagRecord::parse("a\tb\tc\tq").is_none());
        assert!(TagRecord::parse("a\tb\tc\tc\textra").is_none());
        assert!(TagRecord::parse("a\tb\tc\tcc").is_none());
    }

    #[test]
    fn test_letters_are_stable() {
        let letters: String = SymbolKind::TAGGED.iter().map(|k| k.letter()).collect();
        assert_eq!(letters, "cefpovx");
        for kind in SymbolKind::TAGGED {
            assert_eq!(SymbolKind::from_letter(kind.letter()), Some(kind));
        }
        assert_eq!(SymbolKind::from_letter('n'), None);
    }

    #[test]
    fn test_keys() {
        let node = child_node(ROOT_NODE, "lcd");
        assert_eq!(node, "root/lcd");
        assert_eq!(symbol_key(&node, "show"), "root/lcd:show");

        assert!(is_object_key("root/lcd:lcd"));
        assert!(is_object_key("root/a/b:b"));
        assert!(!is_object_key("root/lcd:show"));
        assert!(!is_object_key("root:MAX"));
        assert!(!is_object_key("root"));
    }

    #[test]
    fn test_object_info() {
        let tag = TagRecord::new("lcd", "top.spin", "lcd : \"display\"", SymbolKind::Object);
        assert_eq!(object_info(&tag), Some(("lcd".to_string(), "display.spin".to_string())));

        let tag = TagRecord::new("ser", "top.spin", "ser[2] : \"lib/Serial.SPIN\"", SymbolKind::Object);
        assert_eq!(object_info(&tag), Some(("ser".to_string(), "lib/Serial.SPIN".to_string())));

        let tag = TagRecord::new("x", "top.spin", "x : nothing quoted", SymbolKind::Object);
        assert_eq!(object_info(&tag), None);
    }
}
