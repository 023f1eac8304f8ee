// Query execution engine

use std::fmt;

use crate::index::db::SymbolDatabase;
use crate::index::{SymbolKind, TagRecord, KEY_ELEMENT_SEP};

/// Which part of the database a query looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Tags whose serialized value mentions this file name.
    File(String),
    /// Tags keyed under an object instance of this name.
    Object(String),
}

impl Scope {
    /// An object name wins over a file name when both are given.
    pub fn new(file: Option<&str>, object: Option<&str>) -> Self {
        match object.filter(|o| !o.is_empty()) {
            Some(object) => Scope::Object(object.to_string()),
            None => Scope::File(file.unwrap_or_default().to_string()),
        }
    }

    fn matches(&self, key: &str, tag: &TagRecord) -> bool {
        match self {
            Scope::Object(object) => {
                let needle = format!("{}{}", object, KEY_ELEMENT_SEP).to_lowercase();
                key.to_lowercase().contains(&needle)
            }
            Scope::File(file) => tag.to_string().to_lowercase().contains(&file.to_lowercase()),
        }
    }
}

/// Query types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Symbols,
    Constants,
    Methods,
    Dat,
    Vars,
    Objects,
}

impl QueryKind {
    pub const ALL: [QueryKind; 6] = [
        QueryKind::Symbols,
        QueryKind::Constants,
        QueryKind::Methods,
        QueryKind::Dat,
        QueryKind::Vars,
        QueryKind::Objects,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QueryKind::Symbols => "symbols",
            QueryKind::Constants => "constants",
            QueryKind::Methods => "methods",
            QueryKind::Dat => "dat",
            QueryKind::Vars => "vars",
            QueryKind::Objects => "objects",
        }
    }

    pub fn from_str(s: &str) -> anyhow::Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| anyhow::anyhow!("Unknown query type: {}", s))
    }
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only queries over a `SymbolDatabase`. Results are display forms in
/// key order.
pub struct QueryEngine<'a> {
    db: &'a SymbolDatabase,
}

impl<'a> QueryEngine<'a> {
    pub fn new(db: &'a SymbolDatabase) -> Self {
        Self { db }
    }

    /// Object files in discovery order, root first.
    pub fn file_tree(&self) -> Vec<String> {
        self.db.spin_files().to_vec()
    }

    pub fn run(&self, kind: QueryKind, scope: &Scope) -> Vec<String> {
        match kind {
            QueryKind::Symbols => self.symbols(scope),
            QueryKind::Constants => self.constants(scope),
            QueryKind::Methods => self.methods(scope),
            QueryKind::Dat => self.dat(scope),
            QueryKind::Vars => self.vars(scope),
            QueryKind::Objects => self.objects(scope),
        }
    }

    /// Every symbol in scope.
    pub fn symbols(&self, scope: &Scope) -> Vec<String> {
        self.filtered(scope, |_| true)
            .map(TagRecord::display_form)
            .collect()
    }

    /// Named constants by line, enum members by name.
    pub fn constants(&self, scope: &Scope) -> Vec<String> {
        self.filtered(scope, |kind| matches!(kind, SymbolKind::Const | SymbolKind::EnumConst))
            .map(|tag| match tag.kind {
                SymbolKind::EnumConst => tag.display_name(),
                _ => tag.display_form(),
            })
            .collect()
    }

    /// Methods; object declarations are included when scoped by file.
    pub fn methods(&self, scope: &Scope) -> Vec<String> {
        let with_objects = matches!(scope, Scope::File(_));
        self.filtered(scope, move |kind| match kind {
            SymbolKind::Pub | SymbolKind::Pri => true,
            SymbolKind::Object => with_objects,
            _ => false,
        })
        .map(TagRecord::display_form)
        .collect()
    }

    pub fn dat(&self, scope: &Scope) -> Vec<String> {
        self.of_kind(scope, SymbolKind::Dat)
    }

    pub fn vars(&self, scope: &Scope) -> Vec<String> {
        self.of_kind(scope, SymbolKind::Var)
    }

    pub fn objects(&self, scope: &Scope) -> Vec<String> {
        self.of_kind(scope, SymbolKind::Object)
    }

    fn of_kind(&self, scope: &Scope, wanted: SymbolKind) -> Vec<String> {
        self.filtered(scope, move |kind| kind == wanted)
            .map(TagRecord::display_form)
            .collect()
    }

    fn filtered<'s, F>(&'s self, scope: &'s Scope, keep: F) -> impl Iterator<Item = &'a TagRecord> + 's
    where
        F: Fn(SymbolKind) -> bool + 's,
    {
        let db: &'a SymbolDatabase = self.db;
        db.iter()
            .filter(move |(key, tag)| keep(tag.kind) && scope.matches(key, tag))
            .map(|(_, tag)| tag)
    }
}
