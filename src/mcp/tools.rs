// MCP tool handlers

use anyhow::Result;
use serde_json::{json, Map, Value};

use crate::index::db::SymbolDatabase;
use crate::query::{QueryEngine, QueryKind, Scope};

/// Tools that run one query against the parsed database.
pub const QUERY_TOOLS: [(&str, QueryKind); 6] = [
    ("spin_symbols", QueryKind::Symbols),
    ("spin_constants", QueryKind::Constants),
    ("spin_methods", QueryKind::Methods),
    ("spin_dat", QueryKind::Dat),
    ("spin_vars", QueryKind::Vars),
    ("spin_objects", QueryKind::Objects),
];

pub fn query_kind(tool_name: &str) -> Option<QueryKind> {
    QUERY_TOOLS
        .iter()
        .find(|(name, _)| *name == tool_name)
        .map(|(_, kind)| *kind)
}

/// Wrap lines as an MCP text result.
pub fn text_content(lines: &[String]) -> Value {
    json!({
        "content": [{
            "type": "text",
            "text": lines.join("\n")
        }]
    })
}

/// File tree tool handler
pub fn file_tree(db: &SymbolDatabase) -> Value {
    text_content(&QueryEngine::new(db).file_tree())
}

/// Query tool handler. Takes optional `file` and `object` arguments;
/// at least one is required.
pub fn query(db: &SymbolDatabase, kind: QueryKind, args: &Map<String, Value>) -> Result<Value> {
    let file = args.get("file").and_then(|v| v.as_str());
    let object = args.get("object").and_then(|v| v.as_str());

    if file.unwrap_or_default().is_empty() && object.unwrap_or_default().is_empty() {
        anyhow::bail!("{} needs a file or object argument", kind);
    }

    let scope = Scope::new(file, object);
    Ok(text_content(&QueryEngine::new(db).run(kind, &scope)))
}

/// Schema shared by the query tools.
pub fn scope_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "file": {
                "type": "string",
                "description": "Source file name to scope by (case-insensitive substring)"
            },
            "object": {
                "type": "string",
                "description": "Object instance name to scope by; takes precedence over file"
            }
        }
    })
}
