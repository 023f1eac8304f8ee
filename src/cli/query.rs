use anyhow::{Context, Result};
use std::path::Path;

use crate::cli::{settings, ParseArgs};
use crate::config::Config;
use crate::index::db::SymbolDatabase;
use crate::index::store::SymbolStore;
use crate::indexer::resolver::short_name;
use crate::query::{QueryEngine, QueryKind, Scope};

/// Run `query_type` against a loaded database. `tree` lists object files;
/// everything else is a scoped symbol query.
pub fn run_query(db: &SymbolDatabase, query_type: &str, scope: &Scope) -> Result<Vec<String>> {
    let engine = QueryEngine::new(db);
    if query_type == "tree" {
        return Ok(engine.file_tree());
    }
    Ok(engine.run(QueryKind::from_str(query_type)?, scope))
}

pub fn query_index(
    root: &Path,
    config: &Config,
    query_type: &str,
    file: Option<&str>,
    object: Option<&str>,
    format: &str,
) -> Result<()> {
    let settings = settings(root, config, &ParseArgs::default())?;
    let store = SymbolStore::open_existing(&settings.store_path).with_context(|| {
        format!("Run 'spintags index {}' first", root.display())
    })?;
    let db = store.load()?;

    // Without an explicit scope, look at the root file itself
    let root_name = short_name(&root.to_string_lossy()).to_string();
    let scope = Scope::new(Some(file.unwrap_or(&root_name)), object);
    let results = run_query(&db, query_type, &scope)?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&results)?),
        "text" => {
            for line in &results {
                println!("{}", line);
            }
        }
        _ => anyhow::bail!("Unknown format: {}", format),
    }

    Ok(())
}
