use anyhow::{Context, Result};
use std::path::Path;

use crate::cli::{settings, ParseArgs};
use crate::config::Config;
use crate::index::store::SymbolStore;
use crate::index::SymbolKind;

pub fn show_stats(root: &Path, config: &Config, verbose: bool) -> Result<()> {
    let settings = settings(root, config, &ParseArgs::default())?;
    let store = SymbolStore::open_existing(&settings.store_path).with_context(|| {
        format!("Run 'spintags index {}' first", root.display())
    })?;
    let db = store.load()?;
    let stats = db.stats();

    println!("Index: {}", store.path().display());
    if let Some(indexed_root) = store.meta("root")? {
        println!("Root: {}", indexed_root);
    }
    if let Some(mode) = store.meta("mode")? {
        println!("Mode: {}", mode);
    }
    if let Some(at) = store.meta("last_full_index")? {
        println!("Indexed: {}", format_timestamp(&at));
    }

    println!("\nTags: {}", stats.total_tags);
    println!("Objects: {}", stats.total_objects);
    println!("Files: {}", stats.total_files);

    let counts = store.counts_by_kind()?;
    if !counts.is_empty() {
        println!("\nBy kind:");
        for (letter, count) in counts {
            let label = letter
                .chars()
                .next()
                .and_then(SymbolKind::from_letter)
                .map(|kind| kind.description())
                .unwrap_or("unknown");
            println!("  {} {:<14} {}", letter, label, count);
        }
    }

    if verbose {
        println!("\nSources:");
        for source in store.sources()? {
            println!(
                "  {} ({} tags, {})",
                source.path,
                source.tag_count,
                &source.content_hash[..source.content_hash.len().min(12)]
            );
        }
    }

    Ok(())
}

/// Render stored unix seconds; anything unparsable is shown as is.
fn format_timestamp(value: &str) -> String {
    value
        .parse::<i64>()
        .ok()
        .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
        .map(|at| at.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp("0"), "1970-01-01 00:00:00 UTC");
        assert_eq!(format_timestamp("yesterday"), "yesterday");
    }
}
