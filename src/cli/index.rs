use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

use crate::cli::{settings, ParseArgs};
use crate::config::Config;
use crate::indexer::run_index;
use crate::indexer::watcher::start_watcher;

pub async fn index_project(root: &Path, config: &Config, args: &ParseArgs, watch: bool) -> Result<()> {
    let settings = settings(root, config, args)?;
    info!("Indexing {} ({} mode)", root.display(), settings.mode.as_str());

    if !settings.root.is_file() {
        anyhow::bail!("Root file {} does not exist", settings.root.display());
    }

    let summary = run_index(&settings).with_context(|| format!("Failed to index {}", root.display()))?;

    println!("Indexed {}", settings.root.display());
    println!("  Files: {}", summary.files.len());
    println!("  Objects: {}", summary.objects);
    println!("  Tags: {}", summary.tags);
    println!("  Store: {}", settings.store_path.display());
    if let Some(tags) = &summary.ctags {
        println!("  Ctags: {}", tags.display());
    }

    if watch {
        println!("\nWatching for changes. Press Ctrl+C to stop.");
        start_watcher(settings).await?;
    }

    Ok(())
}
