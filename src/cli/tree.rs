use anyhow::Result;
use std::path::Path;
use tracing::info;

use crate::cli::{settings, ParseArgs};
use crate::config::Config;
use crate::indexer::SpinParser;

/// Print the object tree of `root`, one file per line.
pub fn show_tree(root: &Path, config: &Config, args: &ParseArgs) -> Result<()> {
    let settings = settings(root, config, args)?;
    info!("Building object tree for {}", root.display());

    let mut parser = SpinParser::new(settings.mode);
    let files = parser.file_tree(&settings.root, &settings.library);
    if files.is_empty() {
        anyhow::bail!("Cannot read {}", root.display());
    }

    for file in files {
        println!("{}", file);
    }
    Ok(())
}
