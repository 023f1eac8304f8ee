// CLI command implementations

use std::path::Path;

use clap::Args;

use crate::config::{Config, Overrides};
use crate::indexer::IndexSettings;

pub mod index;
pub mod query;
pub mod serve;
pub mod stats;
pub mod tree;

/// Options shared by every command that parses sources.
#[derive(Debug, Clone, Default, Args)]
pub struct ParseArgs {
    /// Library directory searched for objects
    #[arg(short, long)]
    pub library: Option<String>,

    /// Parse mode: full, tree
    #[arg(short, long)]
    pub mode: Option<String>,

    /// Write a ctags file next to the root
    #[arg(long)]
    pub ctags: bool,
}

impl ParseArgs {
    fn overrides(&self) -> Overrides {
        Overrides {
            library: self.library.clone(),
            mode: self.mode.clone(),
            ctags: self.ctags,
        }
    }
}

/// Index settings for `root` from its config file and the command line.
pub fn settings(root: &Path, config: &Config, args: &ParseArgs) -> anyhow::Result<IndexSettings> {
    config.index_settings(root, &args.overrides())
}
