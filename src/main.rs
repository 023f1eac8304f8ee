use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod cli;
mod config;
mod index;
mod indexer;
mod mcp;
mod query;

use cli::ParseArgs;
use config::{Config, LoggingConfig};

#[derive(Parser)]
#[command(name = "spintags")]
#[command(version)]
#[command(about = "Symbol index and object tree for Propeller Spin projects", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the object tree of a root file
    Tree {
        /// Root Spin file
        root: PathBuf,

        #[command(flatten)]
        parse: ParseArgs,
    },

    /// Parse a root file and save its symbols
    Index {
        /// Root Spin file
        root: PathBuf,

        #[command(flatten)]
        parse: ParseArgs,

        /// Re-index whenever a .spin file changes
        #[arg(short, long)]
        watch: bool,
    },

    /// Query a saved index
    Query {
        /// Query type: tree, symbols, constants, methods, dat, vars, objects
        query_type: String,

        /// Root Spin file the index was built from
        root: PathBuf,

        /// Scope by source file name (defaults to the root file)
        #[arg(short, long)]
        file: Option<String>,

        /// Scope by object instance name
        #[arg(short, long)]
        object: Option<String>,

        /// Output format: json, text
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Show index statistics
    Stats {
        /// Root Spin file the index was built from
        root: PathBuf,

        /// List indexed source files
        #[arg(short = 's', long)]
        sources: bool,
    },

    /// Serve the index to editors over MCP (stdio)
    Serve {
        /// Root Spin file
        root: PathBuf,

        #[command(flatten)]
        parse: ParseArgs,
    },
}

impl Commands {
    fn root(&self) -> &Path {
        match self {
            Commands::Tree { root, .. }
            | Commands::Index { root, .. }
            | Commands::Query { root, .. }
            | Commands::Stats { root, .. }
            | Commands::Serve { root, .. } => root,
        }
    }
}

fn init_logging(debug: bool, verbose: bool, logging: &LoggingConfig) {
    let level = if debug {
        "debug"
    } else if verbose {
        "info"
    } else {
        logging.level.as_str()
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // stdout carries query results and MCP responses
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if logging.format == "pretty" {
        builder.pretty().init();
    } else {
        builder.compact().init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::for_root(cli.command.root());

    init_logging(cli.debug, cli.verbose, &config.logging);

    info!("spintags v{} starting...", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Tree { root, parse } => {
            cli::tree::show_tree(&root, &config, &parse)?;
        }

        Commands::Index { root, parse, watch } => {
            cli::index::index_project(&root, &config, &parse, watch).await?;
        }

        Commands::Query {
            query_type,
            root,
            file,
            object,
            format,
        } => {
            cli::query::query_index(
                &root,
                &config,
                &query_type,
                file.as_deref(),
                object.as_deref(),
                &format,
            )?;
        }

        Commands::Stats { root, sources } => {
            cli::stats::show_stats(&root, &config, sources || cli.verbose)?;
        }

        Commands::Serve { root, parse } => {
            info!("Starting MCP server for {}", root.display());
            cli::serve::serve_stdio(&root, &config, &parse).await?;
        }
    }

    Ok(())
}
