use anyhow::Result;
use std::path::Path;
use tracing::info;

use crate::cli::{settings, ParseArgs};
use crate::config::Config;
use crate::mcp::McpServer;

/// Start MCP server with stdio transport
pub async fn serve_stdio(root: &Path, config: &Config, args: &ParseArgs) -> Result<()> {
    let settings = settings(root, config, args)?;
    info!("MCP server (stdio) for {}", root.display());

    let server = McpServer::new(settings);
    if server.db().is_empty() {
        eprintln!("Warning: no symbols found under {}", root.display());
    }

    server.run().await
}
