// MCP server implementation

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::io::{self, Write};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error, info};

use crate::index::ctags::write_ctags;
use crate::index::db::SymbolDatabase;
use crate::indexer::{IndexSettings, SpinParser};
use crate::mcp::tools;

/// JSON-RPC message
#[derive(Debug, Serialize, Deserialize)]
struct JsonRpcMessage {
    jsonrpc: String,
    id: Option<Value>,
    method: Option<String>,
    params: Option<Value>,
}

/// MCP tool definition
#[derive(Debug, Serialize, Deserialize)]
struct Tool {
    name: String,
    description: String,
    #[serde(rename = "inputSchema")]
    input_schema: Value,
}

/// MCP server capabilities
#[derive(Debug, Serialize, Deserialize)]
struct ServerCapabilities {
    tools: Option<Value>,
}

/// MCP server info
#[derive(Debug, Serialize, Deserialize)]
struct ServerInfo {
    name: String,
    version: String,
}

/// MCP initialize result
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InitializeResult {
    protocol_version: String,
    capabilities: ServerCapabilities,
    server_info: ServerInfo,
}

/// MCP server over one parsed Spin project
pub struct McpServer {
    settings: IndexSettings,
    db: SymbolDatabase,
}

impl McpServer {
    /// Parse the project once and serve from memory.
    pub fn new(settings: IndexSettings) -> Self {
        let mut server = Self {
            settings,
            db: SymbolDatabase::new(),
        };
        server.reparse();
        server
    }

    pub fn db(&self) -> &SymbolDatabase {
        &self.db
    }

    /// Replace the database with a fresh parse of the root.
    fn reparse(&mut self) {
        let mut parser = SpinParser::new(self.settings.mode);
        parser.parse(&self.settings.root, &self.settings.library);
        self.db = parser.into_db();

        if self.settings.ctags {
            if let Err(e) = write_ctags(&self.db, &self.settings.root) {
                error!("Failed to write tags: {}", e);
            }
        }
        info!("Parsed {}: {} tags", self.settings.root.display(), self.db.len());
    }

    /// Run the MCP server
    pub async fn run(mut self) -> Result<()> {
        info!("Starting MCP server");

        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            debug!("Received: {}", line);

            match self.handle_message(&line).await {
                Ok(Some(response)) => {
                    println!("{}", response);
                    io::stdout().flush()?;
                }
                Ok(None) => {}
                Err(e) => {
                    error!("Error handling message: {}", e);
                    let error_response = json!({
                        "jsonrpc": "2.0",
                        "id": null,
                        "error": {
                            "code": -32700,
                            "message": format!("Parse error: {}", e)
                        }
                    });
                    println!("{}", error_response);
                    io::stdout().flush()?;
                }
            }
        }

        info!("stdin closed, stopping MCP server");
        Ok(())
    }

    /// Handle a JSON-RPC message. Notifications get no response.
    pub async fn handle_message(&mut self, message: &str) -> Result<Option<String>> {
        let msg: JsonRpcMessage = serde_json::from_str(message)?;

        let Some(id) = msg.id else {
            debug!("Notification: {:?}", msg.method);
            return Ok(None);
        };

        let response = match msg.method.as_deref() {
            Some("initialize") => {
                let result = InitializeResult {
                    protocol_version: "2024-11-05".to_string(),
                    capabilities: ServerCapabilities {
                        tools: Some(json!({})),
                    },
                    server_info: ServerInfo {
                        name: env!("CARGO_PKG_NAME").to_string(),
                        version: env!("CARGO_PKG_VERSION").to_string(),
                    },
                };
                json!({ "jsonrpc": "2.0", "id": id, "result": result })
            }

            Some("tools/list") => {
                json!({ "jsonrpc": "2.0", "id": id, "result": { "tools": self.list_tools() } })
            }

            Some("tools/call") => match msg.params.as_ref().map(|p| self.call_tool(p)) {
                Some(Ok(result)) => json!({ "jsonrpc": "2.0", "id": id, "result": result }),
                Some(Err(e)) => json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "error": { "code": -32602, "message": e.to_string() }
                }),
                None => json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "error": { "code": -32602, "message": "Invalid params" }
                }),
            },

            Some("shutdown") => {
                info!("Received shutdown request");
                json!({ "jsonrpc": "2.0", "id": id, "result": null })
            }

            _ => json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": { "code": -32601, "message": "Method not found" }
            }),
        };

        Ok(Some(serde_json::to_string(&response)?))
    }

    /// List available tools
    fn list_tools(&self) -> Vec<Tool> {
        let mut list = vec![Tool {
            name: "spin_file_tree".to_string(),
            description: "Spin files of the object tree, root first".to_string(),
            input_schema: json!({ "type": "object", "properties": {} }),
        }];

        for (name, kind) in tools::QUERY_TOOLS {
            list.push(Tool {
                name: name.to_string(),
                description: format!("List {} of a file or object instance", kind),
                input_schema: tools::scope_schema(),
            });
        }

        list.push(Tool {
            name: "spin_reparse".to_string(),
            description: "Re-parse the project from its root file".to_string(),
            input_schema: json!({ "type": "object", "properties": {} }),
        });
        list
    }

    /// Call a tool
    fn call_tool(&mut self, params: &Value) -> Result<Value> {
        let tool_name = params["name"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("Missing tool name"))?;
        let empty = Map::new();
        let tool_args = params["arguments"].as_object().unwrap_or(&empty);

        match tool_name {
            "spin_file_tree" => Ok(tools::file_tree(&self.db)),
            "spin_reparse" => {
                self.reparse();
                Ok(tools::text_content(&[format!("{} tags", self.db.len())]))
            }
            name => match tools::query_kind(name) {
                Some(kind) => tools::query(&self.db, kind, tool_args),
                None => Err(anyhow::anyhow!("Unknown tool: {}", name)),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::ParseMode;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::{tempdir, TempDir};

    fn project() -> (TempDir, McpServer) {
        let dir = tempdir().unwrap();
        let root = dir.path().join("top.spin");
        fs::write(&root, "OBJ\n  ser : \"serial\"\nPUB main\n").unwrap();
        fs::write(dir.path().join("serial.spin"), "PUB tx(c)\n").unwrap();

        let server = McpServer::new(IndexSettings {
            store_path: dir.path().join(".spintags.db"),
            root,
            library: PathBuf::new(),
            mode: ParseMode::Full,
            ctags: false,
        });
        (dir, server)
    }

    async fn call(server: &mut McpServer, request: Value) -> Value {
        let response = server.handle_message(&request.to_string()).await.unwrap().unwrap();
        serde_json::from_str(&response).unwrap()
    }

    #[tokio::test]
    async fn test_initialize() {
        let (_dir, mut server) = project();
        let response = call(&mut server, json!({"jsonrpc": "2.0", "id": 1, "method": "initialize"})).await;
        assert_eq!(response["result"]["protocolVersion"], "2024-11-05");
        assert_eq!(response["result"]["serverInfo"]["name"], "spintags");
    }

    #[tokio::test]
    async fn test_notification_has_no_response() {
        let (_dir, mut server) = project();
        let message = json!({"jsonrpc": "2.0", "method": "notifications/initialized"}).to_string();
        assert!(server.handle_message(&message).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_tools_list() {
        let (_dir, mut server) = project();
        let response = call(&mut server, json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"})).await;
        let names: Vec<&str> = response["result"]["tools"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert_eq!(names.len(), 8);
        assert_eq!(names.first(), Some(&"spin_file_tree"));
        assert_eq!(names.last(), Some(&"spin_reparse"));
        assert!(response["result"]["tools"][1]["inputSchema"].is_object());
    }

    #[tokio::test]
    async fn test_tool_calls() {
        let (_dir, mut server) = project();
        let tree = call(
            &mut server,
            json!({"jsonrpc": "2.0", "id": 3, "method": "tools/call", "params": {"name": "spin_file_tree"}}),
        )
        .await;
        assert_eq!(tree["result"]["content"][0]["text"], "top.spin\nserial.spin");

        let methods = call(
            &mut server,
            json!({
                "jsonrpc": "2.0", "id": 4, "method": "tools/call",
                "params": {"name": "spin_methods", "arguments": {"object": "ser"}}
            }),
        )
        .await;
        assert_eq!(methods["result"]["content"][0]["text"], "f\tPUB tx(c)");

        let unknown = call(
            &mut server,
            json!({"jsonrpc": "2.0", "id": 5, "method": "tools/call", "params": {"name": "spin_callers"}}),
        )
        .await;
        assert_eq!(unknown["error"]["code"], -32602);
    }

    #[tokio::test]
    async fn test_reparse_picks_up_changes() {
        let (dir, mut server) = project();
        assert!(server.db().get("root:extra").is_none());

        fs::write(dir.path().join("top.spin"), "PUB main\nPUB extra\n").unwrap();
        call(
            &mut server,
            json!({"jsonrpc": "2.0", "id": 6, "method": "tools/call", "params": {"name": "spin_reparse"}}),
        )
        .await;
        assert!(server.db().get("root:extra").is_some());
        assert!(server.db().get("root/ser:tx").is_none());
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let (_dir, mut server) = project();
        let response = call(&mut server, json!({"jsonrpc": "2.0", "id": 7, "method": "resources/list"})).await;
        assert_eq!(response["error"]["code"], -32601);
    }
}
