// Model Context Protocol server

pub mod server;
pub mod tools;

pub use server::McpServer;
