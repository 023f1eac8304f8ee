// Query layer over a parsed symbol database

pub mod engine;

pub use engine::{QueryEngine, QueryKind, Scope};
