// Spin source walking and index runs

pub mod lexer;
pub mod parser;
pub mod resolver;
pub mod watcher;

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::index::ctags::write_ctags;
use crate::index::db::SymbolDatabase;
use crate::index::store::{SourceFile, SymbolStore};
use crate::index::{child_node, is_object_key, symbol_key, SymbolKind, ROOT_NODE};
use lexer::{classify, clean_line, decode_source, split_lines, CommentStripper};
use parser::{extractor_for, Extraction};
use resolver::{short_name, FileResolver};

/// Which sections the walker extracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParseMode {
    /// Every section's symbols.
    #[serde(rename = "full")]
    Full,
    /// Only `OBJ` declarations, enough to build the object tree.
    #[serde(rename = "tree")]
    TreeOnly,
}

impl Default for ParseMode {
    fn default() -> Self {
        if cfg!(feature = "autocomplete") {
            ParseMode::Full
        } else {
            ParseMode::TreeOnly
        }
    }
}

impl ParseMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParseMode::Full => "full",
            ParseMode::TreeOnly => "tree",
        }
    }

    pub fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "full" => Ok(ParseMode::Full),
            "tree" => Ok(ParseMode::TreeOnly),
            _ => anyhow::bail!("Unknown parse mode: {}", s),
        }
    }
}

/// Walks a Spin object graph and fills a `SymbolDatabase`.
///
/// Each `parse` starts from an empty database. Object references are
/// resolved and parsed recursively under `parent/instance` key prefixes; a
/// reference back to a file that is still being parsed further up the
/// chain is recorded but not followed.
pub struct SpinParser {
    mode: ParseMode,
    db: SymbolDatabase,
    resolver: FileResolver,
    sources: Vec<SourceFile>,
}

impl SpinParser {
    pub fn new(mode: ParseMode) -> Self {
        Self {
            mode,
            db: SymbolDatabase::new(),
            resolver: FileResolver::default(),
            sources: Vec::new(),
        }
    }

    pub fn db(&self) -> &SymbolDatabase {
        &self.db
    }

    pub fn into_db(self) -> SymbolDatabase {
        self.db
    }

    /// Files read by the last parse, in the order they were entered.
    pub fn sources(&self) -> &[SourceFile] {
        &self.sources
    }

    /// Parse `root` and everything it references, searching `library` for
    /// objects that are not found next to their referrer.
    pub fn parse(&mut self, root: &Path, library: &Path) -> &SymbolDatabase {
        self.db.clear();
        self.sources.clear();
        self.resolver = FileResolver::new(library);

        info!("Parsing {} ({} mode)", root.display(), self.mode.as_str());

        if root.is_file() {
            self.db.push_spin_file(short_name(&root.to_string_lossy()));
            let mut ancestors = Vec::new();
            self.find_spin_tags(root, ROOT_NODE, &mut ancestors);
        } else {
            debug!("Root file {} not found", root.display());
        }

        &self.db
    }

    /// Parse and return the object tree: root file name first, then one
    /// entry per object instance in discovery order.
    pub fn file_tree(&mut self, root: &Path, library: &Path) -> Vec<String> {
        self.parse(root, library);
        self.db.spin_files().to_vec()
    }

    fn find_spin_tags(&mut self, file: &Path, node: &str, ancestors: &mut Vec<PathBuf>) {
        let canonical = fs::canonicalize(file).unwrap_or_else(|_| file.to_path_buf());
        if ancestors.contains(&canonical) {
            debug!("Not following cyclic reference to {} at {}", file.display(), node);
            return;
        }

        let bytes = match fs::read(file) {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!("Could not read {}: {}", file.display(), e);
                return;
            }
        };

        debug!("Entering {} as {}", file.display(), node);
        ancestors.push(canonical);

        let text = decode_source(&bytes);
        let file_name = file.to_string_lossy().to_string();
        let mut state = SymbolKind::Const;
        let mut stripper = CommentStripper::new();
        let mut tag_count = 0;

        for raw in split_lines(&text) {
            let line = clean_line(&stripper.strip(raw));
            if line.is_empty() {
                continue;
            }

            let section = classify(&line);
            if section != SymbolKind::None {
                state = section;
            }

            if self.mode == ParseMode::TreeOnly && state != SymbolKind::Object {
                continue;
            }

            let Some(extractor) = extractor_for(state) else {
                continue;
            };
            for extraction in extractor(&line, &file_name) {
                if self.store(extraction, node, file, ancestors) {
                    tag_count += 1;
                }
            }
        }

        ancestors.pop();
        if stripper.in_block() {
            debug!("{} ends inside an unclosed block comment", file.display());
        }

        if !self.sources.iter().any(|s| s.path == file_name) {
            self.sources.push(SourceFile {
                path: file_name,
                content_hash: blake3::hash(&bytes).to_string(),
                tag_count,
            });
        }
    }

    /// Put one extraction into the database; objects are resolved and walked.
    fn store(&mut self, extraction: Extraction, node: &str, file: &Path, ancestors: &mut Vec<PathBuf>) -> bool {
        match extraction {
            Extraction::Tag(tag) => {
                let key = symbol_key(node, &tag.name);
                if is_object_key(&key) && self.db.get(&key).is_some_and(|t| t.kind == SymbolKind::Object) {
                    debug!("Keeping object row {} over {} {}", key, tag.kind, tag.name);
                    return false;
                }
                trace!("{} {}", tag.kind, key);
                self.db.insert(key, tag);
                true
            }
            Extraction::WeakTag(tag) => self.db.insert_if_absent(symbol_key(node, &tag.name), tag),
            Extraction::Object { tag, reference } => {
                let resolved = self.resolver.resolve(&reference, file);
                if !resolved.is_file() {
                    debug!("Skipping object {}: {} not found", tag.name, reference);
                    return false;
                }

                let child = child_node(node, &tag.name);
                self.db.insert(symbol_key(&child, &tag.name), tag);
                self.db.push_spin_file(short_name(&resolved.to_string_lossy()));
                self.find_spin_tags(&resolved, &child, ancestors);
                true
            }
        }
    }
}

/// Everything one index run needs.
#[derive(Debug, Clone)]
pub struct IndexSettings {
    pub root: PathBuf,
    pub library: PathBuf,
    pub mode: ParseMode,
    pub ctags: bool,
    pub store_path: PathBuf,
}

/// Outcome of an index run
#[derive(Debug, Clone, Serialize)]
pub struct IndexSummary {
    pub tags: usize,
    pub objects: usize,
    pub files: Vec<String>,
    pub ctags: Option<PathBuf>,
}

/// Parse the root, persist the result and optionally write ctags.
pub fn run_index(settings: &IndexSettings) -> anyhow::Result<IndexSummary> {
    let mut parser = SpinParser::new(settings.mode);
    parser.parse(&settings.root, &settings.library);

    let store = SymbolStore::open(&settings.store_path)?;
    store.save(parser.db(), parser.sources())?;
    store.set_meta("root", &settings.root.to_string_lossy())?;
    store.set_meta("library", &settings.library.to_string_lossy())?;
    store.set_meta("mode", settings.mode.as_str())?;

    let ctags = if settings.ctags {
        Some(write_ctags(parser.db(), &settings.root)?)
    } else {
        None
    };

    let stats = parser.db().stats();
    Ok(IndexSummary {
        tags: stats.total_tags,
        objects: stats.total_objects,
        files: parser.db().spin_files().to_vec(),
        ctags,
    })
}
