use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::trace;

use super::{is_object_key, SymbolKind, TagRecord};

/// Ordered mapping from hierarchical keys to tag records, plus the object
/// file list produced by the walk that filled it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolDatabase {
    tags: BTreeMap<String, TagRecord>,
    spin_files: Vec<String>,
}

impl SymbolDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every tag and the object file list.
    pub fn clear(&mut self) {
        self.tags.clear();
        self.spin_files.clear();
    }

    /// Insert a tag, replacing whatever the key held before.
    pub fn insert(&mut self, key: String, tag: TagRecord) -> Option<TagRecord> {
        trace!("Inserting tag {} -> {}", key, tag.name);
        self.tags.insert(key, tag)
    }

    /// Insert a tag only when the key is free. Returns whether it was stored.
    pub fn insert_if_absent(&mut self, key: String, tag: TagRecord) -> bool {
        if self.tags.contains_key(&key) {
            return false;
        }
        self.insert(key, tag);
        true
    }

    pub fn get(&self, key: &str) -> Option<&TagRecord> {
        self.tags.get(key)
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &TagRecord)> {
        self.tags.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Rows that mark object instances (`…/name:name`).
    pub fn object_entries(&self) -> impl Iterator<Item = (&str, &TagRecord)> {
        self.iter()
            .filter(|(key, tag)| tag.kind == SymbolKind::Object && is_object_key(key))
    }

    /// Short file names of the object tree, root first.
    pub fn spin_files(&self) -> &[String] {
        &self.spin_files
    }

    pub fn push_spin_file(&mut self, file: impl Into<String>) {
        self.spin_files.push(file.into());
    }

    pub fn stats(&self) -> DatabaseStats {
        let mut by_kind = BTreeMap::new();
        for tag in self.tags.values() {
            *by_kind.entry(tag.kind.as_str().to_string()).or_insert(0) += 1;
        }

        DatabaseStats {
            total_tags: self.tags.len(),
            total_objects: self.object_entries().count(),
            total_files: self.spin_files.len(),
            by_kind,
        }
    }
}

/// Database statistics
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DatabaseStats {
    pub total_tags: usize,
    pub total_objects: usize,
    pub total_files: usize,
    pub by_kind: BTreeMap<String, usize>,
}
