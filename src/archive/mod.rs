//! Archives of named binary entries
//!
//! `ArchiveReference` is the mutable archive a pass rewrites; dependency
//! archives are only ever read through the `ArchiveReader` trait.

pub mod delegating;
pub mod io;

use std::collections::BTreeMap;
use std::sync::Arc;

pub use delegating::DelegatingArchiveReader;

use crate::consts::CLASS_SUFFIX;
use crate::error::{Error, Result};

/// One named entry. Bytes are shared, so cloning an entry is cheap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub is_directory: bool,
    pub bytes: Arc<[u8]>,
}

impl Entry {
    pub fn new(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self { name: name.into(), is_directory: false, bytes: bytes.into() }
    }

    pub fn directory(name: impl Into<String>) -> Self {
        Self { name: name.into(), is_directory: true, bytes: Arc::from(Vec::new()) }
    }

    /// Whether this entry holds a compiled class
    pub fn is_class(&self) -> bool {
        !self.is_directory && self.name.ends_with(CLASS_SUFFIX)
    }

    /// `a/B` for an entry named `a/B.class`
    pub fn class_name(&self) -> Option<&str> {
        if self.is_directory {
            return None;
        }
        self.name.strip_suffix(CLASS_SUFFIX)
    }
}

/// Entry name holding class `name`
pub fn class_entry_name(name: &str) -> String {
    format!("{}{}", name, CLASS_SUFFIX)
}

/// Read access to an archive
pub trait ArchiveReader: Send + Sync {
    fn of(&self, name: &str) -> Option<Entry>;

    /// Like `of`, for an entry that must exist
    fn require(&self, name: &str) -> Result<Entry> {
        self.of(name).ok_or_else(|| Error::missing_entry(name))
    }

    /// Every entry, produced lazily
    fn entries(&self) -> Box<dyn Iterator<Item = Entry> + '_>;
}

/// In-memory archive, keyed by entry name
#[derive(Debug, Clone, Default)]
pub struct ArchiveReference {
    name: String,
    entries: BTreeMap<String, Entry>,
}

impl ArchiveReference {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), entries: BTreeMap::new() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, name: &str) -> Option<&Entry> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Insert or replace the entry with the same name
    pub fn insert(&mut self, entry: Entry) -> Option<Entry> {
        self.entries.insert(entry.name.clone(), entry)
    }

    pub fn remove(&mut self, name: &str) -> Option<Entry> {
        self.entries.remove(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ArchiveReader for ArchiveReference {
    fn of(&self, name: &str) -> Option<Entry> {
        self.entries.get(name).cloned()
    }

    fn entries(&self) -> Box<dyn Iterator<Item = Entry> + '_> {
        Box::new(self.entries.values().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_replaces_and_remove_drops() {
        let mut archive = ArchiveReference::new("test");
        archive.insert(Entry::new("a/B.class", vec![1]));
        let previous = archive.insert(Entry::new("a/B.class", vec![2]));
        assert_eq!(previous.unwrap().bytes.as_ref(), &[1]);
        assert_eq!(archive.len(), 1);
        assert_eq!(archive.of("a/B.class").unwrap().bytes.as_ref(), &[2]);
        assert!(archive.remove("a/B.class").is_some());
        assert!(archive.is_empty());
    }

    #[test]
    fn test_require_reports_missing_entry() {
        let archive = ArchiveReference::new("test");
        match archive.require("a/B.class") {
            Err(Error::MissingEntry { name }) => assert_eq!(name, "a/B.class"),
            other => panic!("expected missing entry, got {:?}", other),
        }
    }

    #[test]
    fn test_class_entries() {
        let class = Entry::new("a/B.class", vec![]);
        assert!(class.is_class());
        assert_eq!(class.class_name(), Some("a/B"));
        assert!(!Entry::new("META-INF/MANIFEST.MF", vec![]).is_class());
        assert!(!Entry::directory("a/").is_class());
        assert_eq!(class_entry_name("a/B"), "a/B.class");
    }
}
