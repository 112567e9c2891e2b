//! Inheritance paths of the classes in an archive
//!
//! Every class is resolved once into an arena of nodes; ancestors shared by
//! several classes (diamonds through interfaces, a common base class) are
//! stored once and linked by `NodeId`. Only class headers are read.

use std::collections::{HashMap, HashSet};

use crate::archive::{class_entry_name, ArchiveReader, ArchiveReference};
use crate::classfile::ClassHeader;
use crate::consts::MAX_HIERARCHY_DEPTH;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
struct Node {
    name: String,
    super_class: Option<NodeId>,
    interfaces: Vec<NodeId>,
}

#[derive(Debug, Default)]
pub struct InheritanceTree {
    nodes: Vec<Node>,
    index: HashMap<String, NodeId>,
}

impl InheritanceTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the inheritance path of every class entry in `archive`,
    /// looking ancestors up through `reader`
    pub fn build(archive: &ArchiveReference, reader: &dyn ArchiveReader) -> Self {
        let mut tree = Self::new();
        for entry in archive.iter().filter(|e| e.is_class()) {
            let header = match ClassHeader::parse(&entry.bytes) {
                Ok(header) => header,
                Err(e) => {
                    log::warn!("Skipping hierarchy of unreadable entry {}: {}", entry.name, e);
                    continue;
                }
            };
            if tree.contains(&header.name) {
                continue;
            }
            let id = tree.insert(&header.name);
            tree.link(id, header, reader, 0);
        }
        log::debug!("Resolved {} hierarchy nodes for {} entries", tree.len(), archive.len());
        tree
    }

    /// A tree holding only `name` and its ancestors. Used for owners that were
    /// not part of the archive when the tree was built.
    pub fn detached(name: &str, reader: &dyn ArchiveReader) -> Self {
        let mut tree = Self::new();
        tree.resolve(name, reader);
        tree
    }

    /// Resolve `name` and its ancestors, reusing nodes already in the tree
    pub fn resolve(&mut self, name: &str, reader: &dyn ArchiveReader) -> NodeId {
        self.resolve_at(name, reader, 0)
    }

    fn resolve_at(&mut self, name: &str, reader: &dyn ArchiveReader, depth: usize) -> NodeId {
        if let Some(&id) = self.index.get(name) {
            return id;
        }
        let id = self.insert(name);
        if depth >= MAX_HIERARCHY_DEPTH {
            log::warn!("Hierarchy of {} exceeds {} levels, truncating", name, MAX_HIERARCHY_DEPTH);
            return id;
        }
        let Some(entry) = reader.of(&class_entry_name(name)) else {
            log::debug!("Class {} not found in any archive, treating as leaf", name);
            return id;
        };
        match ClassHeader::parse(&entry.bytes) {
            Ok(header) => self.link(id, header, reader, depth),
            Err(e) => log::warn!("Cannot read header of {}: {}", entry.name, e),
        }
        id
    }

    fn insert(&mut self, name: &str) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node { name: name.to_string(), super_class: None, interfaces: Vec::new() });
        self.index.insert(name.to_string(), id);
        id
    }

    fn link(&mut self, id: NodeId, header: ClassHeader, reader: &dyn ArchiveReader, depth: usize) {
        if let Some(super_name) = header.super_name {
            let super_id = self.resolve_at(&super_name, reader, depth + 1);
            self.nodes[id.0].super_class = Some(super_id);
        }
        for interface in header.interfaces {
            let interface_id = self.resolve_at(&interface, reader, depth + 1);
            self.nodes[id.0].interfaces.push(interface_id);
        }
    }

    pub fn path(&self, name: &str) -> Option<InheritancePath<'_>> {
        self.index.get(name).map(|&id| InheritancePath { tree: self, id })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Borrowed view of one class in an `InheritanceTree`
#[derive(Debug, Clone, Copy)]
pub struct InheritancePath<'a> {
    tree: &'a InheritanceTree,
    id: NodeId,
}

impl<'a> InheritancePath<'a> {
    pub fn name(&self) -> &'a str {
        &self.tree.nodes[self.id.0].name
    }

    pub fn super_class(&self) -> Option<InheritancePath<'a>> {
        let tree = self.tree;
        tree.nodes[self.id.0].super_class.map(|id| InheritancePath { tree, id })
    }

    pub fn interfaces(&self) -> impl Iterator<Item = InheritancePath<'a>> + 'a {
        let tree = self.tree;
        tree.nodes[self.id.0].interfaces.iter().map(move |&id| InheritancePath { tree, id })
    }

    /// Names to search for a member, in order: this class, then the superclass
    /// path depth first, then each interface path. Each class appears once.
    pub fn to_check(&self) -> Vec<&'a str> {
        let nodes = &self.tree.nodes;
        let mut seen = HashSet::new();
        let mut order = Vec::new();
        let mut pending = vec![self.id];
        while let Some(id) = pending.pop() {
            if !seen.insert(id) {
                continue;
            }
            let node = &nodes[id.0];
            order.push(node.name.as_str());
            pending.extend(node.interfaces.iter().rev().copied());
            pending.extend(node.super_class);
        }
        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::Entry;
    use crate::classfile::builder::ClassBuilder;

    fn class(name: &str, super_name: Option<&str>, interfaces: &[&str]) -> Entry {
        let builder = interfaces
            .iter()
            .fold(ClassBuilder::new(name, super_name), |b, i| b.interface(i));
        Entry::new(class_entry_name(name), builder.build().unwrap())
    }

    fn archive() -> ArchiveReference {
        let mut archive = ArchiveReference::new("test");
        archive.insert(class("a/D", Some("a/B"), &["a/I"]));
        archive.insert(class("a/B", Some("a/A"), &["a/J"]));
        archive.insert(class("a/A", Some("java/lang/Object"), &[]));
        archive.insert(class("a/I", Some("java/lang/Object"), &["a/J"]));
        archive.insert(class("a/J", Some("java/lang/Object"), &[]));
        archive
    }

    #[test]
    fn test_to_check_order_is_super_chain_then_interfaces() {
        let archive = archive();
        let tree = InheritanceTree::build(&archive, &archive);
        let path = tree.path("a/D").unwrap();
        assert_eq!(
            path.to_check(),
            vec!["a/D", "a/B", "a/A", "java/lang/Object", "a/J", "a/I"]
        );
        assert_eq!(path.super_class().unwrap().name(), "a/B");
        assert_eq!(path.interfaces().map(|i| i.name()).collect::<Vec<_>>(), vec!["a/I"]);
    }

    #[test]
    fn test_shared_ancestors_are_stored_once() {
        let archive = archive();
        let tree = InheritanceTree::build(&archive, &archive);
        // a/A, a/B, a/D, a/I, a/J and java/lang/Object
        assert_eq!(tree.len(), 6);
    }

    #[test]
    fn test_missing_ancestor_is_a_leaf() {
        let archive = archive();
        let tree = InheritanceTree::build(&archive, &archive);
        let object = tree.path("java/lang/Object").unwrap();
        assert!(object.super_class().is_none());
        assert_eq!(object.interfaces().count(), 0);
    }

    #[test]
    fn test_unreadable_entry_is_skipped() {
        let mut archive = archive();
        archive.insert(Entry::new("a/Broken.class", vec![0, 1, 2]));
        let tree = InheritanceTree::build(&archive, &archive);
        assert!(!tree.contains("a/Broken"));
        assert!(tree.contains("a/D"));
    }

    #[test]
    fn test_cyclic_hierarchy_terminates() {
        let mut archive = ArchiveReference::new("cycle");
        archive.insert(class("a/X", Some("a/Y"), &[]));
        archive.insert(class("a/Y", Some("a/X"), &[]));
        let tree = InheritanceTree::build(&archive, &archive);
        assert_eq!(tree.path("a/X").unwrap().to_check(), vec!["a/X", "a/Y"]);
    }

    #[test]
    fn test_detached_resolution() {
        let archive = archive();
        let tree = InheritanceTree::detached("a/B", &archive);
        assert_eq!(tree.path("a/B").unwrap().to_check(), vec!["a/B", "a/A", "java/lang/Object", "a/J"]);
        assert!(!tree.contains("a/D"));
    }
}
