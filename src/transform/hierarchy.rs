//! Namespace-consistent hierarchy facts for frame computation
//!
//! Classes are written in the destination namespace, but the archive and its
//! dependencies are still stored under source names. Each `TypeSource` reads a
//! class header and applies the pending class rewrite, so the encoder only
//! ever sees destination-namespace hierarchy data.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::archive::{class_entry_name, ArchiveReader, ArchiveReference};
use crate::classfile::defs::{access_flags::ACC_INTERFACE, OBJECT_CLASS};
use crate::classfile::{ClassFile, ClassHeader, ClassWriter, HierarchyNode, TypeLoader};
use crate::error::Result;

use super::remapper::NamespaceRemapper;

/// One place hierarchy facts can come from
pub trait TypeSource: Send + Sync {
    fn find(&self, name: &str) -> Option<HierarchyNode>;
}

/// Header of `entry_name` in `reader`, with every class name remapped
fn remapped_node(reader: &dyn ArchiveReader, name: &str, remapper: &NamespaceRemapper<'_>) -> Option<HierarchyNode> {
    let entry = reader.of(&class_entry_name(name))?;
    let header = match ClassHeader::parse(&entry.bytes) {
        Ok(header) => header,
        Err(e) => {
            log::warn!("Cannot read header of {}: {}", entry.name, e);
            return None;
        }
    };
    let map = |name: &str| {
        remapper.map_class_name(name).unwrap_or_else(|e| {
            log::warn!("Keeping hierarchy name {}: {}", name, e);
            name.to_string()
        })
    };
    Some(HierarchyNode {
        name: map(&header.name),
        super_name: header.super_name.as_deref().map(&map),
        interfaces: header.interfaces.iter().map(|i| map(i)).collect(),
        is_interface: header.access_flags & ACC_INTERFACE != 0,
    })
}

/// Classes of the archive under transformation
pub struct ArchiveTypeSource<'a> {
    archive: &'a ArchiveReference,
    remapper: &'a NamespaceRemapper<'a>,
}

impl<'a> ArchiveTypeSource<'a> {
    pub fn new(archive: &'a ArchiveReference, remapper: &'a NamespaceRemapper<'a>) -> Self {
        Self { archive, remapper }
    }
}

impl TypeSource for ArchiveTypeSource<'_> {
    fn find(&self, name: &str) -> Option<HierarchyNode> {
        remapped_node(self.archive, name, self.remapper)
    }
}

/// Classes of the dependency archives, first match wins
pub struct DependencyTypeSource<'a> {
    dependencies: &'a [&'a dyn ArchiveReader],
    remapper: &'a NamespaceRemapper<'a>,
}

impl<'a> DependencyTypeSource<'a> {
    pub fn new(dependencies: &'a [&'a dyn ArchiveReader], remapper: &'a NamespaceRemapper<'a>) -> Self {
        Self { dependencies, remapper }
    }
}

impl TypeSource for DependencyTypeSource<'_> {
    fn find(&self, name: &str) -> Option<HierarchyNode> {
        self.dependencies
            .iter()
            .find_map(|dependency| remapped_node(*dependency, name, self.remapper))
    }
}

struct PlatformType {
    super_name: Option<&'static str>,
    interfaces: &'static [&'static str],
    is_interface: bool,
}

const fn class(super_name: &'static str, interfaces: &'static [&'static str]) -> PlatformType {
    PlatformType { super_name: Some(super_name), interfaces, is_interface: false }
}

const fn interface(interfaces: &'static [&'static str]) -> PlatformType {
    PlatformType { super_name: Some(OBJECT_CLASS), interfaces, is_interface: true }
}

static PLATFORM_TYPES: Lazy<HashMap<&'static str, PlatformType>> = Lazy::new(|| {
    const SERIALIZABLE: &str = "java/io/Serializable";
    HashMap::from([
        (OBJECT_CLASS, PlatformType { super_name: None, interfaces: &[], is_interface: false }),
        ("java/lang/String", class(OBJECT_CLASS, &[SERIALIZABLE, "java/lang/Comparable", "java/lang/CharSequence"])),
        ("java/lang/Class", class(OBJECT_CLASS, &[SERIALIZABLE])),
        ("java/lang/Enum", class(OBJECT_CLASS, &["java/lang/Comparable", SERIALIZABLE])),
        ("java/lang/Record", class(OBJECT_CLASS, &[])),
        ("java/lang/Number", class(OBJECT_CLASS, &[SERIALIZABLE])),
        ("java/lang/Integer", class("java/lang/Number", &["java/lang/Comparable"])),
        ("java/lang/Long", class("java/lang/Number", &["java/lang/Comparable"])),
        ("java/lang/Short", class("java/lang/Number", &["java/lang/Comparable"])),
        ("java/lang/Byte", class("java/lang/Number", &["java/lang/Comparable"])),
        ("java/lang/Float", class("java/lang/Number", &["java/lang/Comparable"])),
        ("java/lang/Double", class("java/lang/Number", &["java/lang/Comparable"])),
        ("java/lang/Boolean", class(OBJECT_CLASS, &[SERIALIZABLE, "java/lang/Comparable"])),
        ("java/lang/Character", class(OBJECT_CLASS, &[SERIALIZABLE, "java/lang/Comparable"])),
        ("java/lang/AbstractStringBuilder", class(OBJECT_CLASS, &["java/lang/Appendable", "java/lang/CharSequence"])),
        ("java/lang/StringBuilder", class("java/lang/AbstractStringBuilder", &[SERIALIZABLE])),
        ("java/lang/Throwable", class(OBJECT_CLASS, &[SERIALIZABLE])),
        ("java/lang/Exception", class("java/lang/Throwable", &[])),
        ("java/lang/Error", class("java/lang/Throwable", &[])),
        ("java/lang/RuntimeException", class("java/lang/Exception", &[])),
        ("java/lang/IllegalArgumentException", class("java/lang/RuntimeException", &[])),
        ("java/lang/IllegalStateException", class("java/lang/RuntimeException", &[])),
        ("java/lang/NullPointerException", class("java/lang/RuntimeException", &[])),
        ("java/lang/UnsupportedOperationException", class("java/lang/RuntimeException", &[])),
        ("java/lang/IndexOutOfBoundsException", class("java/lang/RuntimeException", &[])),
        ("java/lang/ClassCastException", class("java/lang/RuntimeException", &[])),
        ("java/io/IOException", class("java/lang/Exception", &[])),
        ("java/util/AbstractCollection", class(OBJECT_CLASS, &["java/util/Collection"])),
        ("java/util/AbstractList", class("java/util/AbstractCollection", &["java/util/List"])),
        ("java/util/ArrayList", class("java/util/AbstractList", &["java/util/List", "java/util/RandomAccess", "java/lang/Cloneable", SERIALIZABLE])),
        ("java/util/AbstractMap", class(OBJECT_CLASS, &["java/util/Map"])),
        ("java/util/HashMap", class("java/util/AbstractMap", &["java/util/Map", "java/lang/Cloneable", SERIALIZABLE])),
        ("java/util/AbstractSet", class("java/util/AbstractCollection", &["java/util/Set"])),
        ("java/util/HashSet", class("java/util/AbstractSet", &["java/util/Set", "java/lang/Cloneable", SERIALIZABLE])),
        (SERIALIZABLE, interface(&[])),
        ("java/lang/Comparable", interface(&[])),
        ("java/lang/CharSequence", interface(&[])),
        ("java/lang/Appendable", interface(&[])),
        ("java/lang/Cloneable", interface(&[])),
        ("java/lang/Runnable", interface(&[])),
        ("java/lang/AutoCloseable", interface(&[])),
        ("java/io/Closeable", interface(&["java/lang/AutoCloseable"])),
        ("java/lang/Iterable", interface(&[])),
        ("java/util/Collection", interface(&["java/lang/Iterable"])),
        ("java/util/List", interface(&["java/util/Collection"])),
        ("java/util/Set", interface(&["java/util/Collection"])),
        ("java/util/Map", interface(&[])),
        ("java/util/RandomAccess", interface(&[])),
    ])
});

/// Built-in table of well-known platform types. Other names are not
/// answered; a full platform archive (`rt.jar`, an extracted jmod) passed as a
/// dependency covers the rest.
#[derive(Debug, Default)]
pub struct PlatformTypeSource;

impl TypeSource for PlatformTypeSource {
    fn find(&self, name: &str) -> Option<HierarchyNode> {
        let Some(known) = PLATFORM_TYPES.get(name) else {
            log::debug!("No hierarchy known for {}", name);
            return None;
        };
        Some(HierarchyNode {
            name: name.to_string(),
            super_name: known.super_name.map(str::to_string),
            interfaces: known.interfaces.iter().map(|i| i.to_string()).collect(),
            is_interface: known.is_interface,
        })
    }
}

/// Encoder hook that answers hierarchy queries from the archive, then the
/// dependencies, then the platform table
pub struct HierarchyAwareWriter<'a> {
    remapper: &'a NamespaceRemapper<'a>,
    sources: Vec<Box<dyn TypeSource + 'a>>,
    compute_frames: bool,
}

impl<'a> HierarchyAwareWriter<'a> {
    pub fn new(
        archive: &'a ArchiveReference,
        dependencies: &'a [&'a dyn ArchiveReader],
        remapper: &'a NamespaceRemapper<'a>,
    ) -> Self {
        Self {
            remapper,
            sources: vec![
                Box::new(ArchiveTypeSource::new(archive, remapper)),
                Box::new(DependencyTypeSource::new(dependencies, remapper)),
                Box::new(PlatformTypeSource),
            ],
            compute_frames: true,
        }
    }

    pub fn with_compute_frames(mut self, compute_frames: bool) -> Self {
        self.compute_frames = compute_frames;
        self
    }

    /// Encode an already remapped class
    pub fn write(&self, class: &mut ClassFile) -> Result<Vec<u8>> {
        Ok(ClassWriter::new(self).with_compute_frames(self.compute_frames).write(class)?)
    }
}

impl TypeLoader for HierarchyAwareWriter<'_> {
    /// Tries `name` as given, then its name in the opposite namespace, in
    /// each source before moving on to the next
    fn load_type(&self, name: &str) -> Option<HierarchyNode> {
        let opposite = self
            .remapper
            .mappings()
            .map_class_name(name, self.remapper.to_namespace(), self.remapper.from_namespace())
            .filter(|&opposite| opposite != name);
        self.sources.iter().find_map(|source| {
            source
                .find(name)
                .or_else(|| opposite.and_then(|opposite| source.find(opposite)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::Entry;
    use crate::classfile::builder::ClassBuilder;
    use crate::mapping::{ArchiveMapping, ClassMappingBuilder};
    use crate::transform::inheritance::InheritanceTree;

    fn class(name: &str, super_name: &str) -> Entry {
        Entry::new(class_entry_name(name), ClassBuilder::new(name, Some(super_name)).build().unwrap())
    }

    fn fixture() -> (ArchiveReference, ArchiveReference, ArchiveMapping) {
        let mut archive = ArchiveReference::new("main");
        archive.insert(class("a", OBJECT_CLASS));
        archive.insert(class("b", "a"));
        archive.insert(class("c", "a"));
        let mut dependency = ArchiveReference::new("dep");
        dependency.insert(class("lib/Base", OBJECT_CLASS));
        let mappings = ArchiveMapping::builder()
            .class(ClassMappingBuilder::new().name("obf", "a").name("named", "pkg/Animal"))
            .class(ClassMappingBuilder::new().name("obf", "b").name("named", "pkg/Dog"))
            .class(ClassMappingBuilder::new().name("obf", "c").name("named", "pkg/Cat"))
            .build()
            .unwrap();
        (archive, dependency, mappings)
    }

    #[test]
    fn test_archive_types_are_seen_in_destination_namespace() {
        let (archive, dependency, mappings) = fixture();
        let tree = InheritanceTree::build(&archive, &archive);
        let remapper = NamespaceRemapper::new(&mappings, "obf", "named", &tree, &archive);
        let dependencies: Vec<&dyn ArchiveReader> = vec![&dependency];
        let writer = HierarchyAwareWriter::new(&archive, &dependencies, &remapper);

        let dog = writer.load_type("pkg/Dog").unwrap();
        assert_eq!(dog.super_name.as_deref(), Some("pkg/Animal"));
        assert_eq!(writer.common_super_class("pkg/Dog", "pkg/Cat").unwrap(), "pkg/Animal");
        assert_eq!(writer.load_type("b").unwrap().name, "pkg/Dog");
        assert_eq!(writer.load_type("lib/Base").unwrap().super_name.as_deref(), Some(OBJECT_CLASS));
    }

    #[test]
    fn test_platform_table() {
        let source = PlatformTypeSource;
        let string = source.find("java/lang/String").unwrap();
        assert!(string.interfaces.contains(&"java/lang/CharSequence".to_string()));
        assert!(source.find("java/util/List").unwrap().is_interface);
        assert!(source.find("java/util/ArrayDeque").is_none());
        let loader = PlatformLoader(&source);
        assert_eq!(loader.common_super_class("java/lang/Integer", "java/lang/Long").unwrap(), "java/lang/Number");
        assert!(loader.common_super_class("java/util/ArrayList", "java/util/ArrayDeque").is_err());
    }

    #[test]
    fn test_platform_archive_as_dependency() {
        let (archive, _, mappings) = fixture();
        let mut platform = ArchiveReference::new("rt");
        platform.insert(class("java/util/ArrayDeque", "java/util/AbstractCollection"));
        let tree = InheritanceTree::build(&archive, &archive);
        let remapper = NamespaceRemapper::new(&mappings, "obf", "named", &tree, &archive);
        let dependencies: Vec<&dyn ArchiveReader> = vec![&platform];
        let writer = HierarchyAwareWriter::new(&archive, &dependencies, &remapper);

        assert_eq!(
            writer.common_super_class("java/util/ArrayList", "java/util/ArrayDeque").unwrap(),
            "java/util/AbstractCollection"
        );
    }

    struct PlatformLoader<'a>(&'a PlatformTypeSource);

    impl TypeLoader for PlatformLoader<'_> {
        fn load_type(&self, name: &str) -> Option<HierarchyNode> {
            self.0.find(name)
        }
    }
}
